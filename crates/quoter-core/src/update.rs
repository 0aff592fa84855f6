//! Inbound updates from the exchange connectivity layer.
//!
//! `MarketUpdate` is the closed set of messages the strategy reacts to.
//! On the wire (replay files) each update is a JSON object tagged by `type`.

use serde::{Deserialize, Serialize};

use crate::{OrderId, Price, Size, TopOfBook};

/// An order currently live on the exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveOrder {
    pub order_id: OrderId,
    pub price: Price,
    pub quantity: Size,
}

/// Authoritative list of live orders, sent at start and after reconnect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrdersSnapshot {
    #[serde(default)]
    pub bids: Vec<LiveOrder>,
    #[serde(default)]
    pub asks: Vec<LiveOrder>,
}

impl OrdersSnapshot {
    /// Total number of live orders across both sides.
    pub fn len(&self) -> usize {
        self.bids.len() + self.asks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}

/// Positive acknowledgement of a new order or an amend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAck {
    pub order_id: OrderId,
    pub price: Price,
    pub quantity: Size,
}

/// Negative acknowledgement. Informational only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderNack {
    pub order_id: OrderId,
    #[serde(default)]
    pub reason: String,
}

/// Partial or full fill notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillAck {
    pub order_id: OrderId,
    pub fill_price: Price,
    pub fill_quantity: Size,
}

/// Inbound update consumed by the strategy router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MarketUpdate {
    TopOfBook(TopOfBook),
    ExchangeOrdersSnapshot(OrdersSnapshot),
    NewOrderAck(OrderAck),
    AmendAck(OrderAck),
    NewOrderNack(OrderNack),
    AmendNack(OrderNack),
    OrderFillAck(FillAck),
    OrderFullFillAck(FillAck),
}

impl MarketUpdate {
    /// Variant name, used as error and log context.
    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::TopOfBook(_) => "TopOfBook",
            Self::ExchangeOrdersSnapshot(_) => "ExchangeOrdersSnapshot",
            Self::NewOrderAck(_) => "NewOrderAck",
            Self::AmendAck(_) => "AmendAck",
            Self::NewOrderNack(_) => "NewOrderNack",
            Self::AmendNack(_) => "AmendNack",
            Self::OrderFillAck(_) => "OrderFillAck",
            Self::OrderFullFillAck(_) => "OrderFullFillAck",
        }
    }

    /// Order the update refers to, for order-lifecycle variants.
    pub fn order_id(&self) -> Option<&OrderId> {
        match self {
            Self::TopOfBook(_) | Self::ExchangeOrdersSnapshot(_) => None,
            Self::NewOrderAck(ack) | Self::AmendAck(ack) => Some(&ack.order_id),
            Self::NewOrderNack(nack) | Self::AmendNack(nack) => Some(&nack.order_id),
            Self::OrderFillAck(fill) | Self::OrderFullFillAck(fill) => Some(&fill.order_id),
        }
    }

    pub fn is_nack(&self) -> bool {
        matches!(self, Self::NewOrderNack(_) | Self::AmendNack(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_tagged_top_of_book() {
        let json = r#"{"type":"TopOfBook","best_bid_price":"100.5","best_ask_price":"101"}"#;
        let update: MarketUpdate = serde_json::from_str(json).unwrap();
        match update {
            MarketUpdate::TopOfBook(tob) => {
                assert_eq!(tob.best_bid().inner(), dec!(100.5));
                assert_eq!(tob.best_ask().inner(), dec!(101));
            }
            other => panic!("Expected TopOfBook, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_snapshot_with_missing_side() {
        let json = r#"{"type":"ExchangeOrdersSnapshot",
            "bids":[{"order_id":"a","price":"99","quantity":"1"}]}"#;
        let update: MarketUpdate = serde_json::from_str(json).unwrap();
        let MarketUpdate::ExchangeOrdersSnapshot(snapshot) = update else {
            panic!("Expected snapshot");
        };
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.asks.is_empty());
    }

    #[test]
    fn test_order_id_and_variant_name() {
        let nack = MarketUpdate::AmendNack(OrderNack {
            order_id: OrderId::from("o-1"),
            reason: "post only".to_string(),
        });
        assert_eq!(nack.variant_name(), "AmendNack");
        assert_eq!(nack.order_id().map(OrderId::as_str), Some("o-1"));
        assert!(nack.is_nack());

        let fill = MarketUpdate::OrderFullFillAck(FillAck {
            order_id: OrderId::from("o-2"),
            fill_price: Price::new(dec!(100)),
            fill_quantity: Size::new(dec!(1)),
        });
        assert_eq!(fill.variant_name(), "OrderFullFillAck");
        assert!(!fill.is_nack());
    }

    #[test]
    fn test_unknown_type_rejected() {
        let json = r#"{"type":"Heartbeat"}"#;
        assert!(serde_json::from_str::<MarketUpdate>(json).is_err());
    }
}
