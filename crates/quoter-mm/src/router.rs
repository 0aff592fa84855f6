//! Market update routing.
//!
//! Dispatches every inbound [`MarketUpdate`]:
//! - `TopOfBook` → cached, marks the quotes dirty when the book moved
//! - `ExchangeOrdersSnapshot` → start-up / reconnect reconciliation
//! - order lifecycle (acks, nacks, fills) → forwarded to the ledger

use quoter_core::{Clock, MarketUpdate, OrdersSnapshot, TopOfBook};
use tracing::{debug, error, info, warn};

use crate::controller::StrategyController;
use crate::error::{FailureCause, FatalError, StrategyError};
use crate::gateway::{Connectivity, OrderLedger};

/// What the router did with an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Strategy is stopped; update dropped.
    Ignored,
    /// Book stored and quotes marked dirty.
    BookChanged,
    /// Same bid and ask as the cached book.
    BookUnchanged,
    /// Snapshot reconciled.
    Reconciled(Reconciliation),
    /// Order-lifecycle update handed to the ledger.
    Forwarded,
}

/// Result of reconciling an exchange snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Empty snapshot, or start-up cancellation is left to connectivity.
    Skipped,
    /// Odd order count; everything was cancelled.
    Cancelled,
    /// Snapshot adopted as the live-order set.
    Activated,
}

impl<L, X, C> StrategyController<L, X, C>
where
    L: OrderLedger,
    X: Connectivity,
    C: Clock,
{
    /// Route one inbound update.
    ///
    /// A ledger failure on an order-lifecycle update is not retried; it is
    /// returned as [`StrategyError::Routing`] for the caller to escalate.
    pub async fn on_market_update(
        &mut self,
        update: MarketUpdate,
    ) -> Result<RouteOutcome, StrategyError> {
        if !self.state.is_active() {
            debug!(
                update = update.variant_name(),
                "Strategy is not active, update will be ignored"
            );
            return Ok(RouteOutcome::Ignored);
        }

        match &update {
            MarketUpdate::TopOfBook(tob) => return Ok(self.on_top_of_book(*tob)),
            MarketUpdate::ExchangeOrdersSnapshot(snapshot) => {
                let result = self.reconcile_snapshot(snapshot.clone()).await?;
                return Ok(RouteOutcome::Reconciled(result));
            }
            MarketUpdate::NewOrderNack(nack) | MarketUpdate::AmendNack(nack) => {
                info!(
                    kind = update.variant_name(),
                    order_id = %nack.order_id,
                    reason = %nack.reason,
                    "Received order nack"
                );
            }
            MarketUpdate::NewOrderAck(_)
            | MarketUpdate::AmendAck(_)
            | MarketUpdate::OrderFillAck(_)
            | MarketUpdate::OrderFullFillAck(_) => {}
        }

        let Some(order_id) = update.order_id() else {
            return Ok(RouteOutcome::Forwarded);
        };
        if let Err(source) = self.ledger.update_order_state(order_id, &update) {
            error!(
                kind = update.variant_name(),
                order_id = %order_id,
                error = %source,
                "update_order_state failed"
            );
            return Err(StrategyError::Routing(FailureCause::Routing {
                variant: update.variant_name(),
                source,
            }));
        }
        Ok(RouteOutcome::Forwarded)
    }

    fn on_top_of_book(&mut self, tob: TopOfBook) -> RouteOutcome {
        let moved = match &self.state.tob {
            None => true,
            Some(previous) => tob.moved_from(previous),
        };
        if !moved {
            return RouteOutcome::BookUnchanged;
        }
        debug!(book = %tob, "Top of book moved");
        self.state.tob = Some(tob);
        self.state.dirty = true;
        RouteOutcome::BookChanged
    }

    /// Reconcile tracked orders with the exchange's live-order list.
    async fn reconcile_snapshot(
        &mut self,
        snapshot: OrdersSnapshot,
    ) -> Result<Reconciliation, FatalError> {
        let count = snapshot.len();
        if count == 0 || self.config.cancel_orders_on_start {
            debug!(
                count,
                cancel_on_start = self.config.cancel_orders_on_start,
                "Snapshot reconciliation skipped"
            );
            return Ok(Reconciliation::Skipped);
        }

        // Quotes are sent as matched bid/ask pairs; an odd count means the
        // book we left behind is inconsistent.
        if count % 2 != 0 {
            warn!(
                bids = snapshot.bids.len(),
                asks = snapshot.asks.len(),
                "Parity check failed on exchange snapshot, cancelling all orders"
            );
            self.cancel_orders("parity check failure").await?;
            return Ok(Reconciliation::Cancelled);
        }

        info!(
            bids = snapshot.bids.len(),
            asks = snapshot.asks.len(),
            "Adopting live orders from exchange snapshot"
        );
        self.ledger.activate_orders(snapshot);
        Ok(Reconciliation::Activated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{harness, snapshot, test_config, tob, LedgerCall};
    use quoter_core::{FillAck, OrderAck, OrderId, OrderNack, Price, Size};
    use rust_decimal_macros::dec;

    fn ack(id: &str) -> MarketUpdate {
        MarketUpdate::AmendAck(OrderAck {
            order_id: OrderId::from(id),
            price: Price::new(dec!(100)),
            quantity: Size::new(dec!(1)),
        })
    }

    #[tokio::test]
    async fn test_first_book_sets_dirty() {
        let mut h = harness(test_config());
        assert!(!h.controller.state().is_dirty());

        let outcome = h
            .controller
            .on_market_update(tob(dec!(100), dec!(101)))
            .await
            .unwrap();

        assert_eq!(outcome, RouteOutcome::BookChanged);
        assert!(h.controller.state().is_dirty());
        assert_eq!(
            h.controller.state().tob().map(|t| t.best_bid().inner()),
            Some(dec!(100))
        );
    }

    #[tokio::test]
    async fn test_identical_book_is_idempotent() {
        let mut h = harness(test_config());
        h.controller
            .on_market_update(tob(dec!(100), dec!(101)))
            .await
            .unwrap();
        // Simulate an amend cycle having consumed the change
        h.controller.state.dirty = false;

        let outcome = h
            .controller
            .on_market_update(tob(dec!(100.0), dec!(101.00)))
            .await
            .unwrap();

        assert_eq!(outcome, RouteOutcome::BookUnchanged);
        assert!(!h.controller.state().is_dirty());
    }

    #[tokio::test]
    async fn test_either_side_moving_sets_dirty() {
        let mut h = harness(test_config());
        h.controller
            .on_market_update(tob(dec!(100), dec!(101)))
            .await
            .unwrap();

        for update in [tob(dec!(100), dec!(101.5)), tob(dec!(99.5), dec!(101.5))] {
            h.controller.state.dirty = false;
            let outcome = h.controller.on_market_update(update).await.unwrap();
            assert_eq!(outcome, RouteOutcome::BookChanged);
            assert!(h.controller.state().is_dirty());
        }
        assert_eq!(
            h.controller.state().tob().map(|t| t.best_bid().inner()),
            Some(dec!(99.5))
        );
    }

    #[tokio::test]
    async fn test_odd_snapshot_cancels_and_never_activates() {
        let mut h = harness(test_config());
        let outcome = h
            .controller
            .on_market_update(MarketUpdate::ExchangeOrdersSnapshot(snapshot(2, 1)))
            .await
            .unwrap();

        assert_eq!(outcome, RouteOutcome::Reconciled(Reconciliation::Cancelled));
        assert_eq!(h.ledger.cancel_count(), 1);
        assert_eq!(h.ledger.activations(), 0);
    }

    #[tokio::test]
    async fn test_even_snapshot_activates_and_never_cancels() {
        let mut h = harness(test_config());
        let outcome = h
            .controller
            .on_market_update(MarketUpdate::ExchangeOrdersSnapshot(snapshot(2, 2)))
            .await
            .unwrap();

        assert_eq!(outcome, RouteOutcome::Reconciled(Reconciliation::Activated));
        assert_eq!(h.ledger.cancel_count(), 0);
        assert_eq!(h.ledger.calls(), vec![LedgerCall::Activate(snapshot(2, 2))]);
    }

    #[tokio::test]
    async fn test_snapshot_skipped_when_empty_or_cancel_on_start() {
        let mut h = harness(test_config());
        let outcome = h
            .controller
            .on_market_update(MarketUpdate::ExchangeOrdersSnapshot(snapshot(0, 0)))
            .await
            .unwrap();
        assert_eq!(outcome, RouteOutcome::Reconciled(Reconciliation::Skipped));

        let mut h = harness(crate::config::StrategyConfig {
            cancel_orders_on_start: true,
            ..test_config()
        });
        let outcome = h
            .controller
            .on_market_update(MarketUpdate::ExchangeOrdersSnapshot(snapshot(2, 1)))
            .await
            .unwrap();
        assert_eq!(outcome, RouteOutcome::Reconciled(Reconciliation::Skipped));
        assert!(h.ledger.calls().is_empty());
    }

    #[tokio::test]
    async fn test_parity_cancel_failure_escalates_to_recovery() {
        let mut h = harness(test_config());
        h.ledger.fail_cancels(1);

        let outcome = h
            .controller
            .on_market_update(MarketUpdate::ExchangeOrdersSnapshot(snapshot(1, 0)))
            .await
            .unwrap();

        assert_eq!(outcome, RouteOutcome::Reconciled(Reconciliation::Cancelled));
        assert_eq!(h.connectivity.reconnects(), 1);
        assert!(h.controller.is_active());
    }

    #[tokio::test]
    async fn test_lifecycle_updates_forwarded_to_ledger() {
        let mut h = harness(test_config());
        let fill = MarketUpdate::OrderFillAck(FillAck {
            order_id: OrderId::from("o-2"),
            fill_price: Price::new(dec!(100)),
            fill_quantity: Size::new(dec!(0.5)),
        });
        let nack = MarketUpdate::NewOrderNack(OrderNack {
            order_id: OrderId::from("o-3"),
            reason: "would cross".to_string(),
        });

        for update in [ack("o-1"), fill, nack] {
            let outcome = h.controller.on_market_update(update).await.unwrap();
            assert_eq!(outcome, RouteOutcome::Forwarded);
        }

        assert_eq!(
            h.ledger.calls(),
            vec![
                LedgerCall::Update(OrderId::from("o-1"), "AmendAck"),
                LedgerCall::Update(OrderId::from("o-2"), "OrderFillAck"),
                LedgerCall::Update(OrderId::from("o-3"), "NewOrderNack"),
            ]
        );
        // Nacks never escalate
        assert_eq!(h.connectivity.reconnects(), 0);
    }

    #[tokio::test]
    async fn test_ledger_failure_is_wrapped_with_variant() {
        let mut h = harness(test_config());
        h.ledger.fail_updates(true);

        let err = h.controller.on_market_update(ack("o-9")).await.unwrap_err();

        match err {
            StrategyError::Routing(FailureCause::Routing { variant, source }) => {
                assert_eq!(variant, "AmendAck");
                assert!(source.to_string().contains("o-9"));
            }
            other => panic!("Expected routing error, got {other:?}"),
        }
        // Not retried locally
        assert_eq!(h.connectivity.reconnects(), 0);
        assert_eq!(h.ledger.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_stopped_strategy_ignores_everything() {
        let mut h = harness(test_config());
        h.controller.state.stop();

        for update in [
            tob(dec!(100), dec!(101)),
            MarketUpdate::ExchangeOrdersSnapshot(snapshot(1, 0)),
            ack("o-1"),
        ] {
            let outcome = h.controller.on_market_update(update).await.unwrap();
            assert_eq!(outcome, RouteOutcome::Ignored);
        }
        assert!(h.controller.state().tob().is_none());
        assert!(h.ledger.calls().is_empty());
    }
}
