//! In-memory paper exchange.
//!
//! Implements both strategy seams, [`OrderLedger`] and [`Connectivity`], over
//! one order book kept in memory. Amends are matched to live orders per side
//! in ladder order; unmatched requests become new orders and surplus live
//! orders are dropped. Acknowledgements are pushed into the registered
//! update sink, so they reach the strategy through the normal update path.

use parking_lot::Mutex;
use quoter_core::{
    LiveOrder, MarketUpdate, OrderAck, OrderId, OrderRequest, OrderSide, OrdersSnapshot, Price,
    Size,
};
use quoter_mm::{
    BoxFuture, Connectivity, ConnectivityError, LedgerError, OrderLedger, UpdateSink,
};
use tracing::{debug, info, warn};

use crate::config::PaperConfig;

/// Order status as the paper ledger tracks it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaperStatus {
    /// Sent, not yet acknowledged.
    Pending,
    /// Acknowledged; may be amended again.
    Confirmed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperOrder {
    pub order_id: OrderId,
    pub side: OrderSide,
    pub price: Price,
    pub quantity: Size,
    pub status: PaperStatus,
}

impl PaperOrder {
    fn to_live(&self) -> LiveOrder {
        LiveOrder {
            order_id: self.order_id.clone(),
            price: self.price,
            quantity: self.quantity,
        }
    }
}

#[derive(Debug, Default)]
struct PaperState {
    orders: Vec<PaperOrder>,
    sink: Option<UpdateSink>,
    cancel_on_start: bool,
    reconnect_failures_left: u32,
    amend_batches: usize,
    cancels: usize,
    reconnects: usize,
}

impl PaperState {
    fn publish(&self, update: MarketUpdate) {
        match &self.sink {
            Some(sink) => {
                if sink.send(update).is_err() {
                    debug!("Update sink closed, update dropped");
                }
            }
            None => warn!(
                update = update.variant_name(),
                "No update sink registered, update dropped"
            ),
        }
    }

    fn snapshot(&self) -> OrdersSnapshot {
        let side = |s: OrderSide| {
            self.orders
                .iter()
                .filter(|o| o.side == s)
                .map(PaperOrder::to_live)
                .collect()
        };
        OrdersSnapshot {
            bids: side(OrderSide::Buy),
            asks: side(OrderSide::Sell),
        }
    }

    fn position(&self, order_id: &OrderId) -> Result<usize, LedgerError> {
        self.orders
            .iter()
            .position(|o| &o.order_id == order_id)
            .ok_or_else(|| LedgerError::new(format!("unknown order {order_id}")))
    }
}

/// Paper ledger and connectivity in one.
#[derive(Debug)]
pub struct PaperExchange {
    config: PaperConfig,
    state: Mutex<PaperState>,
}

impl PaperExchange {
    pub fn new(config: PaperConfig) -> Self {
        let state = PaperState {
            reconnect_failures_left: config.reconnect_failures,
            ..Default::default()
        };
        Self {
            config,
            state: Mutex::new(state),
        }
    }

    /// Open the session: emits the current live orders as a snapshot.
    pub fn connect(&self) {
        let mut state = self.state.lock();
        if state.cancel_on_start && !state.orders.is_empty() {
            info!(count = state.orders.len(), "Cancelling pre-existing orders on start");
            state.orders.clear();
        }
        let snapshot = state.snapshot();
        state.publish(MarketUpdate::ExchangeOrdersSnapshot(snapshot));
    }

    /// Inject an update as if it came from the exchange.
    pub fn publish(&self, update: MarketUpdate) {
        self.state.lock().publish(update);
    }

    /// Sender for external feeds such as the replay task.
    pub fn update_sink(&self) -> Option<UpdateSink> {
        self.state.lock().sink.clone()
    }

    /// Seed live orders, e.g. left over from a previous session.
    pub fn seed_orders(&self, orders: Vec<PaperOrder>) {
        self.state.lock().orders = orders;
    }

    pub fn orders(&self) -> Vec<PaperOrder> {
        self.state.lock().orders.clone()
    }

    pub fn amend_batches(&self) -> usize {
        self.state.lock().amend_batches
    }

    pub fn cancels(&self) -> usize {
        self.state.lock().cancels
    }

    pub fn reconnects(&self) -> usize {
        self.state.lock().reconnects
    }
}

impl OrderLedger for PaperExchange {
    fn cancel_active_orders(&self) -> BoxFuture<'_, Result<(), LedgerError>> {
        Box::pin(async move {
            let mut state = self.state.lock();
            info!(count = state.orders.len(), "Paper cancel of all active orders");
            state.orders.clear();
            state.cancels += 1;
            Ok(())
        })
    }

    fn amend_active_orders(
        &self,
        orders: Vec<OrderRequest>,
    ) -> BoxFuture<'_, Result<(), LedgerError>> {
        Box::pin(async move {
            let mut state = self.state.lock();
            let mut next = Vec::with_capacity(orders.len());
            let mut acks = Vec::with_capacity(orders.len());

            for side in [OrderSide::Sell, OrderSide::Buy] {
                let mut existing = state
                    .orders
                    .iter()
                    .filter(|o| o.side == side)
                    .cloned()
                    .collect::<Vec<_>>()
                    .into_iter();

                for request in orders.iter().filter(|r| r.side == side) {
                    let (order_id, amended) = match existing.next() {
                        Some(live) => (live.order_id, true),
                        None => (OrderId::generate(), false),
                    };
                    let ack = OrderAck {
                        order_id: order_id.clone(),
                        price: request.price,
                        quantity: request.quantity,
                    };
                    acks.push(if amended {
                        MarketUpdate::AmendAck(ack)
                    } else {
                        MarketUpdate::NewOrderAck(ack)
                    });
                    next.push(PaperOrder {
                        order_id,
                        side,
                        price: request.price,
                        quantity: request.quantity,
                        status: PaperStatus::Pending,
                    });
                }

                let dropped = existing.count();
                if dropped > 0 {
                    debug!(%side, dropped, "Surplus live orders dropped by amend");
                }
            }

            debug!(orders = next.len(), "Paper amend batch accepted");
            state.orders = next;
            state.amend_batches += 1;

            if self.config.auto_ack {
                for ack in acks {
                    state.publish(ack);
                }
            }
            Ok(())
        })
    }

    fn activate_orders(&self, snapshot: OrdersSnapshot) {
        let mut state = self.state.lock();
        let tag = |side: OrderSide| {
            move |live: LiveOrder| PaperOrder {
                order_id: live.order_id,
                side,
                price: live.price,
                quantity: live.quantity,
                status: PaperStatus::Confirmed,
            }
        };
        let mut orders: Vec<PaperOrder> =
            snapshot.asks.into_iter().map(tag(OrderSide::Sell)).collect();
        orders.extend(snapshot.bids.into_iter().map(tag(OrderSide::Buy)));
        state.orders = orders;
    }

    fn update_order_state(
        &self,
        order_id: &OrderId,
        update: &MarketUpdate,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.lock();
        let idx = state.position(order_id)?;

        match update {
            MarketUpdate::NewOrderAck(ack) | MarketUpdate::AmendAck(ack) => {
                let order = &mut state.orders[idx];
                order.price = ack.price;
                order.quantity = ack.quantity;
                order.status = PaperStatus::Confirmed;
            }
            // Amend refused: the order keeps its previous terms
            MarketUpdate::AmendNack(_) => state.orders[idx].status = PaperStatus::Confirmed,
            MarketUpdate::NewOrderNack(_) | MarketUpdate::OrderFullFillAck(_) => {
                state.orders.remove(idx);
            }
            MarketUpdate::OrderFillAck(fill) => {
                let order = &mut state.orders[idx];
                let remaining = order.quantity.inner() - fill.fill_quantity.inner();
                if remaining.is_sign_positive() && !remaining.is_zero() {
                    order.quantity = Size::new(remaining);
                } else {
                    state.orders.remove(idx);
                }
            }
            MarketUpdate::TopOfBook(_) | MarketUpdate::ExchangeOrdersSnapshot(_) => {}
        }
        Ok(())
    }

    fn ready_for_amend_count(&self) -> usize {
        self.state
            .lock()
            .orders
            .iter()
            .filter(|o| o.status == PaperStatus::Confirmed)
            .count()
    }

    fn live_order_count(&self) -> usize {
        self.state.lock().orders.len()
    }
}

impl Connectivity for PaperExchange {
    fn register_update_sink(&self, sink: UpdateSink) {
        self.state.lock().sink = Some(sink);
    }

    fn set_cancel_on_start(&self, cancel: bool) {
        self.state.lock().cancel_on_start = cancel;
    }

    fn reconnect(&self) -> BoxFuture<'_, Result<(), ConnectivityError>> {
        Box::pin(async move {
            let mut state = self.state.lock();
            state.reconnects += 1;
            if state.reconnect_failures_left > 0 {
                state.reconnect_failures_left -= 1;
                return Err(ConnectivityError::new("paper session refused"));
            }
            info!(live = state.orders.len(), "Paper session re-established");
            let snapshot = state.snapshot();
            state.publish(MarketUpdate::ExchangeOrdersSnapshot(snapshot));
            Ok(())
        })
    }
}
