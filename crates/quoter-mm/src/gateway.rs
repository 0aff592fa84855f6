//! Seams to the external order ledger and connectivity layer.
//!
//! The strategy never talks to the exchange directly. It reads aggregate
//! order counts from an [`OrderLedger`] and asks it to cancel, amend and
//! adopt orders; it asks a [`Connectivity`] to reconnect. Both are traits so
//! the host can plug in a live gateway or the paper exchange, and tests can
//! plug in recorders.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use quoter_core::{MarketUpdate, OrderId, OrderRequest, OrdersSnapshot};
use thiserror::Error;
use tokio::sync::mpsc;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Sender half of the single update callback registered with connectivity.
pub type UpdateSink = mpsc::UnboundedSender<MarketUpdate>;

/// Failure reported by the order ledger.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct LedgerError(pub String);

impl LedgerError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Failure reported by the connectivity layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ConnectivityError(pub String);

impl ConnectivityError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Order-lifecycle ledger owned by the host.
pub trait OrderLedger: Send + Sync {
    /// Cancel every order the ledger tracks as live.
    fn cancel_active_orders(&self) -> BoxFuture<'_, Result<(), LedgerError>>;

    /// Replace the live quote set with `orders` in one batch.
    fn amend_active_orders(&self, orders: Vec<OrderRequest>)
        -> BoxFuture<'_, Result<(), LedgerError>>;

    /// Adopt an exchange snapshot as the tracked live-order set.
    fn activate_orders(&self, snapshot: OrdersSnapshot);

    /// Apply an order-lifecycle update to the tracked order.
    fn update_order_state(&self, order_id: &OrderId, update: &MarketUpdate)
        -> Result<(), LedgerError>;

    /// Number of tracked orders whose status allows the next amend.
    fn ready_for_amend_count(&self) -> usize;

    /// Number of tracked live orders.
    fn live_order_count(&self) -> usize;
}

/// Exchange connectivity owned by the host.
pub trait Connectivity: Send + Sync {
    /// Register the single update callback. Replaces any previous sink.
    fn register_update_sink(&self, sink: UpdateSink);

    /// Tell the transport whether to cancel pre-existing orders on (re)start.
    fn set_cancel_on_start(&self, cancel: bool);

    /// Tear down and re-establish the exchange session.
    fn reconnect(&self) -> BoxFuture<'_, Result<(), ConnectivityError>>;
}

impl<T: OrderLedger + ?Sized> OrderLedger for Arc<T> {
    fn cancel_active_orders(&self) -> BoxFuture<'_, Result<(), LedgerError>> {
        (**self).cancel_active_orders()
    }

    fn amend_active_orders(
        &self,
        orders: Vec<OrderRequest>,
    ) -> BoxFuture<'_, Result<(), LedgerError>> {
        (**self).amend_active_orders(orders)
    }

    fn activate_orders(&self, snapshot: OrdersSnapshot) {
        (**self).activate_orders(snapshot)
    }

    fn update_order_state(
        &self,
        order_id: &OrderId,
        update: &MarketUpdate,
    ) -> Result<(), LedgerError> {
        (**self).update_order_state(order_id, update)
    }

    fn ready_for_amend_count(&self) -> usize {
        (**self).ready_for_amend_count()
    }

    fn live_order_count(&self) -> usize {
        (**self).live_order_count()
    }
}

impl<T: Connectivity + ?Sized> Connectivity for Arc<T> {
    fn register_update_sink(&self, sink: UpdateSink) {
        (**self).register_update_sink(sink)
    }

    fn set_cancel_on_start(&self, cancel: bool) {
        (**self).set_cancel_on_start(cancel)
    }

    fn reconnect(&self) -> BoxFuture<'_, Result<(), ConnectivityError>> {
        (**self).reconnect()
    }
}
