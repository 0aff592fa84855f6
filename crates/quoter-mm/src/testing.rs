//! Recording collaborators for strategy tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use quoter_core::{
    Clock, LiveOrder, MarketUpdate, OrderId, OrderRequest, OrdersSnapshot, Price, PriceRounding,
    Size, TopOfBook,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::mpsc;

use crate::config::{LadderLevel, StrategyConfig};
use crate::controller::StrategyController;
use crate::gateway::{
    BoxFuture, Connectivity, ConnectivityError, LedgerError, OrderLedger, UpdateSink,
};

pub const BASE_TIME: u64 = 1_700_000_000_000; // ~2023-11-14

/// Calls recorded by [`MockLedger`].
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerCall {
    Cancel,
    Amend(Vec<OrderRequest>),
    Activate(OrdersSnapshot),
    Update(OrderId, &'static str),
}

/// Ledger that records calls and fails on request.
#[derive(Debug, Default)]
pub struct MockLedger {
    calls: Mutex<Vec<LedgerCall>>,
    /// Remaining cancels to fail.
    cancel_failures: Mutex<u32>,
    /// Remaining amends to fail.
    amend_failures: Mutex<u32>,
    update_fails: Mutex<bool>,
    ready: Mutex<usize>,
    live: Mutex<usize>,
}

impl MockLedger {
    pub fn calls(&self) -> Vec<LedgerCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn cancel_count(&self) -> usize {
        self.calls().iter().filter(|c| **c == LedgerCall::Cancel).count()
    }

    pub fn amends(&self) -> Vec<Vec<OrderRequest>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                LedgerCall::Amend(orders) => Some(orders),
                _ => None,
            })
            .collect()
    }

    pub fn activations(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, LedgerCall::Activate(_)))
            .count()
    }

    pub fn fail_cancels(&self, times: u32) {
        *self.cancel_failures.lock() = times;
    }

    pub fn fail_amends(&self, times: u32) {
        *self.amend_failures.lock() = times;
    }

    pub fn fail_updates(&self, fail: bool) {
        *self.update_fails.lock() = fail;
    }

    pub fn set_counts(&self, ready: usize, live: usize) {
        *self.ready.lock() = ready;
        *self.live.lock() = live;
    }
}

fn take_failure(remaining: &Mutex<u32>) -> bool {
    let mut left = remaining.lock();
    if *left > 0 {
        *left -= 1;
        true
    } else {
        false
    }
}

impl OrderLedger for MockLedger {
    fn cancel_active_orders(&self) -> BoxFuture<'_, Result<(), LedgerError>> {
        self.calls.lock().push(LedgerCall::Cancel);
        let result = if take_failure(&self.cancel_failures) {
            Err(LedgerError::new("cancel rejected"))
        } else {
            Ok(())
        };
        Box::pin(std::future::ready(result))
    }

    fn amend_active_orders(
        &self,
        orders: Vec<OrderRequest>,
    ) -> BoxFuture<'_, Result<(), LedgerError>> {
        self.calls.lock().push(LedgerCall::Amend(orders));
        let result = if take_failure(&self.amend_failures) {
            Err(LedgerError::new("amend rejected"))
        } else {
            Ok(())
        };
        Box::pin(std::future::ready(result))
    }

    fn activate_orders(&self, snapshot: OrdersSnapshot) {
        self.calls.lock().push(LedgerCall::Activate(snapshot));
    }

    fn update_order_state(
        &self,
        order_id: &OrderId,
        update: &MarketUpdate,
    ) -> Result<(), LedgerError> {
        self.calls
            .lock()
            .push(LedgerCall::Update(order_id.clone(), update.variant_name()));
        if *self.update_fails.lock() {
            return Err(LedgerError::new(format!("unknown order {order_id}")));
        }
        Ok(())
    }

    fn ready_for_amend_count(&self) -> usize {
        *self.ready.lock()
    }

    fn live_order_count(&self) -> usize {
        *self.live.lock()
    }
}

/// Connectivity that counts reconnects and fails on request.
#[derive(Debug, Default)]
pub struct MockConnectivity {
    sink: Mutex<Option<UpdateSink>>,
    cancel_on_start: Mutex<Option<bool>>,
    reconnects: Mutex<u32>,
    reconnect_failures: Mutex<u32>,
}

impl MockConnectivity {
    pub fn reconnects(&self) -> u32 {
        *self.reconnects.lock()
    }

    pub fn fail_reconnects(&self, times: u32) {
        *self.reconnect_failures.lock() = times;
    }

    pub fn cancel_on_start(&self) -> Option<bool> {
        *self.cancel_on_start.lock()
    }

    pub fn has_sink(&self) -> bool {
        self.sink.lock().is_some()
    }

    pub fn push(&self, update: MarketUpdate) {
        if let Some(sink) = self.sink.lock().as_ref() {
            let _ = sink.send(update);
        }
    }
}

impl Connectivity for MockConnectivity {
    fn register_update_sink(&self, sink: UpdateSink) {
        *self.sink.lock() = Some(sink);
    }

    fn set_cancel_on_start(&self, cancel: bool) {
        *self.cancel_on_start.lock() = Some(cancel);
    }

    fn reconnect(&self) -> BoxFuture<'_, Result<(), ConnectivityError>> {
        *self.reconnects.lock() += 1;
        let result = if take_failure(&self.reconnect_failures) {
            Err(ConnectivityError::new("gateway unreachable"))
        } else {
            Ok(())
        };
        Box::pin(std::future::ready(result))
    }
}

/// Manually driven clock.
#[derive(Debug)]
pub struct MockClock {
    time_ms: AtomicU64,
}

impl MockClock {
    pub fn new(initial_ms: u64) -> Self {
        Self {
            time_ms: AtomicU64::new(initial_ms),
        }
    }

    pub fn advance(&self, delta_ms: u64) {
        self.time_ms.fetch_add(delta_ms, Ordering::AcqRel);
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.time_ms.load(Ordering::Acquire)
    }
}

pub type TestController = StrategyController<Arc<MockLedger>, Arc<MockConnectivity>, Arc<MockClock>>;

pub struct Harness {
    pub controller: TestController,
    pub ledger: Arc<MockLedger>,
    pub connectivity: Arc<MockConnectivity>,
    pub clock: Arc<MockClock>,
    pub updates: mpsc::UnboundedReceiver<MarketUpdate>,
}

pub fn test_config() -> StrategyConfig {
    StrategyConfig {
        instrument_name: "BTC-PERP".to_string(),
        mid_price_based_calculation: false,
        tick_size: Price::new(dec!(0.5)),
        price_rounding: 1,
        cancel_orders_on_start: false,
        stop_strategy_on_error: false,
        cancel_orders_on_reconnection: false,
        asks: vec![
            LadderLevel::new(0, Size::new(dec!(1))),
            LadderLevel::new(1, Size::new(dec!(2))),
        ],
        bids: vec![
            LadderLevel::new(0, Size::new(dec!(1))),
            LadderLevel::new(1, Size::new(dec!(2))),
        ],
        rounding: PriceRounding::HalfEven,
        warmup_ms: 10_000,
        stale_ceiling_ms: 5_000,
        max_recovery_attempts: 5,
    }
}

pub fn harness(config: StrategyConfig) -> Harness {
    let ledger = Arc::new(MockLedger::default());
    let connectivity = Arc::new(MockConnectivity::default());
    let clock = Arc::new(MockClock::new(BASE_TIME));
    let (controller, updates) = StrategyController::new(
        config,
        Arc::clone(&ledger),
        Arc::clone(&connectivity),
        Arc::clone(&clock),
    )
    .expect("valid test config");
    Harness {
        controller,
        ledger,
        connectivity,
        clock,
        updates,
    }
}

pub fn tob(bid: Decimal, ask: Decimal) -> MarketUpdate {
    MarketUpdate::TopOfBook(TopOfBook::new(Price::new(bid), Price::new(ask)).expect("valid book"))
}

pub fn snapshot(bids: usize, asks: usize) -> OrdersSnapshot {
    let order = |i: usize| LiveOrder {
        order_id: OrderId::new(format!("live-{i}")),
        price: Price::new(dec!(100)),
        quantity: Size::new(dec!(1)),
    };
    OrdersSnapshot {
        bids: (0..bids).map(order).collect(),
        asks: (bids..bids + asks).map(order).collect(),
    }
}
