//! Strategy controller and its state record.
//!
//! The controller exclusively owns [`StrategyState`]. Its two entry points,
//! [`StrategyController::on_market_update`] (see `router`) and
//! [`StrategyController::run`] (see `gate`), both take `&mut self`, so
//! the host cannot interleave them. Failure handling lives in `recovery`.

use quoter_core::{Clock, MarketUpdate, TopOfBook};
use tokio::sync::mpsc;
use tracing::info;

use crate::config::{ConfigError, StrategyConfig};
use crate::gateway::{Connectivity, OrderLedger};

/// Lifecycle phase of the strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Quoting normally.
    Normal,
    /// A failure was escalated and recovery is in progress.
    Recovering,
    /// Stopped for good. Never left once entered.
    Stopped,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Recovering => write!(f, "recovering"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Mutable strategy state.
#[derive(Debug, Clone)]
pub struct StrategyState {
    pub(crate) phase: Phase,
    /// Last observed top of book.
    pub(crate) tob: Option<TopOfBook>,
    /// A book change has been observed and not yet acted on.
    pub(crate) dirty: bool,
    /// Start of the current warm-up window.
    pub(crate) started_at_ms: u64,
    /// Time of the last successfully submitted amend batch.
    pub(crate) last_amend_at_ms: Option<u64>,
    /// Reset/reconnect in progress; blocks amend cycles.
    pub(crate) reconnecting: bool,
    /// Size of the last submitted amend batch.
    pub(crate) num_sent: usize,
    /// Whether the last reset cancelled all orders.
    pub(crate) cancel_all_sent: bool,
}

impl StrategyState {
    fn new(now_ms: u64) -> Self {
        Self {
            phase: Phase::Normal,
            tob: None,
            dirty: false,
            started_at_ms: now_ms,
            last_amend_at_ms: None,
            reconnecting: false,
            num_sent: 0,
            cancel_all_sent: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// False once the strategy has stopped; never becomes true again.
    pub fn is_active(&self) -> bool {
        self.phase != Phase::Stopped
    }

    pub fn tob(&self) -> Option<&TopOfBook> {
        self.tob.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn started_at_ms(&self) -> u64 {
        self.started_at_ms
    }

    pub fn last_amend_at_ms(&self) -> Option<u64> {
        self.last_amend_at_ms
    }

    pub fn is_reconnecting(&self) -> bool {
        self.reconnecting
    }

    pub fn num_sent(&self) -> usize {
        self.num_sent
    }

    pub fn cancel_all_sent(&self) -> bool {
        self.cancel_all_sent
    }

    /// Enter the terminal phase.
    pub(crate) fn stop(&mut self) {
        self.phase = Phase::Stopped;
        self.reconnecting = false;
        self.dirty = false;
    }

    /// Move between `Normal` and `Recovering`. No-op once stopped.
    pub(crate) fn set_phase(&mut self, phase: Phase) {
        if self.phase != Phase::Stopped {
            self.phase = phase;
        }
    }
}

/// Single-instrument ladder market maker.
pub struct StrategyController<L, X, C> {
    pub(crate) config: StrategyConfig,
    pub(crate) ledger: L,
    pub(crate) connectivity: X,
    pub(crate) clock: C,
    pub(crate) state: StrategyState,
}

impl<L, X, C> StrategyController<L, X, C>
where
    L: OrderLedger,
    X: Connectivity,
    C: Clock,
{
    /// Validate the configuration and wire the strategy to its collaborators.
    ///
    /// Registers the update callback with `connectivity` and returns the
    /// receiving end; the host feeds what arrives there into
    /// [`StrategyController::on_market_update`].
    pub fn new(
        config: StrategyConfig,
        ledger: L,
        connectivity: X,
        clock: C,
    ) -> Result<(Self, mpsc::UnboundedReceiver<MarketUpdate>), ConfigError> {
        config.validate()?;

        let (tx, rx) = mpsc::unbounded_channel();
        connectivity.register_update_sink(tx);
        connectivity.set_cancel_on_start(config.cancel_orders_on_start);

        let state = StrategyState::new(clock.now_ms());
        info!(
            instrument = %config.instrument_name,
            mid_based = config.mid_price_based_calculation,
            tick_size = %config.tick_size,
            asks = config.asks.len(),
            bids = config.bids.len(),
            orders_per_cycle = config.ladder_len(),
            "Strategy controller created"
        );

        let controller = Self {
            config,
            ledger,
            connectivity,
            clock,
            state,
        };
        Ok((controller, rx))
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn state(&self) -> &StrategyState {
        &self.state
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }
}
