//! Main application event loop.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use quoter_core::{MarketUpdate, SystemClock};
use quoter_mm::{
    FailureCause, FatalError, OrderLedger, RecoveryOutcome, RouteOutcome, StrategyController,
    StrategyError, TickOutcome,
};
use quoter_telemetry::Metrics;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::paper::PaperExchange;
use crate::replay::replay_file;

type PaperController = StrategyController<Arc<PaperExchange>, Arc<PaperExchange>, SystemClock>;

/// Counters for one run, returned when the loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub updates: usize,
    pub ticks: usize,
    pub amend_batches: usize,
    pub recoveries: usize,
    /// Strategy still active when the loop ended.
    pub active: bool,
}

/// Main application.
pub struct Application {
    config: AppConfig,
    controller: PaperController,
    paper: Arc<PaperExchange>,
    updates: mpsc::UnboundedReceiver<MarketUpdate>,
    summary: RunSummary,
}

impl Application {
    /// Create the strategy over a paper exchange.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let paper = Arc::new(PaperExchange::new(config.paper.clone()));
        let (controller, updates) = StrategyController::new(
            config.strategy.clone(),
            Arc::clone(&paper),
            Arc::clone(&paper),
            SystemClock,
        )?;

        Ok(Self {
            config,
            controller,
            paper,
            updates,
            summary: RunSummary::default(),
        })
    }

    /// Paper exchange backing the strategy.
    pub fn paper(&self) -> Arc<PaperExchange> {
        Arc::clone(&self.paper)
    }

    fn instrument(&self) -> &str {
        &self.config.strategy.instrument_name
    }

    /// Run until Ctrl+C or a fatal strategy error.
    pub async fn run(self) -> AppResult<RunSummary> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
            info!("Shutdown signal received");
        })
        .await
    }

    /// Run until `shutdown` completes or a fatal strategy error.
    ///
    /// Live orders are cancelled on the way out while the strategy is still
    /// active.
    pub async fn run_until<F>(mut self, shutdown: F) -> AppResult<RunSummary>
    where
        F: Future<Output = ()>,
    {
        Metrics::strategy_active(self.instrument(), true);
        let replay = self.spawn_replay();
        self.paper.connect();

        let mut tick = tokio::time::interval(Duration::from_millis(self.config.tick_interval_ms));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        let result = loop {
            tokio::select! {
                Some(update) = self.updates.recv() => {
                    if let Err(e) = self.handle_update(update).await {
                        break Err(e);
                    }
                }

                _ = tick.tick() => {
                    if let Err(e) = self.handle_tick().await {
                        break Err(e);
                    }
                }

                _ = &mut shutdown => break Ok(()),
            }
        };

        if let Some(handle) = replay {
            handle.abort();
        }

        match result {
            Ok(()) => {
                let active = self.controller.is_active();
                self.controller.shutdown().await;
                self.record_gauges();
                self.summary.active = active;
                info!(summary = ?self.summary, "Application stopped");
                Ok(self.summary)
            }
            Err(e) => {
                error!(error = %e, "Strategy failed, stopping");
                self.record_fatal(&e);
                self.record_gauges();
                Err(e.into())
            }
        }
    }

    fn spawn_replay(&self) -> Option<JoinHandle<()>> {
        let path = PathBuf::from(self.config.replay.path.as_ref()?);
        let Some(sink) = self.paper.update_sink() else {
            warn!("No update sink registered, replay skipped");
            return None;
        };
        let pace = Duration::from_millis(self.config.replay.pace_ms);

        Some(tokio::spawn(async move {
            if let Err(e) = replay_file(&path, sink, pace).await {
                error!(error = %e, path = %path.display(), "Replay failed");
            }
        }))
    }

    async fn handle_update(&mut self, update: MarketUpdate) -> Result<(), FatalError> {
        self.summary.updates += 1;
        let nack_kind = update.is_nack().then(|| update.variant_name());

        match self.controller.on_market_update(update).await {
            Ok(RouteOutcome::BookChanged) => Metrics::book_update(self.instrument(), true),
            Ok(RouteOutcome::BookUnchanged) => Metrics::book_update(self.instrument(), false),
            Ok(RouteOutcome::Forwarded) => {
                if let Some(kind) = nack_kind {
                    Metrics::nack(self.instrument(), kind);
                }
            }
            Ok(RouteOutcome::Ignored | RouteOutcome::Reconciled(_)) => {}
            Err(StrategyError::Routing(cause)) => {
                if let FailureCause::Routing { variant, .. } = &cause {
                    Metrics::routing_error(self.instrument(), variant);
                }
                warn!(error = %cause, "Routing failed, escalating");
                let outcome = self.controller.escalate(cause).await?;
                self.record_recovery(outcome);
            }
            Err(StrategyError::Fatal(e)) => return Err(e),
        }
        self.record_gauges();
        Ok(())
    }

    async fn handle_tick(&mut self) -> Result<(), FatalError> {
        self.summary.ticks += 1;
        match self.controller.run().await? {
            TickOutcome::Amended { orders } => {
                self.summary.amend_batches += 1;
                Metrics::amend_sent(self.instrument(), orders);
            }
            TickOutcome::Deferred { .. } => Metrics::amend_deferred(self.instrument()),
            TickOutcome::Recovered { stale, outcome } => {
                if stale {
                    Metrics::stale_escalation(self.instrument());
                }
                self.record_recovery(outcome);
            }
            TickOutcome::Inactive
            | TickOutcome::NoBook
            | TickOutcome::Clean
            | TickOutcome::WarmingUp { .. }
            | TickOutcome::Reconnecting => {}
        }
        self.record_gauges();
        Ok(())
    }

    fn record_recovery(&mut self, outcome: RecoveryOutcome) {
        self.summary.recoveries += 1;
        match outcome {
            RecoveryOutcome::Reconnected { attempts } => {
                Metrics::recovery_reconnected(self.instrument(), attempts)
            }
            RecoveryOutcome::Stopped => Metrics::recovery_ended(self.instrument(), "stopped"),
        }
    }

    fn record_fatal(&mut self, error: &FatalError) {
        self.summary.recoveries += 1;
        let outcome = match error {
            FatalError::RecoveryExhausted { .. } => "exhausted",
            FatalError::StopCancelFailed { .. } => "stop_cancel_failed",
        };
        Metrics::recovery_ended(self.instrument(), outcome);
    }

    fn record_gauges(&mut self) {
        let active = self.controller.is_active();
        self.summary.active = active;
        Metrics::strategy_active(self.instrument(), active);
        Metrics::live_orders(self.instrument(), self.controller.ledger().live_order_count());
    }
}
