//! Failure recovery.
//!
//! Every escalated failure runs a bounded number of synchronous attempts.
//! Each attempt either stops the strategy (when configured to stop on
//! error) or resets the order state and reconnects. When all attempts
//! fail the strategy stops and a [`FatalError`] carrying every failure is
//! returned.

use quoter_core::Clock;
use tracing::{error, info, warn};

use crate::controller::{Phase, StrategyController};
use crate::error::{FailureCause, FatalError};
use crate::gateway::{Connectivity, OrderLedger};

/// How a recovery ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// Reconnected; `attempts` includes the successful one.
    Reconnected { attempts: u32 },
    /// Strategy stopped on purpose.
    Stopped,
}

impl<L, X, C> StrategyController<L, X, C>
where
    L: OrderLedger,
    X: Connectivity,
    C: Clock,
{
    /// Handle a failure.
    ///
    /// Returns `Err` only when the strategy could not be brought back; it is
    /// stopped by then.
    pub async fn escalate(&mut self, trigger: FailureCause) -> Result<RecoveryOutcome, FatalError> {
        if !self.state.is_active() {
            return Ok(RecoveryOutcome::Stopped);
        }

        self.state.set_phase(Phase::Recovering);
        let max_attempts = self.config.max_recovery_attempts;
        let mut failures = Vec::new();

        for attempt in 1..=max_attempts {
            match self.recover_once(&trigger).await {
                Ok(Some(outcome)) => return Ok(outcome),
                Ok(None) => {
                    info!(attempt, trigger = %trigger, "Recovery succeeded");
                    return Ok(RecoveryOutcome::Reconnected { attempts: attempt });
                }
                Err(Attempt::Fatal(e)) => {
                    error!(error = %e, "Strategy stop failed");
                    self.state.stop();
                    return Err(e);
                }
                Err(Attempt::Failed(cause)) => {
                    warn!(
                        attempt,
                        max_attempts,
                        error = %cause,
                        "Recovery attempt failed"
                    );
                    failures.push(cause);
                }
            }
        }

        let fatal = FatalError::RecoveryExhausted { trigger, failures };
        error!(error = %fatal, "Recovery exhausted, stopping strategy");
        self.state.stop();
        Err(fatal)
    }

    /// One recovery attempt. `Ok(Some(_))` ends recovery without a reconnect.
    async fn recover_once(
        &mut self,
        trigger: &FailureCause,
    ) -> Result<Option<RecoveryOutcome>, Attempt> {
        if self.config.stop_strategy_on_error {
            if let Err(source) = self.ledger.cancel_active_orders().await {
                return Err(Attempt::Fatal(FatalError::StopCancelFailed {
                    trigger: trigger.clone(),
                    source,
                }));
            }
            warn!(trigger = %trigger, "Stopping strategy on error");
            self.state.stop();
            return Ok(Some(RecoveryOutcome::Stopped));
        }

        self.state.reconnecting = true;
        self.reset().await.map_err(Attempt::Failed)?;
        self.connectivity
            .reconnect()
            .await
            .map_err(|e| Attempt::Failed(FailureCause::Reconnect(e)))?;

        self.state.started_at_ms = self.clock.now_ms();
        self.state.reconnecting = false;
        self.state.set_phase(Phase::Normal);
        Ok(None)
    }

    async fn reset(&mut self) -> Result<(), FailureCause> {
        self.state.cancel_all_sent = false;
        if !self.config.cancel_orders_on_reconnection {
            return Ok(());
        }
        self.ledger
            .cancel_active_orders()
            .await
            .map_err(FailureCause::Cancel)?;
        self.state.cancel_all_sent = true;
        self.state.last_amend_at_ms = None;
        self.state.num_sent = 0;
        Ok(())
    }

    /// Cancel all active orders, escalating a failure to recovery.
    pub(crate) async fn cancel_orders(&mut self, reason: &str) -> Result<(), FatalError> {
        info!(reason, "Cancelling all active orders");
        if let Err(e) = self.ledger.cancel_active_orders().await {
            warn!(reason, error = %e, "Cancel failed, escalating");
            self.escalate(FailureCause::Cancel(e)).await?;
        }
        Ok(())
    }

    /// Cancel live orders before the host exits. Best effort.
    pub async fn shutdown(&mut self) {
        if !self.state.is_active() {
            return;
        }
        if let Err(e) = self.ledger.cancel_active_orders().await {
            warn!(error = %e, "Cancel on shutdown failed");
        }
        self.state.stop();
        info!("Strategy shut down");
    }
}

enum Attempt {
    Failed(FailureCause),
    Fatal(FatalError),
}
