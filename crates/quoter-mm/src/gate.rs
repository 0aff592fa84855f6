//! Amend readiness gate and amend cycle.
//!
//! Each external tick decides whether the quote set should be regenerated.
//! A new batch is only sent once the previous one has been fully
//! acknowledged; a batch stuck for longer than the staleness ceiling is
//! treated as a broken gateway and escalated.

use quoter_core::Clock;
use tracing::{debug, info, warn};

use crate::controller::StrategyController;
use crate::error::{FailureCause, FatalError};
use crate::gateway::{Connectivity, OrderLedger};
use crate::quote_engine::generate_orders;
use crate::recovery::RecoveryOutcome;

/// Whether the previous amend batch has settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    /// Only `confirmed` orders have settled.
    Pending { confirmed: usize },
}

/// Decide whether a new amend batch may be sent.
///
/// Ready when nothing was ever sent, when nothing is live, or when every
/// order of the last batch is confirmed.
pub fn amend_readiness(
    last_amend_at_ms: Option<u64>,
    live_orders: usize,
    confirmed: usize,
    num_sent: usize,
) -> Readiness {
    if last_amend_at_ms.is_none() || live_orders == 0 || confirmed == num_sent {
        Readiness::Ready
    } else {
        Readiness::Pending { confirmed }
    }
}

/// What a tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Strategy is stopped.
    Inactive,
    /// No top of book seen yet.
    NoBook,
    /// Nothing changed since the last amend.
    Clean,
    /// Still inside the warm-up window.
    WarmingUp { remaining_ms: u64 },
    /// Recovery in progress.
    Reconnecting,
    /// Previous batch not settled yet; retried next tick.
    Deferred { confirmed: usize, expected: usize },
    /// New batch submitted.
    Amended { orders: usize },
    /// A failure was escalated and recovery completed. `stale` when the
    /// trigger was an unsettled batch past the ceiling.
    Recovered {
        stale: bool,
        outcome: RecoveryOutcome,
    },
}

impl<L, X, C> StrategyController<L, X, C>
where
    L: OrderLedger,
    X: Connectivity,
    C: Clock,
{
    /// External tick.
    ///
    /// Returns `Err` only when recovery gave up; the host must then stop.
    pub async fn run(&mut self) -> Result<TickOutcome, FatalError> {
        if !self.state.is_active() {
            debug!("Strategy is not active, tick ignored");
            return Ok(TickOutcome::Inactive);
        }
        if self.state.tob.is_none() {
            return Ok(TickOutcome::NoBook);
        }
        if !self.state.dirty {
            return Ok(TickOutcome::Clean);
        }
        let now = self.clock.now_ms();
        let ready_at = self.state.started_at_ms.saturating_add(self.config.warmup_ms);
        if now < ready_at {
            return Ok(TickOutcome::WarmingUp {
                remaining_ms: ready_at - now,
            });
        }

        // Book changes arriving from here on re-mark dirty for the next tick
        self.state.dirty = false;
        self.process_market_move().await
    }

    /// One amend cycle.
    async fn process_market_move(&mut self) -> Result<TickOutcome, FatalError> {
        if !self.state.is_active() {
            return Ok(TickOutcome::Inactive);
        }
        if self.state.reconnecting {
            info!("Ongoing reconnection, amend cycle skipped");
            self.state.dirty = true;
            return Ok(TickOutcome::Reconnecting);
        }
        let Some(tob) = self.state.tob else {
            return Ok(TickOutcome::NoBook);
        };

        let now = self.clock.now_ms();
        let readiness = amend_readiness(
            self.state.last_amend_at_ms,
            self.ledger.live_order_count(),
            self.ledger.ready_for_amend_count(),
            self.state.num_sent,
        );

        if let Readiness::Pending { confirmed } = readiness {
            let expected = self.state.num_sent;
            let last_amend = self.state.last_amend_at_ms.unwrap_or(now);
            // Keep the change pending until the batch settles
            self.state.dirty = true;

            if now > last_amend.saturating_add(self.config.stale_ceiling_ms) {
                let cause = FailureCause::StaleAmend {
                    confirmed,
                    expected,
                    ceiling_ms: self.config.stale_ceiling_ms,
                };
                warn!(confirmed, expected, "Amend batch went stale, escalating");
                let outcome = self.escalate(cause).await?;
                return Ok(TickOutcome::Recovered {
                    stale: true,
                    outcome,
                });
            }

            debug!(confirmed, expected, "Previous amend batch not settled yet");
            return Ok(TickOutcome::Deferred {
                confirmed,
                expected,
            });
        }

        let orders = generate_orders(&tob, &self.config);
        let count = orders.len();
        debug!(book = %tob, orders = count, "Submitting amend batch");

        match self.ledger.amend_active_orders(orders).await {
            Ok(()) => {
                self.state.last_amend_at_ms = Some(self.clock.now_ms());
                self.state.num_sent = count;
                Ok(TickOutcome::Amended { orders: count })
            }
            Err(e) => {
                warn!(error = %e, "Orders amend failed, escalating");
                let outcome = self.escalate(FailureCause::AmendSubmission(e)).await?;
                // Requote once recovery's warm-up has passed
                if self.state.is_active() {
                    self.state.dirty = true;
                }
                Ok(TickOutcome::Recovered {
                    stale: false,
                    outcome,
                })
            }
        }
    }
}
