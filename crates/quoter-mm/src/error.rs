//! Strategy error types.
//!
//! [`FailureCause`] is everything that can trip the recovery controller.
//! [`FatalError`] is what comes out when recovery itself gives up.

use thiserror::Error;

use crate::gateway::{ConnectivityError, LedgerError};

/// A failure escalated to the recovery controller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FailureCause {
    #[error("ledger rejected {variant} update: {source}")]
    Routing {
        variant: &'static str,
        #[source]
        source: LedgerError,
    },

    #[error("orders amend failed: {0}")]
    AmendSubmission(#[source] LedgerError),

    #[error("cancel of active orders failed: {0}")]
    Cancel(#[source] LedgerError),

    #[error("reconnect failed: {0}")]
    Reconnect(#[source] ConnectivityError),

    #[error("only {confirmed} of {expected} active orders were updated within {ceiling_ms} ms")]
    StaleAmend {
        confirmed: usize,
        expected: usize,
        ceiling_ms: u64,
    },
}

/// Unrecoverable failure. The host must stop.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FatalError {
    #[error(
        "recovery unsuccessfully tried {} times after `{trigger}`: {}",
        .failures.len(),
        chain(.failures)
    )]
    RecoveryExhausted {
        trigger: FailureCause,
        failures: Vec<FailureCause>,
    },

    #[error("cancel on strategy stop failed after `{trigger}`: {source}")]
    StopCancelFailed {
        trigger: FailureCause,
        #[source]
        source: LedgerError,
    },
}

fn chain(failures: &[FailureCause]) -> String {
    failures
        .iter()
        .enumerate()
        .map(|(i, cause)| format!("#{} {cause}", i + 1))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Error returned by the update entry point.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StrategyError {
    /// Ledger refused an order-lifecycle update. Not retried locally;
    /// the caller decides whether to escalate.
    #[error("on_market_update failed: {0}")]
    Routing(FailureCause),

    #[error(transparent)]
    Fatal(#[from] FatalError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_display_lists_every_attempt() {
        let err = FatalError::RecoveryExhausted {
            trigger: FailureCause::AmendSubmission(LedgerError::new("timeout")),
            failures: vec![
                FailureCause::Reconnect(ConnectivityError::new("refused")),
                FailureCause::Cancel(LedgerError::new("rejected")),
            ],
        };
        let text = err.to_string();
        assert!(text.contains("tried 2 times"), "{text}");
        assert!(text.contains("orders amend failed: timeout"), "{text}");
        assert!(text.contains("#1 reconnect failed: refused"), "{text}");
        assert!(text.contains("#2 cancel of active orders failed: rejected"), "{text}");
    }

    #[test]
    fn test_stale_display_cites_counts() {
        let cause = FailureCause::StaleAmend {
            confirmed: 2,
            expected: 4,
            ceiling_ms: 5_000,
        };
        assert_eq!(
            cause.to_string(),
            "only 2 of 4 active orders were updated within 5000 ms"
        );
    }
}
