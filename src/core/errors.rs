/*!
 * Error Types
 * Unified error handling with thiserror and miette
 */

use crate::channel::{CloseError, SelectError, SendError};
use crate::core::sync::ConfigError;
use crate::primitives::{BarrierError, LockError};
use miette::Diagnostic;
use thiserror::Error;

/// Unified toolkit error type with miette diagnostics
///
/// Every per-primitive error converts into this type, so worker routines can
/// propagate any coordination failure with `?`.
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum CoordError {
    #[error("Sending on a closed channel")]
    #[diagnostic(
        code(channel::closed),
        help("Only the producing side should close a channel, and only after its last send.")
    )]
    ClosedChannel,

    #[error("Channel closed twice")]
    #[diagnostic(
        code(channel::double_close),
        help("Exactly one worker must own the close. Hand the close to the last producer.")
    )]
    DoubleClose,

    #[error("Barrier counter would go negative: pending {pending}, delta {delta}")]
    #[diagnostic(
        code(barrier::negative_counter),
        help("Every done() must be matched by an earlier add(). Check the worker count.")
    )]
    NegativeCounter { pending: usize, delta: isize },

    #[error("Barrier counter would overflow: pending {pending}, delta {delta}")]
    #[diagnostic(
        code(barrier::counter_overflow),
        help("The pending count exceeds the platform word. Check the delta passed to add().")
    )]
    CounterOverflow { pending: usize, delta: isize },

    #[error("Lock released by a worker that does not hold it")]
    #[diagnostic(
        code(lock::not_held),
        help("Release from the acquiring worker, or use lock() and let the guard release.")
    )]
    NotHeld,

    #[error("Operation timed out after {elapsed_ms}ms (timeout: {timeout_ms}ms)")]
    #[diagnostic(
        code(coord::timeout),
        help("No case became ready in time. Branch on the timeout or raise the deadline.")
    )]
    Timeout { elapsed_ms: u64, timeout_ms: u64 },

    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(coord::configuration),
        help("Review the COORD_* environment variables.")
    )]
    Configuration(String),
}

/// Result alias for fallible toolkit operations
pub type CoordResult<T> = Result<T, CoordError>;

impl<T> From<SendError<T>> for CoordError {
    fn from(_: SendError<T>) -> Self {
        CoordError::ClosedChannel
    }
}

impl From<CloseError> for CoordError {
    fn from(err: CloseError) -> Self {
        match err {
            CloseError::AlreadyClosed => CoordError::DoubleClose,
        }
    }
}

impl From<SelectError> for CoordError {
    fn from(err: SelectError) -> Self {
        match err {
            SelectError::Timeout {
                elapsed_ms,
                timeout_ms,
            } => CoordError::Timeout {
                elapsed_ms,
                timeout_ms,
            },
            SelectError::ClosedChannel { .. } => CoordError::ClosedChannel,
        }
    }
}

impl From<BarrierError> for CoordError {
    fn from(err: BarrierError) -> Self {
        match err {
            BarrierError::NegativeCounter { pending, delta } => {
                CoordError::NegativeCounter { pending, delta }
            }
            BarrierError::CounterOverflow { pending, delta } => {
                CoordError::CounterOverflow { pending, delta }
            }
            BarrierError::Timeout {
                elapsed_ms,
                timeout_ms,
            } => CoordError::Timeout {
                elapsed_ms,
                timeout_ms,
            },
        }
    }
}

impl From<LockError> for CoordError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::NotHeld => CoordError::NotHeld,
        }
    }
}

impl From<ConfigError> for CoordError {
    fn from(err: ConfigError) -> Self {
        CoordError::Configuration(err.to_string())
    }
}
