/*!
 * Primitive Types
 * Errors for the lock and barrier
 */

use thiserror::Error;

/// Lock usage errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockError {
    /// `release()` from a worker that is not the raw holder, including
    /// releasing a free lock or a lock held through a guard
    #[error("Lock not held by the releasing worker")]
    NotHeld,
}

/// Barrier usage errors and wait outcomes
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierError {
    #[error("Barrier counter would go negative: pending {pending}, delta {delta}")]
    NegativeCounter { pending: usize, delta: isize },

    #[error("Barrier counter would overflow: pending {pending}, delta {delta}")]
    CounterOverflow { pending: usize, delta: isize },

    #[error("Barrier wait timed out after {elapsed_ms}ms (timeout: {timeout_ms}ms)")]
    Timeout { elapsed_ms: u64, timeout_ms: u64 },
}
