/*!
 * Channel Types
 * Errors, selection outcomes and statistics for channels
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Sending on a closed channel
///
/// Carries the value that could not be delivered.
#[derive(Error, Clone, Copy, PartialEq, Eq)]
#[error("Sending on a closed channel")]
pub struct SendError<T>(pub T);

impl<T> SendError<T> {
    /// Recover the undelivered value
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SendError(..)")
    }
}

/// Non-blocking send failures
#[derive(Error, Clone, Copy, PartialEq, Eq)]
pub enum TrySendError<T> {
    /// Buffer full and no receiver waiting
    #[error("Channel full")]
    Full(T),

    /// Channel closed
    #[error("Sending on a closed channel")]
    Closed(T),
}

impl<T> TrySendError<T> {
    /// Recover the undelivered value
    pub fn into_inner(self) -> T {
        match self {
            TrySendError::Full(value) | TrySendError::Closed(value) => value,
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, TrySendError::Full(_))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, TrySendError::Closed(_))
    }
}

impl<T> fmt::Debug for TrySendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrySendError::Full(_) => f.write_str("Full(..)"),
            TrySendError::Closed(_) => f.write_str("Closed(..)"),
        }
    }
}

impl<T> From<SendError<T>> for TrySendError<T> {
    fn from(err: SendError<T>) -> Self {
        TrySendError::Closed(err.0)
    }
}

/// Non-blocking receive failures
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryRecvError {
    /// Nothing buffered and no sender waiting
    #[error("Channel empty")]
    Empty,

    /// Closed and fully drained
    #[error("Channel closed")]
    Closed,
}

/// Close failures
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseError {
    #[error("Channel already closed")]
    AlreadyClosed,
}

/// Selector failures and timeouts
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectError {
    /// No case became ready before the deadline
    #[error("Select timed out after {elapsed_ms}ms (timeout: {timeout_ms}ms)")]
    Timeout { elapsed_ms: u64, timeout_ms: u64 },

    /// The chosen case was a send on a closed channel
    #[error("Select case {case} sent on a closed channel")]
    ClosedChannel { case: usize },
}

impl SelectError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, SelectError::Timeout { .. })
    }
}

/// Which branch of a select ran
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selected {
    /// Case at this declaration index
    Case(usize),
    /// The default branch
    Default,
}

impl Selected {
    /// Declaration index of the case that ran, if any
    pub fn case(&self) -> Option<usize> {
        match self {
            Selected::Case(index) => Some(*index),
            Selected::Default => None,
        }
    }
}

/// Channel statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChannelStats {
    pub id: u64,
    pub capacity: usize,
    pub buffered: usize,
    pub closed: bool,
    pub parked_senders: usize,
    pub parked_receivers: usize,
    pub watchers: usize,
}
