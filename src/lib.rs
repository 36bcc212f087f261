/*!
 * Coordination Toolkit Library
 *
 * In-process synchronization primitives for independently scheduled workers:
 * - `Channel`: typed, unbuffered or bounded, closeable queue
 * - `Selector`: random-fair multi-way wait with default and timeout branches
 * - `Barrier`: countdown that releases waiters at zero
 * - `Lock`: exclusive lock with holder tracking and scoped guards
 *
 * Primitives are explicit objects handed to each worker; nothing is global.
 */

pub mod channel;
pub mod core;
pub mod monitoring;
pub mod primitives;

// Re-exports
pub use crate::core::{CoordError, CoordResult, StrategyType, SyncConfig};
pub use channel::{
    after, Channel, ChannelStats, CloseError, RecvOnly, SelectError, Selected, Selector,
    SendError, SendOnly, Ticker, TryRecvError, TrySendError,
};
pub use monitoring::{init_tracing, WorkerSpan};
pub use primitives::{Barrier, BarrierError, Lock, LockError, LockGuard};
