/*!
 * Coordination Primitives
 * Exclusive lock and countdown barrier
 */

pub mod barrier;
pub mod lock;
pub mod types;

// Re-export public API
pub use barrier::Barrier;
pub use lock::{Lock, LockGuard};
pub use types::{BarrierError, LockError};
