/*!
 * Core Module
 * Error handling, limits and the wait layer under every primitive
 */

pub mod errors;
pub mod limits;
pub mod sync;

// Re-export for convenience
pub use errors::*;
pub use sync::{ConfigError, SpinWait, StrategyType, SyncConfig};
