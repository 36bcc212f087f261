/*!
 * Wait Layer
 *
 * Parking machinery shared by every blocking primitive in the toolkit:
 * - Configurable spin-then-park strategy
 * - One-shot handoff slots for blocked channel senders and receivers
 * - Generation-counted signals that selectors park on
 *
 * # Lock Ordering
 *
 * Slots and signals are settled while the owning primitive's state lock is
 * held. A worker waiting on a slot or signal never holds a primitive's state
 * lock, so the order is always primitive state -> slot/signal.
 */

mod config;
mod signal;
mod slot;
mod spinwait;

pub use config::{ConfigError, StrategyType, SyncConfig};
pub use spinwait::SpinWait;

pub(crate) use signal::Signal;
pub(crate) use slot::{Slot, SlotState};
