/*!
 * Toolkit Limits and Constants
 *
 * Centralized location for the tuning constants shared by the primitives.
 */

use std::time::Duration;

// =============================================================================
// WAIT STRATEGY
// =============================================================================

/// Default spin budget before a waiter parks (10µs)
pub const DEFAULT_SPIN_DURATION: Duration = Duration::from_micros(10);

/// Default spin iterations before a waiter parks
pub const DEFAULT_MAX_SPINS: u32 = 100;

/// Low-latency spin budget (50µs)
/// [PERF] Worth it only when the peer is expected on another core
pub const LOW_LATENCY_SPIN_DURATION: Duration = Duration::from_micros(50);

/// Low-latency spin iterations
pub const LOW_LATENCY_MAX_SPINS: u32 = 500;

/// Long-wait spin budget (1µs)
pub const LONG_WAIT_SPIN_DURATION: Duration = Duration::from_micros(1);

/// Long-wait spin iterations
pub const LONG_WAIT_MAX_SPINS: u32 = 10;

/// Yield to the OS scheduler every N spins
pub const SPIN_YIELD_INTERVAL: u32 = 10;

// =============================================================================
// CHANNELS
// =============================================================================

/// Upper bound on buffer slots allocated up front for a bounded channel
/// [PERF] Larger buffers grow on demand instead of reserving their full capacity
pub const BUFFER_PREALLOC_LIMIT: usize = 1024;

/// Capacity of the channels fed by `after` and `Ticker`
/// A slow receiver drops ticks instead of queueing them
pub const TIMER_CHANNEL_CAPACITY: usize = 1;

// =============================================================================
// ENVIRONMENT
// =============================================================================

/// Wait strategy override (`auto`, `park`, `spin`)
pub const ENV_SYNC_STRATEGY: &str = "COORD_SYNC_STRATEGY";

/// Spin iteration override
pub const ENV_SPIN_MAX: &str = "COORD_SPIN_MAX";

/// Enables JSON log output when set to `1` or `true`
pub const ENV_TRACE_JSON: &str = "COORD_TRACE_JSON";
