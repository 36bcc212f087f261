/*!
 * Adaptive Spin-Wait
 *
 * Optimized for low-latency scenarios where waits are typically very short.
 * Spins for a while before the caller falls back to parking.
 */

use crate::core::limits::SPIN_YIELD_INTERVAL;
use std::thread;
use std::time::{Duration, Instant};

/// Bounded spin phase run before a waiter parks
///
/// # Performance
///
/// - Ultra-low latency for short waits (< 10µs)
/// - Higher CPU usage during wait
/// - Callers park on a condvar once the budget is spent
#[derive(Debug, Clone, Copy)]
pub struct SpinWait {
    /// Spin duration before giving up
    spin_duration: Duration,
    /// Maximum spin iterations
    max_spins: u32,
}

impl SpinWait {
    /// Create a new spin phase
    pub fn new(spin_duration: Duration, max_spins: u32) -> Self {
        Self {
            spin_duration,
            max_spins,
        }
    }

    /// Spin until `check` returns true or the budget runs out
    ///
    /// Returns true if the condition was observed while spinning.
    pub fn spin_until(&self, mut check: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        let mut spin_count = 0;

        loop {
            if check() {
                return true;
            }

            if spin_count >= self.max_spins || start.elapsed() >= self.spin_duration {
                return false;
            }

            // Yield to scheduler occasionally
            if spin_count % SPIN_YIELD_INTERVAL == 0 {
                thread::yield_now();
            } else {
                std::hint::spin_loop();
            }

            spin_count += 1;
        }
    }
}
