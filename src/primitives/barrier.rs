/*!
 * Countdown Barrier
 *
 * Releases every waiter once its pending counter drops to zero. Workers
 * report completion with `done()`; a coordinator blocks in `wait()`.
 */

use super::types::BarrierError;
use crate::core::sync::{SpinWait, SyncConfig};
use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, error, trace};

#[derive(Debug, Default)]
struct BarrierState {
    pending: usize,
    /// Bumped every time `pending` reaches zero; waiters key on it so a
    /// release is never missed if the counter is raised again right away
    generation: u64,
    waiters: usize,
}

/// Countdown barrier (wait group)
///
/// # Examples
///
/// ```
/// use coord_kit::Barrier;
/// use std::sync::Arc;
/// use std::thread;
///
/// let barrier = Arc::new(Barrier::new(2));
/// for _ in 0..2 {
///     let barrier = barrier.clone();
///     thread::spawn(move || barrier.done());
/// }
/// barrier.wait();
/// assert_eq!(barrier.pending(), 0);
/// ```
#[derive(Debug)]
pub struct Barrier {
    state: Mutex<BarrierState>,
    condvar: Condvar,
    spin: Option<SpinWait>,
}

impl Barrier {
    /// Create a barrier expecting `count` completions
    pub fn new(count: usize) -> Self {
        Self::with_config(count, SyncConfig::default())
    }

    /// Create a barrier with a specific wait strategy
    pub fn with_config(count: usize, config: SyncConfig) -> Self {
        Self {
            state: Mutex::new(BarrierState {
                pending: count,
                ..Default::default()
            }),
            condvar: Condvar::new(),
            spin: config.spin_wait(),
        }
    }

    /// Adjust the pending counter by `delta`
    ///
    /// # Panics
    ///
    /// Panics when the counter would go negative or overflow. That is a
    /// coordination bug in the caller and is never clamped.
    #[track_caller]
    pub fn add(&self, delta: isize) -> usize {
        match self.try_add(delta) {
            Ok(pending) => pending,
            Err(e) => panic!("{e}"),
        }
    }

    /// Mark one worker complete
    ///
    /// # Panics
    ///
    /// Panics when called more times than the counter allows.
    #[track_caller]
    pub fn done(&self) {
        self.add(-1);
    }

    /// Adjust the counter, reporting a negative result instead of panicking
    ///
    /// The counter is left unchanged on error. Returns the new pending count.
    pub fn try_add(&self, delta: isize) -> Result<usize, BarrierError> {
        let mut state = self.state.lock();
        let pending = state.pending;

        let next = match pending.checked_add_signed(delta) {
            Some(next) => next,
            None if delta < 0 => {
                error!(pending, delta, "Barrier counter would go negative");
                return Err(BarrierError::NegativeCounter { pending, delta });
            }
            None => {
                error!(pending, delta, "Barrier counter would overflow");
                return Err(BarrierError::CounterOverflow { pending, delta });
            }
        };

        state.pending = next;
        trace!(pending = next, delta, "Barrier counter adjusted");

        if next == 0 && pending > 0 {
            state.generation = state.generation.wrapping_add(1);
            debug!(
                generation = state.generation,
                waiters = state.waiters,
                "Barrier released"
            );
            if state.waiters > 0 {
                self.condvar.notify_all();
            }
        }

        Ok(next)
    }

    /// Block until the counter reaches zero
    ///
    /// Returns immediately when nothing is pending.
    pub fn wait(&self) {
        self.wait_deadline(None);
    }

    /// Block until the counter reaches zero or `timeout` elapses
    ///
    /// A timeout too large to represent as a deadline waits without one.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<(), BarrierError> {
        let start = Instant::now();
        if self.wait_deadline(start.checked_add(timeout)) {
            Ok(())
        } else {
            Err(BarrierError::Timeout {
                elapsed_ms: start.elapsed().as_millis() as u64,
                timeout_ms: timeout.as_millis() as u64,
            })
        }
    }

    /// Current pending count (diagnostics only; may be stale immediately)
    pub fn pending(&self) -> usize {
        self.state.lock().pending
    }

    fn wait_deadline(&self, deadline: Option<Instant>) -> bool {
        let generation = {
            let state = self.state.lock();
            if state.pending == 0 {
                return true;
            }
            state.generation
        };

        if let Some(spin) = &self.spin {
            if spin.spin_until(|| self.state.lock().generation != generation) {
                return true;
            }
        }

        let mut state = self.state.lock();
        state.waiters += 1;
        let mut released = true;
        while state.generation == generation {
            match deadline {
                Some(deadline) => {
                    if self.condvar.wait_until(&mut state, deadline).timed_out() {
                        released = state.generation != generation;
                        break;
                    }
                }
                None => self.condvar.wait(&mut state),
            }
        }
        state.waiters -= 1;
        released
    }
}

impl Default for Barrier {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_wait_on_zero_returns() {
        let barrier = Barrier::default();
        barrier.wait();
        assert!(barrier.wait_timeout(Duration::from_millis(1)).is_ok());
    }

    #[test]
    fn test_try_add_rejects_negative() {
        let barrier = Barrier::new(1);
        assert_eq!(barrier.try_add(-1), Ok(0));
        assert_eq!(
            barrier.try_add(-1),
            Err(BarrierError::NegativeCounter {
                pending: 0,
                delta: -1
            })
        );
        assert_eq!(barrier.pending(), 0);
    }

    #[test]
    #[should_panic(expected = "negative")]
    fn test_done_past_zero_panics() {
        let barrier = Barrier::new(0);
        barrier.done();
    }

    #[test]
    fn test_try_add_reports_overflow() {
        let barrier = Barrier::new(usize::MAX);
        assert_eq!(
            barrier.try_add(1),
            Err(BarrierError::CounterOverflow {
                pending: usize::MAX,
                delta: 1
            })
        );
        assert_eq!(barrier.pending(), usize::MAX);
    }

    #[test]
    fn test_done_from_huge_count() {
        let barrier = Barrier::new(usize::MAX);
        barrier.done();
        assert_eq!(barrier.pending(), usize::MAX - 1);
    }

    #[test]
    #[should_panic(expected = "overflow")]
    fn test_add_past_max_panics() {
        let barrier = Barrier::new(usize::MAX);
        barrier.add(1);
    }

    #[test]
    fn test_unrepresentable_timeout() {
        let barrier = Barrier::new(0);
        assert!(barrier.wait_timeout(Duration::MAX).is_ok());

        let barrier = Arc::new(Barrier::with_config(1, SyncConfig::park()));
        let barrier_clone = barrier.clone();
        let handle = thread::spawn(move || barrier_clone.wait_timeout(Duration::MAX));

        thread::sleep(Duration::from_millis(20));
        barrier.done();
        assert!(handle.join().unwrap().is_ok());
    }

    #[test]
    fn test_wait_timeout() {
        let barrier = Barrier::with_config(1, SyncConfig::park());
        let start = Instant::now();
        let result = barrier.wait_timeout(Duration::from_millis(50));

        assert!(matches!(result, Err(BarrierError::Timeout { .. })));
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_release_survives_immediate_rearm() {
        let barrier = Arc::new(Barrier::with_config(1, SyncConfig::park()));
        let barrier_clone = barrier.clone();

        let handle = thread::spawn(move || barrier_clone.wait_timeout(Duration::from_secs(2)));

        thread::sleep(Duration::from_millis(50));
        barrier.done();
        barrier.add(1);

        assert!(handle.join().unwrap().is_ok());
        assert_eq!(barrier.pending(), 1);
    }
}
