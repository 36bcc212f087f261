/*!
 * Change Signal
 *
 * Generation-counted notifier a selector parks on while it watches several
 * channels. Every watched channel bumps the generation when its readiness may
 * have changed; the selector re-evaluates its cases whenever the generation
 * moves past the value it last saw.
 */

use super::spinwait::SpinWait;
use parking_lot::{Condvar, Mutex};
use std::time::Instant;

/// Generation-counted wake-up signal
pub struct Signal {
    generation: Mutex<u64>,
    condvar: Condvar,
}

impl Signal {
    pub fn new() -> Self {
        Self {
            generation: Mutex::new(0),
            condvar: Condvar::new(),
        }
    }

    /// Current generation
    pub fn generation(&self) -> u64 {
        *self.generation.lock()
    }

    /// Record a change and wake the watcher
    pub fn notify(&self) {
        let mut generation = self.generation.lock();
        *generation = generation.wrapping_add(1);
        self.condvar.notify_all();
    }

    /// Block until the generation differs from `seen` or `deadline` passes
    ///
    /// Returns `false` only on deadline.
    pub fn wait_past(&self, seen: u64, deadline: Option<Instant>, spin: Option<&SpinWait>) -> bool {
        if let Some(spin) = spin {
            let moved = spin.spin_until(|| {
                self.generation() != seen || deadline.is_some_and(|d| Instant::now() >= d)
            });
            if moved && self.generation() != seen {
                return true;
            }
        }

        let mut generation = self.generation.lock();
        while *generation == seen {
            match deadline {
                Some(deadline) => {
                    if self.condvar.wait_until(&mut generation, deadline).timed_out() {
                        return *generation != seen;
                    }
                }
                None => self.condvar.wait(&mut generation),
            }
        }
        true
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}
