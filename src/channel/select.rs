/*!
 * Selector
 *
 * Waits on several channel operations at once and runs exactly one of them.
 *
 * # Evaluation
 *
 * Each round collects every ready case and draws one uniformly at random, so
 * declaration order never starves later cases. With nothing ready the
 * default branch runs if present; otherwise the selector watches every
 * channel and re-evaluates whenever one of them changes, until a case fires
 * or the timeout elapses.
 *
 * Readiness is read one channel at a time, each under its own lock, so a
 * round is not an atomic snapshot across channels. A case that loses a race
 * between the readiness check and firing is not reported; readiness is read
 * again and the draw repeats.
 *
 * Cases never park inside a channel. Two selectors on opposite ends of an
 * unbuffered channel therefore never pair with each other; at least one side
 * has to use a blocking `send`/`receive`.
 */

use super::channel::{Channel, Interest, RecvEnd, SendEnd};
use super::types::{SelectError, Selected, TryRecvError, TrySendError};
use crate::core::sync::{Signal, SyncConfig};
use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Outcome of firing a single case
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fired {
    /// Operation completed and the action ran
    Done,
    /// Lost a race since readiness was checked
    NotReady,
    /// Send case hit a closed channel
    Closed,
}

trait SelectCase {
    fn is_ready(&self) -> bool;
    fn fire(&mut self) -> Fired;
    fn watch(&self, signal: &Arc<Signal>);
    fn unwatch(&self, signal: &Arc<Signal>);
}

struct RecvCase<T, F> {
    channel: Channel<T>,
    action: Option<F>,
}

impl<T, F> SelectCase for RecvCase<T, F>
where
    F: FnOnce(Option<T>),
{
    fn is_ready(&self) -> bool {
        self.channel.is_recv_ready()
    }

    fn fire(&mut self) -> Fired {
        let received = match self.channel.try_receive() {
            Ok(value) => Some(value),
            Err(TryRecvError::Closed) => None,
            Err(TryRecvError::Empty) => return Fired::NotReady,
        };
        if let Some(action) = self.action.take() {
            action(received);
        }
        Fired::Done
    }

    fn watch(&self, signal: &Arc<Signal>) {
        self.channel.watch(signal, Interest::Recv);
    }

    fn unwatch(&self, signal: &Arc<Signal>) {
        self.channel.unwatch(signal, Interest::Recv);
    }
}

struct SendCase<T, F> {
    channel: Channel<T>,
    value: Option<T>,
    action: Option<F>,
}

impl<T, F> SelectCase for SendCase<T, F>
where
    F: FnOnce(),
{
    fn is_ready(&self) -> bool {
        self.channel.is_send_ready()
    }

    fn fire(&mut self) -> Fired {
        let Some(value) = self.value.take() else {
            return Fired::NotReady;
        };
        match self.channel.try_send(value) {
            Ok(()) => {
                if let Some(action) = self.action.take() {
                    action();
                }
                Fired::Done
            }
            Err(TrySendError::Full(value)) => {
                self.value = Some(value);
                Fired::NotReady
            }
            Err(TrySendError::Closed(value)) => {
                self.value = Some(value);
                Fired::Closed
            }
        }
    }

    fn watch(&self, signal: &Arc<Signal>) {
        self.channel.watch(signal, Interest::Send);
    }

    fn unwatch(&self, signal: &Arc<Signal>) {
        self.channel.unwatch(signal, Interest::Send);
    }
}

/// Multi-way wait over channel operations
///
/// A selector is built per wait and consumed by [`Selector::select`].
///
/// # Examples
///
/// ```
/// use coord_kit::{Channel, Selected, Selector};
///
/// let numbers = Channel::bounded(1);
/// let words = Channel::<&str>::bounded(1);
/// numbers.send(7).unwrap();
///
/// let mut got = None;
/// let outcome = Selector::new()
///     .recv(&numbers, |n| got = n)
///     .recv(&words, |_| {})
///     .select()
///     .unwrap();
///
/// assert_eq!(outcome, Selected::Case(0));
/// assert_eq!(got, Some(7));
/// ```
pub struct Selector<'a> {
    cases: Vec<Box<dyn SelectCase + 'a>>,
    default: Option<Box<dyn FnOnce() + 'a>>,
    timeout: Option<Duration>,
    config: SyncConfig,
    signal: Option<Arc<Signal>>,
}

impl<'a> Selector<'a> {
    pub fn new() -> Self {
        Self {
            cases: Vec::new(),
            default: None,
            timeout: None,
            config: SyncConfig::default(),
            signal: None,
        }
    }

    /// Add a receive case
    ///
    /// `action` gets `Some(value)`, or `None` when the channel is closed and
    /// drained.
    pub fn recv<T, C, F>(mut self, channel: &C, action: F) -> Self
    where
        T: 'a,
        C: RecvEnd<T>,
        F: FnOnce(Option<T>) + 'a,
    {
        self.cases.push(Box::new(RecvCase {
            channel: channel.endpoint().clone(),
            action: Some(action),
        }));
        self
    }

    /// Add a send case; the value is dropped if another case runs
    pub fn send<T, C, F>(mut self, channel: &C, value: T, action: F) -> Self
    where
        T: 'a,
        C: SendEnd<T>,
        F: FnOnce() + 'a,
    {
        self.cases.push(Box::new(SendCase {
            channel: channel.endpoint().clone(),
            value: Some(value),
            action: Some(action),
        }));
        self
    }

    /// Branch to run when no case is ready; makes the select non-blocking
    pub fn default_case(mut self, action: impl FnOnce() + 'a) -> Self {
        self.default = Some(Box::new(action));
        self
    }

    /// Give up with `SelectError::Timeout` after `timeout`
    ///
    /// A timeout too large to represent as a deadline waits without one.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Wait strategy while blocked
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Run one ready case, the default branch, or time out
    ///
    /// With no cases, no default and no timeout this blocks forever.
    pub fn select(mut self) -> Result<Selected, SelectError> {
        let start = Instant::now();
        let deadline = self.timeout.and_then(|t| start.checked_add(t));
        let spin = self.config.spin_wait();
        let signal = Arc::new(Signal::new());

        loop {
            let seen = signal.generation();

            if let Some(index) = self.fire_ready()? {
                trace!(case = index, cases = self.cases.len(), "Select case chosen");
                return Ok(Selected::Case(index));
            }

            if let Some(default) = self.default.take() {
                trace!("Select default branch");
                default();
                return Ok(Selected::Default);
            }

            if self.signal.is_none() {
                // Register, then re-evaluate so a change racing the first
                // round is not lost
                for case in &self.cases {
                    case.watch(&signal);
                }
                self.signal = Some(signal.clone());
                continue;
            }

            if !signal.wait_past(seen, deadline, spin.as_ref()) {
                let timeout = self.timeout.unwrap_or_default();
                debug!(
                    cases = self.cases.len(),
                    timeout_ms = timeout.as_millis() as u64,
                    "Select timed out"
                );
                return Err(SelectError::Timeout {
                    elapsed_ms: start.elapsed().as_millis() as u64,
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
        }
    }

    /// Evaluate readiness and fire one ready case chosen uniformly at random
    fn fire_ready(&mut self) -> Result<Option<usize>, SelectError> {
        let mut rng = rand::thread_rng();

        loop {
            let ready: Vec<usize> = self
                .cases
                .iter()
                .enumerate()
                .filter(|(_, case)| case.is_ready())
                .map(|(index, _)| index)
                .collect();

            if ready.is_empty() {
                return Ok(None);
            }

            let index = ready[rng.gen_range(0..ready.len())];
            match self.cases[index].fire() {
                Fired::Done => return Ok(Some(index)),
                Fired::Closed => return Err(SelectError::ClosedChannel { case: index }),
                Fired::NotReady => continue,
            }
        }
    }
}

impl Default for Selector<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Selector<'_> {
    fn drop(&mut self) {
        if let Some(signal) = self.signal.take() {
            for case in &self.cases {
                case.unwatch(&signal);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_default_when_nothing_ready() {
        let ch = Channel::<i32>::bounded(1);
        let mut hit = false;

        let outcome = Selector::new()
            .recv(&ch, |_| {})
            .default_case(|| hit = true)
            .select()
            .unwrap();

        assert_eq!(outcome, Selected::Default);
        assert!(hit);
    }

    #[test]
    fn test_send_case_fills_buffer() {
        let ch = Channel::bounded(1);
        let outcome = Selector::new().send(&ch, 5, || {}).select().unwrap();

        assert_eq!(outcome, Selected::Case(0));
        assert_eq!(ch.try_receive(), Ok(5));
    }

    #[test]
    fn test_send_on_closed_is_reported() {
        let ch = Channel::bounded(1);
        ch.close().unwrap();

        let result = Selector::new().send(&ch, 1, || {}).select();
        assert_eq!(result, Err(SelectError::ClosedChannel { case: 0 }));
    }

    #[test]
    fn test_recv_on_closed_gets_none() {
        let ch = Channel::<u8>::unbuffered();
        ch.close().unwrap();

        let mut got = Some(1);
        Selector::new().recv(&ch, |v| got = v).select().unwrap();
        assert_eq!(got, None);
    }

    #[test]
    fn test_unrepresentable_timeout_waits_without_deadline() {
        let ch = Channel::bounded(1);
        ch.send(3).unwrap();

        let mut got = None;
        let outcome = Selector::new()
            .recv(&ch, |v| got = v)
            .timeout(Duration::MAX)
            .select();

        assert_eq!(outcome, Ok(Selected::Case(0)));
        assert_eq!(got, Some(3));
    }

    #[test]
    fn test_default_constructed_selector() {
        let result = Selector::default()
            .timeout(Duration::from_millis(10))
            .select();
        assert!(result.unwrap_err().is_timeout());
    }

    #[test]
    fn test_empty_selector_times_out() {
        let result = Selector::new().timeout(Duration::from_millis(20)).select();
        assert!(matches!(result, Err(SelectError::Timeout { timeout_ms: 20, .. })));
    }

    #[test]
    fn test_watchers_cleared_after_blocking_select() {
        let ch = Channel::with_config(0, SyncConfig::park());
        let ch_clone = ch.clone();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            ch_clone.send(9)
        });

        let mut got = None;
        let outcome = Selector::new()
            .recv(&ch, |v| got = v)
            .timeout(Duration::from_secs(2))
            .select()
            .unwrap();

        assert_eq!(outcome, Selected::Case(0));
        assert_eq!(got, Some(9));
        assert!(handle.join().unwrap().is_ok());
        assert_eq!(ch.stats().watchers, 0);
    }
}
