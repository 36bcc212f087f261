/*!
 * Channel Implementation
 *
 * Typed, optionally-bounded, closeable queue between workers.
 *
 * # Handoff Rules
 *
 * - A sender that finds a parked receiver hands the value straight to it
 * - Otherwise the value goes into the buffer if there is room
 * - Otherwise the sender parks with its value, in arrival order
 * - A receiver takes the buffer head and refills the tail from the oldest
 *   parked sender; with capacity 0 it takes the parked sender's value directly
 *
 * Every completing operation settles at most one parked peer, so exactly one
 * blocked worker is woken per handoff. `close()` settles all of them.
 *
 * # Selector Wake-ups
 *
 * Watching selectors are woken the same way: a change that makes a value
 * available wakes the oldest receive-side watcher, a change that frees room
 * wakes the oldest send-side watcher, and the woken watcher moves to the back
 * of the queue. Only `close()` wakes every watcher. A watcher that leaves
 * without consuming the readiness it was woken for hands the wake-up on.
 */

use super::types::{ChannelStats, CloseError, SendError, TryRecvError, TrySendError};
use crate::core::limits::BUFFER_PREALLOC_LIMIT;
use crate::core::sync::{Signal, Slot, SlotState, SpinWait, SyncConfig};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

static NEXT_CHANNEL_ID: AtomicU64 = AtomicU64::new(1);

struct State<T> {
    buffer: VecDeque<T>,
    closed: bool,
    senders: VecDeque<Arc<Slot<T>>>,
    receivers: VecDeque<Arc<Slot<T>>>,
    /// Selectors currently blocked on this channel, oldest first
    watchers: VecDeque<Watcher>,
}

/// Side of the channel a watching selector is waiting on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Interest {
    /// Waiting for a value to receive
    Recv,
    /// Waiting for room to send
    Send,
}

struct Watcher {
    signal: Arc<Signal>,
    interest: Interest,
}

impl<T> State<T> {
    /// Take the next value without blocking, keeping FIFO order
    fn take_ready(&mut self, capacity: usize) -> Option<T> {
        if let Some(value) = self.buffer.pop_front() {
            if let Some(sender) = self.senders.pop_front() {
                if let Some(moved) = sender.take() {
                    self.buffer.push_back(moved);
                }
            }
            if self.buffer.len() < capacity {
                self.notify_one(Interest::Send);
            }
            return Some(value);
        }

        let sender = self.senders.pop_front()?;
        sender.take()
    }

    fn is_ready(&self, interest: Interest, capacity: usize) -> bool {
        self.closed
            || match interest {
                Interest::Recv => !self.buffer.is_empty() || !self.senders.is_empty(),
                Interest::Send => !self.receivers.is_empty() || self.buffer.len() < capacity,
            }
    }

    /// Wake the oldest watcher waiting on `interest` and rotate it to the back
    fn notify_one(&mut self, interest: Interest) {
        let Some(index) = self.watchers.iter().position(|w| w.interest == interest) else {
            return;
        };
        if let Some(watcher) = self.watchers.remove(index) {
            watcher.signal.notify();
            self.watchers.push_back(watcher);
        }
    }

    fn notify_all(&self) {
        for watcher in &self.watchers {
            watcher.signal.notify();
        }
    }
}

struct Inner<T> {
    id: u64,
    capacity: usize,
    spin: Option<SpinWait>,
    state: Mutex<State<T>>,
}

/// Typed channel shared by every worker holding a handle
///
/// Cloning the handle shares the channel. Capacity 0 is a rendezvous
/// channel: each send completes only together with a receive.
///
/// # Examples
///
/// ```
/// use coord_kit::Channel;
///
/// let ch = Channel::bounded(2);
/// ch.send(1).unwrap();
/// ch.send(2).unwrap();
/// ch.close().unwrap();
///
/// let received: Vec<i32> = ch.iter().collect();
/// assert_eq!(received, vec![1, 2]);
/// assert_eq!(ch.receive(), None);
/// ```
pub struct Channel<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Channel<T> {
    /// Rendezvous channel (capacity 0)
    pub fn unbuffered() -> Self {
        Self::bounded(0)
    }

    /// Channel buffering up to `capacity` values
    pub fn bounded(capacity: usize) -> Self {
        Self::with_config(capacity, SyncConfig::default())
    }

    /// Channel with a specific wait strategy for parked workers
    pub fn with_config(capacity: usize, config: SyncConfig) -> Self {
        let id = NEXT_CHANNEL_ID.fetch_add(1, Ordering::Relaxed);
        trace!(channel = id, capacity, "Channel created");

        Self {
            inner: Arc::new(Inner {
                id,
                capacity,
                spin: config.spin_wait(),
                state: Mutex::new(State {
                    buffer: VecDeque::with_capacity(capacity.min(BUFFER_PREALLOC_LIMIT)),
                    closed: false,
                    senders: VecDeque::new(),
                    receivers: VecDeque::new(),
                    watchers: VecDeque::new(),
                }),
            }),
        }
    }

    /// Send a value, blocking until it is buffered or handed to a receiver
    ///
    /// Fails with the value when the channel is closed, including when it is
    /// closed while this sender is parked. Filling a bounded channel with no
    /// receiver blocks forever.
    pub fn send(&self, value: T) -> Result<(), SendError<T>> {
        let slot = {
            let mut state = self.inner.state.lock();
            let value = match self.offer(&mut state, value) {
                Ok(()) => return Ok(()),
                Err(TrySendError::Closed(value)) => return Err(SendError(value)),
                Err(TrySendError::Full(value)) => value,
            };

            let slot = Arc::new(Slot::holding(value));
            state.senders.push_back(slot.clone());
            trace!(
                channel = self.inner.id,
                parked = state.senders.len(),
                "Sender parked"
            );
            state.notify_one(Interest::Recv);
            slot
        };

        match slot.wait(self.inner.spin.as_ref()) {
            (SlotState::Closed, Some(value)) => {
                warn!(channel = self.inner.id, "Channel closed under parked sender");
                Err(SendError(value))
            }
            _ => Ok(()),
        }
    }

    /// Send without blocking
    pub fn try_send(&self, value: T) -> Result<(), TrySendError<T>> {
        let mut state = self.inner.state.lock();
        self.offer(&mut state, value)
    }

    /// Receive the oldest value, blocking until one arrives
    ///
    /// Returns `None` once the channel is closed and drained, without
    /// blocking, on every later call.
    pub fn receive(&self) -> Option<T> {
        let slot = {
            let mut state = self.inner.state.lock();
            if let Some(value) = state.take_ready(self.inner.capacity) {
                return Some(value);
            }
            if state.closed {
                return None;
            }

            let slot = Arc::new(Slot::empty());
            state.receivers.push_back(slot.clone());
            trace!(
                channel = self.inner.id,
                parked = state.receivers.len(),
                "Receiver parked"
            );
            state.notify_one(Interest::Send);
            slot
        };

        match slot.wait(self.inner.spin.as_ref()) {
            (SlotState::Completed, value) => value,
            _ => None,
        }
    }

    /// Receive without blocking
    pub fn try_receive(&self) -> Result<T, TryRecvError> {
        let mut state = self.inner.state.lock();
        match state.take_ready(self.inner.capacity) {
            Some(value) => Ok(value),
            None if state.closed => Err(TryRecvError::Closed),
            None => Err(TryRecvError::Empty),
        }
    }

    /// Close the channel
    ///
    /// Buffered values stay receivable. Parked senders fail with their
    /// values; parked receivers observe the close.
    pub fn close(&self) -> Result<(), CloseError> {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        if state.closed {
            warn!(channel = self.inner.id, "Channel closed twice");
            return Err(CloseError::AlreadyClosed);
        }
        state.closed = true;

        let senders = state.senders.len();
        let receivers = state.receivers.len();
        for slot in state.senders.drain(..).chain(state.receivers.drain(..)) {
            slot.close();
        }
        state.notify_all();

        debug!(
            channel = self.inner.id,
            buffered = state.buffer.len(),
            senders,
            receivers,
            "Channel closed"
        );
        Ok(())
    }

    /// Whether `close()` has been called
    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    /// Number of buffered values
    pub fn len(&self) -> usize {
        self.inner.state.lock().buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fixed buffer capacity
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Process-unique channel id, as used in log events
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn stats(&self) -> ChannelStats {
        let state = self.inner.state.lock();
        ChannelStats {
            id: self.inner.id,
            capacity: self.inner.capacity,
            buffered: state.buffer.len(),
            closed: state.closed,
            parked_senders: state.senders.len(),
            parked_receivers: state.receivers.len(),
            watchers: state.watchers.len(),
        }
    }

    /// Blocking iterator over received values, ending at close
    pub fn iter(&self) -> Iter<'_, T> {
        Iter { channel: self }
    }

    /// Send-only view of this channel
    pub fn sender(&self) -> SendOnly<T> {
        SendOnly {
            channel: self.clone(),
        }
    }

    /// Receive-only view of this channel
    pub fn receiver(&self) -> RecvOnly<T> {
        RecvOnly {
            channel: self.clone(),
        }
    }

    /// A send could complete without blocking (a closed channel counts:
    /// the send fails immediately)
    pub(crate) fn is_send_ready(&self) -> bool {
        self.inner
            .state
            .lock()
            .is_ready(Interest::Send, self.inner.capacity)
    }

    /// A receive could complete without blocking
    pub(crate) fn is_recv_ready(&self) -> bool {
        self.inner
            .state
            .lock()
            .is_ready(Interest::Recv, self.inner.capacity)
    }

    pub(crate) fn watch(&self, signal: &Arc<Signal>, interest: Interest) {
        self.inner.state.lock().watchers.push_back(Watcher {
            signal: signal.clone(),
            interest,
        });
    }

    /// Stop watching; a still-ready side wakes the next watcher in line
    pub(crate) fn unwatch(&self, signal: &Arc<Signal>, interest: Interest) {
        let mut state = self.inner.state.lock();
        state
            .watchers
            .retain(|w| !(w.interest == interest && Arc::ptr_eq(&w.signal, signal)));

        if !state.closed && state.is_ready(interest, self.inner.capacity) {
            state.notify_one(interest);
        }
    }

    fn offer(&self, state: &mut State<T>, value: T) -> Result<(), TrySendError<T>> {
        if state.closed {
            warn!(channel = self.inner.id, "Send on closed channel");
            return Err(TrySendError::Closed(value));
        }

        if let Some(receiver) = state.receivers.pop_front() {
            trace!(channel = self.inner.id, "Handing value to parked receiver");
            receiver.fill(value);
        } else if state.buffer.len() < self.inner.capacity {
            state.buffer.push_back(value);
            state.notify_one(Interest::Recv);
        } else {
            return Err(TrySendError::Full(value));
        }

        Ok(())
    }
}

impl<T: Default> Channel<T> {
    /// Receive as `(value, ok)`: a closed, drained channel yields
    /// `(T::default(), false)`
    pub fn receive_or_default(&self) -> (T, bool) {
        match self.receive() {
            Some(value) => (value, true),
            None => (T::default(), false),
        }
    }
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Channel")
            .field("id", &self.inner.id)
            .field("capacity", &self.inner.capacity)
            .field("buffered", &state.buffer.len())
            .field("closed", &state.closed)
            .finish()
    }
}

/// Blocking iterator returned by [`Channel::iter`]
pub struct Iter<'a, T> {
    channel: &'a Channel<T>,
}

impl<T> Iterator for Iter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.channel.receive()
    }
}

/// Owning blocking iterator
pub struct IntoIter<T> {
    channel: Channel<T>,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.channel.receive()
    }
}

impl<T> IntoIterator for Channel<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> IntoIter<T> {
        IntoIter { channel: self }
    }
}

impl<'a, T> IntoIterator for &'a Channel<T> {
    type Item = T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

/// Send-only view of a channel
pub struct SendOnly<T> {
    channel: Channel<T>,
}

impl<T> SendOnly<T> {
    pub fn send(&self, value: T) -> Result<(), SendError<T>> {
        self.channel.send(value)
    }

    pub fn try_send(&self, value: T) -> Result<(), TrySendError<T>> {
        self.channel.try_send(value)
    }

    /// Close the underlying channel; closing belongs to the sending side
    pub fn close(&self) -> Result<(), CloseError> {
        self.channel.close()
    }

    pub fn capacity(&self) -> usize {
        self.channel.capacity()
    }
}

impl<T> Clone for SendOnly<T> {
    fn clone(&self) -> Self {
        Self {
            channel: self.channel.clone(),
        }
    }
}

impl<T> fmt::Debug for SendOnly<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SendOnly").field(&self.channel).finish()
    }
}

/// Receive-only view of a channel
pub struct RecvOnly<T> {
    channel: Channel<T>,
}

impl<T> RecvOnly<T> {
    pub fn receive(&self) -> Option<T> {
        self.channel.receive()
    }

    pub fn try_receive(&self) -> Result<T, TryRecvError> {
        self.channel.try_receive()
    }

    pub fn iter(&self) -> Iter<'_, T> {
        self.channel.iter()
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }
}

impl<T: Default> RecvOnly<T> {
    pub fn receive_or_default(&self) -> (T, bool) {
        self.channel.receive_or_default()
    }
}

impl<T> Clone for RecvOnly<T> {
    fn clone(&self) -> Self {
        Self {
            channel: self.channel.clone(),
        }
    }
}

impl<T> fmt::Debug for RecvOnly<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RecvOnly").field(&self.channel).finish()
    }
}

impl<T> IntoIterator for RecvOnly<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> IntoIter<T> {
        self.channel.into_iter()
    }
}

mod sealed {
    pub trait Sealed {}

    impl<T> Sealed for super::Channel<T> {}
    impl<T> Sealed for super::SendOnly<T> {}
    impl<T> Sealed for super::RecvOnly<T> {}
}

/// Handles a selector can send through
pub trait SendEnd<T>: sealed::Sealed {
    #[doc(hidden)]
    fn endpoint(&self) -> &Channel<T>;
}

/// Handles a selector can receive from
pub trait RecvEnd<T>: sealed::Sealed {
    #[doc(hidden)]
    fn endpoint(&self) -> &Channel<T>;
}

impl<T> SendEnd<T> for Channel<T> {
    fn endpoint(&self) -> &Channel<T> {
        self
    }
}

impl<T> RecvEnd<T> for Channel<T> {
    fn endpoint(&self) -> &Channel<T> {
        self
    }
}

impl<T> SendEnd<T> for SendOnly<T> {
    fn endpoint(&self) -> &Channel<T> {
        &self.channel
    }
}

impl<T> RecvEnd<T> for RecvOnly<T> {
    fn endpoint(&self) -> &Channel<T> {
        &self.channel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_buffered_fifo() {
        let ch = Channel::bounded(3);
        for i in 0..3 {
            ch.send(i).unwrap();
        }
        assert_eq!(ch.len(), 3);
        assert_eq!(ch.try_send(3), Err(TrySendError::Full(3)));
        assert_eq!(ch.receive(), Some(0));
        assert_eq!(ch.receive(), Some(1));
        assert_eq!(ch.receive(), Some(2));
        assert_eq!(ch.try_receive(), Err(TryRecvError::Empty));
    }

    #[test]
    fn test_unbuffered_try_ops_need_a_peer() {
        let ch = Channel::<u8>::unbuffered();
        assert!(ch.try_send(1).unwrap_err().is_full());
        assert_eq!(ch.try_receive(), Err(TryRecvError::Empty));
        assert!(!ch.is_send_ready());
        assert!(!ch.is_recv_ready());
    }

    #[test]
    fn test_parked_sender_refills_buffer() {
        let ch = Channel::with_config(1, SyncConfig::park());
        ch.send(1).unwrap();

        let ch_clone = ch.clone();
        let handle = thread::spawn(move || ch_clone.send(2));

        thread::sleep(Duration::from_millis(50));
        assert_eq!(ch.stats().parked_senders, 1);

        assert_eq!(ch.receive(), Some(1));
        assert!(handle.join().unwrap().is_ok());
        assert_eq!(ch.len(), 1);
        assert_eq!(ch.receive(), Some(2));
    }

    #[test]
    fn test_close_fails_parked_sender_with_value() {
        let ch = Channel::with_config(0, SyncConfig::park());
        let ch_clone = ch.clone();
        let handle = thread::spawn(move || ch_clone.send(String::from("late")));

        thread::sleep(Duration::from_millis(50));
        ch.close().unwrap();

        let err = handle.join().unwrap().unwrap_err();
        assert_eq!(err.into_inner(), "late");
        assert_eq!(ch.try_receive(), Err(TryRecvError::Closed));
    }

    #[test]
    fn test_close_releases_parked_receiver() {
        let ch = Channel::<i32>::with_config(2, SyncConfig::park());
        let ch_clone = ch.clone();
        let handle = thread::spawn(move || ch_clone.receive_or_default());

        thread::sleep(Duration::from_millis(50));
        ch.close().unwrap();

        assert_eq!(handle.join().unwrap(), (0, false));
    }

    #[test]
    fn test_views_share_channel() {
        let ch = Channel::bounded(1);
        let tx = ch.sender();
        let rx = ch.receiver();

        tx.send("hello").unwrap();
        assert_eq!(rx.len(), 1);
        assert_eq!(rx.receive(), Some("hello"));
        tx.close().unwrap();
        assert!(ch.is_closed());
        assert_eq!(rx.try_receive(), Err(TryRecvError::Closed));
    }

    #[test]
    fn test_watchers_registered_and_removed() {
        let ch = Channel::<i32>::bounded(1);
        let signal = Arc::new(Signal::new());
        let seen = signal.generation();

        ch.watch(&signal, Interest::Recv);
        assert_eq!(ch.stats().watchers, 1);
        ch.send(1).unwrap();
        assert_ne!(signal.generation(), seen);

        ch.unwatch(&signal, Interest::Recv);
        assert_eq!(ch.stats().watchers, 0);
    }

    fn watchers(ch: &Channel<i32>, interest: Interest, n: usize) -> Vec<(Arc<Signal>, u64)> {
        (0..n)
            .map(|_| {
                let signal = Arc::new(Signal::new());
                ch.watch(&signal, interest);
                let seen = signal.generation();
                (signal, seen)
            })
            .collect()
    }

    fn woken(signals: &[(Arc<Signal>, u64)]) -> Vec<bool> {
        signals
            .iter()
            .map(|(signal, seen)| signal.generation() != *seen)
            .collect()
    }

    #[test]
    fn test_one_send_wakes_one_watcher() {
        let ch = Channel::<i32>::bounded(4);
        let signals = watchers(&ch, Interest::Recv, 3);

        ch.send(1).unwrap();
        assert_eq!(woken(&signals), vec![true, false, false]);

        // The woken watcher rotates to the back of the line
        ch.send(2).unwrap();
        assert_eq!(woken(&signals), vec![true, true, false]);
    }

    #[test]
    fn test_wake_goes_to_matching_side() {
        let ch = Channel::<i32>::with_config(1, SyncConfig::park());
        let senders = watchers(&ch, Interest::Send, 2);
        let receivers = watchers(&ch, Interest::Recv, 2);

        ch.send(1).unwrap();
        assert_eq!(woken(&senders), vec![false, false]);
        assert_eq!(woken(&receivers), vec![true, false]);

        assert_eq!(ch.receive(), Some(1));
        assert_eq!(woken(&senders), vec![true, false]);
        assert_eq!(woken(&receivers), vec![true, false]);
    }

    #[test]
    fn test_close_wakes_every_watcher() {
        let ch = Channel::<i32>::unbuffered();
        let mut signals = watchers(&ch, Interest::Recv, 2);
        signals.extend(watchers(&ch, Interest::Send, 2));

        ch.close().unwrap();
        assert_eq!(woken(&signals), vec![true; 4]);
    }

    #[test]
    fn test_leaving_watcher_hands_wake_on() {
        let ch = Channel::<i32>::bounded(1);
        let signals = watchers(&ch, Interest::Recv, 2);

        ch.send(1).unwrap();
        assert_eq!(woken(&signals), vec![true, false]);

        // First watcher leaves without taking the value
        ch.unwatch(&signals[0].0, Interest::Recv);
        assert_eq!(woken(&signals), vec![true, true]);
    }
}
