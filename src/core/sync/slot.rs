/*!
 * Handoff Slot
 *
 * One-shot parking place for a single blocked channel operation. A parked
 * receiver waits for a value to be dropped into its slot; a parked sender
 * waits for its value to be taken out. Either way the peer settles the slot
 * exactly once and wakes exactly that waiter.
 */

use super::spinwait::SpinWait;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};

/// Final state of a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Nobody has settled the slot yet
    Waiting,
    /// The peer completed the handoff
    Completed,
    /// The channel closed before a peer arrived
    Closed,
}

struct SlotInner<T> {
    value: Option<T>,
    state: SlotState,
}

/// Parking place shared between a blocked worker and the peer that releases it
///
/// Settling methods are called with the owning channel's state lock held;
/// `wait` never touches the channel lock.
pub struct Slot<T> {
    inner: Mutex<SlotInner<T>>,
    condvar: Condvar,
    settled: AtomicBool,
}

impl<T> Slot<T> {
    /// Slot for a receiver: starts empty
    pub fn empty() -> Self {
        Self::with_value(None)
    }

    /// Slot for a sender: starts holding the value to hand off
    pub fn holding(value: T) -> Self {
        Self::with_value(Some(value))
    }

    fn with_value(value: Option<T>) -> Self {
        Self {
            inner: Mutex::new(SlotInner {
                value,
                state: SlotState::Waiting,
            }),
            condvar: Condvar::new(),
            settled: AtomicBool::new(false),
        }
    }

    /// Hand a value to the parked receiver
    pub fn fill(&self, value: T) {
        let mut inner = self.inner.lock();
        inner.value = Some(value);
        self.settle(&mut inner, SlotState::Completed);
    }

    /// Take the value from the parked sender
    pub fn take(&self) -> Option<T> {
        let mut inner = self.inner.lock();
        let value = inner.value.take();
        self.settle(&mut inner, SlotState::Completed);
        value
    }

    /// Release the waiter because the channel closed
    ///
    /// A sender's value stays in the slot so the sender gets it back.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        self.settle(&mut inner, SlotState::Closed);
    }

    fn settle(&self, inner: &mut SlotInner<T>, state: SlotState) {
        debug_assert_eq!(inner.state, SlotState::Waiting, "slot settled twice");
        inner.state = state;
        self.settled.store(true, Ordering::Release);
        self.condvar.notify_one();
    }

    /// Block until the slot is settled
    ///
    /// Returns the final state and whatever value is left in the slot.
    pub fn wait(&self, spin: Option<&SpinWait>) -> (SlotState, Option<T>) {
        if let Some(spin) = spin {
            spin.spin_until(|| self.settled.load(Ordering::Acquire));
        }

        let mut inner = self.inner.lock();
        while inner.state == SlotState::Waiting {
            self.condvar.wait(&mut inner);
        }
        (inner.state, inner.value.take())
    }
}
