/*!
 * Timer Channels
 *
 * Channels fed by a background thread on a clock, for selecting on time
 * alongside ordinary channels.
 */

use super::channel::{Channel, RecvOnly};
use super::types::TrySendError;
use crate::core::limits::TIMER_CHANNEL_CAPACITY;
use std::thread;
use std::time::{Duration, Instant};
use tracing::trace;

/// Channel that receives a single `Instant` once `delay` has elapsed
pub fn after(delay: Duration) -> RecvOnly<Instant> {
    let channel = Channel::bounded(TIMER_CHANNEL_CAPACITY);
    let feed = channel.sender();

    thread::spawn(move || {
        thread::sleep(delay);
        // Receivers may already be gone; an undelivered tick is fine
        let _ = feed.try_send(Instant::now());
    });

    channel.receiver()
}

/// Periodic tick source
///
/// A slow receiver drops ticks instead of queueing them. Dropping the ticker
/// closes its channel and stops the feeding thread.
#[derive(Debug)]
pub struct Ticker {
    channel: Channel<Instant>,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        let channel = Channel::bounded(TIMER_CHANNEL_CAPACITY);
        let feed = channel.clone();

        thread::spawn(move || loop {
            thread::sleep(period);
            match feed.try_send(Instant::now()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => trace!(channel = feed.id(), "Tick dropped"),
                Err(TrySendError::Closed(_)) => break,
            }
        });

        Self { channel }
    }

    /// Receive side of the tick channel
    pub fn receiver(&self) -> RecvOnly<Instant> {
        self.channel.receiver()
    }

    /// Stop ticking; receivers drain the last tick and then see the close
    pub fn stop(&self) {
        // Only the ticker closes this channel
        if !self.channel.is_closed() {
            let _ = self.channel.close();
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}
