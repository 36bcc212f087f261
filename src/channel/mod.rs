/*!
 * Channel Module
 * Typed channels, multi-way selection and timer-fed channels
 */

pub mod channel;
pub mod select;
pub mod timer;
pub mod types;

// Re-export public API
pub use channel::{Channel, IntoIter, Iter, RecvEnd, RecvOnly, SendEnd, SendOnly};
pub use select::Selector;
pub use timer::{after, Ticker};
pub use types::{
    ChannelStats, CloseError, SelectError, Selected, SendError, TryRecvError, TrySendError,
};
