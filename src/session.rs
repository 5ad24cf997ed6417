//! Connection to one participant
//!
//! The room never owns sockets. Whoever hosts it hands in a tunnel finder,
//! a function from participant [`Id`](crate::watcher::Id) to an optional
//! [`Tunnel`], and the room writes through whatever it returns. A missing
//! tunnel means the participant is currently disconnected.

use super::{SyncMessage, UpdateMessage};

/// Trait for sending messages to one connected participant
///
/// Implementations might wrap a WebSocket, a channel sender or a test
/// recorder. Sends are fire-and-forget; a tunnel that can no longer deliver
/// should drop the message silently.
pub trait Tunnel {
    /// Sends an incremental update
    fn send_message(&self, message: &UpdateMessage);

    /// Sends a full view of the current phase
    ///
    /// Used when a participant connects or reconnects.
    fn send_state(&self, state: &SyncMessage);

    /// Closes the connection, after which the participant is disconnected
    fn close(self);
}
