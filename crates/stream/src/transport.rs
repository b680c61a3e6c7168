use std::time::Duration;

use crate::error::TransportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Message-oriented connection driven by a single polling thread.
///
/// Implementations are not required to be thread-safe beyond `Send`: the
/// producer moves its transport into the polling thread and is the only one
/// that ever touches it.
pub trait Transport: Send {
    fn state(&self) -> ConnectionState;

    /// Performs at most one round of I/O lasting no longer than `timeout`,
    /// buffering any messages that arrive.
    fn poll(&mut self, timeout: Duration) -> Result<(), TransportError>;

    /// Hands every message buffered by [`poll`](Self::poll) to `on_message`,
    /// once each, in arrival order.
    fn dispatch(&mut self, on_message: &mut dyn FnMut(String));

    fn send(&mut self, message: &str) -> Result<(), TransportError>;

    /// Starts the close handshake and drains whatever is left on the wire.
    fn close(&mut self);
}
