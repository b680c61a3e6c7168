//! Poll-based WebSocket client on top of `tungstenite`.
//!
//! The socket stays blocking, but every read is bounded by a read timeout
//! derived from the poll deadline, so a silent peer can never wedge the
//! polling thread.

use std::collections::VecDeque;
use std::io::ErrorKind;
use std::net::TcpStream;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

use crate::error::TransportError;
use crate::transport::{ConnectionState, Transport};

type WsStream = WebSocket<MaybeTlsStream<TcpStream>>;

/// Upper bound on how long `close` waits for the peer to finish the close
/// handshake.
const CLOSE_DRAIN: Duration = Duration::from_millis(250);

pub struct WebSocketTransport {
    url: String,
    socket: WsStream,
    state: ConnectionState,
    received: VecDeque<String>,
}

impl WebSocketTransport {
    pub fn connect(url: &str) -> Result<Self, TransportError> {
        let (socket, response) = tungstenite::connect(url)
            .map_err(|source| TransportError::Connect { url: url.to_string(), source })?;
        info!(%url, status = %response.status(), "WebSocket connected");
        Ok(Self {
            url: url.to_string(),
            socket,
            state: ConnectionState::Open,
            received: VecDeque::new(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn set_read_timeout(&self, timeout: Duration) -> Result<(), TransportError> {
        if let MaybeTlsStream::Plain(stream) = self.socket.get_ref() {
            stream.set_read_timeout(Some(timeout))?;
        }
        Ok(())
    }
}

impl Transport for WebSocketTransport {
    fn state(&self) -> ConnectionState {
        self.state
    }

    fn poll(&mut self, timeout: Duration) -> Result<(), TransportError> {
        if self.state == ConnectionState::Closed {
            return Err(TransportError::Closed);
        }
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(());
            }
            self.set_read_timeout(remaining)?;
            match self.socket.read() {
                Ok(Message::Text(text)) => self.received.push_back(text),
                Ok(Message::Binary(data)) => {
                    self.received.push_back(String::from_utf8_lossy(&data).into_owned())
                }
                Ok(Message::Close(frame)) => {
                    debug!(?frame, url = %self.url, "Peer started close handshake");
                    self.state = ConnectionState::Closing;
                }
                // Pings are answered by tungstenite on the next read or write.
                Ok(_) => {}
                Err(tungstenite::Error::Io(e))
                    if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    return Ok(());
                }
                Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                    self.state = ConnectionState::Closed;
                    return Ok(());
                }
                Err(e) => {
                    self.state = ConnectionState::Closed;
                    return Err(e.into());
                }
            }
        }
    }

    fn dispatch(&mut self, on_message: &mut dyn FnMut(String)) {
        for message in self.received.drain(..) {
            on_message(message);
        }
    }

    fn send(&mut self, message: &str) -> Result<(), TransportError> {
        if self.state != ConnectionState::Open {
            return Err(TransportError::Closed);
        }
        self.socket.send(Message::Text(message.to_owned()))?;
        Ok(())
    }

    fn close(&mut self) {
        if self.state == ConnectionState::Closed {
            return;
        }
        if let Err(e) = self.socket.close(None) {
            debug!(error = ?e, "Close frame not sent");
        }
        self.state = ConnectionState::Closing;

        let deadline = Instant::now() + CLOSE_DRAIN;
        while self.state != ConnectionState::Closed {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!(url = %self.url, "Peer did not finish close handshake in time");
                break;
            }
            if let Err(e) = self.poll(remaining) {
                debug!(error = ?e, "Error while draining closed connection");
                break;
            }
        }
        self.received.clear();
        self.state = ConnectionState::Closed;
    }
}
