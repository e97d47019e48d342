//! WebSocket transport for the client.
//!
//! Provides [`TransportHandle`] which handles WebSocket I/O for text frames.
//! This is a thin layer that just sends/receives frames - connection logic
//! remains in the Sans-IO [`parley_core::Connection`].
//!
//! Every transport is opened under the [`TransportId`] the connection
//! allocated for it and reports back on a shared event channel tagged with
//! that id, so events from a replaced socket can be told apart and ignored.

use futures::{SinkExt, StreamExt};
use parley_app::TransportEvent;
use parley_core::TransportId;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{
    Message,
    protocol::{CloseFrame, frame::coding::CloseCode},
};

/// Outgoing frames buffered per transport before writes are refused.
const OUTGOING_CAPACITY: usize = 32;

/// Transport events tagged with the transport they belong to.
pub type TransportEvents = mpsc::Sender<(TransportId, TransportEvent)>;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The socket task has exited; nothing can be written.
    #[error("transport {0} is closed")]
    Closed(TransportId),

    /// The outgoing buffer is full.
    #[error("transport {0} is not keeping up with writes")]
    Backpressure(TransportId),
}

enum Command {
    Text(String),
    Close(String),
}

/// Handle to one WebSocket connection attempt.
///
/// Writes go through a bounded channel to an internal task that owns the
/// socket. Dropping the handle closes the socket once queued frames are
/// written.
pub struct TransportHandle {
    id: TransportId,
    to_socket: mpsc::Sender<Command>,
    abort_handle: tokio::task::AbortHandle,
}

impl TransportHandle {
    /// Id the connection allocated for this transport.
    pub fn id(&self) -> TransportId {
        self.id
    }

    /// Queue a text frame without waiting.
    ///
    /// # Errors
    ///
    /// Fails if the socket task is gone or its buffer is full. The frame is
    /// dropped in both cases.
    pub fn write(&self, payload: String) -> Result<(), TransportError> {
        self.to_socket.try_send(Command::Text(payload)).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TransportError::Backpressure(self.id),
            mpsc::error::TrySendError::Closed(_) => TransportError::Closed(self.id),
        })
    }

    /// Send a close frame with `reason` and stop.
    ///
    /// Falls back to aborting the task if it cannot take the request.
    pub fn close(&self, reason: &str) {
        if self.to_socket.try_send(Command::Close(reason.to_string())).is_err() {
            self.abort_handle.abort();
        }
    }

    /// Whether the socket task has exited.
    pub fn is_finished(&self) -> bool {
        self.to_socket.is_closed()
    }
}

/// Start connecting to `url` under `id`.
///
/// Returns immediately. The outcome is reported on `events` as
/// [`TransportEvent::Opened`] or [`TransportEvent::Failed`]. An open
/// transport then reports frames and one terminal `Closed` or `Failed`,
/// except when the handle closed it.
pub fn open(url: &str, id: TransportId, events: TransportEvents) -> TransportHandle {
    let (to_socket, from_handle) = mpsc::channel(OUTGOING_CAPACITY);
    let handle = tokio::spawn(run_connection(url.to_string(), id, from_handle, events));

    TransportHandle { id, to_socket, abort_handle: handle.abort_handle() }
}

/// Run the connection, bridging between channels and the socket.
async fn run_connection(
    url: String,
    id: TransportId,
    mut from_handle: mpsc::Receiver<Command>,
    events: TransportEvents,
) {
    let connected = tokio::select! {
        connected = tokio_tungstenite::connect_async(&url) => connected,
        // Abandoned before the handshake finished
        _ = from_handle.recv() => return,
    };
    let ws_stream = match connected {
        Ok((ws_stream, _)) => ws_stream,
        Err(e) => {
            tracing::warn!(transport = %id, %url, error = %e, "websocket connect failed");
            let _ = events.send((id, TransportEvent::Failed { error: e.to_string() })).await;
            return;
        },
    };

    tracing::debug!(transport = %id, %url, "websocket open");
    if events.send((id, TransportEvent::Opened)).await.is_err() {
        return;
    }

    let (mut ws_write, mut ws_read) = ws_stream.split();

    let terminal = loop {
        tokio::select! {
            command = from_handle.recv() => match command {
                Some(Command::Text(payload)) => {
                    if let Err(e) = ws_write.send(Message::Text(payload.into())).await {
                        break Some(TransportEvent::Failed { error: e.to_string() });
                    }
                },
                Some(Command::Close(reason)) => {
                    let frame = CloseFrame { code: CloseCode::Normal, reason: reason.into() };
                    let _ = ws_write.send(Message::Close(Some(frame))).await;
                    // Closed on request; the owner already knows.
                    break None;
                },
                None => {
                    let _ = ws_write.close().await;
                    break None;
                },
            },

            inbound = ws_read.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    let event = TransportEvent::Frame(text.as_str().to_owned());
                    if events.send((id, event)).await.is_err() {
                        break None;
                    }
                },
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame.map(|f| f.reason.as_str().to_owned()).unwrap_or_default();
                    break Some(TransportEvent::Closed { reason });
                },
                Some(Ok(_)) => {},
                Some(Err(e)) => break Some(TransportEvent::Failed { error: e.to_string() }),
                None => break Some(TransportEvent::Closed { reason: String::new() }),
            },
        }
    };

    if let Some(event) = terminal {
        tracing::info!(transport = %id, ?event, "websocket down");
        let _ = events.send((id, event)).await;
    }
}
