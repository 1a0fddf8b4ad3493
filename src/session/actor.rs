//! Session Actor
//!
//! Every phonebook command and access reply of one Hands-Free session is
//! processed by a single task, one event at a time. Responses are forwarded to
//! the transport through an outbound channel in the order they were produced.
//!
//! ## Session Lifecycle
//!
//! ```text
//! 1. spawn_session()
//!        │
//!        ▼
//! 2. ┌──────────────────────────────┐
//!    │      Main Loop               │
//!    │                              │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Receive SessionEvent    │ │
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Run it on AtPhonebook   │ │
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Forward responses       │ │
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │         [Loop back]          │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 3. All handles dropped / transport gone
//!        │
//!        ▼
//! 4. Cached results released, task ends
//! ```

use crate::access::{AccessReply, PeerAddress};
use crate::commands::AtPhonebook;
use crate::protocol::{AtCommand, AtResponse};
use bytes::Bytes;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Events queued for a session before senders wait
pub const EVENT_QUEUE_DEPTH: usize = 64;

/// Input to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A tokenized AT command from the peer
    Command { peer: PeerAddress, command: AtCommand },
    /// The user's phonebook access decision for `peer`
    AccessReply { peer: PeerAddress, reply: AccessReply },
    /// The service level connection was torn down
    Reset,
}

/// A response on its way to a peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionResponse {
    pub peer: PeerAddress,
    pub response: AtResponse,
}

impl SessionResponse {
    /// Wire bytes of the response.
    pub fn to_bytes(&self) -> Bytes {
        self.response.serialize()
    }
}

/// Statistics for a session
#[derive(Debug, Default)]
pub struct SessionStats {
    /// Total commands processed
    pub commands_processed: AtomicU64,
    /// Access replies received, including ignored ones
    pub access_replies: AtomicU64,
    /// Responses forwarded to the transport
    pub responses_sent: AtomicU64,
    /// Total bytes forwarded
    pub bytes_sent: AtomicU64,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn access_reply(&self) {
        self.access_replies.fetch_add(1, Ordering::Relaxed);
    }

    pub fn response_sent(&self, bytes: usize) {
        self.responses_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }
}

/// Errors that can occur while talking to a session.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    /// The session task is gone
    #[error("Session closed")]
    Closed,

    /// Nobody is receiving responses anymore
    #[error("Response channel closed")]
    ResponsesClosed,
}

/// Sends events to a running session. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    events: mpsc::Sender<SessionEvent>,
}

impl SessionHandle {
    /// Queues an event, waiting if the session is behind.
    pub async fn send(&self, event: SessionEvent) -> Result<(), SessionError> {
        self.events.send(event).await.map_err(|_| SessionError::Closed)
    }

    pub async fn command(&self, peer: PeerAddress, command: AtCommand) -> Result<(), SessionError> {
        self.send(SessionEvent::Command { peer, command }).await
    }

    pub async fn access_reply(&self, peer: PeerAddress, reply: AccessReply) -> Result<(), SessionError> {
        self.send(SessionEvent::AccessReply { peer, reply }).await
    }

    pub async fn reset(&self) -> Result<(), SessionError> {
        self.send(SessionEvent::Reset).await
    }

    /// Returns true once the session task has stopped.
    pub fn is_closed(&self) -> bool {
        self.events.is_closed()
    }
}

/// Runs one phonebook handler as a serialized event loop.
pub struct Session {
    /// The phonebook command handler owned by this session
    handler: AtPhonebook,

    /// Incoming events
    events: mpsc::Receiver<SessionEvent>,

    /// Outgoing responses
    responses: mpsc::Sender<SessionResponse>,

    /// Session statistics (shared)
    stats: Arc<SessionStats>,
}

impl Session {
    /// Creates a session and the handle feeding it.
    pub fn new(
        handler: AtPhonebook,
        responses: mpsc::Sender<SessionResponse>,
        stats: Arc<SessionStats>,
    ) -> (Self, SessionHandle) {
        let (tx, events) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let session = Self {
            handler,
            events,
            responses,
            stats,
        };
        (session, SessionHandle { events: tx })
    }

    /// Runs the event loop until every handle is dropped or the response
    /// channel closes. Cached results are released on the way out.
    pub async fn run(mut self) -> Result<(), SessionError> {
        info!("Phonebook session started");

        let result = self.main_loop().await;
        self.handler.cleanup();

        match &result {
            Ok(()) => info!("Phonebook session ended"),
            Err(e) => warn!(error = %e, "Phonebook session ended with error"),
        }
        result
    }

    async fn main_loop(&mut self) -> Result<(), SessionError> {
        while let Some(event) = self.events.recv().await {
            match event {
                SessionEvent::Command { peer, command } => {
                    let responses = self.handler.execute(&peer, &command);
                    self.stats.command_processed();
                    self.forward(peer, responses).await?;
                }
                SessionEvent::AccessReply { peer, reply } => {
                    let responses = self.handler.handle_access_reply(&peer, reply);
                    self.stats.access_reply();
                    self.forward(peer, responses).await?;
                }
                SessionEvent::Reset => self.handler.reset_at_state(),
            }
        }
        debug!("All session handles dropped");
        Ok(())
    }

    async fn forward(&mut self, peer: PeerAddress, responses: Vec<AtResponse>) -> Result<(), SessionError> {
        for response in responses {
            let out = SessionResponse { peer, response };
            let bytes = out.response.serialize().len();
            self.responses
                .send(out)
                .await
                .map_err(|_| SessionError::ResponsesClosed)?;
            self.stats.response_sent(bytes);
            trace!(peer = %peer, bytes, "Sent response");
        }
        Ok(())
    }
}

/// Spawns a session task for `handler`.
///
/// Returns the handle feeding the session and the task, which resolves once
/// the session ends.
pub fn spawn_session(
    handler: AtPhonebook,
    responses: mpsc::Sender<SessionResponse>,
    stats: Arc<SessionStats>,
) -> (SessionHandle, JoinHandle<Result<(), SessionError>>) {
    let (session, handle) = Session::new(handler, responses, stats);
    let task = tokio::spawn(session.run());
    (handle, task)
}
