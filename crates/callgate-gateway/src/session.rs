// crates/callgate-gateway/src/session.rs
// ============================================================================
// Module: Session Registry
// Description: Live session tracking for stateful gateway transports.
// Purpose: Own session creation, lookup, and idempotent eviction.
// Dependencies: callgate-config, rand, tokio
// ============================================================================

//! ## Overview
//! A session binds an opaque identifier to one live connection on a stateful
//! transport. The registry is the sole owner of session state; transports
//! hold ids, never mutable references, so a disconnect callback and an
//! in-flight request for the same id cannot race on the session itself.
//! Identifiers come from the operating system RNG and must be unguessable.
//! `remove` is idempotent: whichever of several teardown triggers fires first
//! wins, and the rest are no-ops.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::time::SystemTime;

use callgate_config::ServerTransport;
use rand::RngCore;
use rand::rngs::OsRng;
use thiserror::Error;
use tokio::sync::mpsc;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Number of random bytes in a session identifier.
const SESSION_ID_BYTES: usize = 16;
/// Buffered frames per session stream before senders wait.
pub(crate) const STREAM_CHANNEL_CAPACITY: usize = 16;

// ============================================================================
// SECTION: Types
// ============================================================================

/// One frame pushed onto a session's outbound event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFrame {
    /// Event name on the wire.
    pub event: &'static str,
    /// Serialized event payload.
    pub data: String,
}

/// Snapshot of one live session.
///
/// # Invariants
/// - `id` is unique among live sessions and never reused after removal.
/// - `closed` flips to true exactly once, when the registry evicts the entry.
#[derive(Debug, Clone)]
pub struct Session {
    /// Opaque, unguessable session identifier.
    pub id: String,
    /// Transport the session was established on.
    pub transport: ServerTransport,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Whether the session has been evicted.
    pub closed: bool,
    /// Outbound event stream, when one is attached.
    stream: Option<mpsc::Sender<StreamFrame>>,
}

impl Session {
    /// Returns whether an outbound stream is attached.
    #[must_use]
    pub const fn has_stream(&self) -> bool {
        self.stream.is_some()
    }

    /// Pushes a frame onto the session's outbound stream.
    ///
    /// # Errors
    ///
    /// Returns [`StreamPushError`] when no stream is attached or the
    /// receiving side is gone.
    pub async fn push(&self, frame: StreamFrame) -> Result<(), StreamPushError> {
        let sender = self.stream.as_ref().ok_or(StreamPushError::NoStream)?;
        sender.send(frame).await.map_err(|_| StreamPushError::Disconnected)
    }
}

/// Failure pushing a frame onto a session stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StreamPushError {
    /// The session has no attached stream.
    #[error("session has no attached stream")]
    NoStream,
    /// The stream receiver has been dropped.
    #[error("session stream disconnected")]
    Disconnected,
}

/// Failure attaching a stream to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StreamAttachError {
    /// No session with the given id is live.
    #[error("session not found")]
    NotFound,
    /// The session already has an attached stream.
    #[error("session stream already attached")]
    AlreadyAttached,
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Registry owning all live sessions.
///
/// # Invariants
/// - All mutation happens under one mutex; lookups return clones.
/// - No two live sessions share an identifier.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    /// Live sessions keyed by identifier.
    sessions: Mutex<BTreeMap<String, Session>>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session without an outbound stream.
    #[must_use]
    pub fn create(&self, transport: ServerTransport) -> Session {
        self.insert(transport, None)
    }

    /// Creates a session with an outbound stream attached from the start.
    #[must_use]
    pub fn create_with_stream(
        &self,
        transport: ServerTransport,
        sender: mpsc::Sender<StreamFrame>,
    ) -> Session {
        self.insert(transport, Some(sender))
    }

    /// Looks up a session by id, returning a snapshot.
    #[must_use]
    pub fn lookup(&self, id: &str) -> Option<Session> {
        self.lock().get(id).cloned()
    }

    /// Attaches an outbound stream to an existing session.
    ///
    /// # Errors
    ///
    /// Returns [`StreamAttachError`] when the session is unknown or already
    /// has a stream.
    pub fn attach_stream(
        &self,
        id: &str,
        sender: mpsc::Sender<StreamFrame>,
    ) -> Result<(), StreamAttachError> {
        let mut sessions = self.lock();
        let session = sessions.get_mut(id).ok_or(StreamAttachError::NotFound)?;
        if session.stream.is_some() {
            return Err(StreamAttachError::AlreadyAttached);
        }
        session.stream = Some(sender);
        Ok(())
    }

    /// Detaches the outbound stream from a session, if any.
    ///
    /// Unknown ids are a no-op so stream teardown can race with eviction.
    pub fn detach_stream(&self, id: &str) {
        if let Some(session) = self.lock().get_mut(id) {
            session.stream = None;
        }
    }

    /// Removes a session, returning the evicted entry with `closed` set.
    ///
    /// Idempotent: removing an id that is not live returns `None` and leaves
    /// every other session untouched.
    pub fn remove(&self, id: &str) -> Option<Session> {
        let mut session = self.lock().remove(id)?;
        session.closed = true;
        Some(session)
    }

    /// Returns the number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns whether no sessions are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Returns the identifiers of all live sessions, in id order.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    /// Inserts a freshly generated session.
    fn insert(
        &self,
        transport: ServerTransport,
        stream: Option<mpsc::Sender<StreamFrame>>,
    ) -> Session {
        let mut sessions = self.lock();
        let mut id = generate_session_id();
        // OsRng collisions are not expected; the loop preserves uniqueness anyway.
        while sessions.contains_key(&id) {
            id = generate_session_id();
        }
        let session = Session {
            id: id.clone(),
            transport,
            created_at: SystemTime::now(),
            closed: false,
            stream,
        };
        sessions.insert(id, session.clone());
        session
    }

    /// Locks the session map, recovering from a poisoned mutex.
    ///
    /// A poisoned lock means a writer panicked mid-update; the map itself
    /// stays structurally consistent, so continuing is safe.
    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Generates an unguessable session identifier from the OS RNG.
fn generate_session_id() -> String {
    let mut bytes = [0u8; SESSION_ID_BYTES];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

// ============================================================================
// SECTION: Cleanup Guards
// ============================================================================

/// Drop guard that evicts a session exactly once.
///
/// Attached to the resource whose teardown should end the session (an SSE
/// response stream). Whichever of client close, stream error, or request
/// error drops the guard first performs the removal; later triggers hit the
/// idempotent `remove` and become no-ops.
#[derive(Debug)]
pub struct SessionCleanup {
    /// Registry owning the session.
    registry: Arc<SessionRegistry>,
    /// Identifier of the session to evict.
    id: String,
}

impl SessionCleanup {
    /// Creates a cleanup guard for the given session.
    #[must_use]
    pub const fn new(registry: Arc<SessionRegistry>, id: String) -> Self {
        Self {
            registry,
            id,
        }
    }
}

impl Drop for SessionCleanup {
    fn drop(&mut self) {
        let _ = self.registry.remove(&self.id);
    }
}

/// Drop guard that detaches a session's outbound stream without evicting it.
///
/// Used by the subscribe-only leg: closing the stream must free the slot for
/// a later subscriber while the session itself stays live until terminated.
#[derive(Debug)]
pub struct StreamDetach {
    /// Registry owning the session.
    registry: Arc<SessionRegistry>,
    /// Identifier of the session whose stream detaches.
    id: String,
}

impl StreamDetach {
    /// Creates a detach guard for the given session.
    #[must_use]
    pub const fn new(registry: Arc<SessionRegistry>, id: String) -> Self {
        Self {
            registry,
            id,
        }
    }
}

impl Drop for StreamDetach {
    fn drop(&mut self) {
        self.registry.detach_stream(&self.id);
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
