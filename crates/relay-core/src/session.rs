//! Session state and the transport boundary (spec §3/§4.4/§6).
//!
//! A `Session` is reference-counted and its identity *is* its address:
//! sessions are tracked in the registry's sets and maps by pointer, exactly
//! as the original implementation tracked raw `Session*` in concurrent
//! pointer sets. `SessionHandle` gives that pointer identity `Hash`/`Eq` so
//! it can live in ordinary Rust collections.

use std::{
    hash::{Hash, Hasher},
    sync::{
        atomic::{AtomicU64, AtomicU8, Ordering},
        Arc,
    },
};

use relay_proto::FrameOpcode;

/// The transport capability a session needs from whatever accepted it.
///
/// Kept deliberately minimal — relay-core never touches a socket, TLS
/// context, or event loop directly. `relay-server` provides the concrete
/// implementation over a WebSocket connection.
pub trait ConnectionHandle: Send + Sync {
    /// Sends `payload` to the peer, framed with the given opcode.
    fn send(&self, opcode: FrameOpcode, payload: &[u8]);

    /// Closes the connection with a close code and human-readable reason.
    fn close(&self, code: u16, reason: &str);
}

/// Authentication level for the relay-internal sub-protocol (§4.7). Every op
/// except `Authenticate` itself requires `Authenticated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthLevel {
    /// Has not presented a valid credential via relay op 0.
    Unauthenticated = 0,
    /// Presented a valid credential; may use relay ops 1-5.
    Authenticated = 1,
}

/// A single admitted connection.
///
/// `channel` is fixed for the session's lifetime (assigned during admission,
/// §4.4) — only `user_id`, `auth_level`, and `listener_mask` ever change
/// after that, and all three are independently atomic so readers never need
/// to lock a session to inspect it.
pub struct Session {
    channel: Vec<u8>,
    user_id: AtomicU64,
    auth_level: AtomicU8,
    listener_mask: AtomicU8,
    transport: Box<dyn ConnectionHandle>,
}

impl Session {
    /// Builds a freshly admitted session, addressed as the relay sentinel
    /// (`0`) until it claims or is assigned a real `userId`.
    ///
    /// `channel` is raw bytes, not necessarily valid UTF-8: the admission
    /// protocol takes the first frame's payload verbatim as the channel
    /// name (spec §4.4).
    pub fn new(channel: Vec<u8>, transport: Box<dyn ConnectionHandle>) -> Self {
        Self {
            channel,
            user_id: AtomicU64::new(relay_proto::RELAY_TARGET),
            auth_level: AtomicU8::new(AuthLevel::Unauthenticated as u8),
            listener_mask: AtomicU8::new(0),
            transport,
        }
    }

    /// The channel assigned at admission. Never changes afterward.
    #[must_use]
    pub fn channel(&self) -> &[u8] {
        &self.channel
    }

    /// The session's current address. `0` until assigned or claimed.
    #[must_use]
    pub fn user_id(&self) -> u64 {
        self.user_id.load(Ordering::SeqCst)
    }

    /// Overwrites the session's address.
    pub fn set_user_id(&self, id: u64) {
        self.user_id.store(id, Ordering::SeqCst);
    }

    /// The session's current relay-internal auth level.
    #[must_use]
    pub fn auth_level(&self) -> AuthLevel {
        match self.auth_level.load(Ordering::SeqCst) {
            1 => AuthLevel::Authenticated,
            _ => AuthLevel::Unauthenticated,
        }
    }

    /// Marks the session authenticated (relay op 0 with a valid credential).
    pub fn set_authenticated(&self) {
        self.auth_level.store(AuthLevel::Authenticated as u8, Ordering::SeqCst);
    }

    /// Whether any listener flag is set.
    #[must_use]
    pub fn is_listener(&self) -> bool {
        self.listener_mask.load(Ordering::SeqCst) != 0
    }

    /// The session's current listener bitmask (relay op 1).
    #[must_use]
    pub fn listener_mask(&self) -> u8 {
        self.listener_mask.load(Ordering::SeqCst)
    }

    /// Sets the session's listener bitmask.
    pub fn set_listener_mask(&self, mask: u8) {
        self.listener_mask.store(mask, Ordering::SeqCst);
    }

    /// Sends a frame to this session's peer over its transport.
    pub fn send(&self, opcode: FrameOpcode, payload: &[u8]) {
        self.transport.send(opcode, payload);
    }

    /// Closes this session's transport connection.
    pub fn close(&self, code: u16, reason: &str) {
        self.transport.close(code, reason);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("channel", &self.channel)
            .field("user_id", &self.user_id())
            .field("auth_level", &self.auth_level())
            .finish_non_exhaustive()
    }
}

/// A reference-counted `Session` whose `Hash`/`Eq` come from pointer
/// identity rather than field comparison — two handles are equal iff they
/// point at the same session, regardless of its current `userId`.
#[derive(Clone)]
pub struct SessionHandle(
    /// The underlying reference-counted session.
    pub Arc<Session>,
);

impl SessionHandle {
    /// Wraps a new session in a reference-counted, identity-comparable handle.
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self(Arc::new(session))
    }
}

impl std::ops::Deref for SessionHandle {
    type Target = Session;

    fn deref(&self) -> &Session {
        &self.0
    }
}

impl PartialEq for SessionHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for SessionHandle {}

impl Hash for SessionHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as *const () as usize).hash(state);
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
