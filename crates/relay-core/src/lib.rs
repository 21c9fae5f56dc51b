//! Concurrent relay data plane: the session registry, dispatcher, and
//! reclamation gate that sit behind whatever transport `relay-server`
//! terminates WebSocket connections with.
//!
//! `relay-proto` owns the wire format; this crate owns the state machine
//! and concurrency story built on top of it.

pub mod dispatch;
pub mod env;
pub mod error;
pub mod prng;
pub mod reclaim;
pub mod registry;
pub mod session;

pub use dispatch::{admit_session, dispatch_frame, handle_disconnect, Credentials, ListenerFlag};
pub use env::{Environment, SystemEnv};
pub use error::{AdmissionError, DispatchError};
pub use reclaim::{ReclaimGate, ReclaimGuard};
pub use registry::{ChannelCensusEntry, Registry, RemovalOutcome};
pub use session::{AuthLevel, ConnectionHandle, Session, SessionHandle};
