//! Pure wire-format logic for the relay protocol: the 8-byte↔12-char base64
//! address codec, frame address extraction/rewriting, relay-internal
//! sub-protocol parsing, and server-originated reply/event builders.
//!
//! Nothing in this crate performs I/O or holds any connection state — it
//! only transforms byte slices. The stateful pieces (registry, dispatch,
//! reclamation) live in `relay-core`, which depends on this crate.

pub mod address;
pub mod base64;
pub mod close;
pub mod error;
pub mod relayop;
pub mod replies;

pub use address::{FrameOpcode, BROADCAST_TARGET, GLOBAL_CHANNEL_NAME, MAX_CHANNEL_NAME_LEN, RELAY_TARGET};
pub use error::RelayParseError;
pub use relayop::{parse_relay_request, RelayRequest};
