//! Frame-address extraction and rewriting (spec §4.4/§4.5).
//!
//! Every binary frame begins with an 8-byte little-endian `userId`; every
//! text frame begins with the same 8 bytes base64-encoded as 12 characters.
//! This is the *target* address on the way in, and gets overwritten in place
//! with the sender's `userId` before the frame is forwarded, so the
//! recipient sees who it came from.

use crate::base64;

/// The reserved target meaning "every session on the sender's channel".
pub const BROADCAST_TARGET: u64 = u64::MAX;
/// The reserved target meaning "the relay-internal sub-protocol handler",
/// and also the sentinel a freshly admitted session's `userId` starts as
/// before it picks (or is assigned) a real one.
pub const RELAY_TARGET: u64 = 0;

/// The always-present channel every session is also a member of. Channel
/// names are raw bytes, not necessarily valid UTF-8 (the first frame's
/// payload is taken verbatim), so this is `&[u8]` rather than `&str`.
pub const GLOBAL_CHANNEL_NAME: &[u8] = b"re_globl";
/// Maximum byte length of a channel name (first frame's address field).
pub const MAX_CHANNEL_NAME_LEN: usize = 16;

/// Distinguishes the two supported WebSocket frame encodings. Any other
/// opcode (ping/pong/close/continuation) is rejected by the caller before
/// this type is ever constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOpcode {
    /// 8-byte raw address prefix.
    Binary,
    /// 12-character base64 address prefix.
    Text,
}

impl FrameOpcode {
    /// Byte length of the address field for this encoding.
    #[must_use]
    pub const fn address_len(self) -> usize {
        match self {
            FrameOpcode::Binary => 8,
            FrameOpcode::Text => 12,
        }
    }

    /// Minimum total frame length that passes the size gate (strictly more
    /// than the bare address, i.e. there is at least one payload byte).
    #[must_use]
    pub const fn min_frame_len(self) -> usize {
        self.address_len() + 1
    }
}

/// Extracts the target `userId` from the front of `frame`.
///
/// Returns `None` if `frame` is shorter than the opcode's address field;
/// callers are expected to have already applied the size gate
/// (`frame.len() >= opcode.min_frame_len()`) so this should not normally
/// happen, but the boundary is untrusted network input and is checked
/// rather than assumed.
#[must_use]
pub fn read_address(frame: &[u8], opcode: FrameOpcode) -> Option<u64> {
    match opcode {
        FrameOpcode::Binary => {
            let bytes: [u8; 8] = frame.get(0..8)?.try_into().ok()?;
            Some(u64::from_le_bytes(bytes))
        }
        FrameOpcode::Text => {
            let prefix = frame.get(0..12)?;
            Some(u64::from_le_bytes(base64::decode(prefix)))
        }
    }
}

/// Overwrites the address field at the front of `frame` with `sender_id`,
/// re-encoding to base64 for text frames. No-op if `frame` is shorter than
/// the address field.
pub fn write_sender_address(frame: &mut [u8], opcode: FrameOpcode, sender_id: u64) {
    match opcode {
        FrameOpcode::Binary => {
            if let Some(slot) = frame.get_mut(0..8) {
                slot.copy_from_slice(&sender_id.to_le_bytes());
            }
        }
        FrameOpcode::Text => {
            if let Some(slot) = frame.get_mut(0..12) {
                slot.copy_from_slice(&base64::encode(&sender_id.to_le_bytes()));
            }
        }
    }
}
