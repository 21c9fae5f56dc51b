//! Relay-internal sub-protocol (spec §4.7): parsing of requests sent to the
//! reserved target `0`.
//!
//! The body passed to [`parse_relay_request`] is the frame with its 8-byte
//! target address already stripped — byte 0 of `body` is the opcode, the
//! rest are operands. A length mismatch or out-of-range operand for a known
//! opcode is not a protocol error: the caller silently aborts the request
//! and keeps the connection open. Only an opcode outside 0..=5 is a hard
//! protocol error.

use crate::error::RelayParseError;

/// A parsed relay-internal request, borrowing its variable-length operands
/// from the original frame buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayRequest<'a> {
    /// Op 0: present one of the server's configured credentials.
    Authenticate {
        /// The presented credential bytes, 1..24 bytes long.
        password: &'a [u8],
    },
    /// Op 1: set this session's listener bitmask (requires auth level ≥ 1).
    SetListenerMode {
        /// New listener bitmask.
        mask: u8,
    },
    /// Op 2: request a census of all channels and their populations
    /// (requires auth level ≥ 1).
    Census,
    /// Op 3: claim a specific `userId`, evicting any current holder
    /// (requires auth level ≥ 1).
    ClaimUserId {
        /// The `userId` to claim.
        user_id: u64,
    },
    /// Op 4: set a channel-scoped variable (no auth requirement).
    SetVariable {
        /// Variable name, 1..=255 bytes.
        key: &'a [u8],
        /// Variable value, any length including empty.
        value: &'a [u8],
    },
    /// Op 5: read a channel-scoped variable (no auth requirement).
    GetVariable {
        /// Variable name to look up.
        key: &'a [u8],
    },
}

impl RelayRequest<'_> {
    /// Whether this request requires the session to already be authenticated.
    ///
    /// Only ops 1-3 (listener mode, census, claim) are gated; op 4/5
    /// (channel variables) carry no auth requirement (spec §4.7).
    #[must_use]
    pub const fn requires_auth(&self) -> bool {
        matches!(self, RelayRequest::SetListenerMode { .. } | RelayRequest::Census | RelayRequest::ClaimUserId { .. })
    }
}

/// Parses a relay-internal request body. See the module docs for what
/// `Ok(None)` vs. `Err` mean.
pub fn parse_relay_request(body: &[u8]) -> Result<Option<RelayRequest<'_>>, RelayParseError> {
    let &opcode = body.first().ok_or(RelayParseError::MissingOpcode)?;
    let operands = &body[1..];

    match opcode {
        0 => {
            let k = operands.len();
            Ok((1..24).contains(&k).then_some(RelayRequest::Authenticate { password: operands }))
        }
        1 => Ok((operands.len() == 1).then(|| RelayRequest::SetListenerMode { mask: operands[0] })),
        2 => Ok(operands.is_empty().then_some(RelayRequest::Census)),
        3 => Ok(<[u8; 8]>::try_from(operands)
            .ok()
            .map(|bytes| RelayRequest::ClaimUserId { user_id: u64::from_le_bytes(bytes) })),
        4 => Ok(parse_set_variable(operands)),
        5 => Ok((!operands.is_empty()).then_some(RelayRequest::GetVariable { key: operands })),
        _ => Err(RelayParseError::UnknownOpcode),
    }
}

fn parse_set_variable(operands: &[u8]) -> Option<RelayRequest<'_>> {
    let (&key_len, rest) = operands.split_first()?;
    let key_len = key_len as usize;
    if key_len == 0 || rest.len() < key_len {
        return None;
    }
    let (key, value) = rest.split_at(key_len);
    Some(RelayRequest::SetVariable { key, value })
}
