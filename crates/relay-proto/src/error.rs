//! Protocol-level error types.

use thiserror::Error;

/// Errors from parsing the relay-internal sub-protocol body (§4.7).
///
/// Every other malformed case (wrong length, unauthorized level, absent
/// channel/key) is represented as `Ok(None)` by [`crate::relayop::parse_relay_request`]
/// and silently aborted by the caller — only an unrecognized opcode byte is
/// a hard protocol error that closes the connection.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RelayParseError {
    /// Byte 8 did not match any known relay operation.
    #[error("unknown relay opcode")]
    UnknownOpcode,
    /// The relay frame had no opcode byte at all (frame ended at the target).
    #[error("relay frame missing opcode byte")]
    MissingOpcode,
}
