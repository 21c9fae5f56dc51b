//! WebSocket close codes and canonical reason strings used by the relay.

/// Frame too short, bad opcode, or a malformed relay sub-op.
pub const CLOSE_PROTOCOL_ERROR: u16 = 1002;
/// Opcode other than binary or text.
pub const CLOSE_UNSUPPORTED: u16 = 1003;
/// Reserved for future backpressure signaling; unused by the current
/// dispatcher but kept as a named constant since clients may special-case it.
pub const CLOSE_TRY_AGAIN_LATER: u16 = 1013;
/// A claim (relay op 3) displaced this session's `userId`.
pub const CLOSE_USERID_TAKEN: u16 = 4001;

/// Reason text sent alongside [`CLOSE_PROTOCOL_ERROR`] for an oversized
/// first-frame channel name.
pub const REASON_CHANNEL_LENGTH_EXCEEDED: &str = "Channel Length Exceeded";
/// Reason text for undersized binary/text frames and malformed relay ops.
pub const REASON_PROTOCOL_VIOLATION: &str = "Protocol Violation";
/// Reason text for any opcode other than binary/text.
pub const REASON_TYPE_UNSUPPORTED: &str = "Type Unsupported";
/// Reason text sent to an evicted occupant on relay op 3 (claim).
pub const REASON_USERID_TAKEN: &str = "UserID Taken";
