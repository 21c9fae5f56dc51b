//! Dispatcher-level error types.

use thiserror::Error;

/// Errors from admitting a freshly connected session (spec §4.4 step 1).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionError {
    /// The first frame's payload (the requested channel name) exceeded
    /// [`relay_proto::MAX_CHANNEL_NAME_LEN`] bytes.
    #[error("channel name exceeds {} bytes", relay_proto::MAX_CHANNEL_NAME_LEN)]
    ChannelNameTooLong,
}

/// Errors from dispatching a frame on an already-admitted session (spec §7).
///
/// Every variant here causes the caller to invalidate and close the
/// session — there's nothing else a correct client can do once one of these
/// fires, matching the original implementation's close-on-violation policy.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// Frame shorter than its opcode's minimum length (size gate, §4.5).
    #[error("frame shorter than the minimum length for its opcode")]
    FrameTooShort,
    /// A relay-internal frame (target `0`) had no opcode byte, or an
    /// opcode outside `0..=5`.
    #[error("malformed relay-internal request")]
    MalformedRelayRequest,
}
