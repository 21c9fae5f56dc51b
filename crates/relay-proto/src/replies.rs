//! Wire builders for server-originated frames: the channel-wide disconnect
//! event and the two relay-internal replies (census, variable-get).

use crate::address::{BROADCAST_TARGET, RELAY_TARGET};

/// Opcode byte identifying a variable-get reply (§4.7 op 5's response).
pub const VARIABLE_REPLY_OPCODE: u8 = 0xC8;

/// Builds the 16-byte frame broadcast to a channel when one of its members
/// disconnects: target = broadcast, payload = the departing `userId`.
#[must_use]
pub fn build_disconnect_event(departing_user_id: u64) -> [u8; 16] {
    let mut out = [0u8; 16];
    out[..8].copy_from_slice(&BROADCAST_TARGET.to_le_bytes());
    out[8..].copy_from_slice(&departing_user_id.to_le_bytes());
    out
}

/// Builds the reply to relay op 2 (census): target = relay, a 4-byte count,
/// then one `{1-byte length, name bytes}` record per channel in `channels`'
/// order, followed by that many 4-byte little-endian population counts in
/// the same order. `channels` is a single materialized snapshot so the name
/// block and the count block can never disagree about ordering or contents.
#[must_use]
pub fn build_census_reply(channels: &[(Vec<u8>, u32)]) -> Vec<u8> {
    let name_bytes: usize = channels.iter().map(|(name, _)| 1 + name.len()).sum();
    let mut out = Vec::with_capacity(8 + 4 + name_bytes + channels.len() * 4);

    out.extend_from_slice(&RELAY_TARGET.to_le_bytes());
    out.extend_from_slice(&(channels.len() as u32).to_le_bytes());

    for (name, _) in channels {
        let len = name.len().min(u8::MAX as usize) as u8;
        out.push(len);
        out.extend_from_slice(&name[..len as usize]);
    }
    for (_, count) in channels {
        out.extend_from_slice(&count.to_le_bytes());
    }

    out
}

/// Builds the reply to relay op 5 (get variable) when no value is set: the
/// 9-byte sentinel `00*8 C8` with no value payload.
#[must_use]
pub fn build_variable_missing_reply() -> [u8; 9] {
    let mut out = [0u8; 9];
    out[8] = VARIABLE_REPLY_OPCODE;
    out
}

/// Builds the reply to relay op 5 when a value is set: target = relay,
/// opcode byte, then the raw value bytes.
#[must_use]
pub fn build_variable_value_reply(value: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(9 + value.len());
    out.extend_from_slice(&RELAY_TARGET.to_le_bytes());
    out.push(VARIABLE_REPLY_OPCODE);
    out.extend_from_slice(value);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disconnect_event_layout() {
        let frame = build_disconnect_event(7);
        assert_eq!(&frame[..8], &[0xFF; 8]);
        assert_eq!(&frame[8..], &7u64.to_le_bytes());
    }

    #[test]
    fn census_reply_empty() {
        let frame = build_census_reply(&[]);
        assert_eq!(frame, vec![0u8; 12]);
    }

    #[test]
    fn census_reply_layout_matches_name_then_count_blocks() {
        let channels = vec![(b"re_globl".to_vec(), 3u32), (b"a".to_vec(), 1u32)];
        let frame = build_census_reply(&channels);
        assert_eq!(&frame[0..8], &[0u8; 8]);
        assert_eq!(&frame[8..12], &2u32.to_le_bytes());
        assert_eq!(frame[12], 8);
        assert_eq!(&frame[13..21], b"re_globl");
        assert_eq!(frame[21], 1);
        assert_eq!(&frame[22..23], b"a");
        assert_eq!(&frame[23..27], &3u32.to_le_bytes());
        assert_eq!(&frame[27..31], &1u32.to_le_bytes());
    }

    #[test]
    fn variable_missing_reply_is_sentinel() {
        let frame = build_variable_missing_reply();
        assert_eq!(frame, [0, 0, 0, 0, 0, 0, 0, 0, 0xC8]);
    }

    #[test]
    fn variable_value_reply_carries_payload() {
        let frame = build_variable_value_reply(b"hello");
        assert_eq!(&frame[..8], &[0u8; 8]);
        assert_eq!(frame[8], 0xC8);
        assert_eq!(&frame[9..], b"hello");
    }
}
