//! Frame dispatch: admission, routing, relay-internal ops, and disconnect
//! (spec §4.4-§4.7).
//!
//! Every entry point here calls straight through to a [`Session`]'s
//! transport (`send`/`close`) rather than returning a list of actions for a
//! caller to execute — the `ConnectionHandle` trait *is* the I/O boundary,
//! so there's no further indirection to add. What each function returns is
//! only ever a `Result` describing whether the session is still valid
//! afterward.

use relay_proto::{
    address::{self, FrameOpcode},
    close, replies,
    relayop::{self, RelayRequest},
    BROADCAST_TARGET, RELAY_TARGET,
};
use tracing::{debug, info};

use crate::{
    env::Environment,
    error::{AdmissionError, DispatchError},
    registry::Registry,
    session::{ConnectionHandle, Session, SessionHandle},
};

/// Valid relay-internal credentials (relay op 0). Presenting any one of
/// these raises the session to `Authenticated`.
pub struct Credentials(Vec<Vec<u8>>);

impl Credentials {
    /// Builds a credential set from a list of accepted passwords.
    #[must_use]
    pub fn new(passwords: Vec<Vec<u8>>) -> Self {
        Self(passwords)
    }

    fn accepts(&self, presented: &[u8]) -> bool {
        self.0.iter().any(|known| known.as_slice() == presented)
    }
}

/// Admits a newly connected transport (spec §4.4).
///
/// `first_frame` is the raw payload of the connection's first frame,
/// interpreted directly as the requested channel name — not base64 decoded,
/// regardless of whether it arrived as a binary or text frame, matching the
/// original protocol's admission step. On success the assigned `userId` has
/// already been sent back to the peer as an 8-byte binary frame.
pub fn admit_session<E: Environment>(
    registry: &Registry,
    env: &E,
    first_frame: &[u8],
    transport: Box<dyn ConnectionHandle>,
) -> Result<SessionHandle, AdmissionError> {
    if first_frame.len() > relay_proto::MAX_CHANNEL_NAME_LEN {
        transport.close(close::CLOSE_PROTOCOL_ERROR, close::REASON_CHANNEL_LENGTH_EXCEEDED);
        return Err(AdmissionError::ChannelNameTooLong);
    }

    let session = SessionHandle::new(Session::new(first_frame.to_vec(), transport));
    let user_id = registry.admit(session.clone(), env);
    session.send(FrameOpcode::Binary, &user_id.to_le_bytes());
    debug!(user_id, channel = ?session.channel(), "session admitted");

    Ok(session)
}

/// Dispatches one frame received from an already-admitted `sender`.
///
/// `frame` is mutable because broadcast and point-to-point routing rewrite
/// the address prefix in place with the sender's `userId` before
/// forwarding, exactly as the original implementation does, to avoid a
/// reallocation per recipient.
pub fn dispatch_frame(
    registry: &Registry,
    credentials: &Credentials,
    sender: &SessionHandle,
    opcode: FrameOpcode,
    frame: &mut [u8],
) -> Result<(), DispatchError> {
    if frame.len() < opcode.min_frame_len() {
        sender.close(close::CLOSE_PROTOCOL_ERROR, close::REASON_PROTOCOL_VIOLATION);
        return Err(DispatchError::FrameTooShort);
    }

    let Some(target) = address::read_address(frame, opcode) else {
        sender.close(close::CLOSE_PROTOCOL_ERROR, close::REASON_PROTOCOL_VIOLATION);
        return Err(DispatchError::FrameTooShort);
    };

    match (target, opcode) {
        (BROADCAST_TARGET, _) => {
            address::write_sender_address(frame, opcode, sender.user_id());
            broadcast(registry, sender, opcode, frame);
            Ok(())
        }
        // The relay-internal sub-protocol only exists on binary frames; a
        // text frame addressed to `0` falls through to the point-to-point
        // branch below and is silently dropped (no session holds userId 0).
        (RELAY_TARGET, FrameOpcode::Binary) => {
            dispatch_relay_op(registry, credentials, sender, &frame[opcode.address_len()..])
        }
        (target, _) => {
            send_point_to_point(registry, sender, opcode, frame, target);
            Ok(())
        }
    }
}

fn broadcast(registry: &Registry, sender: &SessionHandle, opcode: FrameOpcode, frame: &[u8]) {
    if sender.channel() == relay_proto::GLOBAL_CHANNEL_NAME {
        for member in registry.all_sessions() {
            if member != *sender {
                member.send(opcode, frame);
            }
        }
        return;
    }

    for member in registry.members_of(sender.channel()) {
        if member != *sender {
            member.send(opcode, frame);
        }
    }
    for listener in registry.global_listeners() {
        if listener != *sender && listener.listener_mask() & ListenerFlag::ChannelMessage as u8 != 0 {
            listener.send(opcode, frame);
        }
    }
}

fn send_point_to_point(registry: &Registry, sender: &SessionHandle, opcode: FrameOpcode, frame: &mut [u8], target: u64) {
    let Some(recipient) = registry.by_user_id(target) else { return };
    if recipient == *sender {
        return;
    }

    address::write_sender_address(frame, opcode, sender.user_id());
    recipient.send(opcode, frame);

    for listener in registry.global_listeners() {
        if listener != recipient && listener.listener_mask() & ListenerFlag::PrivateMessage as u8 != 0 {
            listener.send(opcode, frame);
        }
    }
}

/// Bits of a session's listener mask (relay op 1), matching the original
/// implementation's `re_spy` flag set.
#[derive(Debug, Clone, Copy)]
#[repr(u8)]
pub enum ListenerFlag {
    /// Receive every message sent to the global channel.
    ChannelMessage = 0b0000_0001,
    /// Receive every private message routed anywhere on the relay.
    PrivateMessage = 0b0000_0010,
    /// Receive every session's disconnect event.
    DisconnectMessage = 0b0000_0100,
}

fn dispatch_relay_op(
    registry: &Registry,
    credentials: &Credentials,
    sender: &SessionHandle,
    body: &[u8],
) -> Result<(), DispatchError> {
    let request = match relayop::parse_relay_request(body) {
        Ok(Some(request)) => request,
        Ok(None) => return Ok(()), // malformed operand for a known opcode: silently ignored
        Err(_) => {
            sender.close(close::CLOSE_PROTOCOL_ERROR, close::REASON_PROTOCOL_VIOLATION);
            return Err(DispatchError::MalformedRelayRequest);
        }
    };

    if request.requires_auth() && sender.auth_level() != crate::session::AuthLevel::Authenticated {
        return Ok(());
    }

    match request {
        RelayRequest::Authenticate { password } => {
            if credentials.accepts(password) {
                sender.set_authenticated();
            }
        }
        RelayRequest::SetListenerMode { mask } => sender.set_listener_mask(mask),
        RelayRequest::Census => {
            let census = registry.census();
            let entries: Vec<_> = census.into_iter().map(|e| (e.name, e.member_count)).collect();
            sender.send(FrameOpcode::Binary, &replies::build_census_reply(&entries));
        }
        RelayRequest::ClaimUserId { user_id } => {
            if let Some(evicted) = registry.claim_user_id(sender, user_id) {
                evicted.close(close::CLOSE_USERID_TAKEN, close::REASON_USERID_TAKEN);
            }
        }
        RelayRequest::SetVariable { key, value } => registry.set_variable(sender.channel(), key, value),
        RelayRequest::GetVariable { key } => {
            let reply = match registry.get_variable(sender.channel(), key) {
                Some(value) => replies::build_variable_value_reply(&value),
                None => replies::build_variable_missing_reply().to_vec(),
            };
            sender.send(FrameOpcode::Binary, &reply);
        }
    }

    Ok(())
}

/// Removes a session and broadcasts its disconnect event (spec §4.6).
///
/// Covers both a genuine peer disconnect and a transport-level error —
/// spec §7 treats the two identically, unlike the original implementation
/// (which silently drops the channel-wide notification on error).
pub fn handle_disconnect(registry: &Registry, departing: &SessionHandle) {
    let outcome = registry.remove(departing);
    let event = replies::build_disconnect_event(departing.user_id());

    for member in &outcome.remaining_in_channel {
        member.send(FrameOpcode::Binary, &event);
    }
    for listener in &outcome.global_listeners {
        if listener != departing && listener.listener_mask() & ListenerFlag::DisconnectMessage as u8 != 0 {
            listener.send(FrameOpcode::Binary, &event);
        }
    }

    info!(user_id = departing.user_id(), channel = ?outcome.channel, "session disconnected");
}
