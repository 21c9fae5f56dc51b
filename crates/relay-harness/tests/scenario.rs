//! End-to-end scenarios, one per spec §8 "End-to-end scenarios" entry.
//!
//! Each test drives `relay-core::dispatch` directly against a real
//! `Registry`, using `FakeTransport`/`SimEnv` from this crate instead of a
//! live socket, and asserts on exactly the wire-level outcome the
//! scenario describes.

use std::sync::Arc;

use relay_core::{dispatch, Credentials, Registry};
use relay_harness::{FakeTransport, RegistrySnapshot};
use relay_proto::{FrameOpcode, BROADCAST_TARGET};

fn admit(registry: &Registry, env: &relay_harness::SimEnv, channel: &[u8]) -> (relay_core::SessionHandle, Arc<FakeTransport>) {
    let transport = Arc::new(FakeTransport::new());
    struct Forwarding(Arc<FakeTransport>);
    impl relay_core::ConnectionHandle for Forwarding {
        fn send(&self, opcode: FrameOpcode, payload: &[u8]) {
            self.0.send(opcode, payload);
        }
        fn close(&self, code: u16, reason: &str) {
            self.0.close(code, reason);
        }
    }
    let session = dispatch::admit_session(registry, env, channel, Box::new(Forwarding(transport.clone()))).unwrap();
    (session, transport)
}

fn sent_payloads(transport: &FakeTransport) -> Vec<Vec<u8>> {
    transport
        .log()
        .into_iter()
        .filter_map(|event| match event {
            relay_harness::Recorded::Sent { payload, .. } => Some(payload),
            relay_harness::Recorded::Closed { .. } => None,
        })
        .collect()
}

#[test]
fn scenario_1_admission() {
    let registry = Registry::new();
    let env = relay_harness::SimEnv::new(1);

    let (a, transport) = admit(&registry, &env, b"room");

    let sent = sent_payloads(&transport);
    assert_eq!(sent.len(), 1);
    assert_eq!(u64::from_le_bytes(sent[0].clone().try_into().unwrap()), a.user_id());
    assert_eq!(registry.members_of(b"room"), vec![a]);
}

#[test]
fn scenario_2_private_message() {
    let registry = Registry::new();
    let credentials = Credentials::new(vec![]);
    let env = relay_harness::SimEnv::new(2);

    let (a, a_transport) = admit(&registry, &env, b"room");
    let (b, b_transport) = admit(&registry, &env, b"room2");

    let mut frame = Vec::new();
    frame.extend_from_slice(&b.user_id().to_le_bytes());
    frame.extend_from_slice(b"hi");

    dispatch::dispatch_frame(&registry, &credentials, &a, FrameOpcode::Binary, &mut frame).unwrap();

    let b_sent = sent_payloads(&b_transport);
    assert_eq!(b_sent.len(), 1);
    assert_eq!(&b_sent[0][..8], &a.user_id().to_le_bytes());
    assert_eq!(&b_sent[0][8..], b"hi");

    // A only ever saw its own admission reply.
    assert_eq!(sent_payloads(&a_transport).len(), 1);
}

#[test]
fn scenario_3_broadcast_with_listener() {
    let registry = Registry::new();
    let credentials = Credentials::new(vec![]);
    let env = relay_harness::SimEnv::new(3);

    let (a, a_transport) = admit(&registry, &env, b"room");
    let (_c, c_transport) = admit(&registry, &env, b"room");
    let (l, l_transport) = admit(&registry, &env, relay_proto::GLOBAL_CHANNEL_NAME);
    l.set_listener_mask(0b001);

    let mut frame = Vec::new();
    frame.extend_from_slice(&BROADCAST_TARGET.to_le_bytes());
    frame.extend_from_slice(b"hi");

    dispatch::dispatch_frame(&registry, &credentials, &a, FrameOpcode::Binary, &mut frame).unwrap();

    let c_sent = sent_payloads(&c_transport);
    assert_eq!(c_sent.len(), 1);
    assert_eq!(&c_sent[0][..8], &a.user_id().to_le_bytes());
    assert_eq!(&c_sent[0][8..], b"hi");

    let l_sent = sent_payloads(&l_transport);
    assert_eq!(l_sent.len(), 1);
    assert_eq!(&l_sent[0][8..], b"hi");

    // A's admission reply is the only thing it ever received.
    assert_eq!(sent_payloads(&a_transport).len(), 1);
}

#[test]
fn scenario_4_authenticate_and_query() {
    let registry = Registry::new();
    let credentials = Credentials::new(vec![b"hunter2".to_vec()]);
    let env = relay_harness::SimEnv::new(4);

    let (_a, _) = admit(&registry, &env, b"room");
    let (l, l_transport) = admit(&registry, &env, relay_proto::GLOBAL_CHANNEL_NAME);

    let mut auth = vec![0u8; 8];
    auth.push(0);
    auth.extend_from_slice(b"hunter2");
    dispatch::dispatch_frame(&registry, &credentials, &l, FrameOpcode::Binary, &mut auth).unwrap();

    let mut census = vec![0u8; 8];
    census.push(2);
    dispatch::dispatch_frame(&registry, &credentials, &l, FrameOpcode::Binary, &mut census).unwrap();

    let sent = sent_payloads(&l_transport);
    let reply = sent.last().unwrap();
    assert_eq!(&reply[..8], &[0u8; 8]);
    let count = u32::from_le_bytes(reply[8..12].try_into().unwrap());
    assert_eq!(count as usize, registry.census().len());
}

#[test]
fn scenario_5_userid_claim() {
    let registry = Registry::new();
    let credentials = Credentials::new(vec![b"hunter2".to_vec()]);
    let env = relay_harness::SimEnv::new(5);

    let (a, a_transport) = admit(&registry, &env, b"room");
    let (l, _) = admit(&registry, &env, relay_proto::GLOBAL_CHANNEL_NAME);

    let mut auth = vec![0u8; 8];
    auth.push(0);
    auth.extend_from_slice(b"hunter2");
    dispatch::dispatch_frame(&registry, &credentials, &l, FrameOpcode::Binary, &mut auth).unwrap();

    let a_id = a.user_id();
    let mut claim = vec![0u8; 8];
    claim.push(3);
    claim.extend_from_slice(&a_id.to_le_bytes());
    dispatch::dispatch_frame(&registry, &credentials, &l, FrameOpcode::Binary, &mut claim).unwrap();

    assert!(a_transport.is_closed());
    let closed = a_transport.log().into_iter().find_map(|event| match event {
        relay_harness::Recorded::Closed { code, .. } => Some(code),
        relay_harness::Recorded::Sent { .. } => None,
    });
    assert_eq!(closed, Some(relay_proto::close::CLOSE_USERID_TAKEN));
    assert_eq!(registry.by_user_id(a_id), Some(l));
}

#[test]
fn scenario_6_disconnect_event() {
    let registry = Registry::new();
    let env = relay_harness::SimEnv::new(6);

    let (a, _) = admit(&registry, &env, b"room");
    let (_b, b_transport) = admit(&registry, &env, b"room");
    let (l, l_transport) = admit(&registry, &env, relay_proto::GLOBAL_CHANNEL_NAME);
    l.set_listener_mask(0b100);

    let a_id = a.user_id();
    dispatch::handle_disconnect(&registry, &a);

    for transport in [&b_transport, &l_transport] {
        let sent = sent_payloads(transport);
        let event = sent.last().unwrap();
        assert_eq!(event.len(), 16);
        assert_eq!(&event[..8], &BROADCAST_TARGET.to_le_bytes());
        assert_eq!(&event[8..], &a_id.to_le_bytes());
    }

    let snapshot = RegistrySnapshot::capture(&registry);
    assert!(relay_harness::check_standard(&snapshot).is_empty());
}

#[test]
fn channel_name_boundary_16_admits_17_rejects() {
    let registry = Registry::new();
    let env = relay_harness::SimEnv::new(7);

    let (_ok, ok_transport) = admit(&registry, &env, &[b'x'; 16]);
    assert!(!ok_transport.is_closed());

    let transport = Arc::new(FakeTransport::new());
    struct Forwarding(Arc<FakeTransport>);
    impl relay_core::ConnectionHandle for Forwarding {
        fn send(&self, opcode: FrameOpcode, payload: &[u8]) {
            self.0.send(opcode, payload);
        }
        fn close(&self, code: u16, reason: &str) {
            self.0.close(code, reason);
        }
    }
    let result = dispatch::admit_session(&registry, &env, &[b'x'; 17], Box::new(Forwarding(transport.clone())));
    assert!(result.is_err());
    assert!(transport.is_closed());
}

#[test]
fn unauthenticated_set_then_get_variable_round_trips() {
    let registry = Registry::new();
    let credentials = Credentials::new(vec![]);
    let env = relay_harness::SimEnv::new(8);

    let (client, transport) = admit(&registry, &env, b"room");
    assert_eq!(client.auth_level(), relay_core::AuthLevel::Unauthenticated);

    let mut set = vec![0u8; 8];
    set.push(4);
    set.push(1);
    set.extend_from_slice(b"k");
    set.extend_from_slice(b"hello");
    dispatch::dispatch_frame(&registry, &credentials, &client, FrameOpcode::Binary, &mut set).unwrap();

    let mut get = vec![0u8; 8];
    get.push(5);
    get.extend_from_slice(b"k");
    dispatch::dispatch_frame(&registry, &credentials, &client, FrameOpcode::Binary, &mut get).unwrap();

    let sent = sent_payloads(&transport);
    let reply = sent.last().unwrap();
    assert_eq!(&reply[..8], &[0u8; 8]);
    assert_eq!(reply[8], 0xC8);
    assert_eq!(&reply[9..], b"hello");
}
