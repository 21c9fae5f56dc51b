//! An in-memory [`ConnectionHandle`] that records everything sent to it,
//! for asserting on what a session would have received without an actual
//! socket.

use std::sync::Mutex;

use relay_core::ConnectionHandle;
use relay_proto::address::FrameOpcode;

/// One frame or close event recorded by a [`FakeTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    /// A frame sent to the peer.
    Sent {
        /// The frame's encoding.
        opcode: FrameOpcode,
        /// The frame's raw bytes (address included).
        payload: Vec<u8>,
    },
    /// The transport was closed.
    Closed {
        /// WebSocket close code.
        code: u16,
        /// Close reason string.
        reason: String,
    },
}

/// Records every [`ConnectionHandle::send`]/`close` call in order.
#[derive(Default)]
pub struct FakeTransport {
    log: Mutex<Vec<Recorded>>,
}

impl FakeTransport {
    /// Builds an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of everything recorded so far, in call order.
    #[must_use]
    pub fn log(&self) -> Vec<Recorded> {
        self.log.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }

    /// Whether [`ConnectionHandle::close`] was ever called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.log().iter().any(|event| matches!(event, Recorded::Closed { .. }))
    }
}

impl ConnectionHandle for FakeTransport {
    fn send(&self, opcode: FrameOpcode, payload: &[u8]) {
        self.log
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(Recorded::Sent { opcode, payload: payload.to_vec() });
    }

    fn close(&self, code: u16, reason: &str) {
        self.log
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(Recorded::Closed { code, reason: reason.to_string() });
    }
}
