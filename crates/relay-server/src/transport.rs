//! WebSocket transport: the `ConnectionHandle` implementation and the
//! per-connection read/write loop.
//!
//! [`relay_core::ConnectionHandle::send`]/`close` are synchronous, since
//! dispatch logic holds no executor; outbound frames instead go through an
//! unbounded channel to a dedicated writer task that owns the axum sink,
//! mirroring the teacher's `outbound_streams` pattern of funneling
//! dispatch-originated sends through a channel rather than awaiting I/O
//! from inside dispatch itself.

use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use relay_core::{dispatch, ConnectionHandle, Credentials, ReclaimGate, Registry, SessionHandle, SystemEnv};
use relay_proto::address::FrameOpcode;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// The auto-ping interval the server holds every connection to.
const PING_INTERVAL: std::time::Duration = std::time::Duration::from_secs(15);

enum OutboundCommand {
    Send(FrameOpcode, Vec<u8>),
    Close(u16, String),
}

/// `ConnectionHandle` over a channel into the connection's writer task.
struct WsHandle {
    outbound: mpsc::UnboundedSender<OutboundCommand>,
}

impl ConnectionHandle for WsHandle {
    fn send(&self, opcode: FrameOpcode, payload: &[u8]) {
        let _ = self.outbound.send(OutboundCommand::Send(opcode, payload.to_vec()));
    }

    fn close(&self, code: u16, reason: &str) {
        let _ = self.outbound.send(OutboundCommand::Close(code, reason.to_string()));
    }
}

/// Drives one accepted WebSocket connection end to end: admission, frame
/// dispatch, and disconnect cleanup.
///
/// Every call into `relay_core::dispatch` holds a permit from `gate` for its
/// duration, so a reclamation sweep never runs concurrently with live
/// admission, dispatch, or disconnect work (spec §5).
pub async fn handle_socket(
    socket: WebSocket,
    registry: Arc<Registry>,
    credentials: Arc<Credentials>,
    env: SystemEnv,
    gate: Arc<ReclaimGate>,
) {
    let (mut sink, mut stream) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<OutboundCommand>();

    let writer = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(PING_INTERVAL);
        ping_interval.tick().await; // first tick fires immediately

        loop {
            tokio::select! {
                command = outbound_rx.recv() => {
                    match command {
                        Some(OutboundCommand::Send(FrameOpcode::Binary, payload)) => {
                            if sink.send(Message::Binary(payload.into())).await.is_err() {
                                break;
                            }
                        }
                        Some(OutboundCommand::Send(FrameOpcode::Text, payload)) => {
                            match String::from_utf8(payload) {
                                Ok(text) => {
                                    if sink.send(Message::Text(text.into())).await.is_err() {
                                        break;
                                    }
                                }
                                Err(_) => warn!("dropped non-UTF-8 text-frame reply"),
                            }
                        }
                        Some(OutboundCommand::Close(code, reason)) => {
                            let _ = sink.send(Message::Close(Some(CloseFrame { code, reason: reason.into() }))).await;
                            break;
                        }
                        None => break,
                    }
                }
                _ = ping_interval.tick() => {
                    if sink.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let handle: Box<dyn ConnectionHandle> = Box::new(WsHandle { outbound: outbound_tx });
    let Some(session) = admit(&mut stream, &registry, &env, &gate, handle).await else {
        writer.abort();
        return;
    };

    loop {
        let Some(message) = stream.next().await else { break };
        match message {
            Ok(Message::Binary(payload)) => {
                let mut frame = payload.to_vec();
                let _permit = gate.enter();
                if dispatch::dispatch_frame(&registry, &credentials, &session, FrameOpcode::Binary, &mut frame).is_err() {
                    break;
                }
            }
            Ok(Message::Text(text)) => {
                let mut frame = text.as_bytes().to_vec();
                let _permit = gate.enter();
                if dispatch::dispatch_frame(&registry, &credentials, &session, FrameOpcode::Text, &mut frame).is_err() {
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(Message::Ping(_) | Message::Pong(_)) => {}
            Err(e) => {
                debug!(error = %e, "websocket read error, treating as disconnect");
                break;
            }
        }
    }

    {
        let _permit = gate.enter();
        dispatch::handle_disconnect(&registry, &session);
    }
    writer.abort();
}

async fn admit(
    stream: &mut (impl StreamExt<Item = Result<Message, axum::Error>> + Unpin),
    registry: &Registry,
    env: &SystemEnv,
    gate: &ReclaimGate,
    handle: Box<dyn ConnectionHandle>,
) -> Option<SessionHandle> {
    loop {
        match stream.next().await? {
            Ok(Message::Binary(payload)) => {
                let _permit = gate.enter();
                return dispatch::admit_session(registry, env, &payload, handle).ok();
            }
            Ok(Message::Text(text)) => {
                let _permit = gate.enter();
                return dispatch::admit_session(registry, env, text.as_bytes(), handle).ok();
            }
            Ok(Message::Close(_)) => return None,
            Ok(Message::Ping(_) | Message::Pong(_)) => continue,
            Err(_) => return None,
        }
    }
}
