// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-connection session actor.
//!
//! Each session runs a reader (the calling task) and a writer (a spawned
//! task). Either side may detect a dead connection. The writer reports its
//! failure by cancelling the session's close token; the reader then
//! unregisters from the hub, which is a no-op if someone already did.
//! A writer stuck on a peer that stopped reading is aborted after
//! [`WRITER_GRACE`], so the connection is always released.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::Message;
use courier_config::model::SessionConfig;
use courier_core::{unix_now, CallLookup, ClientEnvelope, DecodeError, ServerEnvelope, UserId};
use courier_hub::{Hub, SessionHandle};
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{interval_at, timeout, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::signaling::relay_signaling;

/// Payloads written in one physical frame are joined with this separator.
pub const RECORD_SEPARATOR: char = '\n';

/// Upper bound on payloads merged into one frame.
const MAX_COALESCED: usize = 64;

/// How long the writer may take to flush its close frame after the reader
/// has finished. A writer still blocked after this is aborted.
pub const WRITER_GRACE: Duration = Duration::from_secs(5);

/// Limits and keepalive timing for one session.
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub outbound_queue_capacity: usize,
    pub max_frame_bytes: usize,
    pub ping_interval: Duration,
    pub read_deadline: Duration,
}

impl From<&SessionConfig> for SessionSettings {
    fn from(config: &SessionConfig) -> Self {
        Self {
            outbound_queue_capacity: config.outbound_queue_capacity,
            max_frame_bytes: config.max_frame_bytes,
            ping_interval: config.ping_interval(),
            read_deadline: config.read_deadline(),
        }
    }
}

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Teardown {
    /// No frame arrived within the read deadline.
    DeadlineExpired,
    /// The peer closed the connection or the stream ended.
    PeerClosed,
    ReadError(String),
    WriteError(String),
    FrameTooLarge(usize),
    /// Unregistered from outside, e.g. on shutdown.
    Closed,
}

/// One live client connection owned by a single user.
pub struct ClientSession {
    handle: Arc<SessionHandle>,
    outbound: mpsc::Receiver<Arc<str>>,
    hub: Arc<Hub>,
    calls: Arc<dyn CallLookup>,
    settings: SessionSettings,
}

impl ClientSession {
    pub fn new(
        user: UserId,
        hub: Arc<Hub>,
        calls: Arc<dyn CallLookup>,
        settings: SessionSettings,
    ) -> Self {
        let (handle, outbound) = SessionHandle::new(user, settings.outbound_queue_capacity);
        Self {
            handle,
            outbound,
            hub,
            calls,
            settings,
        }
    }

    pub fn handle(&self) -> &Arc<SessionHandle> {
        &self.handle
    }

    /// Register with the hub and serve the connection until it dies.
    ///
    /// Returns the reason reported by whichever side tore the session down.
    pub async fn run<S, R, E>(self, sink: S, mut stream: R) -> Teardown
    where
        S: Sink<Message> + Unpin + Send + 'static,
        S::Error: Display + Send,
        R: Stream<Item = Result<Message, E>> + Unpin,
        E: Display,
    {
        let Self {
            handle,
            outbound,
            hub,
            calls,
            settings,
        } = self;
        let user = handle.user_id();
        let session_id = handle.id();
        hub.register(Arc::clone(&handle));

        let mut writer = tokio::spawn(write_loop(
            sink,
            outbound,
            handle.closed().clone(),
            settings.ping_interval,
        ));

        let closed = handle.closed().clone();
        let reason = loop {
            let next = tokio::select! {
                _ = closed.cancelled() => break Teardown::Closed,
                next = timeout(settings.read_deadline, stream.next()) => next,
            };
            let frame = match next {
                Err(_) => break Teardown::DeadlineExpired,
                Ok(None) => break Teardown::PeerClosed,
                Ok(Some(Err(e))) => break Teardown::ReadError(e.to_string()),
                Ok(Some(Ok(frame))) => frame,
            };
            match frame {
                Message::Text(text) => {
                    if text.len() > settings.max_frame_bytes {
                        break Teardown::FrameTooLarge(text.len());
                    }
                    handle_text(&handle, &hub, calls.as_ref(), text.as_str()).await;
                }
                Message::Binary(data) => {
                    if data.len() > settings.max_frame_bytes {
                        break Teardown::FrameTooLarge(data.len());
                    }
                    debug!(user_id = %user, session_id = %session_id, "binary frame ignored");
                }
                Message::Close(_) => break Teardown::PeerClosed,
                // Pongs answer our keepalive probes; the deadline already reset.
                Message::Ping(_) | Message::Pong(_) => {}
            }
        };

        hub.unregister(&handle);
        let written = match timeout(WRITER_GRACE, &mut writer).await {
            Ok(joined) => joined.ok(),
            Err(_) => {
                writer.abort();
                warn!(user_id = %user, session_id = %session_id, "writer stalled, aborted");
                None
            }
        };
        let reason = match (reason, written) {
            (Teardown::Closed, Some(Err(write_err))) => Teardown::WriteError(write_err),
            (reason, _) => reason,
        };
        info!(user_id = %user, session_id = %session_id, reason = ?reason, "session closed");
        reason
    }
}

/// Dispatch one inbound text frame.
async fn handle_text(handle: &SessionHandle, hub: &Hub, calls: &dyn CallLookup, text: &str) {
    match ClientEnvelope::decode(text) {
        Ok(ClientEnvelope::Ping) => reply(handle, &ServerEnvelope::Pong { time: unix_now() }),
        Ok(ClientEnvelope::Ack) => {}
        Ok(ClientEnvelope::Signaling { call_id, data }) => {
            let outcome = relay_signaling(calls, hub, handle.user_id(), call_id, data).await;
            if let Some(error) = outcome.error_reply() {
                reply(handle, &error);
            }
        }
        Ok(ClientEnvelope::Unrecognized { kind }) => {
            debug!(session_id = %handle.id(), kind = ?kind, "unrecognized frame dropped");
        }
        Err(e @ DecodeError::Incomplete { .. }) => reply(handle, &ServerEnvelope::error(e.to_string())),
        Err(DecodeError::Malformed(reason)) => {
            debug!(session_id = %handle.id(), reason = %reason, "malformed frame dropped");
        }
    }
}

/// Queue a reply on this session's own outbound queue.
fn reply(handle: &SessionHandle, envelope: &ServerEnvelope) {
    match serde_json::to_string(envelope) {
        Ok(json) => {
            if !handle.offer(Arc::from(json)) {
                courier_prometheus::record_reply_drop();
                debug!(session_id = %handle.id(), "reply dropped, outbound queue full");
            }
        }
        Err(e) => warn!(error = %e, "failed to serialize reply"),
    }
}

/// Drain ready payloads behind `first`, preserving FIFO order.
pub fn coalesce(first: Arc<str>, rx: &mut mpsc::Receiver<Arc<str>>) -> String {
    let mut frame = String::from(&*first);
    for _ in 1..MAX_COALESCED {
        match rx.try_recv() {
            Ok(next) => {
                frame.push(RECORD_SEPARATOR);
                frame.push_str(&next);
            }
            Err(_) => break,
        }
    }
    frame
}

/// Write queued payloads and keepalive pings until closed or the sink fails.
async fn write_loop<S>(
    mut sink: S,
    mut rx: mpsc::Receiver<Arc<str>>,
    closed: CancellationToken,
    ping_interval: Duration,
) -> Result<(), String>
where
    S: Sink<Message> + Unpin,
    S::Error: Display + Send,
{
    let mut ping = interval_at(Instant::now() + ping_interval, ping_interval);
    let result = loop {
        tokio::select! {
            biased;
            _ = closed.cancelled() => {
                let _ = sink.send(Message::Close(None)).await;
                break Ok(());
            }
            payload = rx.recv() => {
                let Some(first) = payload else {
                    let _ = sink.send(Message::Close(None)).await;
                    break Ok(());
                };
                let frame = coalesce(first, &mut rx);
                if let Err(e) = sink.send(Message::Text(frame.into())).await {
                    break Err(e.to_string());
                }
            }
            _ = ping.tick() => {
                if let Err(e) = sink.send(Message::Ping(Bytes::new())).await {
                    break Err(e.to_string());
                }
            }
        }
    };
    closed.cancel();
    result
}
