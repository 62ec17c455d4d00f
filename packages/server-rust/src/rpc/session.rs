//! Session bootstrap and the per-connection read/write loops.
//!
//! One upgraded socket becomes one session:
//! 1. the identity was parsed from `Authorization` before the upgrade
//!    ([`parse_identity`]);
//! 2. the connection is registered under that identity (last connect wins);
//! 3. a user record is materialized for the identity;
//! 4. a write task starts draining the connection's outbound queue;
//! 5. the `Hello` greeting is queued;
//! 6. the read loop decodes frames and hands them to the dispatcher until
//!    the socket errors, closes, sends an undecodable frame, or shutdown
//!    begins.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use base64::Engine;
use futures_util::stream::{SplitSink, StreamExt};
use futures_util::SinkExt;
use tokio::sync::mpsc;
use tracing::{debug, info, info_span, warn, Instrument};
use zedex_core::{Envelope, FrameCodec};

use super::dispatcher::Dispatcher;
use super::error::{SessionError, UpgradeError};
use crate::network::config::ConnectionConfig;
use crate::network::connection::{ConnectionHandle, ConnectionRegistry, OutboundMessage};
use crate::network::shutdown::ShutdownController;

/// Extracts the caller identity from an `Authorization: <identity> <token>`
/// header. The token half is accepted as-is and never verified.
///
/// # Errors
///
/// Returns [`UpgradeError`] when the header is missing, not visible ASCII,
/// lacks the separating space, or the identity is not an unsigned integer.
pub fn parse_identity(headers: &HeaderMap) -> Result<u64, UpgradeError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(UpgradeError::MissingAuthorization)?
        .to_str()
        .map_err(|_| UpgradeError::MalformedAuthorization)?;
    let (identity, _token) = value
        .split_once(' ')
        .ok_or(UpgradeError::MalformedAuthorization)?;
    identity
        .parse::<u64>()
        .map_err(|_| UpgradeError::InvalidIdentity(identity.to_string()))
}

/// Shared handles a session needs; cloned once per upgrade.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub registry: Arc<ConnectionRegistry>,
    pub dispatcher: Arc<Dispatcher>,
    pub shutdown: Arc<ShutdownController>,
    pub config: ConnectionConfig,
}

/// Outbound side of one session: encodes envelopes and enqueues frames.
#[derive(Debug)]
pub struct Outbox {
    handle: Arc<ConnectionHandle>,
    codec: FrameCodec,
    send_timeout: Duration,
}

impl Outbox {
    #[must_use]
    pub fn new(handle: Arc<ConnectionHandle>, config: &ConnectionConfig) -> Self {
        Self {
            handle,
            codec: config.codec(),
            send_timeout: config.send_timeout,
        }
    }

    /// Encodes `envelope` and queues it for the write task.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Codec`] if encoding or compression fails, or
    /// a timeout/disconnect error if the frame could not be queued.
    pub async fn send(&self, envelope: &Envelope) -> Result<(), SessionError> {
        let frame = self.codec.encode(envelope)?;
        self.handle
            .send_timeout(OutboundMessage::Binary(frame), self.send_timeout)
            .await?;
        Ok(())
    }
}

/// Runs one session to completion on an upgraded socket.
pub async fn run_session(socket: WebSocket, identity: u64, ctx: SessionContext) {
    let (handle, rx) = ctx.registry.register(identity, &ctx.config);
    let span = info_span!("rpc_session", identity, conn_id = handle.id.0);
    serve_socket(socket, identity, handle, rx, ctx)
        .instrument(span)
        .await;
}

async fn serve_socket(
    socket: WebSocket,
    identity: u64,
    handle: Arc<ConnectionHandle>,
    rx: mpsc::Receiver<OutboundMessage>,
    ctx: SessionContext,
) {
    info!("session started");
    ctx.dispatcher.world().ensure_user(identity);

    let (sink, mut stream) = socket.split();
    let mut writer = tokio::spawn(write_loop(sink, rx).in_current_span());
    let outbox = Outbox::new(Arc::clone(&handle), &ctx.config);

    if let Err(e) = outbox.send(&ctx.dispatcher.greeting(identity)).await {
        metrics::counter!("zedex_rpc_send_errors_total").increment(1);
        warn!(error = %e, "failed to queue greeting");
    }

    let codec = ctx.config.codec();
    let mut shutdown_rx = ctx.shutdown.shutdown_receiver();
    loop {
        if *shutdown_rx.borrow() {
            break;
        }
        let next = tokio::select! {
            next = stream.next() => next,
            _ = shutdown_rx.changed() => break,
        };

        let frame = match next {
            Some(Ok(Message::Binary(frame))) => frame,
            Some(Ok(Message::Close(_))) | None => {
                debug!("peer closed connection");
                break;
            }
            Some(Ok(Message::Text(_))) => {
                debug!("ignoring text frame");
                continue;
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            Some(Err(e)) => {
                debug!(error = %e, "read failed");
                break;
            }
        };

        let _guard = ctx.shutdown.in_flight_guard();
        let envelope = match codec.decode(&frame) {
            Ok(envelope) => envelope,
            Err(e) => {
                metrics::counter!("zedex_rpc_decode_errors_total").increment(1);
                warn!(error = %e, len = frame.len(), "undecodable frame; closing session");
                break;
            }
        };
        if envelope.payload.is_none() {
            debug!(
                raw = %base64::engine::general_purpose::STANDARD.encode(&frame),
                "frame with unknown payload"
            );
        }

        for outbound in ctx.dispatcher.dispatch(identity, envelope) {
            if let Err(e) = outbox.send(&outbound).await {
                metrics::counter!("zedex_rpc_send_errors_total").increment(1);
                warn!(
                    error = %e,
                    variant = outbound.payload_name(),
                    respond_to = outbound.responding_to,
                    "send failed"
                );
            }
        }
    }

    // The registry keeps the entry; stopping the writer marks it stale.
    let _ = handle.try_send(OutboundMessage::Close(None));
    if tokio::time::timeout(ctx.config.send_timeout, &mut writer)
        .await
        .is_err()
    {
        writer.abort();
    }
    info!(
        duration_ms = handle.connected_at.elapsed().as_millis(),
        "session ended"
    );
}

async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<OutboundMessage>,
) {
    while let Some(msg) = rx.recv().await {
        match msg {
            OutboundMessage::Binary(frame) => {
                if let Err(e) = sink.send(Message::Binary(frame.into())).await {
                    debug!(error = %e, "write failed");
                    break;
                }
            }
            OutboundMessage::Close(reason) => {
                let frame = reason.map(|reason| CloseFrame {
                    code: close_code::AWAY,
                    reason: reason.into(),
                });
                let _ = sink.send(Message::Close(frame)).await;
                break;
            }
        }
    }
}
