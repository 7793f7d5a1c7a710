// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket upgrade for the live channel.
//!
//! The credential is checked during the handshake, either from a `token`
//! query parameter or an `Authorization: Bearer` header. Once upgraded the
//! socket is handed to a [`ClientSession`] for its whole lifetime.

use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use courier_core::UserId;
use futures::StreamExt;
use serde::Deserialize;
use tracing::debug;

use crate::auth::{authenticate, bearer_token};
use crate::error::ApiError;
use crate::server::GatewayState;
use crate::session::ClientSession;

/// Query parameters accepted on `/ws`.
#[derive(Debug, Default, Deserialize)]
pub struct WsParams {
    #[serde(default)]
    pub token: Option<String>,
}

/// Authenticate, then upgrade the connection.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<GatewayState>,
    Query(params): Query<WsParams>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let credential = params.token.as_deref().or_else(|| bearer_token(&headers));
    let user = authenticate(state.identity.as_ref(), credential).await?;

    let max_frame = state.session.max_frame_bytes;
    Ok(ws
        .max_message_size(max_frame)
        .max_frame_size(max_frame)
        .on_upgrade(move |socket| serve_socket(socket, user, state)))
}

async fn serve_socket(socket: WebSocket, user: UserId, state: GatewayState) {
    let (sink, stream) = socket.split();
    let session = ClientSession::new(
        user,
        state.hub.clone(),
        state.calls.clone(),
        state.session,
    );
    let reason = session.run(sink, stream).await;
    debug!(user_id = %user, ?reason, "websocket closed");
}
