// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.
//!
//! Every `/v1` handler runs behind [`auth_middleware`](crate::auth::auth_middleware)
//! and acts as the resolved [`AuthUser`].

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use courier_core::{Dialog, DialogPrefs, MediaRef, Message, Peer, PeerType, UserId};
use courier_sequencer::SendMessage;
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::server::GatewayState;

/// Request body for `POST /v1/messages`.
#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub peer_id: i64,
    pub peer_type: PeerType,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub random_id: Option<i64>,
    #[serde(default)]
    pub reply_to_message_id: Option<i64>,
    #[serde(default)]
    pub media: Option<MediaRef>,
    #[serde(default)]
    pub entities: Option<serde_json::Value>,
    #[serde(default)]
    pub silent: bool,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub peer_id: i64,
    pub peer_type: PeerType,
    /// Exclusive bound: the message `id` in direct chats, `stream_message_id` otherwise.
    #[serde(default)]
    pub offset_id: Option<i64>,
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct DialogsParams {
    #[serde(default)]
    pub offset_date: Option<i64>,
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ReadRequest {
    pub peer_id: i64,
    pub peer_type: PeerType,
    /// Same key as [`HistoryParams::offset_id`].
    pub max_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct EditRequest {
    pub text: String,
    #[serde(default)]
    pub entities: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    pub ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ForwardRequest {
    pub from_peer_id: i64,
    pub from_peer_type: PeerType,
    pub to_peer_id: i64,
    pub to_peer_type: PeerType,
    pub ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct DialogPrefsRequest {
    pub peer_id: i64,
    pub peer_type: PeerType,
    #[serde(flatten)]
    pub prefs: DialogPrefs,
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub struct DialogsResponse {
    pub dialogs: Vec<Dialog>,
}

#[derive(Debug, Serialize)]
pub struct ReadResponse {
    pub advanced: bool,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct PresenceResponse {
    pub user_id: UserId,
    pub online: bool,
    pub connections: usize,
}

#[derive(Debug, Serialize)]
pub struct OnlineUsersResponse {
    pub users: Vec<UserId>,
}

/// Response body for `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub connections: usize,
}

/// POST /v1/messages
pub async fn post_message(
    State(state): State<GatewayState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(body): Json<SendRequest>,
) -> Result<Json<Message>, ApiError> {
    let request = SendMessage {
        sender: user,
        peer: Peer::new(body.peer_id, body.peer_type),
        text: body.text,
        random_id: body.random_id,
        reply_to_message_id: body.reply_to_message_id,
        media: body.media,
        entities: body.entities,
        silent: body.silent,
    };
    Ok(Json(state.sequencer.send(request).await?))
}

/// GET /v1/history
pub async fn get_history(
    State(state): State<GatewayState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<MessagesResponse>, ApiError> {
    let messages = state
        .sequencer
        .get_history(
            user,
            Peer::new(params.peer_id, params.peer_type),
            params.offset_id,
            params.limit,
        )
        .await?;
    Ok(Json(MessagesResponse { messages }))
}

/// GET /v1/dialogs
pub async fn get_dialogs(
    State(state): State<GatewayState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Query(params): Query<DialogsParams>,
) -> Result<Json<DialogsResponse>, ApiError> {
    let dialogs = state
        .sequencer
        .get_dialogs(user, params.offset_date, params.limit)
        .await?;
    Ok(Json(DialogsResponse { dialogs }))
}

/// PATCH /v1/dialogs
pub async fn patch_dialog(
    State(state): State<GatewayState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(body): Json<DialogPrefsRequest>,
) -> Result<Json<Dialog>, ApiError> {
    let dialog = state
        .sequencer
        .update_dialog_prefs(user, Peer::new(body.peer_id, body.peer_type), &body.prefs)
        .await?;
    Ok(Json(dialog))
}

/// POST /v1/read
pub async fn post_read(
    State(state): State<GatewayState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(body): Json<ReadRequest>,
) -> Result<Json<ReadResponse>, ApiError> {
    let advanced = state
        .sequencer
        .mark_as_read(user, Peer::new(body.peer_id, body.peer_type), body.max_id)
        .await?;
    Ok(Json(ReadResponse { advanced }))
}

/// GET /v1/messages/{id}
pub async fn get_message(
    State(state): State<GatewayState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<Message>, ApiError> {
    Ok(Json(state.sequencer.get_message(user, id).await?))
}

/// PATCH /v1/messages/{id}
pub async fn patch_message(
    State(state): State<GatewayState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(body): Json<EditRequest>,
) -> Result<Json<Message>, ApiError> {
    let message = state
        .sequencer
        .edit_message(user, id, &body.text, body.entities)
        .await?;
    Ok(Json(message))
}

/// POST /v1/messages/delete
pub async fn post_delete(
    State(state): State<GatewayState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(body): Json<DeleteRequest>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let deleted = state.sequencer.delete_messages(user, &body.ids).await?;
    Ok(Json(DeleteResponse { deleted }))
}

/// POST /v1/messages/forward
pub async fn post_forward(
    State(state): State<GatewayState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(body): Json<ForwardRequest>,
) -> Result<Json<MessagesResponse>, ApiError> {
    let messages = state
        .sequencer
        .forward_messages(
            user,
            Peer::new(body.from_peer_id, body.from_peer_type),
            Peer::new(body.to_peer_id, body.to_peer_type),
            &body.ids,
        )
        .await?;
    Ok(Json(MessagesResponse { messages }))
}

/// GET /v1/presence/{user_id}
pub async fn get_presence(
    State(state): State<GatewayState>,
    Path(user_id): Path<i64>,
) -> Json<PresenceResponse> {
    let user = UserId(user_id);
    Json(PresenceResponse {
        user_id: user,
        online: state.hub.is_online(user),
        connections: state.hub.connection_count(user),
    })
}

/// GET /v1/presence
pub async fn get_online_users(State(state): State<GatewayState>) -> Json<OnlineUsersResponse> {
    let mut users = state.hub.list_online_users();
    users.sort();
    Json(OnlineUsersResponse { users })
}

/// GET /health (unauthenticated)
pub async fn get_public_health(State(state): State<GatewayState>) -> Response {
    let store_status = state.sequencer.store().health_check().await;
    let (status, code) = match store_status {
        Ok(courier_core::HealthStatus::Healthy) => ("ok", StatusCode::OK),
        Ok(courier_core::HealthStatus::Degraded(_)) => ("degraded", StatusCode::OK),
        _ => ("unavailable", StatusCode::SERVICE_UNAVAILABLE),
    };
    let body = HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
        connections: state.hub.total_connections(),
    };
    (code, Json(body)).into_response()
}

/// GET /metrics (unauthenticated, Prometheus text format)
pub async fn get_public_metrics(State(state): State<GatewayState>) -> Response {
    match &state.health.prometheus_render {
        Some(render) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
