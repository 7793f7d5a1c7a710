// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential extraction and the bearer authentication middleware.
//!
//! Credentials are opaque; the [`IdentityResolver`] decides who they belong to.
//! Requests without a resolvable credential are rejected (fail-closed).

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use courier_core::{CourierError, IdentityResolver, UserId};

use crate::error::ApiError;

/// The authenticated caller, inserted into request extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub UserId);

/// Token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Resolve `credential` to a user, mapping "unknown" to an authentication error.
pub async fn authenticate(
    resolver: &dyn IdentityResolver,
    credential: Option<&str>,
) -> Result<UserId, CourierError> {
    let credential =
        credential.ok_or_else(|| CourierError::Authentication("missing credential".into()))?;
    resolver
        .resolve(credential)
        .await?
        .map(|identity| identity.user_id)
        .ok_or_else(|| CourierError::Authentication("unknown credential".into()))
}

/// Middleware that resolves the bearer token and stores [`AuthUser`].
pub async fn auth_middleware(
    State(resolver): State<Arc<dyn IdentityResolver>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(resolver.as_ref(), bearer_token(request.headers())).await?;
    request.extensions_mut().insert(AuthUser(user));
    Ok(next.run(request).await)
}
