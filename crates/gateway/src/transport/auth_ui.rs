// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bearer-token middleware guarding the UI-facing `/api/runs*` surface,
//! grounded in the teacher's `transport::auth::auth_layer`.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::GatewayError;
use crate::state::GatewayState;

fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    let mut acc = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        acc |= x ^ y;
    }
    acc == 0
}

fn validate_bearer(headers: &HeaderMap, expected: Option<&str>) -> Result<(), GatewayError> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let unauthorized = || GatewayError::auth_capability("missing or invalid bearer token");
    let header = headers.get("authorization").and_then(|v| v.to_str().ok()).ok_or_else(unauthorized)?;
    let token = header.strip_prefix("Bearer ").ok_or_else(unauthorized)?;
    if constant_time_eq(token, expected) {
        Ok(())
    } else {
        Err(unauthorized())
    }
}

/// Validate a token passed as a WS upgrade query parameter rather than an
/// `Authorization` header — browsers can't set arbitrary headers on a
/// WebSocket handshake. No-op when `expected` is unset.
pub fn validate_bearer_query(token: Option<&str>, expected: Option<&str>) -> Result<(), GatewayError> {
    let Some(expected) = expected else {
        return Ok(());
    };
    match token {
        Some(token) if constant_time_eq(token, expected) => Ok(()),
        _ => Err(GatewayError::auth_capability("missing or invalid ws token")),
    }
}

/// Enforce the UI bearer token. No-op when `ui_auth_token` is unset (local
/// dev). Health is exempt.
pub async fn require_bearer(
    State(state): State<Arc<GatewayState>>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    if req.uri().path() == "/api/health" {
        return next.run(req).await;
    }
    match validate_bearer(req.headers(), state.config.ui_auth_token.as_deref()) {
        Ok(()) => next.run(req).await,
        Err(err) => err.into_response(),
    }
}
