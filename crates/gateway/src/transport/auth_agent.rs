// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HMAC-signed-request middleware guarding the agent-facing `/api/clients*`,
//! `/api/runs/claim`, and `/api/ingest*` surface. Wraps `relay_wire::verify`
//! the way the teacher's `auth_layer` wraps bearer validation, but must
//! buffer the body first since the signature covers a hash of it.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use relay_core::ErrorCode;
use relay_wire::{headers, SignableRequest, WireError};

use crate::error::GatewayError;
use crate::state::GatewayState;

fn wire_error_to_gateway(err: WireError) -> GatewayError {
    let code = match err {
        WireError::BadSignature => ErrorCode::AuthBadSignature,
        WireError::Skew => ErrorCode::AuthSkew,
        WireError::Replay => ErrorCode::AuthReplay,
    };
    GatewayError::new(code, err.to_string())
}

fn header_str<'a>(header_map: &'a HeaderMap, name: &str) -> Option<&'a str> {
    header_map.get(name).and_then(|v| v.to_str().ok())
}

pub async fn require_signed_request(
    State(state): State<Arc<GatewayState>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if req.uri().path() == "/api/health" {
        return next.run(req).await;
    }

    let method = req.method().as_str().to_owned();
    let path = req.uri().path().to_owned();
    let header_map = req.headers().clone();

    let (parts, body) = req.into_parts();
    let body_bytes = match axum::body::to_bytes(body, 16 * 1024 * 1024).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return GatewayError::validation("body too large or unreadable").into_response();
        }
    };

    let verification = verify_headers(&state, &header_map, &method, &path, &body_bytes);
    if let Err(err) = verification {
        return err.into_response();
    }

    let req = Request::from_parts(parts, Body::from(body_bytes));
    next.run(req).await
}

fn verify_headers(
    state: &GatewayState,
    header_map: &HeaderMap,
    method: &str,
    path: &str,
    body: &[u8],
) -> Result<(), GatewayError> {
    let missing = || GatewayError::new(ErrorCode::AuthBadSignature, "missing signing headers");

    let timestamp_secs: u64 = header_str(header_map, headers::TIMESTAMP)
        .ok_or_else(missing)?
        .parse()
        .map_err(|_| missing())?;
    let nonce = header_str(header_map, headers::NONCE).ok_or_else(missing)?;
    let signature = header_str(header_map, headers::SIGNATURE).ok_or_else(missing)?;
    let run_id = header_str(header_map, headers::RUN_ID);
    let capability_token = header_str(header_map, headers::CAPABILITY_TOKEN);

    let request = SignableRequest {
        method,
        path,
        body,
        timestamp_secs,
        nonce,
        run_id,
        capability_token,
    };

    relay_wire::verify(
        &state.signing_key,
        &request,
        signature,
        state.clock.now_secs(),
        state.config.clock_skew_seconds,
        &state.nonces,
    )
    .map_err(wire_error_to_gateway)
}
