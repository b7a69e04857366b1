// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket upgrade handlers for C5: one for the global `"all"` feed, one
//! per-run. Each pairs a single upgrade with a `broadcast::Receiver` read
//! loop that forwards serialized JSON frames until the socket or the
//! gateway's shutdown token closes, the way the teacher's
//! `transport/ws.rs`/`transport/ws_mux.rs` pair does.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use relay_core::RunId;
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;

use crate::state::GatewayState;
use crate::transport::auth_ui::validate_bearer_query;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

/// `GET /ws` — subscribe to every run's activity plus agent liveness.
pub async fn ws_all(
    State(state): State<Arc<GatewayState>>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    if validate_bearer_query(query.token.as_deref(), state.config.ui_auth_token.as_deref()).is_err()
    {
        return axum::http::StatusCode::UNAUTHORIZED.into_response();
    }
    ws.on_upgrade(move |socket| handle_ws(socket, state, None)).into_response()
}

/// `GET /ws/runs/:id` — subscribe to one run's activity.
pub async fn ws_run(
    State(state): State<Arc<GatewayState>>,
    Path(run_id): Path<String>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    if validate_bearer_query(query.token.as_deref(), state.config.ui_auth_token.as_deref()).is_err()
    {
        return axum::http::StatusCode::UNAUTHORIZED.into_response();
    }
    ws.on_upgrade(move |socket| handle_ws(socket, state, Some(RunId::from(run_id)))).into_response()
}

async fn handle_ws(socket: WebSocket, state: Arc<GatewayState>, run_id: Option<RunId>) {
    let mut rx = match &run_id {
        Some(run_id) => state.hub.subscribe_run(run_id).await,
        None => state.hub.subscribe_all().await,
    };
    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            _ = state.shutdown.cancelled() => break,
            event = rx.recv() => {
                match event {
                    Ok(event) => {
                        let Ok(text) = serde_json::to_string(event.as_ref()) else { continue };
                        if ws_tx.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
            incoming = ws_rx.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }
}
