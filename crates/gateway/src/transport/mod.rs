// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP + WebSocket transport for the dispatch gateway.

pub mod auth_agent;
pub mod auth_ui;
pub mod http_agent;
pub mod http_ui;
pub mod ws;

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::state::GatewayState;

/// Build the axum `Router` with every UI, agent, and WebSocket route wired
/// up, each surface behind its own auth middleware layer — bearer for the
/// UI surface, HMAC-signed-request for the agent surface — the way the
/// teacher's `build_router` layers a single `auth_layer` over one `Router`.
pub fn build_router(state: Arc<GatewayState>) -> Router {
    let ui_routes = Router::new()
        .route("/api/runs", post(http_ui::create_run).get(http_ui::list_runs))
        .route("/api/runs/{id}", get(http_ui::get_run).delete(http_ui::delete_run))
        .route("/api/runs/{id}/events", get(http_ui::get_events))
        .route("/api/runs/{id}/state", get(http_ui::get_state))
        .route("/api/runs/{id}/command", post(http_ui::enqueue_command))
        .route("/api/runs/{id}/input", post(http_ui::enqueue_input))
        .route("/api/runs/{id}/escape", post(http_ui::escape_run))
        .route("/api/runs/{id}/stop", post(http_ui::stop_run))
        .route("/api/runs/{id}/halt", post(http_ui::halt_run))
        .route("/api/runs/{id}/restart", post(http_ui::restart_run))
        .route("/api/runs/{id}/artifacts", get(http_ui::list_artifacts))
        .route("/api/runs/{id}/artifacts/{name}", get(http_ui::get_artifact))
        .route("/ws", get(ws::ws_all))
        .route("/ws/runs/{id}", get(ws::ws_run))
        .layer(middleware::from_fn_with_state(state.clone(), auth_ui::require_bearer));

    let agent_routes = Router::new()
        .route("/api/clients/register", post(http_agent::register))
        .route("/api/clients/heartbeat", post(http_agent::heartbeat))
        .route("/api/runs/claim", post(http_agent::claim))
        .route("/api/ingest/event", post(http_agent::ingest_event))
        .route("/api/runs/{id}/commands", get(http_agent::list_commands))
        .route("/api/runs/{id}/commands/{cmdId}/ack", post(http_agent::ack_command))
        .route("/api/runs/{id}/state", post(http_agent::post_state))
        .route("/api/runs/{id}/artifacts", post(http_agent::upload_artifact))
        .layer(middleware::from_fn_with_state(state.clone(), auth_agent::require_signed_request));

    Router::new()
        .route("/api/health", get(http_ui::health))
        .merge(ui_routes)
        .merge(agent_routes)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
