// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers for the agent connect-back surface: registration,
//! heartbeat, claim dispatch, event ingest, command polling/ack, and state
//! persistence. Every route here sits behind [`crate::transport::auth_agent::require_signed_request`].

use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use relay_core::{
    AgentId, CapabilityToken, CommandId, EventType, FinishedMarker, RunId, RunState, StartedMarker,
    WorkerType,
};
use relay_wire::headers;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::state::GatewayState;
use crate::store::Store as _;
use crate::{command_queue, event_log, registry, run_machine, run_state};

// -- Request/response types ---------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub agent_id: String,
    pub label: String,
    pub version: String,
    #[serde(default)]
    pub capabilities: Vec<WorkerType>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatRequest {
    pub agent_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    pub agent_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestEventRequest {
    #[serde(rename = "type")]
    pub kind: EventType,
    pub data: String,
    #[serde(default)]
    pub sequence: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestEventResponse {
    pub ok: bool,
    pub event_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AckRequest {
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StateRequest {
    #[serde(default)]
    pub working_dir: Option<String>,
    #[serde(default)]
    pub last_sequence: Option<u64>,
    #[serde(default)]
    pub stdin_buffer: Option<String>,
    #[serde(default)]
    pub environment: Option<std::collections::HashMap<String, String>>,
}

fn header_str<'a>(header_map: &'a HeaderMap, name: &str) -> Option<&'a str> {
    header_map.get(name).and_then(|v| v.to_str().ok())
}

/// Every run-scoped agent endpoint authorizes off the `X-Capability-Token`
/// header the signed-request middleware already verified was part of the
/// signature — the header is re-read here (not re-verified) to learn which
/// run it authorizes.
fn capability_token_header(header_map: &HeaderMap) -> Result<CapabilityToken, GatewayError> {
    header_str(header_map, headers::CAPABILITY_TOKEN)
        .map(|token| CapabilityToken::from(token))
        .ok_or_else(|| GatewayError::auth_capability("missing capability token"))
}

/// `POST /api/clients/register`
pub async fn register(
    State(state): State<Arc<GatewayState>>,
    Json(req): Json<RegisterRequest>,
) -> impl IntoResponse {
    let record = registry::register(
        &state,
        AgentId::from(req.agent_id),
        req.label,
        req.version,
        req.capabilities,
    )
    .await;
    Json(record).into_response()
}

/// `POST /api/clients/heartbeat`
pub async fn heartbeat(
    State(state): State<Arc<GatewayState>>,
    Json(req): Json<HeartbeatRequest>,
) -> impl IntoResponse {
    let agent_id = AgentId::from(req.agent_id);
    match registry::heartbeat(&state, &agent_id).await {
        Some(record) => Json(record).into_response(),
        None => GatewayError::not_found("agent not registered").into_response(),
    }
}

/// `POST /api/runs/claim` — returns a pending, eligible run (with its
/// capability token) as `{...}`, or `null` when nothing is claimable.
pub async fn claim(
    State(state): State<Arc<GatewayState>>,
    Json(req): Json<ClaimRequest>,
) -> impl IntoResponse {
    let agent_id = AgentId::from(req.agent_id);
    Json(registry::claim(&state, &agent_id).await)
}

/// `POST /api/ingest/event` (run-scoped via `X-Run-Id`/`X-Capability-Token`).
pub async fn ingest_event(
    State(state): State<Arc<GatewayState>>,
    header_map: HeaderMap,
    Json(req): Json<IngestEventRequest>,
) -> impl IntoResponse {
    match ingest_event_inner(&state, &header_map, req).await {
        Ok(resp) => Json(resp).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn ingest_event_inner(
    state: &GatewayState,
    header_map: &HeaderMap,
    req: IngestEventRequest,
) -> Result<IngestEventResponse, GatewayError> {
    let run_id = RunId::from(
        header_str(header_map, headers::RUN_ID)
            .ok_or_else(|| GatewayError::validation("missing run id"))?,
    );
    let token = capability_token_header(header_map)?;
    crate::run_machine::authorize_by_token(state, &run_id, &token).await?;

    if req.kind == EventType::Marker {
        apply_marker(state, &run_id, &req.data).await;
    }

    let event = event_log::append(state, &run_id, req.kind, &req.data, req.sequence).await;
    Ok(IngestEventResponse { ok: true, event_id: event.id.to_string() })
}

/// Drive C4's transitions off the two marker shapes `relay_agent::driver`
/// emits (`{"event":"started",...}` / `{"event":"finished",...}`, built by
/// its `tag_marker` helper). Malformed or unrecognized marker payloads are
/// logged and otherwise ignored — the event is still appended to the log
/// either way, so nothing is silently lost.
async fn apply_marker(state: &GatewayState, run_id: &RunId, data: &str) {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(data) else {
        tracing::warn!(run_id = %run_id, "marker event payload is not valid json");
        return;
    };
    match value.get("event").and_then(serde_json::Value::as_str) {
        Some("started") => {
            if serde_json::from_value::<StartedMarker>(value).is_ok() {
                run_machine::mark_started(state, run_id).await;
            }
        }
        Some("finished") => match serde_json::from_value::<FinishedMarker>(value) {
            Ok(marker) => {
                run_machine::mark_finished(state, run_id, marker.exit_code).await;
            }
            Err(_) => tracing::warn!(run_id = %run_id, "finished marker missing expected fields"),
        },
        _ => tracing::warn!(run_id = %run_id, "marker event has no recognized \"event\" field"),
    }
}

/// `GET /api/runs/:id/commands` (run-scoped) — pending commands in FIFO order.
pub async fn list_commands(
    State(state): State<Arc<GatewayState>>,
    Path(run_id): Path<String>,
    header_map: HeaderMap,
) -> impl IntoResponse {
    let run_id = RunId::from(run_id);
    let token = match capability_token_header(&header_map) {
        Ok(token) => token,
        Err(err) => return err.into_response(),
    };
    match crate::run_machine::authorize_by_token(&state, &run_id, &token).await {
        Ok(_) => Json(command_queue::poll_pending(&state, &run_id).await).into_response(),
        Err(err) => err.into_response(),
    }
}

/// `POST /api/runs/:id/commands/:cmdId/ack` (run-scoped).
pub async fn ack_command(
    State(state): State<Arc<GatewayState>>,
    Path((run_id, command_id)): Path<(String, String)>,
    header_map: HeaderMap,
    Json(req): Json<AckRequest>,
) -> impl IntoResponse {
    let run_id = RunId::from(run_id);
    let command_id = CommandId::from(command_id);
    let token = match capability_token_header(&header_map) {
        Ok(token) => token,
        Err(err) => return err.into_response(),
    };
    if let Err(err) = crate::run_machine::authorize_by_token(&state, &run_id, &token).await {
        return err.into_response();
    }
    match command_queue::ack(&state, &run_id, &command_id, req.result, req.error).await {
        Ok(command) => Json(command).into_response(),
        Err(err) => err.into_response(),
    }
}

/// `POST /api/runs/:id/state` (run-scoped) — mirror the agent's local
/// persisted-state snapshot for operator introspection.
pub async fn post_state(
    State(state): State<Arc<GatewayState>>,
    Path(run_id): Path<String>,
    header_map: HeaderMap,
    Json(req): Json<StateRequest>,
) -> impl IntoResponse {
    let run_id = RunId::from(run_id);
    let token = match capability_token_header(&header_map) {
        Ok(token) => token,
        Err(err) => return err.into_response(),
    };
    if let Err(err) = crate::run_machine::authorize_by_token(&state, &run_id, &token).await {
        return err.into_response();
    }
    let snapshot = RunState {
        working_dir: req.working_dir,
        last_sequence: req.last_sequence,
        stdin_buffer: req.stdin_buffer,
        environment: req.environment,
        saved_at_ms: 0,
    };
    run_state::save(&state, &run_id, snapshot).await;
    Json(serde_json::json!({ "ok": true })).into_response()
}

/// `POST /api/runs/:id/artifacts` (run-scoped, multipart) — a named file
/// part per upload (e.g. `latest.diff`, the session log). Field name is
/// taken as the artifact name.
pub async fn upload_artifact(
    State(state): State<Arc<GatewayState>>,
    Path(run_id): Path<String>,
    header_map: HeaderMap,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let run_id = RunId::from(run_id);
    let token = match capability_token_header(&header_map) {
        Ok(token) => token,
        Err(err) => return err.into_response(),
    };
    if let Err(err) = crate::run_machine::authorize_by_token(&state, &run_id, &token).await {
        return err.into_response();
    }

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(_) => return GatewayError::validation("malformed multipart body").into_response(),
        };
        let Some(name) = field.file_name().map(str::to_owned).or_else(|| field.name().map(str::to_owned))
        else {
            continue;
        };
        let Ok(bytes) = field.bytes().await else {
            return GatewayError::validation("malformed multipart body").into_response();
        };
        state.store.put_artifact(&run_id, name, bytes.to_vec()).await;
    }

    Json(serde_json::json!({ "ok": true })).into_response()
}
