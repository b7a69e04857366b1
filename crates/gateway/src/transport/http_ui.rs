// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers for the UI-facing surface: create/list/inspect runs, read
//! their event log and state snapshot, and drive them with the C10 control
//! primitives. Every route here sits behind
//! [`crate::transport::auth_ui::require_bearer`].

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use relay_core::{Command, MagicVerb, NewRun, Run, RunId, RunStatus};
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::state::GatewayState;
use crate::store::Store as _;
use crate::{command_queue, event_log, run_machine, run_state};

#[derive(Debug, Default, Deserialize)]
pub struct ListRunsQuery {
    pub status: Option<String>,
    pub worker_type: Option<String>,
    pub search: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRunResponse {
    pub id: RunId,
    pub capability_token: String,
    pub status: RunStatus,
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    #[serde(default)]
    pub after: u64,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub command: String,
}

#[derive(Debug, Deserialize)]
pub struct InputRequest {
    pub input: String,
    #[serde(default)]
    pub escape: bool,
}

#[derive(Debug, Deserialize, Default)]
pub struct RestartRequest {
    #[serde(default)]
    pub command: Option<String>,
    /// Set by the `resume` CLI subcommand/control primitive: on top of a
    /// plain restart, requires the source run to be terminal and re-seeds
    /// the new run's working directory from the source's saved state.
    #[serde(default)]
    pub resume: bool,
}

/// `POST /api/runs`
pub async fn create_run(
    State(state): State<Arc<GatewayState>>,
    Json(req): Json<NewRun>,
) -> impl IntoResponse {
    let run = run_machine::create(&state, req).await;
    Json(CreateRunResponse {
        id: run.id,
        capability_token: run.capability_token.to_string(),
        status: run.status,
    })
    .into_response()
}

/// `GET /api/runs`
pub async fn list_runs(
    State(state): State<Arc<GatewayState>>,
    Query(query): Query<ListRunsQuery>,
) -> impl IntoResponse {
    let mut runs = run_machine::list(&state).await;

    if let Some(status) = query.status.as_deref() {
        runs.retain(|r| r.status.to_string() == status);
    }
    if let Some(worker_type) = query.worker_type.as_deref() {
        runs.retain(|r| r.worker_type.as_str() == worker_type);
    }
    if let Some(search) = query.search.as_deref() {
        runs.retain(|r| r.command.as_deref().is_some_and(|c| c.contains(search)));
    }

    let offset = query.offset.unwrap_or(0);
    let limit = query.limit.unwrap_or(runs.len());
    let page: Vec<Run> = runs.into_iter().skip(offset).take(limit).collect();
    Json(page).into_response()
}

/// `GET /api/runs/:id`
pub async fn get_run(
    State(state): State<Arc<GatewayState>>,
    Path(run_id): Path<String>,
) -> impl IntoResponse {
    match run_machine::get(&state, &RunId::from(run_id)).await {
        Ok(run) => Json(run).into_response(),
        Err(err) => err.into_response(),
    }
}

/// `GET /api/runs/:id/events?after=&limit=`
pub async fn get_events(
    State(state): State<Arc<GatewayState>>,
    Path(run_id): Path<String>,
    Query(query): Query<EventsQuery>,
) -> impl IntoResponse {
    let run_id = RunId::from(run_id);
    if let Err(err) = run_machine::get(&state, &run_id).await {
        return err.into_response();
    }
    let mut events = event_log::list_since(&state, &run_id, query.after).await;
    if let Some(limit) = query.limit {
        events.truncate(limit);
    }
    Json(events).into_response()
}

/// `GET /api/runs/:id/state`
pub async fn get_state(
    State(state): State<Arc<GatewayState>>,
    Path(run_id): Path<String>,
) -> impl IntoResponse {
    let run_id = RunId::from(run_id);
    if let Err(err) = run_machine::get(&state, &run_id).await {
        return err.into_response();
    }
    match run_state::get(&state, &run_id).await {
        Some(snapshot) => Json(snapshot).into_response(),
        None => Json(serde_json::json!(null)).into_response(),
    }
}

async fn enqueue_running(
    state: &GatewayState,
    run_id: &RunId,
    command: String,
) -> Result<Command, GatewayError> {
    let run = run_machine::get(state, run_id).await?;
    if run.status.is_terminal() {
        return Err(GatewayError::conflict("run is already finished"));
    }
    command_queue::enqueue(state, run_id, command).await
}

/// `POST /api/runs/:id/command`
pub async fn enqueue_command(
    State(state): State<Arc<GatewayState>>,
    Path(run_id): Path<String>,
    Json(req): Json<CommandRequest>,
) -> impl IntoResponse {
    match enqueue_running(&state, &RunId::from(run_id), req.command).await {
        Ok(command) => Json(command).into_response(),
        Err(err) => err.into_response(),
    }
}

/// `POST /api/runs/:id/input`
pub async fn enqueue_input(
    State(state): State<Arc<GatewayState>>,
    Path(run_id): Path<String>,
    Json(req): Json<InputRequest>,
) -> impl IntoResponse {
    let wire = MagicVerb::input(&req.input, req.escape).to_wire();
    match enqueue_running(&state, &RunId::from(run_id), wire).await {
        Ok(command) => Json(command).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn enqueue_magic(
    state: &GatewayState,
    run_id: String,
    verb: MagicVerb,
) -> impl IntoResponse {
    match enqueue_running(state, &RunId::from(run_id), verb.to_wire()).await {
        Ok(command) => Json(command).into_response(),
        Err(err) => err.into_response(),
    }
}

/// `POST /api/runs/:id/escape`
pub async fn escape_run(
    State(state): State<Arc<GatewayState>>,
    Path(run_id): Path<String>,
) -> impl IntoResponse {
    enqueue_magic(&state, run_id, MagicVerb::Escape).await
}

/// `POST /api/runs/:id/stop`
pub async fn stop_run(
    State(state): State<Arc<GatewayState>>,
    Path(run_id): Path<String>,
) -> impl IntoResponse {
    enqueue_magic(&state, run_id, MagicVerb::Stop).await
}

/// `POST /api/runs/:id/halt`
pub async fn halt_run(
    State(state): State<Arc<GatewayState>>,
    Path(run_id): Path<String>,
) -> impl IntoResponse {
    enqueue_magic(&state, run_id, MagicVerb::Halt).await
}

/// `POST /api/runs/:id/restart` — never mutates the source run, always
/// produces a new `pending` one. `resume: true` additionally requires the
/// source to be terminal and re-seeds the working directory from its last
/// saved state.
pub async fn restart_run(
    State(state): State<Arc<GatewayState>>,
    Path(run_id): Path<String>,
    Json(req): Json<RestartRequest>,
) -> impl IntoResponse {
    match run_machine::restart(&state, &RunId::from(run_id), req.command, req.resume).await {
        Ok(run) => Json(CreateRunResponse {
            id: run.id,
            capability_token: run.capability_token.to_string(),
            status: run.status,
        })
        .into_response(),
        Err(err) => err.into_response(),
    }
}

/// `DELETE /api/runs/:id`
pub async fn delete_run(
    State(state): State<Arc<GatewayState>>,
    Path(run_id): Path<String>,
) -> impl IntoResponse {
    match run_machine::delete(&state, &RunId::from(run_id)).await {
        Ok(()) => Json(serde_json::json!({ "ok": true })).into_response(),
        Err(err) => err.into_response(),
    }
}

/// `GET /api/runs/:id/artifacts` — names of artifacts uploaded so far.
pub async fn list_artifacts(
    State(state): State<Arc<GatewayState>>,
    Path(run_id): Path<String>,
) -> impl IntoResponse {
    let run_id = RunId::from(run_id);
    if let Err(err) = run_machine::get(&state, &run_id).await {
        return err.into_response();
    }
    Json(state.store.list_artifacts(&run_id).await).into_response()
}

/// `GET /api/runs/:id/artifacts/:name` — raw artifact bytes.
pub async fn get_artifact(
    State(state): State<Arc<GatewayState>>,
    Path((run_id, name)): Path<(String, String)>,
) -> impl IntoResponse {
    let run_id = RunId::from(run_id);
    if let Err(err) = run_machine::get(&state, &run_id).await {
        return err.into_response();
    }
    match state.store.get_artifact(&run_id, &name).await {
        Some(bytes) => bytes.into_response(),
        None => GatewayError::not_found("artifact not found").into_response(),
    }
}

/// `GET /api/health` — exempt from both auth layers.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}

#[cfg(test)]
mod tests {
    use relay_core::RunStatus;

    use super::*;
    use crate::test_support::StateBuilder;

    #[tokio::test]
    async fn creating_a_run_returns_a_pending_status() {
        let state = StateBuilder::new().build();
        let run = run_machine::create(&state, NewRun::default()).await;
        assert_eq!(run.status, RunStatus::Pending);
        assert!(!run.capability_token.to_string().is_empty());
    }

    #[tokio::test]
    async fn enqueue_on_a_finished_run_conflicts() {
        let state = StateBuilder::new().build();
        let run = run_machine::create(&state, NewRun::default()).await;
        run_machine::mark_started(&state, &run.id).await;
        run_machine::mark_finished(&state, &run.id, Some(0)).await;

        let result = enqueue_running(&state, &run.id, "__STOP__".to_owned()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn enqueue_on_a_pending_run_succeeds() {
        let state = StateBuilder::new().build();
        let run = run_machine::create(&state, NewRun::default()).await;
        let result = enqueue_running(&state, &run.id, "__STOP__".to_owned()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let state = StateBuilder::new().build();
        let pending = run_machine::create(&state, NewRun::default()).await;
        let done = run_machine::create(&state, NewRun::default()).await;
        run_machine::mark_started(&state, &done.id).await;
        run_machine::mark_finished(&state, &done.id, Some(0)).await;

        let runs = run_machine::list(&state).await;
        let only_pending: Vec<_> =
            runs.into_iter().filter(|r| r.status == RunStatus::Pending).collect();
        assert_eq!(only_pending.len(), 1);
        assert_eq!(only_pending[0].id, pending.id);
    }
}
