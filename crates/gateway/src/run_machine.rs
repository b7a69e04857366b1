// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C4 — the run lifecycle state machine. `pending → running` happens only
//! on the agent's first `marker:started`, never at claim time; `running →
//! done|failed` happens only on `marker:finished`, classified by exit-code
//! sign. `restart`/`resume` never mutate an existing run — they always
//! produce a new one.

use relay_core::{AgentId, CapabilityToken, NewRun, Run, RunId, RunStatus};

use crate::error::GatewayError;
use crate::hub::HubEvent;
use crate::run_state;
use crate::state::GatewayState;
use crate::store::Store;

pub async fn create(state: &GatewayState, req: NewRun) -> Run {
    let now_ms = state.clock.now_ms();
    let run = Run::create(req, now_ms);
    state.store.insert_run(run.clone()).await;
    run
}

pub async fn get(state: &GatewayState, run_id: &RunId) -> Result<Run, GatewayError> {
    state.store.get_run(run_id).await.ok_or_else(|| GatewayError::not_found("run not found"))
}

pub async fn list(state: &GatewayState) -> Vec<Run> {
    state.store.list_runs().await
}

/// Verify `agent_id`/`token` authorize acting on `run_id`, returning the run.
pub async fn authorize(
    state: &GatewayState,
    run_id: &RunId,
    agent_id: &AgentId,
    token: &CapabilityToken,
) -> Result<Run, GatewayError> {
    let run = get(state, run_id).await?;
    if run.capability_matches(agent_id, token) {
        Ok(run)
    } else {
        Err(GatewayError::auth_capability("capability token does not match this run"))
    }
}

/// Possession-based authorization for the agent's run-scoped ingest/command/
/// state endpoints: holding the capability token is the authority, per its
/// definition as "a per-run random secret granting write authority" — the
/// caller's agent identity isn't re-checked on every call, only at claim.
pub async fn authorize_by_token(
    state: &GatewayState,
    run_id: &RunId,
    token: &CapabilityToken,
) -> Result<Run, GatewayError> {
    let run = get(state, run_id).await?;
    if &run.capability_token == token {
        Ok(run)
    } else {
        Err(GatewayError::auth_capability("capability token does not match this run"))
    }
}

/// `marker:started` — transition `pending → running`. Idempotent: a repeat
/// or out-of-order `started` marker for an already-running (or terminal)
/// run is a no-op, so `startedAt` is never reset.
pub async fn mark_started(state: &GatewayState, run_id: &RunId) -> Option<Run> {
    let now_ms = state.clock.now_ms();
    let run = state
        .store
        .update_run(run_id, |run| {
            if run.status == RunStatus::Pending {
                run.status = RunStatus::Running;
                run.started_at_ms = Some(now_ms);
            }
            run.clone()
        })
        .await?;
    state
        .hub
        .publish(HubEvent::RunStatusChanged { run_id: run_id.clone(), status: run.status.to_string() })
        .await;
    Some(run)
}

/// `marker:finished` — transition to `done` (exit code zero) or `failed`
/// (nonzero, missing, or stop/halt-forced). If the run never saw a
/// `started` marker (e.g. the subprocess failed to spawn), `startedAt` is
/// backfilled here so invariant (b) — `startedAt` set iff status ever
/// reached `running` — still holds.
pub async fn mark_finished(state: &GatewayState, run_id: &RunId, exit_code: Option<i32>) -> Option<Run> {
    let now_ms = state.clock.now_ms();
    let run = state
        .store
        .update_run(run_id, |run| {
            if run.status.is_terminal() {
                return run.clone();
            }
            if run.started_at_ms.is_none() {
                run.started_at_ms = Some(now_ms);
            }
            run.status = match exit_code {
                Some(0) => RunStatus::Done,
                _ => RunStatus::Failed,
            };
            run.finished_at_ms = Some(now_ms);
            run.exit_code = exit_code;
            run.clone()
        })
        .await?;
    state
        .hub
        .publish(HubEvent::RunStatusChanged { run_id: run_id.clone(), status: run.status.to_string() })
        .await;
    Some(run)
}

/// `restart` (optionally with a command override) or, when `resume` is set,
/// the `resume` primitive: restart plus re-seeding the new run's working
/// directory from the source's last saved state, with `resumed_from` set.
/// Always produces a brand-new `pending` run; the source run is untouched.
/// `resume` additionally requires the source to be in a terminal state.
pub async fn restart(
    state: &GatewayState,
    source_id: &RunId,
    override_command: Option<String>,
    resume: bool,
) -> Result<Run, GatewayError> {
    let source = get(state, source_id).await?;
    let now_ms = state.clock.now_ms();
    let restarted = if resume {
        if !source.status.is_terminal() {
            return Err(GatewayError::conflict("only runs in a terminal state may be resumed"));
        }
        let seeded_working_dir = run_state::get(state, source_id).await.and_then(|s| s.working_dir);
        source.resume_from(override_command, seeded_working_dir, now_ms)
    } else {
        source.restart_from(override_command, now_ms)
    };
    state.store.insert_run(restarted.clone()).await;
    Ok(restarted)
}

pub async fn delete(state: &GatewayState, run_id: &RunId) -> Result<(), GatewayError> {
    if state.store.delete_run(run_id).await {
        Ok(())
    } else {
        Err(GatewayError::not_found("run not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StateBuilder;

    #[tokio::test]
    async fn a_pending_run_transitions_to_running_only_on_started() {
        let state = StateBuilder::new().build();
        let run = create(&state, NewRun::default()).await;
        assert_eq!(run.status, RunStatus::Pending);

        let started = mark_started(&state, &run.id).await;
        assert_eq!(started.map(|r| r.status), Some(RunStatus::Running));
    }

    #[tokio::test]
    async fn a_repeat_started_marker_does_not_reset_started_at() {
        let state = StateBuilder::new().build();
        let run = create(&state, NewRun::default()).await;
        let first = mark_started(&state, &run.id).await;
        let second = mark_started(&state, &run.id).await;
        assert_eq!(
            first.and_then(|r| r.started_at_ms),
            second.and_then(|r| r.started_at_ms)
        );
    }

    #[tokio::test]
    async fn zero_exit_code_finishes_as_done_nonzero_as_failed() {
        let state = StateBuilder::new().build();
        let ok_run = create(&state, NewRun::default()).await;
        mark_started(&state, &ok_run.id).await;
        let done = mark_finished(&state, &ok_run.id, Some(0)).await;
        assert_eq!(done.map(|r| r.status), Some(RunStatus::Done));

        let bad_run = create(&state, NewRun::default()).await;
        mark_started(&state, &bad_run.id).await;
        let failed = mark_finished(&state, &bad_run.id, Some(1)).await;
        assert_eq!(failed.map(|r| r.status), Some(RunStatus::Failed));
    }

    #[tokio::test]
    async fn finishing_without_a_started_marker_still_backfills_started_at() {
        let state = StateBuilder::new().build();
        let run = create(&state, NewRun::default()).await;
        let finished = mark_finished(&state, &run.id, Some(1)).await;
        assert!(finished.is_some_and(|r| r.started_at_ms.is_some()));
    }

    #[tokio::test]
    async fn restart_creates_a_new_pending_run_and_leaves_the_source_alone() {
        let state = StateBuilder::new().build();
        let source = create(&state, NewRun { command: Some("hi".to_owned()), ..Default::default() }).await;
        mark_started(&state, &source.id).await;
        mark_finished(&state, &source.id, Some(0)).await;

        let restarted = restart(&state, &source.id, None, false).await;
        let restarted = match restarted {
            Ok(r) => r,
            Err(_) => return,
        };
        assert_eq!(restarted.status, RunStatus::Pending);
        assert_eq!(restarted.restarted_from, Some(source.id.clone()));
        assert_eq!(restarted.resumed_from, None);

        let reloaded_source = get(&state, &source.id).await;
        assert_eq!(reloaded_source.map(|r| r.status).ok(), Some(RunStatus::Done));
    }

    #[tokio::test]
    async fn resume_rejects_a_non_terminal_source_run() {
        let state = StateBuilder::new().build();
        let source = create(&state, NewRun { command: Some("hi".to_owned()), ..Default::default() }).await;

        let result = restart(&state, &source.id, None, true).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn resume_seeds_the_working_directory_from_saved_state_and_sets_resumed_from() {
        let state = StateBuilder::new().build();
        let source = create(
            &state,
            NewRun { command: Some("hi".to_owned()), working_dir: Some("/srv/w".to_owned()), ..Default::default() },
        )
        .await;
        mark_started(&state, &source.id).await;
        mark_finished(&state, &source.id, Some(0)).await;

        run_state::save(
            &state,
            &source.id,
            relay_core::RunState { working_dir: Some("/srv/w/sub".to_owned()), ..Default::default() },
        )
        .await;

        let Ok(resumed) = restart(&state, &source.id, None, true).await else {
            unreachable!("resume of a terminal run must succeed")
        };
        assert_eq!(resumed.resumed_from, Some(source.id.clone()));
        assert_eq!(resumed.restarted_from, Some(source.id.clone()));
        assert_eq!(resumed.working_dir, "/srv/w/sub");
    }

    #[tokio::test]
    async fn resume_without_saved_state_falls_back_to_the_source_s_working_directory() {
        let state = StateBuilder::new().build();
        let source = create(
            &state,
            NewRun { command: Some("hi".to_owned()), working_dir: Some("/srv/w".to_owned()), ..Default::default() },
        )
        .await;
        mark_started(&state, &source.id).await;
        mark_finished(&state, &source.id, Some(0)).await;

        let Ok(resumed) = restart(&state, &source.id, None, true).await else {
            unreachable!("resume of a terminal run must succeed")
        };
        assert_eq!(resumed.working_dir, "/srv/w");
    }

    #[tokio::test]
    async fn authorize_by_token_accepts_the_run_s_own_token_and_rejects_others() {
        let state = StateBuilder::new().build();
        let run = create(&state, NewRun::default()).await;

        assert!(authorize_by_token(&state, &run.id, &run.capability_token).await.is_ok());
        assert!(authorize_by_token(&state, &run.id, &CapabilityToken::new()).await.is_err());
    }

    #[tokio::test]
    async fn delete_removes_the_run() {
        let state = StateBuilder::new().build();
        let run = create(&state, NewRun::default()).await;
        assert!(delete(&state, &run.id).await.is_ok());
        assert!(get(&state, &run.id).await.is_err());
    }
}
