// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `Run` aggregate — one AI coding session.

use serde::{Deserialize, Serialize};

use crate::ids::{define_string_id, AgentId};
use crate::worker_type::WorkerType;

define_string_id!(
    /// Opaque, short, unique identifier for a run.
    RunId,
    "run-"
);

define_string_id!(
    /// Per-run random secret, returned once at creation (and once more at
    /// claim time to the claiming agent). Required on every agent-side call
    /// that touches this run.
    CapabilityToken,
    "cap-"
);

/// Lifecycle status of a run.
///
/// `pending ──(claim)──▶ running ──(marker:finished)──▶ done | failed`.
/// Status is monotone except that `restart` never mutates an existing run —
/// it always produces a brand new one in `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Done,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One AI coding session, tracked from creation through its terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    pub id: RunId,
    pub worker_type: WorkerType,
    pub command: Option<String>,
    pub model: Option<String>,
    pub integration: Option<String>,
    pub provider: Option<String>,
    pub autonomous: bool,
    pub working_dir: String,
    pub assigned_agent_id: Option<AgentId>,
    pub capability_token: CapabilityToken,
    pub status: RunStatus,
    pub created_at_ms: u64,
    pub started_at_ms: Option<u64>,
    pub finished_at_ms: Option<u64>,
    pub exit_code: Option<i32>,
    pub restarted_from: Option<RunId>,
    pub resumed_from: Option<RunId>,
}

/// Fields accepted from `POST /api/runs`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRun {
    pub command: Option<String>,
    pub worker_type: Option<WorkerType>,
    pub model: Option<String>,
    pub integration: Option<String>,
    pub provider: Option<String>,
    pub autonomous: Option<bool>,
    pub working_dir: Option<String>,
}

/// Derived-cache snapshot of an agent's locally persisted run state (§
/// "State persistence"), posted on every heartbeat tick and readable by the
/// UI as `GET /api/runs/:id/state`. Folded in, never computed — the agent
/// is the source of truth for these fields, the gateway only mirrors them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunState {
    pub working_dir: Option<String>,
    pub last_sequence: Option<u64>,
    pub stdin_buffer: Option<String>,
    pub environment: Option<std::collections::HashMap<String, String>>,
    pub saved_at_ms: u64,
}

impl Run {
    /// Create a brand-new `pending` run from a UI-supplied request.
    pub fn create(req: NewRun, now_ms: u64) -> Self {
        Self {
            id: RunId::new(),
            worker_type: req.worker_type.unwrap_or(WorkerType::Claude),
            command: normalize_command(req.command),
            model: req.model,
            integration: req.integration,
            provider: req.provider,
            autonomous: req.autonomous.unwrap_or(false),
            working_dir: req.working_dir.unwrap_or_else(|| "/workspace".to_owned()),
            assigned_agent_id: None,
            capability_token: CapabilityToken::new(),
            status: RunStatus::Pending,
            created_at_ms: now_ms,
            started_at_ms: None,
            finished_at_ms: None,
            exit_code: None,
            restarted_from: None,
            resumed_from: None,
        }
    }

    /// Build the `pending` run produced by `restart`: copies the source's
    /// command/model/working directory, always starts a fresh run, never
    /// touches the source.
    pub fn restart_from(&self, override_command: Option<String>, now_ms: u64) -> Self {
        Self {
            id: RunId::new(),
            worker_type: self.worker_type,
            command: normalize_command(override_command).or_else(|| self.command.clone()),
            model: self.model.clone(),
            integration: self.integration.clone(),
            provider: self.provider.clone(),
            autonomous: self.autonomous,
            working_dir: self.working_dir.clone(),
            assigned_agent_id: None,
            capability_token: CapabilityToken::new(),
            status: RunStatus::Pending,
            created_at_ms: now_ms,
            started_at_ms: None,
            finished_at_ms: None,
            exit_code: None,
            restarted_from: Some(self.id.clone()),
            resumed_from: None,
        }
    }

    /// Build the `pending` run produced by `resume`: a `restart_from` that
    /// additionally records `resumed_from` and re-seeds the working
    /// directory from the source run's last saved state (falling back to
    /// the source's own working directory if it never reported one).
    /// Callers are responsible for enforcing the "only terminal runs may be
    /// resumed" precondition before calling this.
    pub fn resume_from(
        &self,
        override_command: Option<String>,
        seeded_working_dir: Option<String>,
        now_ms: u64,
    ) -> Self {
        let mut run = self.restart_from(override_command, now_ms);
        run.resumed_from = Some(self.id.clone());
        if let Some(working_dir) = seeded_working_dir {
            run.working_dir = working_dir;
        }
        run
    }

    /// Whether `agent_id` may act on this run with `token`.
    pub fn capability_matches(&self, agent_id: &AgentId, token: &CapabilityToken) -> bool {
        self.assigned_agent_id.as_ref() == Some(agent_id) && &self.capability_token == token
    }
}

fn normalize_command(command: Option<String>) -> Option<String> {
    match command {
        Some(c) if c.trim().is_empty() => None,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_only_prompt_is_treated_as_empty() {
        let run = Run::create(
            NewRun { command: Some("   \n\t".to_owned()), ..Default::default() },
            1_000,
        );
        assert_eq!(run.command, None);
    }

    #[test]
    fn restart_produces_a_new_run_pointing_back_at_the_source() {
        let source = Run::create(
            NewRun { command: Some("hello".to_owned()), ..Default::default() },
            1_000,
        );
        let restarted = source.restart_from(Some("hello again".to_owned()), 2_000);

        assert_ne!(restarted.id, source.id);
        assert_ne!(restarted.capability_token, source.capability_token);
        assert_eq!(restarted.status, RunStatus::Pending);
        assert_eq!(restarted.restarted_from, Some(source.id.clone()));
        assert_eq!(restarted.command, Some("hello again".to_owned()));
        // The source run is untouched — restart never mutates it.
        assert_eq!(source.status, RunStatus::Pending);
    }

    #[test]
    fn restart_without_override_copies_the_source_command() {
        let source = Run::create(
            NewRun { command: Some("hello".to_owned()), ..Default::default() },
            1_000,
        );
        let restarted = source.restart_from(None, 2_000);
        assert_eq!(restarted.command, Some("hello".to_owned()));
    }

    #[test]
    fn resume_sets_resumed_from_and_seeds_the_working_directory() {
        let source = Run::create(
            NewRun { command: Some("hello".to_owned()), working_dir: Some("/srv/w".to_owned()), ..Default::default() },
            1_000,
        );
        let resumed = source.resume_from(None, Some("/srv/w/sub".to_owned()), 2_000);

        assert_eq!(resumed.restarted_from, Some(source.id.clone()));
        assert_eq!(resumed.resumed_from, Some(source.id.clone()));
        assert_eq!(resumed.working_dir, "/srv/w/sub");
    }

    #[test]
    fn resume_without_saved_state_falls_back_to_the_source_s_working_directory() {
        let source = Run::create(
            NewRun { command: Some("hello".to_owned()), working_dir: Some("/srv/w".to_owned()), ..Default::default() },
            1_000,
        );
        let resumed = source.resume_from(None, None, 2_000);
        assert_eq!(resumed.working_dir, "/srv/w");
    }

    #[test]
    fn capability_requires_both_agent_and_token_to_match() {
        let mut run =
            Run::create(NewRun { command: Some("hi".to_owned()), ..Default::default() }, 0);
        let agent = AgentId::new();
        assert!(!run.capability_matches(&agent, &run.capability_token.clone()));

        run.assigned_agent_id = Some(agent.clone());
        assert!(run.capability_matches(&agent, &run.capability_token.clone()));

        let other_token = CapabilityToken::new();
        assert!(!run.capability_matches(&agent, &other_token));
    }
}
