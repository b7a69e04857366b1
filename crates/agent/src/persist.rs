// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic local run-state persistence (C7): one file per run under the
//! configured runs directory, rewritten temp-and-rename on every heartbeat
//! tick so a crash never observes a half-written file.

use std::path::{Path, PathBuf};

use relay_core::{RunId, WorkerType};
use serde::{Deserialize, Serialize};

use crate::error::AgentError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedRunState {
    pub run_id: RunId,
    pub sequence: u64,
    pub working_dir: String,
    pub worker_type: WorkerType,
    pub model: Option<String>,
    pub saved_at_ms: u64,
}

fn state_path(runs_dir: &str, run_id: &RunId) -> PathBuf {
    Path::new(runs_dir).join(format!("{}.json", run_id.as_str()))
}

/// Write `state` to its run's file, creating `runs_dir` if needed. Writes to
/// `<file>.tmp` then renames over the target so readers never see a partial
/// file; `rename` is atomic within the same filesystem.
pub fn save(runs_dir: &str, state: &PersistedRunState) -> Result<(), AgentError> {
    std::fs::create_dir_all(runs_dir)?;
    let target = state_path(runs_dir, &state.run_id);
    let tmp = target.with_extension("json.tmp");

    let bytes = serde_json::to_vec_pretty(state)
        .map_err(|e| AgentError::validation(format!("failed to serialize run state: {e}")))?;
    std::fs::write(&tmp, &bytes)?;
    std::fs::rename(&tmp, &target)?;
    Ok(())
}

/// Load a run's persisted state, if any file exists for it yet.
pub fn load(runs_dir: &str, run_id: &RunId) -> Option<PersistedRunState> {
    let bytes = std::fs::read(state_path(runs_dir, run_id)).ok()?;
    serde_json::from_slice(&bytes).ok()
}
