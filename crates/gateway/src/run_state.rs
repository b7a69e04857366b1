// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Derived-cache mirror of the agent's locally persisted run state, posted
//! on every heartbeat tick via `POST /api/runs/:id/state` and read back by
//! operators via `GET /api/runs/:id/state`. The gateway never computes this
//! — it only stores whatever the agent last reported.

use relay_core::{RunId, RunState};

use crate::state::GatewayState;
use crate::store::Store;

pub async fn save(state: &GatewayState, run_id: &RunId, mut snapshot: RunState) {
    snapshot.saved_at_ms = state.clock.now_ms();
    state.store.save_run_state(run_id, snapshot).await;
}

pub async fn get(state: &GatewayState, run_id: &RunId) -> Option<RunState> {
    state.store.get_run_state(run_id).await
}
