// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C6 — the agent registry and claim dispatcher. Liveness is refreshed
//! lazily on each read (no background sweep), the same way the wire crate's
//! `NonceStore` purges lazily on each check rather than ticking a timer.

use relay_core::{AgentId, AgentRecord, Liveness, Run, WorkerType};

use crate::hub::HubEvent;
use crate::state::GatewayState;
use crate::store::Store;

/// Register (or re-register) an agent under the operator-chosen `agent_id`
/// it was started with (`relay-agent listen --agent-id ...`). Re-
/// registering refreshes label/version/capabilities and resets liveness to
/// online, the same as a heartbeat.
pub async fn register(
    state: &GatewayState,
    agent_id: AgentId,
    label: String,
    version: String,
    capabilities: Vec<WorkerType>,
) -> AgentRecord {
    let now_ms = state.clock.now_ms();
    let record = AgentRecord::new(agent_id, label, version, capabilities, now_ms);
    state.store.upsert_agent(record.clone()).await;
    record
}

pub async fn heartbeat(state: &GatewayState, agent_id: &AgentId) -> Option<AgentRecord> {
    let now_ms = state.clock.now_ms();
    let record = state
        .store
        .update_agent(agent_id, |record| {
            record.heartbeat(now_ms);
            record.clone()
        })
        .await?;
    state
        .hub
        .publish(HubEvent::AgentLivenessChanged {
            agent_id: agent_id.clone(),
            liveness: format!("{:?}", record.liveness).to_lowercase(),
        })
        .await;
    Some(record)
}

/// Current liveness-refreshed view of one agent.
pub async fn get(state: &GatewayState, agent_id: &AgentId) -> Option<AgentRecord> {
    refresh_one(state, agent_id).await
}

/// Current liveness-refreshed view of every registered agent.
pub async fn list(state: &GatewayState) -> Vec<AgentRecord> {
    let mut out = Vec::new();
    for record in state.store.list_agents().await {
        if let Some(refreshed) = refresh_one(state, &record.agent_id).await {
            out.push(refreshed);
        }
    }
    out
}

async fn refresh_one(state: &GatewayState, agent_id: &AgentId) -> Option<AgentRecord> {
    let now_ms = state.clock.now_ms();
    let degraded_ms = state.config.degraded_threshold_seconds * 1_000;
    let offline_ms = state.config.offline_threshold_seconds * 1_000;
    state
        .store
        .update_agent(agent_id, |record| {
            record.refresh_liveness(now_ms, degraded_ms, offline_ms);
            record.clone()
        })
        .await
}

/// Claim the oldest pending run this agent supports, per its declared
/// capabilities. Online/degraded agents may claim; offline agents should be
/// refused at the transport layer before reaching here.
pub async fn claim(state: &GatewayState, agent_id: &AgentId) -> Option<Run> {
    let record = get(state, agent_id).await?;
    state.store.claim_pending_run(agent_id, &record.capabilities).await
}
