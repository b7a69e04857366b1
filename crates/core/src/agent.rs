// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A self-registered agent host (C6's registry entry).

use serde::{Deserialize, Serialize};

use crate::ids::AgentId;
use crate::worker_type::WorkerType;

/// Two-level liveness with hysteresis: an agent degrades before it goes
/// fully offline, and recovers straight to online on the next heartbeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Liveness {
    Online,
    Degraded,
    Offline,
}

/// A registered agent host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRecord {
    pub agent_id: AgentId,
    pub label: String,
    pub version: String,
    pub capabilities: Vec<WorkerType>,
    pub liveness: Liveness,
    pub registered_at_ms: u64,
    pub last_heartbeat_ms: u64,
}

impl AgentRecord {
    pub fn new(
        agent_id: AgentId,
        label: String,
        version: String,
        capabilities: Vec<WorkerType>,
        now_ms: u64,
    ) -> Self {
        Self {
            agent_id,
            label,
            version,
            capabilities,
            liveness: Liveness::Online,
            registered_at_ms: now_ms,
            last_heartbeat_ms: now_ms,
        }
    }

    pub fn heartbeat(&mut self, now_ms: u64) {
        self.last_heartbeat_ms = now_ms;
        self.liveness = Liveness::Online;
    }

    pub fn supports(&self, worker_type: WorkerType) -> bool {
        self.capabilities.contains(&worker_type)
    }

    /// Recompute liveness from elapsed time since the last heartbeat.
    /// Recovery only happens via an actual heartbeat, not by this check —
    /// this only ever degrades or offlines, never upgrades.
    pub fn refresh_liveness(&mut self, now_ms: u64, degraded_after_ms: u64, offline_after_ms: u64) {
        let elapsed = now_ms.saturating_sub(self.last_heartbeat_ms);
        self.liveness = if elapsed >= offline_after_ms {
            Liveness::Offline
        } else if elapsed >= degraded_after_ms {
            Liveness::Degraded
        } else {
            Liveness::Online
        };
    }
}
