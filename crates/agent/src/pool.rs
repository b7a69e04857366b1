// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker pool (C8): the set of live [`Driver`] instances on one agent.
//! `spawn` enforces `maxConcurrent`, rejecting with `resource.exhausted`
//! rather than queuing; the dispatcher decides what to do with that (skip
//! the claim cycle, per spec). One `tokio::task` per worker bridges its
//! I/O; the pool itself only tracks lifecycle state and aggregated totals,
//! guarded by a `tokio::sync::Mutex` per the teacher's `MuxState` locking
//! granularity (one lock per logical resource, never a single global lock).

use std::collections::HashMap;
use std::sync::Arc;

use relay_core::RunId;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::driver::{Driver, DriverOutcome};
use crate::error::AgentError;

/// Lifecycle state of one worker, per spec §4.8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Pending,
    Starting,
    Active,
    Stopping,
    Completed,
    Failed,
}

impl WorkerState {
    /// Whether this worker still counts against `maxConcurrent`.
    fn is_live(self) -> bool {
        !matches!(self, Self::Completed | Self::Failed)
    }
}

/// Aggregated counters across every worker this pool has ever run.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoolTotals {
    pub completed: u64,
    pub failed: u64,
}

struct WorkerEntry {
    state: WorkerState,
    shutdown: CancellationToken,
    join: Option<JoinHandle<()>>,
}

/// Owns every worker this agent has spawned. Always held behind an `Arc` so
/// a spawned worker task can report its own state transitions back in.
pub struct WorkerPool {
    max_concurrent: usize,
    workers: Mutex<HashMap<RunId, WorkerEntry>>,
    totals: Mutex<PoolTotals>,
}

impl WorkerPool {
    pub fn new(max_concurrent: usize) -> Arc<Self> {
        Arc::new(Self { max_concurrent, workers: Mutex::new(HashMap::new()), totals: Mutex::new(PoolTotals::default()) })
    }

    pub async fn active_count(&self) -> usize {
        self.workers.lock().await.values().filter(|e| e.state.is_live()).count()
    }

    pub async fn totals(&self) -> PoolTotals {
        *self.totals.lock().await
    }

    pub async fn state_of(&self, run_id: &RunId) -> Option<WorkerState> {
        self.workers.lock().await.get(run_id).map(|e| e.state)
    }

    /// Reserve a slot and spawn `driver` on its own task. Rejects with
    /// `resource.exhausted` without touching the driver when the pool is
    /// already at `maxConcurrent` — the caller (the dispatcher) is expected
    /// to simply skip this claim cycle on that error.
    pub async fn spawn(self: &Arc<Self>, driver: Driver) -> Result<(), AgentError> {
        let run_id = driver.run_id().clone();
        let shutdown = CancellationToken::new();

        {
            let mut workers = self.workers.lock().await;
            let active = workers.values().filter(|e| e.state.is_live()).count();
            if active >= self.max_concurrent {
                return Err(AgentError::resource_exhausted(format!(
                    "worker pool at capacity ({active}/{})",
                    self.max_concurrent
                )));
            }
            workers.insert(run_id.clone(), WorkerEntry { state: WorkerState::Starting, shutdown: shutdown.clone(), join: None });
        }

        let pool = Arc::clone(self);
        let spawned_run_id = run_id.clone();
        let join = tokio::spawn(async move {
            pool.set_state(&spawned_run_id, WorkerState::Active).await;
            let outcome = driver.run(shutdown).await;
            let failed = match outcome {
                DriverOutcome::Finished { exit_code } => !matches!(exit_code, Some(0)),
                DriverOutcome::SpawnFailed(_) => true,
            };
            pool.finish(&spawned_run_id, failed).await;
        });

        if let Some(entry) = self.workers.lock().await.get_mut(&run_id) {
            entry.join = Some(join);
        }
        Ok(())
    }

    async fn set_state(&self, run_id: &RunId, state: WorkerState) {
        if let Some(entry) = self.workers.lock().await.get_mut(run_id) {
            entry.state = state;
        }
    }

    async fn finish(&self, run_id: &RunId, failed: bool) {
        self.set_state(run_id, if failed { WorkerState::Failed } else { WorkerState::Completed }).await;
        let mut totals = self.totals.lock().await;
        if failed {
            totals.failed += 1;
        } else {
            totals.completed += 1;
        }
    }

    /// Signal every live worker to stop and await them all. Used on
    /// graceful shutdown (SIGINT/SIGTERM) to drain before the process exits.
    pub async fn terminate_all(&self) {
        let (tokens, joins) = {
            let mut workers = self.workers.lock().await;
            let mut tokens = Vec::new();
            let mut joins = Vec::new();
            for entry in workers.values_mut() {
                if entry.state.is_live() {
                    entry.state = WorkerState::Stopping;
                    tokens.push(entry.shutdown.clone());
                }
                if let Some(join) = entry.join.take() {
                    joins.push(join);
                }
            }
            (tokens, joins)
        };
        for token in tokens {
            token.cancel();
        }
        for join in joins {
            let _ = join.await;
        }
    }
}
