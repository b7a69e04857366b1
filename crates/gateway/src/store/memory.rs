// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory `Store` implementation. Everything lives for the life of the
//! process — restart loses history, same as the teacher's session registry.

use std::collections::HashMap;

use indexmap::IndexMap;
use relay_core::{
    AgentId, AgentRecord, Command, CommandId, Event, EventId, EventType, Run, RunId, RunState,
    WorkerType,
};
use tokio::sync::RwLock;

use super::Store;

#[derive(Default)]
pub struct MemoryStore {
    runs: RwLock<IndexMap<RunId, Run>>,
    events: RwLock<HashMap<RunId, Vec<Event>>>,
    commands: RwLock<HashMap<RunId, Vec<Command>>>,
    agents: RwLock<HashMap<AgentId, AgentRecord>>,
    run_states: RwLock<HashMap<RunId, RunState>>,
    artifacts: RwLock<HashMap<RunId, HashMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    async fn insert_run(&self, run: Run) {
        self.runs.write().await.insert(run.id.clone(), run);
    }

    async fn get_run(&self, id: &RunId) -> Option<Run> {
        self.runs.read().await.get(id).cloned()
    }

    async fn list_runs(&self) -> Vec<Run> {
        self.runs.read().await.values().cloned().collect()
    }

    async fn update_run<F, R>(&self, id: &RunId, f: F) -> Option<R>
    where
        F: FnOnce(&mut Run) -> R + Send,
    {
        let mut runs = self.runs.write().await;
        runs.get_mut(id).map(f)
    }

    async fn claim_pending_run(&self, agent_id: &AgentId, supported: &[WorkerType]) -> Option<Run> {
        let mut runs = self.runs.write().await;
        let claimable = runs.values_mut().find(|run| {
            run.status == relay_core::RunStatus::Pending
                && supported.contains(&run.worker_type)
                && run
                    .assigned_agent_id
                    .as_ref()
                    .map_or(true, |assigned| assigned == agent_id)
        })?;
        claimable.assigned_agent_id = Some(agent_id.clone());
        Some(claimable.clone())
    }

    async fn delete_run(&self, id: &RunId) -> bool {
        let removed = self.runs.write().await.shift_remove(id).is_some();
        if removed {
            self.events.write().await.remove(id);
            self.commands.write().await.remove(id);
            self.run_states.write().await.remove(id);
            self.artifacts.write().await.remove(id);
        }
        removed
    }

    async fn append_event(
        &self,
        run_id: &RunId,
        kind: EventType,
        data: String,
        sender_seq: Option<u64>,
        now_ms: u64,
    ) -> Event {
        let mut events = self.events.write().await;
        let log = events.entry(run_id.clone()).or_default();
        let event = Event {
            id: EventId::new(),
            run_id: run_id.clone(),
            seq: log.len() as u64 + 1,
            kind,
            data,
            at_ms: now_ms,
            sender_seq,
        };
        log.push(event.clone());
        event
    }

    async fn list_events(&self, run_id: &RunId, after_seq: u64) -> Vec<Event> {
        self.events
            .read()
            .await
            .get(run_id)
            .map(|log| log.iter().filter(|e| e.seq > after_seq).cloned().collect())
            .unwrap_or_default()
    }

    async fn enqueue_command(&self, command: Command) {
        self.commands.write().await.entry(command.run_id.clone()).or_default().push(command);
    }

    async fn list_commands(&self, run_id: &RunId) -> Vec<Command> {
        self.commands.read().await.get(run_id).cloned().unwrap_or_default()
    }

    async fn get_command(&self, run_id: &RunId, command_id: &CommandId) -> Option<Command> {
        self.commands
            .read()
            .await
            .get(run_id)
            .and_then(|cmds| cmds.iter().find(|c| &c.id == command_id).cloned())
    }

    async fn update_command<F, R>(&self, run_id: &RunId, command_id: &CommandId, f: F) -> Option<R>
    where
        F: FnOnce(&mut Command) -> R + Send,
    {
        let mut commands = self.commands.write().await;
        commands.get_mut(run_id)?.iter_mut().find(|c| &c.id == command_id).map(f)
    }

    async fn upsert_agent(&self, record: AgentRecord) {
        self.agents.write().await.insert(record.agent_id.clone(), record);
    }

    async fn get_agent(&self, agent_id: &AgentId) -> Option<AgentRecord> {
        self.agents.read().await.get(agent_id).cloned()
    }

    async fn list_agents(&self) -> Vec<AgentRecord> {
        self.agents.read().await.values().cloned().collect()
    }

    async fn update_agent<F, R>(&self, agent_id: &AgentId, f: F) -> Option<R>
    where
        F: FnOnce(&mut AgentRecord) -> R + Send,
    {
        let mut agents = self.agents.write().await;
        agents.get_mut(agent_id).map(f)
    }

    async fn save_run_state(&self, run_id: &RunId, state: RunState) {
        self.run_states.write().await.insert(run_id.clone(), state);
    }

    async fn get_run_state(&self, run_id: &RunId) -> Option<RunState> {
        self.run_states.read().await.get(run_id).cloned()
    }

    async fn put_artifact(&self, run_id: &RunId, name: String, bytes: Vec<u8>) {
        self.artifacts.write().await.entry(run_id.clone()).or_default().insert(name, bytes);
    }

    async fn get_artifact(&self, run_id: &RunId, name: &str) -> Option<Vec<u8>> {
        self.artifacts.read().await.get(run_id).and_then(|m| m.get(name)).cloned()
    }

    async fn list_artifacts(&self, run_id: &RunId) -> Vec<String> {
        self.artifacts.read().await.get(run_id).map(|m| m.keys().cloned().collect()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use relay_core::{NewRun, RunStatus};

    use super::*;

    fn run(worker_type: WorkerType) -> Run {
        Run::create(NewRun { worker_type: Some(worker_type), ..Default::default() }, 1_000)
    }

    #[tokio::test]
    async fn claim_picks_oldest_unassigned_matching_run() {
        let store = MemoryStore::new();
        let first = run(WorkerType::Claude);
        let second = run(WorkerType::Claude);
        store.insert_run(first.clone()).await;
        store.insert_run(second.clone()).await;

        let agent = AgentId::new();
        let claimed = store.claim_pending_run(&agent, &[WorkerType::Claude]).await;
        assert_eq!(claimed.map(|r| r.id), Some(first.id));
    }

    #[tokio::test]
    async fn claim_skips_runs_assigned_to_a_different_agent() {
        let store = MemoryStore::new();
        let mut assigned = run(WorkerType::Claude);
        let other_agent = AgentId::new();
        assigned.assigned_agent_id = Some(other_agent);
        store.insert_run(assigned).await;

        let agent = AgentId::new();
        assert!(store.claim_pending_run(&agent, &[WorkerType::Claude]).await.is_none());
    }

    #[tokio::test]
    async fn claim_respects_worker_type_support() {
        let store = MemoryStore::new();
        store.insert_run(run(WorkerType::Gemini)).await;

        let agent = AgentId::new();
        assert!(store.claim_pending_run(&agent, &[WorkerType::Claude]).await.is_none());
    }

    #[tokio::test]
    async fn event_seq_is_strictly_increasing_per_run() {
        let store = MemoryStore::new();
        let run_id = RunId::new();
        let e1 = store.append_event(&run_id, EventType::Stdout, "a".into(), None, 1).await;
        let e2 = store.append_event(&run_id, EventType::Stdout, "b".into(), None, 2).await;
        assert_eq!(e1.seq, 1);
        assert_eq!(e2.seq, 2);

        let since_first = store.list_events(&run_id, e1.seq).await;
        assert_eq!(since_first.len(), 1);
        assert_eq!(since_first[0].seq, 2);
    }

    #[tokio::test]
    async fn delete_run_cascades_to_events_and_commands() {
        let store = MemoryStore::new();
        let r = run(WorkerType::Claude);
        store.insert_run(r.clone()).await;
        store.append_event(&r.id, EventType::Info, "x".into(), None, 1).await;
        store.enqueue_command(Command::new(r.id.clone(), "ls".into(), 1)).await;

        assert!(store.delete_run(&r.id).await);
        assert!(store.get_run(&r.id).await.is_none());
        assert!(store.list_events(&r.id, 0).await.is_empty());
        assert!(store.list_commands(&r.id).await.is_empty());
    }

    #[tokio::test]
    async fn update_run_mutates_in_place() {
        let store = MemoryStore::new();
        let r = run(WorkerType::Claude);
        store.insert_run(r.clone()).await;

        store
            .update_run(&r.id, |run| run.status = RunStatus::Running)
            .await;
        let reloaded = store.get_run(&r.id).await;
        assert_eq!(reloaded.map(|run| run.status), Some(RunStatus::Running));
    }

    #[tokio::test]
    async fn run_state_round_trips_and_is_cascade_deleted() {
        let store = MemoryStore::new();
        let r = run(WorkerType::Claude);
        store.insert_run(r.clone()).await;
        store
            .save_run_state(
                &r.id,
                RunState { working_dir: Some("/workspace".into()), saved_at_ms: 5, ..Default::default() },
            )
            .await;

        let state = store.get_run_state(&r.id).await;
        assert_eq!(state.map(|s| s.working_dir), Some(Some("/workspace".to_owned())));

        store.delete_run(&r.id).await;
        assert!(store.get_run_state(&r.id).await.is_none());
    }

    #[tokio::test]
    async fn artifacts_round_trip_and_are_cascade_deleted() {
        let store = MemoryStore::new();
        let r = run(WorkerType::Claude);
        store.insert_run(r.clone()).await;
        store.put_artifact(&r.id, "latest.diff".into(), b"diff --git a b".to_vec()).await;

        assert_eq!(store.list_artifacts(&r.id).await, vec!["latest.diff".to_owned()]);
        assert_eq!(store.get_artifact(&r.id, "latest.diff").await, Some(b"diff --git a b".to_vec()));

        store.delete_run(&r.id).await;
        assert!(store.get_artifact(&r.id, "latest.diff").await.is_none());
    }
}
