// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistence seam for runs/events/commands/agents (A1).
//!
//! One implementation ships — [`memory::MemoryStore`] — but the trait keeps
//! the storage concern separate from the run/command/registry logic built on
//! top of it, the way the teacher separates `EventLog`'s file I/O from the
//! state-machine code that calls it.

pub mod memory;

use relay_core::{
    AgentId, AgentRecord, Command, CommandId, Event, EventType, Run, RunId, RunState, WorkerType,
};

/// Persistence operations needed by the gateway's control-plane logic.
///
/// Mutation methods that need read-modify-write atomicity take a closure run
/// under the implementation's own lock, rather than exposing separate
/// read/write calls that could race between them.
pub trait Store: Send + Sync + 'static {
    // -- Runs ----------------------------------------------------------

    fn insert_run(&self, run: Run) -> impl Future<Output = ()> + Send;

    fn get_run(&self, id: &RunId) -> impl Future<Output = Option<Run>> + Send;

    fn list_runs(&self) -> impl Future<Output = Vec<Run>> + Send;

    fn update_run<F, R>(&self, id: &RunId, f: F) -> impl Future<Output = Option<R>> + Send
    where
        F: FnOnce(&mut Run) -> R + Send;

    /// Assign the oldest pending run whose `workerType` is in `supported`
    /// and whose `assignedAgentId` is either unset or already `agent_id`
    /// (claim idempotence) to `agent_id`. Does not transition run status —
    /// that happens only on the agent's `marker:started` event.
    fn claim_pending_run(
        &self,
        agent_id: &AgentId,
        supported: &[WorkerType],
    ) -> impl Future<Output = Option<Run>> + Send;

    /// Remove a run and cascade-delete its events and commands.
    fn delete_run(&self, id: &RunId) -> impl Future<Output = bool> + Send;

    // -- Events ----------------------------------------------------------

    /// Append an event to `run_id`'s log, assigning the next per-run `seq`.
    fn append_event(
        &self,
        run_id: &RunId,
        kind: EventType,
        data: String,
        sender_seq: Option<u64>,
        now_ms: u64,
    ) -> impl Future<Output = Event> + Send;

    /// Events for `run_id` with `seq > after_seq`, in ascending order.
    fn list_events(
        &self,
        run_id: &RunId,
        after_seq: u64,
    ) -> impl Future<Output = Vec<Event>> + Send;

    // -- Commands ----------------------------------------------------------

    fn enqueue_command(&self, command: Command) -> impl Future<Output = ()> + Send;

    /// Commands for `run_id` in FIFO (creation) order.
    fn list_commands(&self, run_id: &RunId) -> impl Future<Output = Vec<Command>> + Send;

    fn get_command(
        &self,
        run_id: &RunId,
        command_id: &CommandId,
    ) -> impl Future<Output = Option<Command>> + Send;

    fn update_command<F, R>(
        &self,
        run_id: &RunId,
        command_id: &CommandId,
        f: F,
    ) -> impl Future<Output = Option<R>> + Send
    where
        F: FnOnce(&mut Command) -> R + Send;

    // -- Agents ----------------------------------------------------------

    fn upsert_agent(&self, record: AgentRecord) -> impl Future<Output = ()> + Send;

    fn get_agent(&self, agent_id: &AgentId) -> impl Future<Output = Option<AgentRecord>> + Send;

    fn list_agents(&self) -> impl Future<Output = Vec<AgentRecord>> + Send;

    fn update_agent<F, R>(&self, agent_id: &AgentId, f: F) -> impl Future<Output = Option<R>> + Send
    where
        F: FnOnce(&mut AgentRecord) -> R + Send;

    // -- Run state snapshots ---------------------------------------------

    /// Overwrite `run_id`'s persisted-state snapshot (agent heartbeat tick).
    fn save_run_state(&self, run_id: &RunId, state: RunState) -> impl Future<Output = ()> + Send;

    fn get_run_state(&self, run_id: &RunId) -> impl Future<Output = Option<RunState>> + Send;

    // -- Artifacts ---------------------------------------------------------

    /// Store (overwriting any existing artifact of the same `name`) a blob
    /// uploaded against `run_id`, e.g. `latest.diff` or the session log.
    fn put_artifact(&self, run_id: &RunId, name: String, bytes: Vec<u8>) -> impl Future<Output = ()> + Send;

    fn get_artifact(&self, run_id: &RunId, name: &str) -> impl Future<Output = Option<Vec<u8>>> + Send;

    fn list_artifacts(&self, run_id: &RunId) -> impl Future<Output = Vec<String>> + Send;
}
