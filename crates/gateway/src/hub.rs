// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subscription hub (C5): fans out run/agent activity to WebSocket
//! subscribers over per-topic `tokio::sync::broadcast` channels, grounded in
//! the teacher's `Aggregator`. Best-effort, at-most-once — a slow subscriber
//! drops the oldest queued message rather than stall the sender; callers
//! reconcile gaps with a cursor read against the event log.

use std::collections::HashMap;
use std::sync::Arc;

use relay_core::{AgentId, Command, Event, RunId};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};

/// One fanned-out notification. Subscribers re-read authoritative state
/// (event log, run record) off the payload's id rather than trusting this
/// message to carry the full picture — it's a nudge, not a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HubEvent {
    EventAppended { run_id: RunId, event: Event },
    RunStatusChanged { run_id: RunId, status: String },
    CommandQueued { run_id: RunId, command_id: String },
    CommandCompleted { run_id: RunId, command_id: String },
    AgentLivenessChanged { agent_id: AgentId, liveness: String },
}

impl HubEvent {
    fn run_id(&self) -> Option<&RunId> {
        match self {
            Self::EventAppended { run_id, .. }
            | Self::RunStatusChanged { run_id, .. }
            | Self::CommandQueued { run_id, .. }
            | Self::CommandCompleted { run_id, .. } => Some(run_id),
            Self::AgentLivenessChanged { .. } => None,
        }
    }
}

const ALL_TOPIC: &str = "all";

fn run_topic(run_id: &RunId) -> String {
    format!("run/{run_id}")
}

/// Per-topic broadcast hub. `"all"` receives every event; `"run/<id>"`
/// receives only events scoped to that run.
pub struct Hub {
    buffer: usize,
    topics: RwLock<HashMap<String, broadcast::Sender<Arc<HubEvent>>>>,
}

impl Hub {
    pub fn new(buffer: usize) -> Self {
        Self { buffer, topics: RwLock::new(HashMap::new()) }
    }

    async fn sender(&self, topic: &str) -> broadcast::Sender<Arc<HubEvent>> {
        if let Some(tx) = self.topics.read().await.get(topic) {
            return tx.clone();
        }
        let mut topics = self.topics.write().await;
        topics
            .entry(topic.to_owned())
            .or_insert_with(|| broadcast::channel(self.buffer).0)
            .clone()
    }

    /// Subscribe to the global feed.
    pub async fn subscribe_all(&self) -> broadcast::Receiver<Arc<HubEvent>> {
        self.sender(ALL_TOPIC).await.subscribe()
    }

    /// Subscribe to a single run's feed.
    pub async fn subscribe_run(&self, run_id: &RunId) -> broadcast::Receiver<Arc<HubEvent>> {
        self.sender(&run_topic(run_id)).await.subscribe()
    }

    /// Publish to `"all"` and, when the event is run-scoped, to that run's
    /// topic too. No-op (besides the attempted send) when nobody's
    /// listening — `broadcast::Sender::send` failing just means 0 receivers.
    pub async fn publish(&self, event: HubEvent) {
        let event = Arc::new(event);
        let _ = self.sender(ALL_TOPIC).await.send(event.clone());
        if let Some(run_id) = event.run_id() {
            let _ = self.sender(&run_topic(run_id)).await.send(event);
        }
    }

    pub fn event_appended(run_id: RunId, event: Event) -> HubEvent {
        HubEvent::EventAppended { run_id, event }
    }

    pub fn command_queued(command: &Command) -> HubEvent {
        HubEvent::CommandQueued { run_id: command.run_id.clone(), command_id: command.id.to_string() }
    }

    pub fn command_completed(command: &Command) -> HubEvent {
        HubEvent::CommandCompleted {
            run_id: command.run_id.clone(),
            command_id: command.id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use relay_core::{EventId, EventType};

    use super::*;

    fn sample_event(run_id: &RunId) -> Event {
        Event {
            id: EventId::new(),
            run_id: run_id.clone(),
            seq: 1,
            kind: EventType::Stdout,
            data: "hi".to_owned(),
            at_ms: 0,
            sender_seq: None,
        }
    }

    #[tokio::test]
    async fn a_run_scoped_publish_reaches_both_its_topic_and_all() {
        let hub = Hub::new(16);
        let run_id = RunId::new();
        let mut run_rx = hub.subscribe_run(&run_id).await;
        let mut all_rx = hub.subscribe_all().await;

        hub.publish(Hub::event_appended(run_id.clone(), sample_event(&run_id))).await;

        assert!(run_rx.recv().await.is_ok());
        assert!(all_rx.recv().await.is_ok());
    }

    #[tokio::test]
    async fn a_different_run_s_subscriber_does_not_see_the_event() {
        let hub = Hub::new(16);
        let run_a = RunId::new();
        let run_b = RunId::new();
        let mut rx_b = hub.subscribe_run(&run_b).await;

        hub.publish(Hub::event_appended(run_a.clone(), sample_event(&run_a))).await;

        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn publishing_with_no_subscribers_does_not_panic() {
        let hub = Hub::new(16);
        let run_id = RunId::new();
        hub.publish(Hub::event_appended(run_id.clone(), sample_event(&run_id))).await;
    }
}
