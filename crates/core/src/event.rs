// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-run append-only event log's record type.

use serde::{Deserialize, Serialize};

use crate::ids::define_string_id;
use crate::run::RunId;

define_string_id!(
    /// Monotonic-per-run event identifier, assigned by the gateway.
    EventId,
    "evt-"
);

/// Kind of one event-log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Stdout,
    Stderr,
    Marker,
    Info,
    Error,
    Assist,
    PromptWaiting,
    PromptResolved,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
            Self::Marker => "marker",
            Self::Info => "info",
            Self::Error => "error",
            Self::Assist => "assist",
            Self::PromptWaiting => "prompt_waiting",
            Self::PromptResolved => "prompt_resolved",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One record in a run's append-only log.
///
/// `seq` is assigned by the gateway atomically at append time, strictly
/// increasing per run, and is the authoritative ordering/cursor key. `id` is
/// an opaque stable identifier for the record. `sender_seq` is whatever the
/// agent happened to tag the chunk with and exists only to aid debugging
/// gaps/reorders — it is never used for ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: EventId,
    pub run_id: RunId,
    pub seq: u64,
    #[serde(rename = "type")]
    pub kind: EventType,
    pub data: String,
    pub at_ms: u64,
    pub sender_seq: Option<u64>,
}

/// Payload carried by a `marker` event announcing a worker has started.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartedMarker {
    pub pid: u32,
    pub command: String,
    pub working_dir: String,
}

/// Payload carried by a `marker` event announcing a worker has exited.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishedMarker {
    pub exit_code: Option<i32>,
    pub stop_requested: bool,
    pub halt_requested: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_round_trips_through_the_wire_name() -> anyhow::Result<()> {
        for (kind, wire) in [
            (EventType::Stdout, "\"stdout\""),
            (EventType::PromptWaiting, "\"prompt_waiting\""),
            (EventType::PromptResolved, "\"prompt_resolved\""),
        ] {
            assert_eq!(serde_json::to_string(&kind)?, wire);
        }
        Ok(())
    }

    #[test]
    fn finished_marker_survives_a_json_round_trip() -> anyhow::Result<()> {
        let marker = FinishedMarker { exit_code: Some(1), stop_requested: true, halt_requested: false };
        let json = serde_json::to_string(&marker)?;
        let back: FinishedMarker = serde_json::from_str(&json)?;
        assert_eq!(back.exit_code, Some(1));
        assert!(back.stop_requested);
        assert!(!back.halt_requested);
        Ok(())
    }
}
