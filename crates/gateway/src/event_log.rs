// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C2 — append/read over the per-run event log, with redaction applied at
//! the write path so nothing unredacted is ever persisted or fanned out.

use relay_core::{Event, EventType, RunId};

use crate::hub::Hub;
use crate::state::GatewayState;
use crate::store::Store;

/// Append a redacted event to `run_id`'s log and publish it to the hub.
pub async fn append(
    state: &GatewayState,
    run_id: &RunId,
    kind: EventType,
    data: &str,
    sender_seq: Option<u64>,
) -> Event {
    let redacted = state.redactor.redact(data);
    let now_ms = state.clock.now_ms();
    let event = state.store.append_event(run_id, kind, redacted, sender_seq, now_ms).await;
    state.hub.publish(Hub::event_appended(run_id.clone(), event.clone())).await;
    event
}

/// Events for `run_id` strictly after `after_seq`, in ascending order.
pub async fn list_since(state: &GatewayState, run_id: &RunId, after_seq: u64) -> Vec<Event> {
    state.store.list_events(run_id, after_seq).await
}
