// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C3 — the per-run command queue: enqueue (validated against the magic-verb
//! set or the operator allowlist), FIFO poll, and idempotent ack.

use relay_core::{Command, CommandId, CommandStatus, MagicVerb, RunId};

use crate::error::GatewayError;
use crate::hub::Hub;
use crate::state::GatewayState;
use crate::store::Store;

/// Enqueue `command_text` against `run_id`. Rejects non-magic commands that
/// don't match the configured allowlist — defense-in-depth; the agent
/// re-checks its own copy of the allowlist before executing.
pub async fn enqueue(
    state: &GatewayState,
    run_id: &RunId,
    command_text: String,
) -> Result<Command, GatewayError> {
    if MagicVerb::parse(&command_text).is_none() && !state.config.command_allowed(&command_text) {
        return Err(GatewayError::validation(format!(
            "command not allowlisted: {command_text}"
        )));
    }
    let now_ms = state.clock.now_ms();
    let command = Command::new(run_id.clone(), command_text, now_ms);
    state.store.enqueue_command(command.clone()).await;
    state.hub.publish(Hub::command_queued(&command)).await;
    Ok(command)
}

/// Commands still awaiting execution, in FIFO order.
pub async fn poll_pending(state: &GatewayState, run_id: &RunId) -> Vec<Command> {
    state
        .store
        .list_commands(run_id)
        .await
        .into_iter()
        .filter(|c| c.status == CommandStatus::Pending)
        .collect()
}

/// Ack a command. Idempotent — a second ack of an already-completed command
/// leaves its `(result, error)` untouched ([`Command::ack`]) but still
/// republishes the `command_completed` notification, which is harmless under
/// at-most-once fanout since subscribers re-read authoritative state.
pub async fn ack(
    state: &GatewayState,
    run_id: &RunId,
    command_id: &CommandId,
    result: Option<String>,
    error: Option<String>,
) -> Result<Command, GatewayError> {
    let now_ms = state.clock.now_ms();
    let acked = state
        .store
        .update_command(run_id, command_id, |cmd| {
            cmd.ack(result, error, now_ms);
            cmd.clone()
        })
        .await
        .ok_or_else(|| GatewayError::not_found("command not found"))?;
    state.hub.publish(Hub::command_completed(&acked)).await;
    Ok(acked)
}
