// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control directives enqueued against a run's agent-side subprocess.

use serde::{Deserialize, Serialize};

use crate::ids::define_string_id;
use crate::run::RunId;

define_string_id!(
    /// Opaque identifier for one queued command.
    CommandId,
    "cmd-"
);

/// Lifecycle of a queued command: pending until acked, then terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandStatus {
    Pending,
    Completed,
}

/// The magic, non-shell verbs a driver interprets rather than executes.
///
/// Wire format is bit-exact ASCII; `__INPUT__:` is followed by arbitrary
/// UTF-8 bytes (which may themselves begin with `\x03` to indicate a
/// Ctrl-C precedes the payload).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MagicVerb {
    Stop,
    Halt,
    Escape,
    Input(String),
    StartVncStream,
}

const STOP: &str = "__STOP__";
const HALT: &str = "__HALT__";
const ESCAPE: &str = "__ESCAPE__";
const INPUT_PREFIX: &str = "__INPUT__:";
const START_VNC_STREAM: &str = "__START_VNC_STREAM__";

impl MagicVerb {
    /// Parse a literal command string, returning `None` for ordinary
    /// shell/allowlisted commands.
    pub fn parse(command: &str) -> Option<Self> {
        if command == STOP {
            Some(Self::Stop)
        } else if command == HALT {
            Some(Self::Halt)
        } else if command == ESCAPE {
            Some(Self::Escape)
        } else if command == START_VNC_STREAM {
            Some(Self::StartVncStream)
        } else {
            command.strip_prefix(INPUT_PREFIX).map(|rest| Self::Input(rest.to_owned()))
        }
    }

    /// Render back to the bit-exact wire string.
    pub fn to_wire(&self) -> String {
        match self {
            Self::Stop => STOP.to_owned(),
            Self::Halt => HALT.to_owned(),
            Self::Escape => ESCAPE.to_owned(),
            Self::StartVncStream => START_VNC_STREAM.to_owned(),
            Self::Input(bytes) => format!("{INPUT_PREFIX}{bytes}"),
        }
    }

    /// Build the `__INPUT__:` verb, optionally prefixing a Ctrl-C byte as the
    /// escape-then-input convention used by the UI's input endpoint.
    pub fn input(text: &str, escape: bool) -> Self {
        let payload = if escape { format!("\x03{text}") } else { text.to_owned() };
        Self::Input(payload)
    }
}

/// A control directive targeted at a run's agent-side subprocess.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    pub id: CommandId,
    pub run_id: RunId,
    pub command: String,
    pub status: CommandStatus,
    pub result: Option<String>,
    pub error: Option<String>,
    pub created_at_ms: u64,
    pub acked_at_ms: Option<u64>,
}

impl Command {
    pub fn new(run_id: RunId, command: String, now_ms: u64) -> Self {
        Self {
            id: CommandId::new(),
            run_id,
            command,
            status: CommandStatus::Pending,
            result: None,
            error: None,
            created_at_ms: now_ms,
            acked_at_ms: None,
        }
    }

    pub fn magic(&self) -> Option<MagicVerb> {
        MagicVerb::parse(&self.command)
    }

    /// Apply an ack. Idempotent: acking an already-completed command leaves
    /// its observable state unchanged.
    pub fn ack(&mut self, result: Option<String>, error: Option<String>, now_ms: u64) {
        if self.status == CommandStatus::Completed {
            return;
        }
        self.status = CommandStatus::Completed;
        self.result = result;
        self.error = error;
        self.acked_at_ms = Some(now_ms);
    }
}
