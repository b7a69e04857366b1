// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The kind of subprocess spawned for a run.

use serde::{Deserialize, Serialize};

/// Which LLM CLI (or pseudo-worker) a run's subprocess drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkerType {
    Claude,
    OllamaLaunch,
    Codex,
    Gemini,
    Rev,
    Vnc,
    HandsOn,
}

impl WorkerType {
    pub const ALL: [WorkerType; 7] = [
        WorkerType::Claude,
        WorkerType::OllamaLaunch,
        WorkerType::Codex,
        WorkerType::Gemini,
        WorkerType::Rev,
        WorkerType::Vnc,
        WorkerType::HandsOn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::OllamaLaunch => "ollama-launch",
            Self::Codex => "codex",
            Self::Gemini => "gemini",
            Self::Rev => "rev",
            Self::Vnc => "vnc",
            Self::HandsOn => "hands-on",
        }
    }
}

impl std::fmt::Display for WorkerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WorkerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|w| w.as_str() == s)
            .ok_or_else(|| format!("unknown worker type: {s}"))
    }
}
