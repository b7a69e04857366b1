// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The hands-on pseudo-worker: no LLM at all, a plain shell that a human
//! drives entirely through `__INPUT__` commands. Spawns the user's shell
//! (`$SHELL`, defaulting to `/bin/sh`) with no positional prompt.

use relay_core::{Run, WorkerType};

use super::WorkerRecipe;
use crate::config::ListenConfig;

pub struct HandsOnRecipe {
    binary: String,
}

impl HandsOnRecipe {
    pub fn new(_config: &ListenConfig) -> Self {
        let binary = std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_owned());
        Self { binary }
    }
}

impl WorkerRecipe for HandsOnRecipe {
    fn worker_type(&self) -> WorkerType {
        WorkerType::HandsOn
    }

    fn binary(&self) -> &str {
        &self.binary
    }

    fn build_argv(&self, _run: &Run) -> Vec<String> {
        Vec::new()
    }

    fn build_env(&self, _run: &Run) -> Vec<(String, String)> {
        Vec::new()
    }
}
