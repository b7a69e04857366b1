// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Claude Code CLI recipe — `claude --print --session-id <runId> [--model
//! <model>] [prompt]`.

use relay_core::{Run, WorkerType};

use super::{push_prompt, WorkerRecipe};
use crate::config::ListenConfig;

pub struct ClaudeRecipe {
    binary: String,
    default_model: Option<String>,
}

impl ClaudeRecipe {
    pub fn new(config: &ListenConfig) -> Self {
        Self { binary: config.claude_bin.clone(), default_model: config.claude_default_model.clone() }
    }
}

impl WorkerRecipe for ClaudeRecipe {
    fn worker_type(&self) -> WorkerType {
        WorkerType::Claude
    }

    fn binary(&self) -> &str {
        &self.binary
    }

    fn build_argv(&self, run: &Run) -> Vec<String> {
        let mut argv = vec!["--print".to_owned(), "--session-id".to_owned(), run.id.to_string()];
        if run.autonomous {
            argv.push("--dangerously-skip-permissions".to_owned());
        }
        if let Some(model) = run.model.as_deref().or(self.default_model.as_deref()) {
            argv.push("--model".to_owned());
            argv.push(model.to_owned());
        }
        push_prompt(&mut argv, run);
        argv
    }

    fn build_env(&self, _run: &Run) -> Vec<(String, String)> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use relay_core::NewRun;

    use super::*;
    use crate::config::tests_support::listen_config;

    #[test]
    fn builds_a_print_session_argv_with_the_run_id() {
        let run = Run::create(
            NewRun { command: Some("hello".to_owned()), ..Default::default() },
            0,
        );
        let recipe = ClaudeRecipe::new(&listen_config());
        let argv = recipe.build_argv(&run);
        assert_eq!(argv[0], "--print");
        assert_eq!(argv[1], "--session-id");
        assert_eq!(argv[2], run.id.to_string());
        assert_eq!(argv.last(), Some(&"hello".to_owned()));
    }

    #[test]
    fn autonomous_runs_add_the_skip_permissions_flag() {
        let run = Run::create(NewRun { autonomous: Some(true), ..Default::default() }, 0);
        let recipe = ClaudeRecipe::new(&listen_config());
        let argv = recipe.build_argv(&run);
        assert!(argv.contains(&"--dangerously-skip-permissions".to_owned()));
    }
}
