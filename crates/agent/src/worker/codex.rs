// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Codex CLI recipe — `codex exec [--full-auto] [--model <model>]
//! --prompt <prompt>`.

use relay_core::{Run, WorkerType};

use super::WorkerRecipe;
use crate::config::ListenConfig;

pub struct CodexRecipe {
    binary: String,
    default_model: Option<String>,
}

impl CodexRecipe {
    pub fn new(config: &ListenConfig) -> Self {
        Self { binary: config.codex_bin.clone(), default_model: config.codex_default_model.clone() }
    }
}

impl WorkerRecipe for CodexRecipe {
    fn worker_type(&self) -> WorkerType {
        WorkerType::Codex
    }

    fn binary(&self) -> &str {
        &self.binary
    }

    fn build_argv(&self, run: &Run) -> Vec<String> {
        let mut argv = vec!["exec".to_owned()];
        if run.autonomous {
            argv.push("--full-auto".to_owned());
        }
        if let Some(model) = run.model.as_deref().or(self.default_model.as_deref()) {
            argv.push("--model".to_owned());
            argv.push(model.to_owned());
        }
        if let Some(command) = run.command.as_deref() {
            if !command.trim().is_empty() {
                argv.push("--prompt".to_owned());
                argv.push(command.to_owned());
            }
        }
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
    fn builds_an_exec_subcommand_with_a_prompt_flag() {
        let run = Run::create(NewRun { command: Some("fix the bug".to_owned()), ..Default::default() }, 0);
        let recipe = CodexRecipe::new(&listen_config());
        let argv = recipe.build_argv(&run);
        assert_eq!(argv[0], "exec");
        assert!(argv.windows(2).any(|w| w == ["--prompt".to_owned(), "fix the bug".to_owned()]));
    }

    #[test]
    fn empty_prompt_omits_the_prompt_flag_entirely() {
        let run = Run::create(NewRun::default(), 0);
        let recipe = CodexRecipe::new(&listen_config());
        let argv = recipe.build_argv(&run);
        assert!(!argv.contains(&"--prompt".to_owned()));
    }
}
