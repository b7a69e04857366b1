// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Gemini CLI recipe — `gemini --output-format json --approval-mode
//! <mode> [--model <model>] [prompt]`.

use relay_core::{Run, WorkerType};

use super::{push_prompt, WorkerRecipe};
use crate::config::ListenConfig;

pub struct GeminiRecipe {
    binary: String,
    default_model: Option<String>,
    approval_mode: String,
}

impl GeminiRecipe {
    pub fn new(config: &ListenConfig) -> Self {
        Self {
            binary: config.gemini_bin.clone(),
            default_model: config.gemini_default_model.clone(),
            approval_mode: config.gemini_approval_mode.clone(),
        }
    }
}

impl WorkerRecipe for GeminiRecipe {
    fn worker_type(&self) -> WorkerType {
        WorkerType::Gemini
    }

    fn binary(&self) -> &str {
        &self.binary
    }

    fn build_argv(&self, run: &Run) -> Vec<String> {
        let approval_mode = if run.autonomous { "yolo".to_owned() } else { self.approval_mode.clone() };
        let mut argv =
            vec!["--output-format".to_owned(), "json".to_owned(), "--approval-mode".to_owned(), approval_mode];
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
    fn autonomous_runs_use_yolo_approval_mode() {
        let run = Run::create(NewRun { autonomous: Some(true), ..Default::default() }, 0);
        let recipe = GeminiRecipe::new(&listen_config());
        let argv = recipe.build_argv(&run);
        assert!(argv.windows(2).any(|w| w == ["--approval-mode".to_owned(), "yolo".to_owned()]));
    }

    #[test]
    fn non_autonomous_runs_use_the_configured_default_mode() {
        let run = Run::create(NewRun::default(), 0);
        let recipe = GeminiRecipe::new(&listen_config());
        let argv = recipe.build_argv(&run);
        assert!(argv.windows(2).any(|w| w == ["--approval-mode".to_owned(), "auto_edit".to_owned()]));
    }
}
