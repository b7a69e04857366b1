// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Ollama recipe — `ollama run <model> [prompt]` or `ollama launch
//! <integration>`, with `OLLAMA_HOST` set in the child's environment.

use relay_core::{Run, WorkerType};

use super::{push_prompt, WorkerRecipe};
use crate::config::ListenConfig;

pub struct OllamaRecipe {
    binary: String,
    default_model: Option<String>,
    subcommand: String,
    host: String,
}

impl OllamaRecipe {
    pub fn new(config: &ListenConfig) -> Self {
        Self {
            binary: config.ollama_bin.clone(),
            default_model: config.ollama_default_model.clone(),
            subcommand: config.ollama_subcommand.clone(),
            host: config.ollama_host.clone(),
        }
    }
}

impl WorkerRecipe for OllamaRecipe {
    fn worker_type(&self) -> WorkerType {
        WorkerType::OllamaLaunch
    }

    fn binary(&self) -> &str {
        &self.binary
    }

    fn build_argv(&self, run: &Run) -> Vec<String> {
        if self.subcommand == "launch" {
            let integration = run.integration.as_deref().unwrap_or("default");
            return vec!["launch".to_owned(), integration.to_owned()];
        }
        let model = run.model.as_deref().or(self.default_model.as_deref()).unwrap_or("llama3");
        let mut argv = vec!["run".to_owned(), model.to_owned()];
        push_prompt(&mut argv, run);
        argv
    }

    fn build_env(&self, _run: &Run) -> Vec<(String, String)> {
        vec![("OLLAMA_HOST".to_owned(), self.host.clone())]
    }
}
