// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Rev CLI recipe — `rev --llm-provider <provider> [--trust-workspace]
//! [--model <model>] [prompt]`.

use relay_core::{Run, WorkerType};

use super::{push_prompt, WorkerRecipe};
use crate::config::ListenConfig;

pub struct RevRecipe {
    binary: String,
    llm_provider: String,
}

impl RevRecipe {
    pub fn new(config: &ListenConfig) -> Self {
        Self { binary: config.rev_bin.clone(), llm_provider: config.rev_llm_provider.clone() }
    }
}

impl WorkerRecipe for RevRecipe {
    fn worker_type(&self) -> WorkerType {
        WorkerType::Rev
    }

    fn binary(&self) -> &str {
        &self.binary
    }

    fn build_argv(&self, run: &Run) -> Vec<String> {
        let provider = run.provider.as_deref().unwrap_or(&self.llm_provider);
        let mut argv = vec!["--llm-provider".to_owned(), provider.to_owned()];
        if run.autonomous {
            argv.push("--trust-workspace".to_owned());
        }
        if let Some(model) = run.model.as_deref() {
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
    fn a_run_scoped_provider_overrides_the_agent_default() {
        let run = Run::create(NewRun { provider: Some("openai".to_owned()), ..Default::default() }, 0);
        let recipe = RevRecipe::new(&listen_config());
        let argv = recipe.build_argv(&run);
        assert!(argv.windows(2).any(|w| w == ["--llm-provider".to_owned(), "openai".to_owned()]));
    }

    #[test]
    fn only_autonomous_runs_trust_the_workspace() {
        let run = Run::create(NewRun::default(), 0);
        let recipe = RevRecipe::new(&listen_config());
        assert!(!recipe.build_argv(&run).contains(&"--trust-workspace".to_owned()));
    }
}
