// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker-type capability interface (C7's "inheritance of `BaseRunner`"
//! redesign): a [`WorkerRecipe`] per [`WorkerType`], built once from the
//! agent's config and held in a small registry table, the way the teacher's
//! `driver` module dispatches per-agent-kind setup without an inheritance
//! hierarchy.

mod claude;
mod codex;
mod gemini;
mod hands_on;
mod ollama;
mod rev;
mod vnc;

use relay_core::{Run, WorkerType};

use crate::config::ListenConfig;

/// Builds the argv/env for one worker type. Implementations must never
/// shell-interpolate the prompt — it is always passed as a single argv
/// element so quotes, `$`, and newlines survive untouched (shell mode off
/// unless [`WorkerRecipe::shell_mode`] opts in).
pub trait WorkerRecipe: Send + Sync {
    fn worker_type(&self) -> WorkerType;

    /// The executable to spawn.
    fn binary(&self) -> &str;

    /// Full argument list, in order, excluding the binary itself.
    fn build_argv(&self, run: &Run) -> Vec<String>;

    /// Extra environment variables layered over the inherited environment.
    fn build_env(&self, run: &Run) -> Vec<(String, String)>;

    /// Whether this recipe must be invoked through a shell. Off by default;
    /// only a worker type whose launcher is itself a shell script on some
    /// platform should override this.
    fn shell_mode(&self) -> bool {
        false
    }
}

/// Appends `run.command` as the trailing positional argument, skipping it
/// entirely for an empty/whitespace-only prompt so the child is spawned
/// with no trailing positional at all.
fn push_prompt(argv: &mut Vec<String>, run: &Run) {
    if let Some(command) = run.command.as_deref() {
        if !command.trim().is_empty() {
            argv.push(command.to_owned());
        }
    }
}

/// Resolve the recipe for `worker_type`, parameterized over the agent's
/// per-worker-type config (binaries, default models, provider flags).
pub fn recipe_for(worker_type: WorkerType, config: &ListenConfig) -> Box<dyn WorkerRecipe> {
    match worker_type {
        WorkerType::Claude => Box::new(claude::ClaudeRecipe::new(config)),
        WorkerType::Codex => Box::new(codex::CodexRecipe::new(config)),
        WorkerType::Gemini => Box::new(gemini::GeminiRecipe::new(config)),
        WorkerType::OllamaLaunch => Box::new(ollama::OllamaRecipe::new(config)),
        WorkerType::Rev => Box::new(rev::RevRecipe::new(config)),
        WorkerType::Vnc => Box::new(vnc::VncRecipe::new(config)),
        WorkerType::HandsOn => Box::new(hands_on::HandsOnRecipe::new(config)),
    }
}
