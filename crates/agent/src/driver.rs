// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker driver (C7) — the hardest part. Owns one subprocess for the
//! lifetime of one run: spawns it, bridges its stdio, polls and applies
//! commands from the queue, persists local state, and reports its exit.
//!
//! Deliberately built on [`tokio::process::Command`] with piped stdio
//! rather than a pty: this driver only needs line-oriented stdout/stderr
//! capture, not a pixel-accurate terminal emulation.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use relay_core::{Command as QueuedCommand, EventType, FinishedMarker, Run, RunId, RunState, StartedMarker, WorkerType};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::client::GatewayClient;
use crate::config::ListenConfig;
use crate::error::AgentError;
use crate::persist::{self, PersistedRunState};
use crate::processed_ids::ProcessedIds;
use crate::prompt_detect::PromptDetector;
use crate::sandbox::Sandbox;
use crate::worker::WorkerRecipe;

const STOP_ESCALATE_AFTER: Duration = Duration::from_secs(10);
const LS_TIMEOUT: Duration = Duration::from_secs(10);
const LS_BUFFER_CAP: usize = 5 * 1024 * 1024;
const ALLOWLIST_TIMEOUT: Duration = Duration::from_secs(60);
const ALLOWLIST_BUFFER_CAP: usize = 10 * 1024 * 1024;

/// How a driver's run ended.
#[derive(Debug)]
pub enum DriverOutcome {
    /// The subprocess ran and exited (or was killed); the run's final exit
    /// code has already been reported via `marker:finished`.
    Finished { exit_code: Option<i32> },
    /// The subprocess never started; the caller should mark the run failed.
    SpawnFailed(AgentError),
}

struct Line {
    kind: EventType,
    text: String,
}

/// Owns one run's subprocess from spawn to exit.
pub struct Driver {
    run: Run,
    recipe: Box<dyn WorkerRecipe>,
    client: Arc<GatewayClient>,
    redactor: relay_core::Redactor,
    config: Arc<ListenConfig>,
}

impl Driver {
    pub fn new(
        run: Run,
        recipe: Box<dyn WorkerRecipe>,
        client: Arc<GatewayClient>,
        redactor: relay_core::Redactor,
        config: Arc<ListenConfig>,
    ) -> Self {
        Self { run, recipe, client, redactor, config }
    }

    pub fn run_id(&self) -> &RunId {
        &self.run.id
    }

    /// Resolved argv, for logging/diagnostics and for the `started` marker.
    fn command_line(&self) -> String {
        let mut parts = vec![self.recipe.binary().to_owned()];
        parts.extend(self.recipe.build_argv(&self.run));
        parts.join(" ")
    }

    fn build_environment(&self) -> Vec<(String, String)> {
        let mut env = self.recipe.build_env(&self.run);
        env.push(("TERM".to_owned(), if self.run.autonomous { "xterm-256color" } else { "dumb" }.to_owned()));
        if let Some(key_var) = api_key_env_var(self.run.worker_type) {
            env.push((key_var.to_owned(), std::env::var(key_var).unwrap_or_default()));
        }
        env
    }

    fn spawn(&self) -> std::io::Result<Child> {
        let mut command = if self.recipe.shell_mode() {
            let mut argv = vec![self.recipe.binary().to_owned()];
            argv.extend(self.recipe.build_argv(&self.run));
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(argv.join(" "));
            cmd
        } else {
            let mut cmd = Command::new(self.recipe.binary());
            cmd.args(self.recipe.build_argv(&self.run));
            cmd
        };
        command
            .current_dir(&self.run.working_dir)
            .envs(self.build_environment())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command.spawn()
    }

    /// Drive the subprocess to completion. Consumes the driver.
    pub async fn run(mut self, shutdown: CancellationToken) -> DriverOutcome {
        let token_str = self.run.capability_token.to_string();
        let mut child = match self.spawn() {
            Ok(child) => child,
            Err(err) => {
                let message = format!("failed to spawn {}: {err}", self.recipe.binary());
                tracing::warn!(run_id = %self.run.id, error = %message, "worker spawn failed");
                let _ = self
                    .client
                    .ingest_event(&self.run.id, &token_str, EventType::Error, &message, None)
                    .await;
                return DriverOutcome::SpawnFailed(AgentError::spawn_failed(message));
            }
        };

        let pid = child.id().unwrap_or(0);
        let mut stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let (line_tx, mut line_rx) = mpsc::channel::<Line>(512);
        if let Some(stdout) = stdout {
            spawn_reader(stdout, EventType::Stdout, line_tx.clone());
        }
        if let Some(stderr) = stderr {
            spawn_reader(stderr, EventType::Stderr, line_tx.clone());
        }
        drop(line_tx);

        let command_line = self.command_line();
        self.emit_started(&token_str, pid, &command_line).await;

        let mut sandbox = Sandbox::new(self.run.working_dir.clone());
        let mut processed = ProcessedIds::new(self.config.processed_command_ttl());
        let prompt_detector = PromptDetector::new();
        let mut sequence: u64 = 0;
        let mut stop_requested = false;
        let mut halt_requested = false;
        let mut local_log = Vec::<u8>::new();

        let mut heartbeat_tick = tokio::time::interval(self.config.heartbeat_interval());
        let mut command_tick = tokio::time::interval(self.config.command_poll_interval());
        heartbeat_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        command_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut stop_deadline: Option<tokio::time::Instant> = None;

        let exit_code = loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    let _ = child.start_kill();
                    halt_requested = true;
                    break await_exit(&mut child).await;
                }
                line = line_rx.recv() => {
                    match line {
                        Some(line) => {
                            sequence += 1;
                            self.handle_line(&token_str, line, sequence, &prompt_detector, &mut local_log).await;
                        }
                        None => {
                            // Both readers hit EOF; the child is on its way out.
                        }
                    }
                }
                _ = heartbeat_tick.tick() => {
                    self.persist_and_report(&token_str, &sandbox, sequence).await;
                }
                _ = command_tick.tick() => {
                    self.poll_and_apply_commands(
                        &token_str,
                        &mut child,
                        &mut stdin,
                        &mut sandbox,
                        &mut processed,
                        &mut stop_requested,
                        &mut halt_requested,
                        &mut stop_deadline,
                    )
                    .await;
                }
                _ = wait_for_deadline(stop_deadline) => {
                    let _ = child.start_kill();
                    stop_deadline = None;
                }
                status = child.wait() => {
                    break status.ok().and_then(|s| s.code());
                }
            }
        };

        // Drain whatever output the reader tasks already buffered before the
        // child fully closed its pipes.
        while let Ok(line) = line_rx.try_recv() {
            sequence += 1;
            self.handle_line(&token_str, line, sequence, &prompt_detector, &mut local_log).await;
        }

        self.emit_finished(&token_str, exit_code, stop_requested, halt_requested).await;
        if !local_log.is_empty() {
            let _ = self.client.upload_artifact(&self.run.id, &token_str, "session.log", local_log).await;
        }

        DriverOutcome::Finished { exit_code }
    }

    async fn emit_started(&self, token: &str, pid: u32, command_line: &str) {
        let marker = StartedMarker { pid, command: command_line.to_owned(), working_dir: self.run.working_dir.clone() };
        let data = tag_marker("started", &marker);
        if let Err(err) = self.client.ingest_event(&self.run.id, token, EventType::Marker, &data, None).await {
            tracing::warn!(run_id = %self.run.id, error = %err, "failed to ingest started marker");
        }
    }

    async fn emit_finished(&self, token: &str, exit_code: Option<i32>, stop_requested: bool, halt_requested: bool) {
        let marker = FinishedMarker { exit_code, stop_requested, halt_requested };
        let data = tag_marker("finished", &marker);
        if let Err(err) = self.client.ingest_event(&self.run.id, token, EventType::Marker, &data, None).await {
            tracing::warn!(run_id = %self.run.id, error = %err, "failed to ingest finished marker");
        }
    }

    async fn handle_line(
        &self,
        token: &str,
        line: Line,
        sequence: u64,
        prompt_detector: &PromptDetector,
        local_log: &mut Vec<u8>,
    ) {
        let redacted = self.redactor.redact(&line.text);
        local_log.extend_from_slice(redacted.as_bytes());
        local_log.push(b'\n');

        if let Err(err) =
            self.client.ingest_event(&self.run.id, token, line.kind, &redacted, Some(sequence)).await
        {
            tracing::warn!(run_id = %self.run.id, error = %err, "failed to ingest output event");
        }

        if prompt_detector.is_blocking_prompt(&redacted) {
            let _ = self.client.ingest_event(&self.run.id, token, EventType::PromptWaiting, &redacted, None).await;
        }
    }

    async fn persist_and_report(&self, token: &str, sandbox: &Sandbox, sequence: u64) {
        let state = PersistedRunState {
            run_id: self.run.id.clone(),
            sequence,
            working_dir: sandbox.current().to_string_lossy().into_owned(),
            worker_type: self.run.worker_type,
            model: self.run.model.clone(),
            saved_at_ms: 0,
        };
        if let Err(err) = persist::save(&self.config.runs_dir, &state) {
            tracing::warn!(run_id = %self.run.id, error = %err, "failed to persist local run state");
        }

        let snapshot = RunState {
            working_dir: Some(state.working_dir),
            last_sequence: Some(sequence),
            stdin_buffer: None,
            environment: None,
            saved_at_ms: 0,
        };
        if let Err(err) = self.client.post_state(&self.run.id, token, &snapshot).await {
            tracing::warn!(run_id = %self.run.id, error = %err, "failed to report state to gateway");
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn poll_and_apply_commands(
        &self,
        token: &str,
        child: &mut Child,
        stdin: &mut Option<ChildStdin>,
        sandbox: &mut Sandbox,
        processed: &mut ProcessedIds,
        stop_requested: &mut bool,
        halt_requested: &mut bool,
        stop_deadline: &mut Option<tokio::time::Instant>,
    ) {
        let commands = match self.client.list_commands(&self.run.id, token).await {
            Ok(commands) => commands,
            Err(err) => {
                tracing::debug!(run_id = %self.run.id, error = %err, "command poll failed, will retry next tick");
                return;
            }
        };

        for command in commands {
            if !processed.mark_if_new(command.id.as_str()) {
                continue;
            }
            let (result, error) = self
                .apply_command(token, &command, child, stdin, sandbox, stop_requested, halt_requested, stop_deadline)
                .await;
            if let Err(err) = self.client.ack_command(&self.run.id, token, &command.id, result, error).await {
                tracing::warn!(run_id = %self.run.id, error = %err, "failed to ack command");
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn apply_command(
        &self,
        token: &str,
        command: &QueuedCommand,
        child: &mut Child,
        stdin: &mut Option<ChildStdin>,
        sandbox: &mut Sandbox,
        stop_requested: &mut bool,
        halt_requested: &mut bool,
        stop_deadline: &mut Option<tokio::time::Instant>,
    ) -> (Option<String>, Option<String>) {
        if let Some(magic) = command.magic() {
            return self
                .apply_magic(token, magic, child, stdin, stop_requested, halt_requested, stop_deadline)
                .await;
        }
        self.apply_builtin_or_allowlisted(token, &command.command, sandbox).await
    }

    #[allow(clippy::too_many_arguments)]
    async fn apply_magic(
        &self,
        token: &str,
        magic: relay_core::MagicVerb,
        child: &mut Child,
        stdin: &mut Option<ChildStdin>,
        stop_requested: &mut bool,
        halt_requested: &mut bool,
        stop_deadline: &mut Option<tokio::time::Instant>,
    ) -> (Option<String>, Option<String>) {
        use relay_core::MagicVerb;
        match magic {
            MagicVerb::Stop => {
                *stop_requested = true;
                send_signal(child, Signal::SIGINT);
                *stop_deadline = Some(tokio::time::Instant::now() + STOP_ESCALATE_AFTER);
                (Some("Stop initiated".to_owned()), None)
            }
            MagicVerb::Halt => {
                *halt_requested = true;
                let _ = child.start_kill();
                (Some("Halted".to_owned()), None)
            }
            MagicVerb::Escape => {
                send_signal(child, Signal::SIGINT);
                (Some("Escape sent".to_owned()), None)
            }
            MagicVerb::Input(bytes) => {
                if let Some(stdin) = stdin.as_mut() {
                    if let Err(err) = stdin.write_all(bytes.as_bytes()).await {
                        return (None, Some(format!("failed to write input: {err}")));
                    }
                    let _ = stdin.write_all(b"\n").await;
                }
                let _ = self.client.ingest_event(&self.run.id, token, EventType::PromptResolved, &bytes, None).await;
                (Some("Input delivered".to_owned()), None)
            }
            MagicVerb::StartVncStream => (Some("VNC stream requested".to_owned()), None),
        }
    }

    async fn apply_builtin_or_allowlisted(
        &self,
        token: &str,
        command: &str,
        sandbox: &mut Sandbox,
    ) -> (Option<String>, Option<String>) {
        if let Some(target) = command.strip_prefix("cd ").map(str::trim) {
            return match sandbox.change_dir(target) {
                Ok(resolved) => {
                    let info = format!("changed directory to {}", resolved.display());
                    let _ = self.client.ingest_event(&self.run.id, token, EventType::Info, &info, None).await;
                    (Some(info), None)
                }
                Err(message) => (None, Some(message)),
            };
        }
        if command.trim() == "pwd" {
            return (Some(sandbox.relative_current().to_string_lossy().into_owned()), None);
        }
        if command.trim() == "ls" || command.trim() == "dir" {
            return self.run_subshell(command, sandbox.current(), LS_TIMEOUT, LS_BUFFER_CAP).await;
        }
        if !self.config.command_allowed(command) {
            return (None, Some("rejected: command is not allowlisted".to_owned()));
        }
        let upload_diff = command.trim_start().starts_with("git diff");
        let (result, error) =
            self.run_subshell(command, sandbox.current(), ALLOWLIST_TIMEOUT, ALLOWLIST_BUFFER_CAP).await;
        if upload_diff {
            if let Some(stdout) = result.as_deref() {
                let _ = self
                    .client
                    .upload_artifact(&self.run.id, token, "latest.diff", stdout.as_bytes().to_vec())
                    .await;
            }
        }
        (result, error)
    }

    async fn run_subshell(
        &self,
        command: &str,
        cwd: &std::path::Path,
        timeout: Duration,
        buffer_cap: usize,
    ) -> (Option<String>, Option<String>) {
        let mut child = match Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(err) => return (None, Some(format!("failed to run command: {err}"))),
        };

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let mut combined = output.stdout;
                combined.extend_from_slice(&output.stderr);
                combined.truncate(buffer_cap);
                let text = self.redactor.redact(&String::from_utf8_lossy(&combined));
                if output.status.success() {
                    (Some(text), None)
                } else {
                    (Some(text), Some(format!("exited with status {}", output.status)))
                }
            }
            Ok(Err(err)) => (None, Some(format!("command failed: {err}"))),
            Err(_) => (None, Some(format!("command timed out after {}s", timeout.as_secs()))),
        }
    }
}

fn api_key_env_var(worker_type: WorkerType) -> Option<&'static str> {
    match worker_type {
        WorkerType::Claude => Some("ANTHROPIC_API_KEY"),
        WorkerType::Codex => Some("OPENAI_API_KEY"),
        WorkerType::Gemini => Some("GEMINI_API_KEY"),
        WorkerType::Rev => Some("REV_API_KEY"),
        WorkerType::OllamaLaunch | WorkerType::Vnc | WorkerType::HandsOn => None,
    }
}

fn send_signal(child: &Child, signal: Signal) {
    let Some(pid) = child.id() else { return };
    let Ok(pid) = i32::try_from(pid) else { return };
    let _ = signal::kill(Pid::from_raw(pid), signal);
}

async fn await_exit(child: &mut Child) -> Option<i32> {
    child.wait().await.ok().and_then(|s| s.code())
}

/// Sleeps until `deadline` if set; never resolves otherwise, so it can sit
/// as an always-present branch in the driver's `select!` loop.
async fn wait_for_deadline(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(instant) => tokio::time::sleep_until(instant).await,
        None => std::future::pending::<()>().await,
    }
}

fn tag_marker(event: &str, marker: &impl serde::Serialize) -> String {
    let mut value = serde_json::to_value(marker).unwrap_or_else(|_| serde_json::json!({}));
    if let Some(object) = value.as_object_mut() {
        object.insert("event".to_owned(), serde_json::Value::String(event.to_owned()));
    }
    value.to_string()
}

fn spawn_reader<R>(reader: R, kind: EventType, tx: mpsc::Sender<Line>)
where
    R: tokio::io::AsyncRead + Send + Unpin + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(text)) = lines.next_line().await {
            if tx.send(Line { kind, text }).await.is_err() {
                break;
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_env_vars_are_scoped_to_llm_workers() {
        assert_eq!(api_key_env_var(WorkerType::Claude), Some("ANTHROPIC_API_KEY"));
        assert_eq!(api_key_env_var(WorkerType::Vnc), None);
        assert_eq!(api_key_env_var(WorkerType::HandsOn), None);
    }

    #[test]
    fn tag_marker_embeds_the_event_name_alongside_the_payload() -> anyhow::Result<()> {
        let marker = StartedMarker { pid: 42, command: "claude --print".to_owned(), working_dir: "/srv/w".to_owned() };
        let json = tag_marker("started", &marker);
        let value: serde_json::Value = serde_json::from_str(&json)?;
        assert_eq!(value["event"], "started");
        assert_eq!(value["pid"], 42);
        assert_eq!(value["command"], "claude --print");
        Ok(())
    }
}
