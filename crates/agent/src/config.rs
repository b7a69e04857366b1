// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent configuration: `clap`-derived CLI flags with `AGENT_*` env
//! fallbacks, mirroring `relay_gateway::config::GatewayConfig`'s `GW_*`
//! convention under this crate's own prefix.

use std::time::Duration;

/// Flags for `relay-agent listen`, the long-running dispatcher.
#[derive(Debug, Clone, clap::Args)]
pub struct ListenConfig {
    /// Base URL of the gateway this agent connects back to.
    #[arg(long, env = "AGENT_GATEWAY_URL")]
    pub gateway_url: String,

    /// Stable id this agent registers under. Generated once and reused
    /// across restarts so `resumeFrom` can find this host's prior runs.
    #[arg(long, env = "AGENT_ID")]
    pub agent_id: String,

    /// Human-readable label shown in the registry.
    #[arg(long, default_value = "relay-agent", env = "AGENT_LABEL")]
    pub agent_label: String,

    /// HMAC signing secret shared with the gateway.
    #[arg(long, env = "AGENT_HMAC_SECRET")]
    pub hmac_secret: String,

    /// Worker types this agent is willing to claim, comma-separated.
    /// Empty means every worker type defined in `WorkerType::ALL`.
    #[arg(long, value_delimiter = ',', env = "AGENT_CAPABILITIES")]
    pub capabilities: Vec<String>,

    /// Maximum number of concurrently active workers.
    #[arg(long, default_value_t = 4, env = "AGENT_MAX_CONCURRENT")]
    pub max_concurrent: usize,

    /// Seconds between claim-dispatcher polls.
    #[arg(long, default_value_t = 2, env = "AGENT_POLL_INTERVAL_SECONDS")]
    pub poll_interval_seconds: u64,

    /// Seconds between heartbeats.
    #[arg(long, default_value_t = 10, env = "AGENT_HEARTBEAT_INTERVAL_SECONDS")]
    pub heartbeat_interval_seconds: u64,

    /// Seconds between command-queue polls for each active worker.
    #[arg(long, default_value_t = 1, env = "AGENT_COMMAND_POLL_INTERVAL_SECONDS")]
    pub command_poll_interval_seconds: u64,

    /// TTL, in seconds, of the processed-command-id dedup set.
    #[arg(long, default_value_t = 10, env = "AGENT_PROCESSED_COMMAND_TTL_SECONDS")]
    pub processed_command_ttl_seconds: u64,

    /// Ordered allowlist of non-magic commands (exact-or-prefix match).
    /// Re-enforced here even though the gateway enforces its own copy at
    /// enqueue time — defense-in-depth per the spec's explicit requirement.
    #[arg(long, value_delimiter = ',', env = "AGENT_ALLOWLISTED_COMMANDS")]
    pub allowlisted_commands: Vec<String>,

    /// Regex patterns for secret redaction (C9), comma-separated. Empty
    /// uses `relay_core::Redactor::default_patterns()`.
    #[arg(long, value_delimiter = ',', env = "AGENT_SECRET_PATTERNS")]
    pub secret_patterns: Vec<String>,

    /// Directory holding one local state file per run.
    #[arg(long, default_value = "./runs", env = "AGENT_RUNS_DIR")]
    pub runs_dir: String,

    /// Claude worker binary.
    #[arg(long, default_value = "claude", env = "AGENT_CLAUDE_BIN")]
    pub claude_bin: String,
    /// Codex worker binary.
    #[arg(long, default_value = "codex", env = "AGENT_CODEX_BIN")]
    pub codex_bin: String,
    /// Gemini worker binary.
    #[arg(long, default_value = "gemini", env = "AGENT_GEMINI_BIN")]
    pub gemini_bin: String,
    /// Ollama worker binary.
    #[arg(long, default_value = "ollama", env = "AGENT_OLLAMA_BIN")]
    pub ollama_bin: String,
    /// Rev worker binary.
    #[arg(long, default_value = "rev", env = "AGENT_REV_BIN")]
    pub rev_bin: String,

    /// Default model passed to Claude when a run doesn't specify one.
    #[arg(long, env = "AGENT_CLAUDE_DEFAULT_MODEL")]
    pub claude_default_model: Option<String>,
    /// Default model passed to Codex when a run doesn't specify one.
    #[arg(long, env = "AGENT_CODEX_DEFAULT_MODEL")]
    pub codex_default_model: Option<String>,
    /// Default model passed to Gemini when a run doesn't specify one.
    #[arg(long, env = "AGENT_GEMINI_DEFAULT_MODEL")]
    pub gemini_default_model: Option<String>,
    /// `--approval-mode` passed to Gemini.
    #[arg(long, default_value = "auto_edit", env = "AGENT_GEMINI_APPROVAL_MODE")]
    pub gemini_approval_mode: String,
    /// `--llm-provider` passed to Rev.
    #[arg(long, default_value = "anthropic", env = "AGENT_REV_LLM_PROVIDER")]
    pub rev_llm_provider: String,
    /// Ollama subcommand (`run` for a chat prompt, `launch` for an
    /// integration-managed session).
    #[arg(long, default_value = "run", env = "AGENT_OLLAMA_SUBCOMMAND")]
    pub ollama_subcommand: String,
    /// `OLLAMA_HOST` passed to the Ollama subprocess's environment.
    #[arg(long, default_value = "127.0.0.1:11434", env = "AGENT_OLLAMA_HOST")]
    pub ollama_host: String,

    /// Log format (json or text).
    #[arg(long, default_value = "json", env = "AGENT_LOG_FORMAT")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "AGENT_LOG_LEVEL")]
    pub log_level: String,
}

impl ListenConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_seconds)
    }

    pub fn command_poll_interval(&self) -> Duration {
        Duration::from_secs(self.command_poll_interval_seconds)
    }

    pub fn processed_command_ttl(&self) -> Duration {
        Duration::from_secs(self.processed_command_ttl_seconds)
    }

    /// Same prefix-or-exact allowlist semantics as the gateway's own copy
    /// (`"git diff"` allows `"git diff --stat"` but not `"git diff-ish"`).
    pub fn command_allowed(&self, command: &str) -> bool {
        self.allowlisted_commands.iter().any(|allowed| {
            command == allowed
                || command
                    .strip_prefix(allowed.as_str())
                    .is_some_and(|rest| rest.starts_with(char::is_whitespace))
        })
    }

    pub fn capability_set(&self) -> Vec<relay_core::WorkerType> {
        if self.capabilities.is_empty() {
            return relay_core::WorkerType::ALL.to_vec();
        }
        self.capabilities.iter().filter_map(|s| s.parse().ok()).collect()
    }
}

/// Flags shared by the thin CLI wrappers (`list`, `show`, `stop`, ...) that
/// drive the UI-facing HTTP surface rather than the agent connect-back one.
#[derive(Debug, Clone, clap::Args)]
pub struct UiClientConfig {
    /// Base URL of the gateway's UI-facing API.
    #[arg(long, env = "AGENT_GATEWAY_URL")]
    pub gateway_url: String,

    /// Bearer token for the UI-facing API. Falls back to the cached
    /// credential written by `relay-agent login` when unset.
    #[arg(long, env = "AGENT_UI_AUTH_TOKEN")]
    pub token: Option<String>,

    /// Path to the cached-credential file used by `login`/`logout`/`whoami`.
    #[arg(long, default_value = "./.relay-agent-credentials.json", env = "AGENT_CREDENTIAL_FILE")]
    pub credential_file: String,
}

/// Builds a `ListenConfig` with every required field filled in but
/// otherwise default, for use by other modules' tests (worker recipes, the
/// driver, the dispatcher) that need a config without going through `clap`.
#[cfg(test)]
pub(crate) mod tests_support {
    use clap::Parser;

    use super::ListenConfig;

    #[derive(clap::Parser)]
    struct Wrapper {
        #[command(flatten)]
        listen: ListenConfig,
    }

    pub(crate) fn listen_config() -> ListenConfig {
        Wrapper::parse_from([
            "relay-agent",
            "--gateway-url",
            "http://127.0.0.1:8900",
            "--agent-id",
            "agt-test",
            "--hmac-secret",
            "test-secret",
        ])
        .listen
    }
}
