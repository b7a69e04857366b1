// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Gateway configuration: `clap`-derived CLI flags with `GW_*` env fallbacks,
//! mirroring the teacher's `COOP_MUX_*` convention under this system's own
//! prefix.

/// Configuration for the dispatch gateway.
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "relay-gateway", version, about)]
pub struct GatewayConfig {
    /// Host to bind on.
    #[arg(long, default_value = "0.0.0.0", env = "GW_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 8900, env = "GW_PORT")]
    pub port: u16,

    /// HMAC signing secret shared with agents. Required.
    #[arg(long, env = "GW_HMAC_SECRET")]
    pub hmac_secret: String,

    /// Bearer token for UI-facing API auth. If unset, UI auth is disabled.
    #[arg(long, env = "GW_UI_AUTH_TOKEN")]
    pub ui_auth_token: Option<String>,

    /// Maximum accepted |now - timestamp| skew, in seconds, for signed requests.
    #[arg(long, default_value_t = 300, env = "GW_CLOCK_SKEW_SECONDS")]
    pub clock_skew_seconds: u64,

    /// Replay-nonce retention window, in seconds.
    #[arg(long, default_value_t = 600, env = "GW_NONCE_EXPIRY_SECONDS")]
    pub nonce_expiry_seconds: u64,

    /// Seconds since last heartbeat before an agent is marked degraded.
    #[arg(long, default_value_t = 30, env = "GW_DEGRADED_THRESHOLD_SECONDS")]
    pub degraded_threshold_seconds: u64,

    /// Seconds since last heartbeat before an agent is marked offline.
    #[arg(long, default_value_t = 120, env = "GW_OFFLINE_THRESHOLD_SECONDS")]
    pub offline_threshold_seconds: u64,

    /// Ordered allowlist of non-magic commands (exact-or-prefix match),
    /// comma-separated. Enforced here too (defense-in-depth; the agent
    /// re-enforces its own copy at execution time).
    #[arg(long, value_delimiter = ',', env = "GW_ALLOWLISTED_COMMANDS")]
    pub allowlisted_commands: Vec<String>,

    /// Regex patterns for secret redaction (C9), comma-separated. Empty
    /// uses `relay_core::Redactor::default_patterns()`.
    #[arg(long, value_delimiter = ',', env = "GW_SECRET_PATTERNS")]
    pub secret_patterns: Vec<String>,

    /// Per-subscriber broadcast buffer size before the oldest queued
    /// message for that subscriber is dropped (C5 backpressure policy).
    #[arg(long, default_value_t = 256, env = "GW_SUBSCRIBER_BUFFER")]
    pub subscriber_buffer: usize,

    /// Log format (json or text).
    #[arg(long, default_value = "json", env = "GW_LOG_FORMAT")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "GW_LOG_LEVEL")]
    pub log_level: String,
}

impl GatewayConfig {
    pub fn clock_skew(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.clock_skew_seconds)
    }

    pub fn nonce_expiry(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.nonce_expiry_seconds)
    }

    /// Whether `command` is allowed for direct (non-magic) execution: an
    /// allowlist entry matches either the whole command or a whitespace-
    /// bounded prefix of it (so `"git diff"` allows `"git diff --stat"` but
    /// not `"git diff-ish"`).
    pub fn command_allowed(&self, command: &str) -> bool {
        self.allowlisted_commands.iter().any(|allowed| {
            command == allowed
                || command
                    .strip_prefix(allowed.as_str())
                    .is_some_and(|rest| rest.starts_with(char::is_whitespace))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(args: &[&str]) -> GatewayConfig {
        GatewayConfig::parse_from(
            std::iter::once("relay-gateway").chain(args.iter().copied()),
        )
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = parse(&["--hmac-secret", "s"]);
        assert_eq!(config.port, 8900);
        assert_eq!(config.clock_skew_seconds, 300);
        assert_eq!(config.nonce_expiry_seconds, 600);
    }

    #[test]
    fn allowlist_matches_exact_or_prefix() {
        let config = parse(&[
            "--hmac-secret",
            "s",
            "--allowlisted-commands",
            "git diff,git status,npm test",
        ]);
        assert!(config.command_allowed("git status"));
        assert!(config.command_allowed("git diff --stat"));
        assert!(!config.command_allowed("rm -rf /"));
    }
}
