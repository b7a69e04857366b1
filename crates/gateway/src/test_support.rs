// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: a builder for [`GatewayState`] with sensible
//! defaults and a `FakeClock`. Not `cfg(test)`-gated so the integration tests
//! under `tests/` can build a `GatewayState` the same way unit tests do.

use std::sync::Arc;

use relay_core::FakeClock;
use tokio_util::sync::CancellationToken;

use crate::config::GatewayConfig;
use crate::state::GatewayState;

pub struct StateBuilder {
    hmac_secret: String,
    allowlisted_commands: Vec<String>,
    secret_patterns: Vec<String>,
    subscriber_buffer: usize,
    degraded_threshold_seconds: u64,
    offline_threshold_seconds: u64,
    clock: FakeClock,
}

impl Default for StateBuilder {
    fn default() -> Self {
        Self {
            hmac_secret: "test-secret".to_owned(),
            allowlisted_commands: vec![],
            secret_patterns: vec![],
            subscriber_buffer: 16,
            degraded_threshold_seconds: 30,
            offline_threshold_seconds: 120,
            clock: FakeClock::new(1_000),
        }
    }
}

impl StateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allowlisted_commands(mut self, commands: Vec<String>) -> Self {
        self.allowlisted_commands = commands;
        self
    }

    pub fn clock(mut self, clock: FakeClock) -> Self {
        self.clock = clock;
        self
    }

    /// Build a `GatewayState`. Infra setup failure (a bad regex baked into
    /// this function) is a test bug, not a runtime condition worth a `?`.
    #[allow(clippy::expect_used)]
    pub fn build(self) -> GatewayState {
        let config = GatewayConfig {
            host: "127.0.0.1".to_owned(),
            port: 0,
            hmac_secret: self.hmac_secret,
            ui_auth_token: None,
            clock_skew_seconds: 300,
            nonce_expiry_seconds: 600,
            degraded_threshold_seconds: self.degraded_threshold_seconds,
            offline_threshold_seconds: self.offline_threshold_seconds,
            allowlisted_commands: self.allowlisted_commands,
            secret_patterns: self.secret_patterns,
            subscriber_buffer: self.subscriber_buffer,
            log_format: "json".to_owned(),
            log_level: "info".to_owned(),
        };
        GatewayState::with_clock(config, CancellationToken::new(), Arc::new(self.clock))
            .expect("test config builds a valid GatewayState")
    }
}
