// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared gateway state, wiring storage, signing, and fanout together —
//! the counterpart to the teacher's `MuxState`.

use std::sync::Arc;

use relay_core::{Clock, Redactor, SystemClock};
use relay_wire::{NonceStore, SigningKey};
use tokio_util::sync::CancellationToken;

use crate::config::GatewayConfig;
use crate::hub::Hub;
use crate::store::memory::MemoryStore;

pub struct GatewayState {
    pub config: GatewayConfig,
    pub store: MemoryStore,
    pub hub: Hub,
    pub signing_key: SigningKey,
    pub nonces: NonceStore,
    pub redactor: Redactor,
    pub clock: Arc<dyn Clock>,
    pub shutdown: CancellationToken,
}

impl GatewayState {
    pub fn new(config: GatewayConfig, shutdown: CancellationToken) -> anyhow::Result<Self> {
        Self::with_clock(config, shutdown, Arc::new(SystemClock))
    }

    /// Construct with an explicit clock (tests inject a `FakeClock`).
    pub fn with_clock(
        config: GatewayConfig,
        shutdown: CancellationToken,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let signing_key = SigningKey::new(config.hmac_secret.as_bytes());
        let nonces = NonceStore::new(config.nonce_expiry_seconds);
        let redactor = if config.secret_patterns.is_empty() {
            Redactor::default()
        } else {
            Redactor::new(&config.secret_patterns).map_err(|e| anyhow::anyhow!("{e}"))?
        };
        let hub = Hub::new(config.subscriber_buffer);
        Ok(Self {
            config,
            store: MemoryStore::new(),
            hub,
            signing_key,
            nonces,
            redactor,
            clock,
            shutdown,
        })
    }
}

pub type SharedState = Arc<GatewayState>;
