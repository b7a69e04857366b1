// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The claim dispatcher (C6 agent side, C8 scheduling): one periodic ticker
//! polls `claim()` and schedules the spawn, another drives heartbeats.
//! Only this task ever calls `claim()`, per spec §4.8.

use std::sync::Arc;

use relay_core::Redactor;
use tokio_util::sync::CancellationToken;

use crate::client::GatewayClient;
use crate::config::ListenConfig;
use crate::driver::Driver;
use crate::pool::WorkerPool;
use crate::worker::recipe_for;

pub struct Dispatcher {
    client: Arc<GatewayClient>,
    pool: Arc<WorkerPool>,
    config: Arc<ListenConfig>,
    redactor: Redactor,
}

impl Dispatcher {
    pub fn new(client: Arc<GatewayClient>, pool: Arc<WorkerPool>, config: Arc<ListenConfig>) -> Self {
        let redactor = if config.secret_patterns.is_empty() {
            Redactor::default()
        } else {
            Redactor::new(&config.secret_patterns).unwrap_or_default()
        };
        Self { client, pool, config, redactor }
    }

    /// Register once, then run the claim/heartbeat tickers until `shutdown`
    /// fires, at which point every live worker is drained before returning.
    pub async fn run(&self, shutdown: CancellationToken) {
        if let Err(err) =
            self.client.register(&self.config.agent_label, env!("CARGO_PKG_VERSION"), &self.config.capability_set()).await
        {
            tracing::warn!(error = %err, "initial registration failed, will retry via heartbeat cadence");
        }

        let mut claim_tick = tokio::time::interval(self.config.poll_interval());
        let mut heartbeat_tick = tokio::time::interval(self.config.heartbeat_interval());
        claim_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        heartbeat_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = claim_tick.tick() => self.try_claim().await,
                _ = heartbeat_tick.tick() => self.heartbeat().await,
            }
        }

        tracing::info!("shutdown requested, draining active workers");
        self.pool.terminate_all().await;
    }

    /// Skips the claim entirely when the pool is already full, so a run is
    /// never claimed on the gateway only to have nowhere to run locally.
    async fn try_claim(&self) {
        if self.pool.active_count().await >= self.config.max_concurrent {
            return;
        }

        match self.client.claim().await {
            Ok(Some(run)) => {
                let run_id = run.id.clone();
                let recipe = recipe_for(run.worker_type, &self.config);
                let driver =
                    Driver::new(run, recipe, Arc::clone(&self.client), self.redactor.clone(), Arc::clone(&self.config));
                if let Err(err) = self.pool.spawn(driver).await {
                    tracing::debug!(run_id = %run_id, error = %err, "skipping claim: pool at capacity");
                }
            }
            Ok(None) => {}
            Err(err) => tracing::debug!(error = %err, "claim poll failed, will retry next tick"),
        }
    }

    async fn heartbeat(&self) {
        if let Err(err) = self.client.heartbeat().await {
            tracing::debug!(error = %err, "heartbeat failed, will retry next tick");
        }
    }
}
