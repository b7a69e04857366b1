// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `relay-agent` CLI surface (§6): the long-running `listen`
//! dispatcher, `login`/`logout`/`whoami` credential caching, and thin
//! wrappers over the UI-facing HTTP surface.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use crate::client::GatewayClient;
use crate::config::{ListenConfig, UiClientConfig};
use crate::credential::{self, CachedCredential};
use crate::dispatcher::Dispatcher;
use crate::error::AgentError;
use crate::pool::WorkerPool;
use crate::ui_client::UiClient;

#[derive(Parser)]
#[command(name = "relay-agent", version, about = "Connect-back agent host for remote AI coding sessions.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the long-running claim dispatcher. Exits 0 on SIGINT/SIGTERM
    /// after draining every active worker.
    Listen(ListenConfig),
    /// Cache a bearer token for the UI-facing API.
    Login {
        #[command(flatten)]
        ui: UiClientConfig,
    },
    /// Remove the cached credential, if any.
    Logout {
        #[command(flatten)]
        ui: UiClientConfig,
    },
    /// Print the gateway URL and a masked view of the cached token.
    Whoami {
        #[command(flatten)]
        ui: UiClientConfig,
    },
    /// List runs.
    List {
        #[command(flatten)]
        ui: UiClientConfig,
    },
    /// Show one run's detail.
    Show {
        #[command(flatten)]
        ui: UiClientConfig,
        run_id: String,
    },
    /// Send the stop control primitive (SIGINT, escalating to force-kill).
    Stop {
        #[command(flatten)]
        ui: UiClientConfig,
        run_id: String,
    },
    /// Send the halt control primitive (immediate force-kill).
    Halt {
        #[command(flatten)]
        ui: UiClientConfig,
        run_id: String,
    },
    /// Send interrupt without killing the worker.
    Escape {
        #[command(flatten)]
        ui: UiClientConfig,
        run_id: String,
    },
    /// Write to the worker's stdin.
    Input {
        #[command(flatten)]
        ui: UiClientConfig,
        run_id: String,
        text: String,
        /// Prefix a Ctrl-C before the input text.
        #[arg(long)]
        escape: bool,
    },
    /// Create a new run from a finished/failed one, optionally overriding
    /// its command. The source run is never mutated.
    Restart {
        #[command(flatten)]
        ui: UiClientConfig,
        run_id: String,
        #[arg(long)]
        command: Option<String>,
    },
    /// Like `restart`, additionally seeding the new run's working directory
    /// from the source run's last reported state.
    Resume {
        #[command(flatten)]
        ui: UiClientConfig,
        run_id: String,
        #[arg(long)]
        command: Option<String>,
    },
}

/// Dispatch a parsed [`Cli`] and return the process exit code (§6: 0
/// success, 1 operational failure, 2 configuration error).
pub async fn run(cli: Cli) -> i32 {
    match cli.command {
        Command::Listen(config) => run_listen(config).await,
        Command::Login { ui } => run_login(ui),
        Command::Logout { ui } => run_logout(ui),
        Command::Whoami { ui } => run_whoami(ui),
        Command::List { ui } => print_result(UiClient::new(&ui).list_runs().await),
        Command::Show { ui, run_id } => print_result(UiClient::new(&ui).show_run(&run_id).await),
        Command::Stop { ui, run_id } => print_result(UiClient::new(&ui).stop(&run_id).await),
        Command::Halt { ui, run_id } => print_result(UiClient::new(&ui).halt(&run_id).await),
        Command::Escape { ui, run_id } => print_result(UiClient::new(&ui).escape(&run_id).await),
        Command::Input { ui, run_id, text, escape } => {
            print_result(UiClient::new(&ui).send_input(&run_id, &text, escape).await)
        }
        Command::Restart { ui, run_id, command } => {
            print_result(UiClient::new(&ui).restart(&run_id, command, false).await)
        }
        Command::Resume { ui, run_id, command } => {
            print_result(UiClient::new(&ui).restart(&run_id, command, true).await)
        }
    }
}

async fn run_listen(config: ListenConfig) -> i32 {
    let client = Arc::new(GatewayClient::new(config.gateway_url.clone(), config.agent_id.clone(), &config.hmac_secret));
    let pool = WorkerPool::new(config.max_concurrent);
    let config = Arc::new(config);
    let dispatcher = Dispatcher::new(client, pool, config);

    let shutdown = CancellationToken::new();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        tracing::info!("shutdown signal received");
        signal_shutdown.cancel();
    });

    dispatcher.run(shutdown).await;
    0
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).ok();
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt()).ok();
    tokio::select! {
        _ = async { match sigterm.as_mut() { Some(s) => s.recv().await, None => std::future::pending().await } } => {}
        _ = async { match sigint.as_mut() { Some(s) => s.recv().await, None => std::future::pending().await } } => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn run_login(ui: UiClientConfig) -> i32 {
    let Some(token) = ui.token.clone() else {
        eprintln!("error: login requires --token (or AGENT_UI_AUTH_TOKEN)");
        return AgentError::validation("missing token").exit_code();
    };
    let cred = CachedCredential { gateway_url: ui.gateway_url.clone(), token };
    match credential::save(&ui.credential_file, &cred) {
        Ok(()) => {
            println!("Logged in to {}", ui.gateway_url);
            0
        }
        Err(err) => {
            eprintln!("error: {err}");
            err.exit_code()
        }
    }
}

fn run_logout(ui: UiClientConfig) -> i32 {
    match credential::clear(&ui.credential_file) {
        Ok(()) => {
            println!("Logged out.");
            0
        }
        Err(err) => {
            eprintln!("error: {err}");
            err.exit_code()
        }
    }
}

fn run_whoami(ui: UiClientConfig) -> i32 {
    match credential::load(&ui.credential_file) {
        Some(cred) => {
            println!("gateway: {}", cred.gateway_url);
            println!("token:   {}", mask_token(&cred.token));
            0
        }
        None => {
            println!("not logged in");
            1
        }
    }
}

fn mask_token(token: &str) -> String {
    if token.len() <= 8 {
        "*".repeat(token.len())
    } else {
        format!("{}...{}", &token[..4], &token[token.len() - 4..])
    }
}

fn print_result<T: serde::Serialize>(result: Result<T, AgentError>) -> i32 {
    match result {
        Ok(value) => {
            match serde_json::to_string_pretty(&value) {
                Ok(json) => println!("{json}"),
                Err(err) => eprintln!("error: failed to render response: {err}"),
            }
            0
        }
        Err(err) => {
            eprintln!("error: {err}");
            err.exit_code()
        }
    }
}
