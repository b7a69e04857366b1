// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;

use relay_agent::cli::{self, Cli, Command};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.command);
    std::process::exit(cli::run(cli).await);
}

/// Only `listen` carries log format/level flags (the other subcommands are
/// one-shot CLI wrappers); everything else gets a quiet default so it
/// doesn't clutter scriptable output.
fn init_tracing(command: &Command) {
    let (format, level) = match command {
        Command::Listen(config) => (config.log_format.clone(), config.log_level.clone()),
        _ => ("text".to_owned(), "warn".to_owned()),
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    if format == "json" {
        tracing_subscriber::fmt().json().with_env_filter(env_filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}
