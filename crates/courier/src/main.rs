// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Courier - real-time messaging backbone.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod admin;
mod serve;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use courier_config::CourierConfig;

/// Courier - live sessions, call signaling, and ordered message streams.
#[derive(Parser, Debug)]
#[command(name = "courier", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP/WebSocket server.
    Serve,
    /// Apply pending database migrations and exit.
    Migrate,
    /// Print the effective configuration as TOML.
    Config,
    /// Manage access tokens.
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
    /// Manage calls.
    Call {
        #[command(subcommand)]
        action: CallAction,
    },
}

#[derive(Subcommand, Debug)]
enum TokenAction {
    /// Issue a token for a user and print it.
    Issue {
        #[arg(long)]
        user: i64,
        /// Lifetime in seconds; omit for a token that never expires.
        #[arg(long)]
        ttl_secs: Option<i64>,
        /// Use this token value instead of a random one.
        #[arg(long)]
        token: Option<String>,
    },
    /// Revoke a token.
    Revoke { token: String },
}

#[derive(Subcommand, Debug)]
enum CallAction {
    /// Register a call between two users and print its id.
    Create {
        #[arg(long)]
        caller: i64,
        #[arg(long)]
        callee: i64,
    },
    /// Mark a call as ended.
    End { call_id: i64 },
}

fn load_config(path: Option<&PathBuf>) -> CourierConfig {
    let loaded = match path {
        Some(path) => courier_config::load_and_validate_path(path),
        None => courier_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            courier_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref());

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Migrate) => admin::run_migrate(&config).await,
        Some(Commands::Config) => admin::print_config(&config),
        Some(Commands::Token { action }) => match action {
            TokenAction::Issue {
                user,
                ttl_secs,
                token,
            } => admin::issue_token(&config, user, ttl_secs, token).await,
            TokenAction::Revoke { token } => admin::revoke_token(&config, &token).await,
        },
        Some(Commands::Call { action }) => match action {
            CallAction::Create { caller, callee } => {
                admin::create_call(&config, caller, callee).await
            }
            CallAction::End { call_id } => admin::end_call(&config, call_id).await,
        },
        None => {
            println!("courier: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("courier: {e}");
        std::process::exit(1);
    }
}
