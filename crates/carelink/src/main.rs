// SPDX-FileCopyrightText: 2026 Carelink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Carelink - messaging backend for the facility directory.
//!
//! This is the binary entry point for operational tooling: health checks and
//! a live view of an identity's conversation list.

mod doctor;
mod watch;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Carelink - messaging backend for the facility directory.
#[derive(Parser, Debug)]
#[command(name = "carelink", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run diagnostic checks against the configured environment.
    Doctor,
    /// Follow an identity's conversation list as changes arrive.
    Watch {
        /// Identity id to watch conversations for.
        #[arg(long)]
        identity: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match carelink_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            for error in &errors {
                eprintln!("carelink: {error}");
            }
            std::process::exit(1);
        }
    };

    // RUST_LOG overrides the configured level when set.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.app.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = match cli.command {
        Some(Commands::Doctor) => doctor::run_doctor(&config).await,
        Some(Commands::Watch { identity }) => watch::run_watch(&config, &identity).await,
        None => {
            println!("carelink: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("carelink: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        super::Cli::command().debug_assert();
    }
}
