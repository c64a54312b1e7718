// file: src/main.rs
// version: 1.1.0
// guid: b74e02d9-5c18-4f6a-8e93-1a62d50c47bf

//! Pterodactyl Install Agent - Main entry point

use clap::Parser;
use pterodactyl_install_agent::{
    cli::{args::Cli, commands},
    logging::logger,
};
use tokio::signal;
use tracing::{error, warn};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = logger::init_logger(cli.verbose, cli.quiet) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(99);
    }

    // Interrupting mid-stage leaves external state behind; the idempotent
    // stages recover it on the next run, so a plain exit is enough here.
    let shutdown_signal = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        warn!("Received Ctrl+C, aborting installation");
    };

    let command_future = async {
        match cli.command {
            pterodactyl_install_agent::cli::args::Commands::Install(install_args) => {
                commands::install_command(install_args).await
            }
            pterodactyl_install_agent::cli::args::Commands::Check { json } => {
                commands::check_command(json).await
            }
        }
    };

    tokio::select! {
        result = command_future => {
            if let Err(e) = result {
                error!("Installation aborted: {}", e);
                eprintln!("Error: {}", e);
                std::process::exit(e.exit_code());
            }
        }
        _ = shutdown_signal => {
            std::process::exit(130); // Standard exit code for Ctrl+C
        }
    }
}
