#![recursion_limit = "256"]
//! # Main Entry Point
//!
//! Wires the application together:
//! - Domain: Configuration and Types
//! - Infrastructure: Matrix transport
//! - Application: Conversation engine, review routing, supervisor, sweeper, logging
//! - Interface: Command Handlers
//!

mod application;
mod domain;
mod infrastructure;
mod interface;
mod strings;
#[cfg(test)]
mod test_support;

use anyhow::{Result, bail};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

use crate::application::conversation::ConversationEngine;
use crate::application::review::ReviewRouter;
use crate::application::router::CommandRouter;
use crate::application::state::IntakeState;
use crate::application::supervisor::{ResilienceSupervisor, RestartPolicy, SupervisorExit};
use crate::domain::config::AppConfig;
use crate::infrastructure::matrix::MatrixTransport;
use crate::strings::logs;

const INBOX_CAPACITY: usize = 256;

/// Application intake bot for Matrix.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "data/config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Load Configuration
    let config = AppConfig::load(&args.config)?;

    // 2. Logging Setup
    let _guard = application::logging::init(&config.system.data_dir)?;
    tracing::info!(
        "{}",
        logs::config_loaded(&config.services.matrix.username, config.reviewers.len())
    );

    // 3. Initialize Application Components
    let intake = Arc::new(IntakeState::new(config.application.intake_open));
    let engine = Arc::new(ConversationEngine::new(
        config.application.clone(),
        intake.clone(),
    ));
    let review = Arc::new(ReviewRouter::new(config.reviewers.clone()));
    let router = Arc::new(CommandRouter::new(
        config.clone(),
        engine.clone(),
        review,
        intake.clone(),
    ));

    let (inbox_tx, inbox_rx) = mpsc::channel(INBOX_CAPACITY);
    let sweeper = config
        .application
        .session_timeout()
        .map(|timeout| application::sweeper::spawn(engine.clone(), inbox_tx.clone(), timeout));

    // 4. Shutdown signal
    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("{}", logs::SHUTDOWN);
                let _ = stop_tx.send(true);
            }
            Err(e) => tracing::error!("{}", logs::shutdown_fail(&e.to_string())),
        }
    });

    // 5. Supervised Matrix connection
    let transport = MatrixTransport::new(
        config.services.matrix.clone(),
        router,
        inbox_tx,
        inbox_rx,
    );
    let mut supervisor =
        ResilienceSupervisor::new(transport, RestartPolicy::from(&config.supervisor));
    let exit = supervisor.run(stop_rx).await;

    intake.set_open(false);
    if let Some(handle) = sweeper {
        handle.abort();
    }

    match exit {
        SupervisorExit::Stopped => Ok(()),
        SupervisorExit::BudgetExhausted(e) => bail!("Giving up on the Matrix connection: {}", e),
    }
}
