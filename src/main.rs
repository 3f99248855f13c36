use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use calnotes_core::Store;
use calnotes_server::config::ServerConfig;
use calnotes_server::session::generate_secret;
use calnotes_server::state::AppState;
use clap::{Parser, Subcommand};
use log::{error, info};

#[derive(Parser)]
#[command(name = "calnotes-server", version, about = "Personal calendar and notes server")]
struct Cli {
    /// Config file (default: ~/.config/calnotes/config.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve HTTP (the default)
    Serve,
    /// Open the configured store and check that it is writable
    CheckStore,
    /// Print a new random value for session_secret
    GenSecret,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(cli.config.as_deref()).await,
        Command::CheckStore => check_store(cli.config.as_deref()),
        Command::GenSecret => {
            println!("{}", generate_secret());
            Ok(())
        }
    }
}

async fn serve(config_path: Option<&Path>) -> Result<()> {
    let config = ServerConfig::load(config_path)?;
    let state = AppState::new(&config)?;
    let app = calnotes_server::app(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Could not bind {}", config.bind))?;
    info!(
        "calnotes-server listening on http://{} (store: {})",
        config.bind,
        config.database_path.display()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("calnotes-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested"),
        Err(e) => {
            error!("could not listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

fn check_store(config_path: Option<&Path>) -> Result<()> {
    let config = ServerConfig::load(config_path)?;
    let store = Store::open(&config.database_path).with_context(|| {
        format!("Could not open store at {}", config.database_path.display())
    })?;
    let stats = store.probe().context("Store is not writable")?;

    println!("Store OK: {}", config.database_path.display());
    println!(
        "  users: {}, events: {}, notes: {}, sessions: {}",
        stats.users, stats.events, stats.notes, stats.sessions
    );
    Ok(())
}
