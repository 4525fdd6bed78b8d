// Favored Prompts - prompt library server and command-line client
// Entry point and subcommand dispatch

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use favored_prompts::app::AppState;
use favored_prompts::config::Config;

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let cli = Cli::parse();

    // The stdio MCP server owns stdout, so its logs go to stderr
    let to_stderr = matches!(cli.command, Command::Mcp { .. });
    init_tracing(to_stderr);

    match cli.command {
        Command::Serve { bind } => serve(bind).await,
        Command::Mcp { api_key, base_url } => cli::run_mcp(api_key, base_url).await,
        Command::Local(args) => cli::run_local(args).await,
        Command::Moderate { action } => cli::run_moderate(action).await,
    }
}

fn init_tracing(to_stderr: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "favored_prompts=debug,favored=debug,info".into());

    let registry = tracing_subscriber::registry().with(filter);
    if to_stderr {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn serve(bind: Option<String>) -> Result<()> {
    let mut config = Config::from_env().context("failed to load configuration")?;
    if let Some(bind) = bind {
        config.bind_addr = bind;
    }

    tracing::info!("Starting Favored Prompts server");

    let addr = config.bind_addr.clone();
    let state = AppState::initialize(config)
        .await
        .context("failed to initialize application")?;
    let app = favored_prompts::api::build_router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
