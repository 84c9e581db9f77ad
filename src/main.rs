use std::path::{Path, PathBuf};

use clap::Parser;
use modeldex::{
    AppState, build_app,
    config::ModeldexConfig,
    jobs::{ModelRefresher, start_cache_purge_worker, start_model_refresh_worker},
    observability,
};
use tokio_util::task::TaskTracker;

/// CLI arguments for modeldex
#[derive(Parser, Debug)]
#[command(version, about = "AI model catalog aggregating OpenRouter and Hugging Face", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to a TOML config file. Built-in defaults apply without one.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Port to listen on, overriding `server.port`
    #[arg(short, long, env = "PORT", global = true)]
    port: Option<u16>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Start the API server (default)
    Serve,
    /// Validate the configuration file and exit
    CheckConfig,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    match args.command {
        Some(Command::CheckConfig) => {
            let config = load_config(args.config.as_deref(), args.port);
            println!(
                "Configuration OK: listening on {}:{}, refresh every {}s",
                config.server.host, config.server.port, config.catalog.refresh_interval_secs
            );
        }
        Some(Command::Serve) | None => run_server(args.config.as_deref(), args.port).await,
    }
}

/// Load and validate the config, exiting with a message on failure.
fn load_config(path: Option<&Path>, port: Option<u16>) -> ModeldexConfig {
    let result = match path {
        Some(path) => ModeldexConfig::from_file(path),
        None => Ok(ModeldexConfig::default()),
    };

    let mut config = match result {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    if let Some(port) = port {
        config.server.port = port;
    }

    config
}

async fn run_server(config_path: Option<&Path>, port: Option<u16>) {
    let config = load_config(config_path, port);

    observability::init_tracing(&config.observability).expect("Failed to initialize tracing");

    tracing::info!(
        config_file = ?config_path.map(|p| p.display().to_string()),
        icons_dir = %config.icons.dir.display(),
        "Starting modeldex"
    );

    let state = match AppState::new(config.clone()) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build HTTP client");
            std::process::exit(1);
        }
    };

    tokio::spawn(start_model_refresh_worker(
        state.refresher.clone(),
        config.catalog.clone(),
    ));
    tokio::spawn(start_cache_purge_worker(
        state.cache.clone(),
        std::time::Duration::from_secs(config.catalog.purge_interval_secs),
    ));

    let task_tracker = state.task_tracker.clone();
    let refresher = state.refresher.clone();
    let app = build_app(&config, state);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on http://{}", bind_addr);

    // Graceful shutdown: wait for SIGINT/SIGTERM, then wait for all background tasks
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(task_tracker, refresher))
        .await
        .expect("Server error");
}

async fn shutdown_signal(task_tracker: TaskTracker, refresher: ModelRefresher) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, stopping background tasks...");

    // Close the task tracker to prevent new tasks from being spawned
    task_tracker.close();

    // The Hugging Face stream can run for many minutes; its partial output is
    // discarded with the process anyway.
    refresher.shutdown();

    let wait_result =
        tokio::time::timeout(std::time::Duration::from_secs(30), task_tracker.wait()).await;

    match wait_result {
        Ok(()) => tracing::info!("All background tasks completed"),
        Err(_) => {
            tracing::warn!("Timeout waiting for background tasks, some may not have completed")
        }
    }

    tracing::info!("Shutdown complete");
}
