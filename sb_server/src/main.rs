//! Setback table server using the async actor model.
//!
//! This server spawns one TableActor and serves it over WebSocket.

use std::net::SocketAddr;

use anyhow::{Context, Error};
use pico_args::Arguments;
use sb_server::{api, config::ServerConfig, logging, metrics};
use setback::TableActor;
use tracing::info;

const HELP: &str = "\
Run a four-player Setback table server

USAGE:
  sb_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --target     SCORE       Score that wins a game      [default: env TARGET_SCORE or 52]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  TARGET_SCORE             Score that wins a game
  TABLE_NAME               Table name shown in logs and /health
  INBOX_CAPACITY           Bounded action queue size
  OUTBOUND_CAPACITY        Per-connection send queue size
  METRICS_BIND             Prometheus exporter address (disabled when unset)
  RUST_LOG                 Log filter (default: info,tower_http=warn,hyper=warn)
  (See .env file for all configuration options)
";

struct Args {
    bind: Option<SocketAddr>,
    target: Option<i32>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs
            .opt_value_from_str("--bind")
            .context("Invalid --bind address")?,
        target: pargs
            .opt_value_from_str("--target")
            .context("Invalid --target score")?,
    };

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.target)?;
    config.validate()?;

    if let Some(metrics_bind) = config.metrics_bind {
        metrics::init_metrics(metrics_bind).map_err(Error::msg)?;
        info!("Prometheus metrics exported on http://{}/metrics", metrics_bind);
    }

    info!(
        "Starting table '{}' (target score {})",
        config.table.name, config.table.target_score
    );
    let outbound_capacity = config.table.outbound_capacity;
    let (actor, table) = TableActor::new(config.table);
    let actor_task = tokio::spawn(actor.run());

    let app = api::create_router(api::AppState {
        table,
        outbound_capacity,
    });

    // Start HTTP server
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{} (WebSocket at ws://{}/ws). Press Ctrl+C to stop.",
        config.bind, config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down server...");
    // Upgraded sockets may still hold table handles, so stop the actor here.
    actor_task.abort();

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
}
