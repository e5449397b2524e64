//! GridPlane entry point: wire the subsystems together and serve.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use gridplane::admin::admin_router;
use gridplane::config::loader::load_config;
use gridplane::http::server::build_router;
use gridplane::lifecycle::signals;
use gridplane::observability::{logging, metrics};
use gridplane::{AppState, ProxyConfig, Shutdown};

#[derive(Parser)]
#[command(name = "gridplane")]
#[command(about = "Dynamically reconfigurable L7 reverse proxy", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "gridplane.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = if cli.config.exists() {
        load_config(&cli.config)?
    } else {
        ProxyConfig::default()
    };

    logging::init(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "gridplane starting");

    if !cli.config.exists() {
        tracing::warn!(path = %cli.config.display(), "config file not found, using defaults");
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "failed to parse metrics address"
            ),
        }
    }

    let initial_routes = config.routes.clone();
    let grace_period = Duration::from_secs(config.shutdown.grace_period_secs);
    let admin_config = config.admin.clone();
    let bind_address = config.listener.bind_address.clone();

    let state = AppState::new(config)?;

    // Restore the persisted route set. A rejected set leaves the table
    // empty; traffic falls back to the default pool.
    if initial_routes.is_empty() {
        state
            .health
            .restart(&state.table.snapshot(), state.table.default_pool().cloned());
    } else {
        match state.apply_routes(initial_routes) {
            Ok(count) => tracing::info!(count, "startup routes applied"),
            Err(error) => {
                tracing::error!(error = %error, "startup routes rejected, serving with empty table")
            }
        }
    }

    let shutdown = Arc::new(Shutdown::new());

    // Admin plane
    let mut admin_task = None;
    if admin_config.enabled {
        let listener = tokio::net::TcpListener::bind(&admin_config.bind_address).await?;
        tracing::info!(address = %admin_config.bind_address, "admin API listening");
        let app = admin_router(state.clone());
        let stop = shutdown.notified();
        admin_task = Some(tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(stop)
                .await
        }));
    }

    // Data plane
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %bind_address, "proxy listening");
    let app = build_router(state.clone())
        .into_make_service_with_connect_info::<std::net::SocketAddr>();
    let stop = shutdown.notified();
    let data_task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(stop)
            .await
    });

    signals::shutdown_signal().await;
    shutdown.trigger();

    // Bounded drain: in-flight requests get the grace period, then we go.
    let drain = async {
        let _ = data_task.await;
        if let Some(task) = admin_task {
            let _ = task.await;
        }
    };
    if tokio::time::timeout(grace_period, drain).await.is_err() {
        tracing::warn!(
            grace_period_secs = grace_period.as_secs(),
            "drain deadline exceeded, forcing shutdown"
        );
    }

    state.health.shutdown();
    tracing::info!(dropped_logs = state.logs.dropped(), "shutdown complete");
    Ok(())
}
