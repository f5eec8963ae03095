// SPDX-License-Identifier: GPL-3.0-or-later
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use axum::serve;
use marquee_api::router;
use marquee_application::AppState;
use marquee_config::{load as load_config, HttpConfig, TelemetryConfig};
use marquee_infrastructure::{http_client, init_database};
use marquee_scheduler::Scheduler;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Optional first argument: path to a TOML config file.
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = load_config(config_path.as_deref())?;
    init_tracing(&config.telemetry);

    let pool = init_database(&config).await?;
    let client = http_client().context("building http client")?;

    let state = AppState::new(config.clone(), pool, client);
    state.on_start();
    let _commands_handle = state.start_commands();

    let scheduler = Scheduler::new(config.clone(), state.queue.clone());
    scheduler.register_tasks().await;
    let _scheduler_handle = scheduler.start();

    let listener = TcpListener::bind(bind_addr(&config.http)?).await?;
    let addr = listener.local_addr()?;
    info!(target: "cli", %addr, "listening");

    serve(listener, router(state)?)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!(target: "cli", "server stopped");
    Ok(())
}

fn init_tracing(telemetry: &TelemetryConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&telemetry.log_level));
    let registry = tracing_subscriber::registry().with(env_filter);

    if telemetry.json {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_thread_names(true).with_level(true))
            .init();
    }
}

fn bind_addr(http: &HttpConfig) -> Result<SocketAddr> {
    let addr = format!("{}:{}", http.host, http.port);
    addr.parse()
        .with_context(|| format!("invalid listen address {addr}"))
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    result = tokio::signal::ctrl_c() => {
                        if let Err(error) = result {
                            warn!(target: "cli", %error, "failed to listen for ctrl-c");
                        }
                    }
                    _ = terminate.recv() => {}
                }
            }
            Err(error) => {
                warn!(target: "cli", %error, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(target: "cli", %error, "failed to listen for ctrl-c");
    }

    info!(target: "cli", "shutdown signal received");
}
