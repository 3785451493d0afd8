//! taskmeter server
//!
//! - Loads `taskmeter.yaml` (or `$TASKMETER_CONFIG`)
//! - Builds the process-wide metrics registry
//! - Serves `/healthz`, `/readyz`, `/metrics`
//! - Sweeps the active-user window until shutdown

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taskmeter_core::error::{MeterError, Result};
use taskmeter_server::{app_state::AppState, audit::TracingAuditSink, config, obs, router};

const CONFIG_ENV: &str = "TASKMETER_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "taskmeter.yaml";

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(code = e.code().as_str(), error = %e, "taskmeter-server failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut cfg = config::load_from_file(&path)?;
    cfg.apply_env_overrides();
    let listen = cfg.server.listen_addr()?;
    let sweep_every = Duration::from_secs(cfg.metrics.cleanup_interval_minutes * 60);

    let registry = taskmeter_core::init_global(&cfg.metrics)?;
    let state = AppState::with_parts(cfg, Arc::clone(&registry), Arc::new(TracingAuditSink));
    let sweeper = obs::spawn_sweeper(registry, sweep_every);
    let app = router::build_router(state.clone());

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| MeterError::Internal(format!("bind {listen} failed: {e}")))?;
    tracing::info!(%listen, config = %path, "taskmeter-server starting");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await;

    sweeper.stop().await;
    served.map_err(|e| MeterError::Internal(format!("server failed: {e}")))
}

async fn shutdown_signal(state: AppState) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    state.set_draining();
    tracing::info!("signal received, starting graceful shutdown");
}
