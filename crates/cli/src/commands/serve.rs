//! `serve` command implementation.

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, warn};

use config_loader::ConfigLoader;
use contracts::RelayBlueprint;
use fanout_relay_cli::{build_app, CliError};

use crate::cli::ServeArgs;

/// Execute the `serve` command
pub async fn run_serve(args: &ServeArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let mut blueprint = ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    apply_overrides(&mut blueprint, args);
    ConfigLoader::validate(&blueprint).context("Configuration invalid after CLI overrides")?;

    info!(
        bind = %blueprint.server.bind_addr,
        ingest_path = %blueprint.server.ingest_path,
        accounts = blueprint.accounts.len(),
        destinations = blueprint.destinations.len(),
        timeout_ms = blueprint.dispatch.timeout_ms,
        "Configuration loaded"
    );

    if let Some(port) = blueprint.server.metrics_port {
        observability::init_metrics_only(port)?;
    }

    let app = build_app(&blueprint)?;

    let addr = blueprint.server.bind_addr;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| CliError::bind(addr, e))?;
    info!(addr = %listener.local_addr()?, "Relay listening");

    axum::serve(listener, app.router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    let snapshot = app.metrics.snapshot();
    info!(
        waves = snapshot.waves,
        completed = snapshot.completed,
        failed = snapshot.failed,
        timeouts = snapshot.timeouts,
        aborted = snapshot.aborted,
        "Relay stopped"
    );
    Ok(())
}

/// CLI flags win over the file; `--metrics-port 0` disables the exporter
fn apply_overrides(blueprint: &mut RelayBlueprint, args: &ServeArgs) {
    if let Some(bind) = args.bind {
        info!(bind = %bind, "Overriding bind address from CLI");
        blueprint.server.bind_addr = bind;
    }
    if let Some(port) = args.metrics_port {
        info!(port = port, "Overriding metrics port from CLI");
        blueprint.server.metrics_port = (port != 0).then_some(port);
    }
    if let Some(timeout_ms) = args.timeout_ms {
        info!(timeout_ms = timeout_ms, "Overriding dispatch timeout from CLI");
        blueprint.dispatch.timeout_ms = timeout_ms;
    }
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
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

    warn!("Received shutdown signal, draining connections...");
}
