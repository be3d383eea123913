// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MonteCrypto

use std::{net::SocketAddr, time::Duration};

use axum_server::{tls_rustls::RustlsConfig, Handle};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use montecrypto_rust_server::{
    api::router,
    config::{AppConfig, ConfigError, LogFormat, DEFAULT_LOG_FILTER},
    state::{AppState, StateError},
};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
enum ServerError {
    #[error("failed to install rustls crypto provider")]
    CryptoProvider,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error("invalid bind address {0}")]
    BindAddress(String),
    #[error("failed to load TLS certificate: {0}")]
    Tls(std::io::Error),
    #[error("server error: {0}")]
    Serve(std::io::Error),
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

async fn shutdown_signal(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
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

    info!("Shutdown signal received, draining connections");
    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
}

async fn run() -> Result<(), ServerError> {
    // rustls needs a process-wide provider before any TLS config is built
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| ServerError::CryptoProvider)?;

    let config = AppConfig::from_env()?;
    init_tracing(config.log_format);
    for warning in &config.warnings {
        warn!("{warning}");
    }

    let state = AppState::from_config(&config)?;
    for (integration, configured) in state.integrations() {
        info!(%integration, configured, "Integration status");
    }
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|_| ServerError::BindAddress(format!("{}:{}", config.host, config.port)))?;

    let handle = Handle::new();
    tokio::spawn(shutdown_signal(handle.clone()));

    match &config.tls {
        Some(tls) => {
            let tls_config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
                .await
                .map_err(ServerError::Tls)?;
            info!("Scam Likely API listening on https://{addr} (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .map_err(ServerError::Serve)
        }
        None => {
            info!("Scam Likely API listening on http://{addr} (docs at /docs)");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .map_err(ServerError::Serve)
        }
    }
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    match run().await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            // Tracing may not be initialised yet when configuration fails
            eprintln!("montecrypto-rust-server: {e}");
            error!(error = %e, "Server stopped");
            std::process::ExitCode::FAILURE
        }
    }
}
