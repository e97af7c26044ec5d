// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{
    env,
    net::{IpAddr, SocketAddr},
    path::PathBuf,
    process::ExitCode,
    sync::Arc,
    time::Duration,
};

use axum_server::{tls_rustls::RustlsConfig, Handle};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use restserver_security::{
    api::router,
    auth::SecurityContext,
    config::{ConfigReport, Settings, HOST_ENV, LOG_FORMAT_ENV, MAX_LOGGING_LEVEL},
    state::AppState,
    tls::TlsMaterial,
};

const DEFAULT_HOST: &str = "0.0.0.0";
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Restserver - interface to LwM2M server and all clients connected to it
#[derive(Debug, Parser)]
#[command(name = "restserver", version, about)]
struct Cli {
    /// Specify logging level (0-5)
    #[arg(short = 'l', long = "log", env = "RESTSERVER_LOG", value_name = "LOGGING_LEVEL")]
    log: Option<u8>,

    /// Specify parameters configuration file
    #[arg(short = 'c', long = "config", env = "RESTSERVER_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Specify TLS security private key file
    #[arg(
        short = 'k',
        long = "private_key",
        env = "RESTSERVER_PRIVATE_KEY",
        value_name = "PRIVATE_KEY"
    )]
    private_key: Option<String>,

    /// Specify TLS security certificate file
    #[arg(
        short = 'C',
        long = "certificate",
        env = "RESTSERVER_CERTIFICATE",
        value_name = "CERTIFICATE"
    )]
    certificate: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let ConfigReport {
        mut settings,
        warnings,
    } = match &cli.config {
        Some(path) => match Settings::load_file(path) {
            Ok(report) => report,
            Err(e) => {
                eprintln!("{e}");
                return ExitCode::FAILURE;
            }
        },
        None => ConfigReport {
            settings: Settings::default(),
            warnings: Vec::new(),
        },
    };
    settings.apply_overrides(cli.log, cli.private_key, cli.certificate);

    init_tracing(&settings);
    for warning in &warnings {
        tracing::warn!("{warning}");
    }
    if settings.logging.level > MAX_LOGGING_LEVEL {
        tracing::warn!(
            level = settings.logging.level,
            "Logging level above {MAX_LOGGING_LEVEL}, using trace"
        );
    }

    match serve(&settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Server stopped");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.logging.filter_directive()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if env::var(LOG_FORMAT_ENV).is_ok_and(|format| format.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn serve(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let security = &settings.http.security;

    let context = SecurityContext::from_settings(&security.jwt)?;
    if !context.is_enforcing() {
        tracing::warn!("No users configured, authorization is disabled");
    }

    let tls = TlsMaterial::from_paths(
        security.private_key.as_deref(),
        security.certificate.as_deref(),
    )?;

    let host = env::var(HOST_ENV).unwrap_or_else(|_| DEFAULT_HOST.to_string());
    let ip: IpAddr = host
        .parse()
        .map_err(|e| format!("invalid {HOST_ENV} address {host}: {e}"))?;
    let addr = SocketAddr::new(ip, settings.http.port);

    let app = router(AppState::new(Arc::new(context)));

    let handle = Handle::new();
    let shutdown = handle.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.graceful_shutdown(Some(SHUTDOWN_GRACE));
    });

    tracing::debug!(port = settings.coap.port, "CoAP port configured");

    match tls {
        Some(material) => {
            let config = RustlsConfig::from_config(Arc::new(material.server_config()?));
            drop(material);
            tracing::info!("Restserver listening on https://{addr} (docs at /docs)");
            axum_server::bind_rustls(addr, config)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            tracing::info!("Restserver listening on http://{addr} (docs at /docs)");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
