//! ycscalerd — the KEDA external scaler daemon.
//!
//! Single binary that assembles:
//! - Service account key + cached IAM token
//! - Metric query pipeline (Monitoring API)
//! - External scaler gRPC service (with server reflection)
//! - HTTP health endpoint
//!
//! # Usage
//!
//! ```text
//! ycscalerd --key-path /app/key.json --grpc-port 8080 --http-port 8081
//! ```

mod config;
mod health;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ycscaler_auth::{CredentialCache, IamExchange, SigningKey};
use ycscaler_metrics::MetricQueryPipeline;
use ycscaler_server::ScalerService;

use crate::config::Config;
use crate::health::health_router;

const DEFAULT_LOG_FILTER: &str = "info,ycscalerd=debug,ycscaler=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let config = Config::parse();
    config.validate().context("invalid configuration")?;

    run(config).await
}

async fn run(config: Config) -> anyhow::Result<()> {
    info!(
        iam = %config.iam_endpoint,
        monitoring = %config.monitoring_endpoint,
        "ycscalerd starting"
    );

    // ── Credentials ────────────────────────────────────────────

    let key = SigningKey::load(&config.key_path).with_context(|| {
        format!(
            "failed to load service account key from {}",
            config.key_path.display()
        )
    })?;
    info!(key_id = key.key_id(), "service account key loaded");

    let timeout = config.api_timeout();
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("failed to build HTTP client")?;
    info!(?timeout, "HTTP client initialized");

    let tokens = Arc::new(CredentialCache::new(
        key,
        IamExchange::new(client.clone(), config.iam_token_url()),
    ));

    // ── Scaler ─────────────────────────────────────────────────

    let pipeline = MetricQueryPipeline::new(client, config.monitoring_read_url(), tokens);
    let scaler = ScalerService::new(pipeline);

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── gRPC server ────────────────────────────────────────────

    let reflection = tonic_reflection::server::Builder::configure()
        .register_encoded_file_descriptor_set(ycscaler_server::proto::FILE_DESCRIPTOR_SET)
        .build_v1()
        .context("failed to build gRPC reflection service")?;

    let grpc_addr = SocketAddr::from(([0, 0, 0, 0], config.grpc_port));
    let mut grpc_shutdown = shutdown_rx.clone();
    info!(%grpc_addr, "gRPC server starting");

    let mut grpc_handle = tokio::spawn(async move {
        tonic::transport::Server::builder()
            .add_service(scaler.into_service())
            .add_service(reflection)
            .serve_with_shutdown(grpc_addr, async move {
                let _ = grpc_shutdown.changed().await;
            })
            .await
    });

    // ── Health server ──────────────────────────────────────────

    let http_addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = tokio::net::TcpListener::bind(http_addr)
        .await
        .with_context(|| format!("failed to bind health endpoint on {http_addr}"))?;
    let router = health_router(&config.health_path);
    let mut http_shutdown = shutdown_rx;
    info!(%http_addr, path = %config.health_path, "health server starting");

    let mut http_handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = http_shutdown.changed().await;
            })
            .await
    });

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                error!(error = %e, "failed to listen for shutdown signal");
            }
            info!("shutdown signal received");
        }
        res = &mut grpc_handle => {
            res??;
            bail!("gRPC server exited unexpectedly");
        }
        res = &mut http_handle => {
            res??;
            bail!("health server exited unexpectedly");
        }
    }

    let _ = shutdown_tx.send(true);

    grpc_handle.await??;
    http_handle.await??;

    info!("ycscalerd stopped");
    Ok(())
}
