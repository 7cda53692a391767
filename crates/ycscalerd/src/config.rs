//! Process configuration from flags and environment.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::bail;
use clap::Parser;

use ycscaler_metrics::duration::parse_duration;

/// Timeout applied when `--api-timeout` is not a valid duration.
pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser, Debug, Clone)]
#[command(
    name = "ycscalerd",
    about = "KEDA external scaler for Yandex Cloud Monitoring"
)]
pub struct Config {
    /// Base URL of the IAM API.
    #[arg(long, env = "IAM_ENDPOINT", default_value = "https://iam.api.cloud.yandex.net")]
    pub iam_endpoint: String,

    /// Base URL of the Monitoring API.
    #[arg(
        long,
        env = "MONITORING_ENDPOINT",
        default_value = "https://monitoring.api.cloud.yandex.net"
    )]
    pub monitoring_endpoint: String,

    /// Port for the external scaler gRPC service.
    #[arg(long, env = "GRPC_PORT", default_value = "8080")]
    pub grpc_port: u16,

    /// Port for the health endpoint.
    #[arg(long, env = "HTTP_PORT", default_value = "8081")]
    pub http_port: u16,

    #[arg(long, env = "HEALTH_PATH", default_value = "/health")]
    pub health_path: String,

    /// Service account key (JSON).
    #[arg(long, env = "KEY_PATH", default_value = "/app/key.json")]
    pub key_path: PathBuf,

    /// Timeout for IAM and Monitoring requests, e.g. `30s` or `1m`.
    #[arg(long, env = "API_TIMEOUT", default_value = "30s")]
    pub api_timeout: String,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.iam_endpoint.trim().is_empty() {
            bail!("IAM endpoint is required");
        }
        if self.monitoring_endpoint.trim().is_empty() {
            bail!("monitoring endpoint is required");
        }
        if self.key_path.as_os_str().is_empty() {
            bail!("key path is required");
        }
        if !self.health_path.starts_with('/') {
            bail!("health path must start with '/': {}", self.health_path);
        }
        Ok(())
    }

    /// Request timeout; an unparsable or zero value falls back to 30s.
    pub fn api_timeout(&self) -> Duration {
        parse_duration(&self.api_timeout)
            .filter(|d| !d.is_zero())
            .unwrap_or(DEFAULT_API_TIMEOUT)
    }

    pub fn iam_token_url(&self) -> String {
        format!("{}/iam/v1/tokens", self.iam_endpoint.trim_end_matches('/'))
    }

    pub fn monitoring_read_url(&self) -> String {
        format!(
            "{}/monitoring/v2/data/read",
            self.monitoring_endpoint.trim_end_matches('/')
        )
    }
}
