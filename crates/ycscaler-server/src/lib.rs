//! ycscaler-server — KEDA external scaler over gRPC.
//!
//! Serves the `externalscaler.ExternalScaler` protocol on top of the
//! metric pipeline.
//!
//! # Architecture
//!
//! ```text
//! KEDA operator
//!   └── ScalerService (gRPC)
//!       ├── IsActive()      → pipeline value > 0; query failures report false
//!       ├── StreamIsActive() → UNIMPLEMENTED
//!       ├── GetMetricSpec() → { yandex_monitoring_metric, targetValue | 80 }
//!       └── GetMetrics()    → pipeline value; query failures → INTERNAL
//!                 │
//!                 ▼
//!         MetricQueryPipeline ──► CredentialCache ──► IAM
//!                 └────────────► Monitoring API
//! ```

pub mod proto;
pub mod service;

pub use service::{DEFAULT_TARGET_VALUE, METRIC_NAME, ScaleDirection, ScalerService};
