//! External scaler gRPC service.
//!
//! Every call rebuilds its query options from the request metadata and
//! runs the metric pipeline; nothing is kept between calls apart from the
//! credential cache behind the pipeline.

use std::collections::HashMap;
use std::fmt;

use tonic::codegen::BoxStream;
use tonic::{Request, Response, Status};
use tracing::field::Empty;
use tracing::{Instrument, Span, debug, error, info, info_span, warn};

use ycscaler_metrics::{LogLevel, MetricQueryPipeline, QueryOptions};

use crate::proto;
use crate::proto::external_scaler_server::{ExternalScaler, ExternalScalerServer};

/// Name of the single metric this scaler reports.
pub const METRIC_NAME: &str = "yandex_monitoring_metric";

/// Target used when `targetValue` is absent or unparsable.
pub const DEFAULT_TARGET_VALUE: f64 = 80.0;

pub const TARGET_VALUE_KEY: &str = "targetValue";

/// Where the current value sits relative to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleDirection {
    Up,
    Down,
    Stable,
}

impl ScaleDirection {
    pub fn classify(current: f64, target: f64) -> Self {
        if current > target {
            ScaleDirection::Up
        } else if current < target {
            ScaleDirection::Down
        } else {
            ScaleDirection::Stable
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScaleDirection::Up => "SCALE-UP",
            ScaleDirection::Down => "SCALE-DOWN",
            ScaleDirection::Stable => "STABLE",
        }
    }
}

impl fmt::Display for ScaleDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read `targetValue` from metadata, falling back to [`DEFAULT_TARGET_VALUE`].
pub fn target_value(metadata: &HashMap<String, String>) -> f64 {
    match metadata.get(TARGET_VALUE_KEY).filter(|v| !v.is_empty()) {
        None => DEFAULT_TARGET_VALUE,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(
                value = %raw,
                fallback = DEFAULT_TARGET_VALUE,
                "invalid targetValue, using default"
            );
            DEFAULT_TARGET_VALUE
        }),
    }
}

/// Parse query options, log every default that had to be applied, and
/// record the requested level on the current span.
fn query_options(metadata: &HashMap<String, String>) -> QueryOptions {
    let parsed = QueryOptions::from_metadata(metadata);
    for notice in &parsed.notices {
        warn!(key = %notice.key, value = %notice.value, fallback = %notice.fallback, "{notice}");
    }
    Span::current().record("log_level", parsed.options.diagnostics.log_level.as_str());
    parsed.options
}

/// gRPC implementation of the KEDA external scaler.
pub struct ScalerService {
    pipeline: MetricQueryPipeline,
}

impl ScalerService {
    pub fn new(pipeline: MetricQueryPipeline) -> Self {
        Self { pipeline }
    }

    /// Get the tonic service for mounting on a gRPC server.
    pub fn into_service(self) -> ExternalScalerServer<Self> {
        ExternalScalerServer::new(self)
    }
}

#[tonic::async_trait]
impl ExternalScaler for ScalerService {
    async fn is_active(
        &self,
        request: Request<proto::ScaledObjectRef>,
    ) -> Result<Response<proto::IsActiveResponse>, Status> {
        let scaled = request.into_inner();
        let span = info_span!(
            "is_active",
            scaler = %scaled.name,
            namespace = %scaled.namespace,
            log_level = Empty
        );

        async move {
            debug!("IsActive called");
            let options = query_options(&scaled.scaler_metadata);

            // A failed query means "not active"; the activity check itself never fails.
            let result = match self.pipeline.run(&options).await {
                Ok(aggregated) => {
                    let active = aggregated.value > 0.0;
                    info!(active, value = aggregated.value, "IsActive result");
                    active
                }
                Err(e) => {
                    error!(error = %e, "metric query failed, reporting inactive");
                    false
                }
            };

            Ok(Response::new(proto::IsActiveResponse { result }))
        }
        .instrument(span)
        .await
    }

    type StreamIsActiveStream = BoxStream<proto::IsActiveResponse>;

    /// Push-based activity is not offered; KEDA polls `IsActive` instead.
    async fn stream_is_active(
        &self,
        request: Request<proto::ScaledObjectRef>,
    ) -> Result<Response<Self::StreamIsActiveStream>, Status> {
        let scaled = request.into_inner();
        debug!(scaler = %scaled.name, namespace = %scaled.namespace, "StreamIsActive rejected");
        Err(Status::unimplemented("StreamIsActive is not supported"))
    }

    async fn get_metric_spec(
        &self,
        request: Request<proto::ScaledObjectRef>,
    ) -> Result<Response<proto::GetMetricSpecResponse>, Status> {
        let scaled = request.into_inner();
        let span = info_span!(
            "get_metric_spec",
            scaler = %scaled.name,
            namespace = %scaled.namespace,
            log_level = Empty
        );

        let target = span.in_scope(|| {
            let (level, notice) = LogLevel::from_metadata(&scaled.scaler_metadata);
            Span::current().record("log_level", level.as_str());
            if let Some(notice) = notice {
                warn!(key = %notice.key, value = %notice.value, fallback = %notice.fallback, "{notice}");
            }

            debug!("GetMetricSpec called");
            let target = target_value(&scaled.scaler_metadata);
            info!(target, "returning metric spec");
            target
        });

        Ok(Response::new(proto::GetMetricSpecResponse {
            metric_specs: vec![proto::MetricSpec {
                metric_name: METRIC_NAME.to_string(),
                target_size: 0,
                target_size_float: target,
            }],
        }))
    }

    async fn get_metrics(
        &self,
        request: Request<proto::GetMetricsRequest>,
    ) -> Result<Response<proto::GetMetricsResponse>, Status> {
        let req = request.into_inner();
        let scaled = req.scaled_object_ref.unwrap_or_default();
        let metric_name = req.metric_name;
        let span = info_span!(
            "get_metrics",
            scaler = %scaled.name,
            namespace = %scaled.namespace,
            log_level = Empty
        );

        async move {
            debug!(metric = %metric_name, metadata = ?scaled.scaler_metadata, "GetMetrics called");

            let target = target_value(&scaled.scaler_metadata);
            let options = query_options(&scaled.scaler_metadata);

            let aggregated = self.pipeline.run(&options).await.map_err(|e| {
                error!(error = %e, "metric query failed");
                Status::internal(format!("failed to query metric: {e}"))
            })?;

            let value = aggregated.value;
            info!(
                metric = %metric_name,
                current = value,
                target,
                ratio = value / target,
                direction = %ScaleDirection::classify(value, target),
                "returning metric value"
            );

            Ok(Response::new(proto::GetMetricsResponse {
                metric_values: vec![proto::MetricValue {
                    metric_name,
                    metric_value: 0,
                    metric_value_float: value,
                }],
            }))
        }
        .instrument(span)
        .await
    }
}
