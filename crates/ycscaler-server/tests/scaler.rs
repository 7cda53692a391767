//! External scaler behavior against an in-process monitoring backend.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::Json;
use axum::Router;
use axum::http::StatusCode;
use axum::routing::post;
use serde_json::{Value, json};
use tonic::{Code, Request};

use ycscaler_auth::{AuthError, TokenProvider};
use ycscaler_metrics::MetricQueryPipeline;
use ycscaler_server::proto::external_scaler_server::ExternalScaler;
use ycscaler_server::proto::{GetMetricsRequest, ScaledObjectRef};
use ycscaler_server::{METRIC_NAME, ScalerService};

// ── Helpers ────────────────────────────────────────────────────

struct StaticToken;

#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self) -> Result<String, AuthError> {
        Ok("t1.static".to_string())
    }
}

struct FailingToken;

#[async_trait]
impl TokenProvider for FailingToken {
    async fn token(&self) -> Result<String, AuthError> {
        Err(AuthError::Timeout)
    }
}

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/monitoring/v2/data/read")
}

/// Backend that always answers with `response` and counts requests.
async fn monitoring(response: Value) -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let router = Router::new().route(
        "/monitoring/v2/data/read",
        post(move || {
            let response = response.clone();
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Json(response)
            }
        }),
    );
    (serve(router).await, hits)
}

async fn failing_monitoring() -> String {
    let router = Router::new().route(
        "/monitoring/v2/data/read",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "backend down") }),
    );
    serve(router).await
}

fn service(endpoint: String, tokens: Arc<dyn TokenProvider>) -> ScalerService {
    ScalerService::new(MetricQueryPipeline::new(
        reqwest::Client::new(),
        endpoint,
        tokens,
    ))
}

fn scaled_object(pairs: &[(&str, &str)]) -> ScaledObjectRef {
    let scaler_metadata: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    ScaledObjectRef {
        name: "worker".to_string(),
        namespace: "default".to_string(),
        scaler_metadata,
    }
}

fn series(values: &[f64]) -> Value {
    json!({"metrics": [{"name": "queue_depth", "timeseries": {"doubleValues": values}}]})
}

// ── IsActive ───────────────────────────────────────────────────

#[tokio::test]
async fn is_active_when_value_is_positive() {
    let (endpoint, hits) = monitoring(series(&[0.0, 3.0])).await;
    let svc = service(endpoint, Arc::new(StaticToken));

    let resp = svc
        .is_active(Request::new(scaled_object(&[("folderId", "f")])))
        .await
        .unwrap();
    assert!(resp.into_inner().result);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn is_inactive_when_value_is_zero() {
    let (endpoint, _) = monitoring(series(&[0.0, 0.0])).await;
    let svc = service(endpoint, Arc::new(StaticToken));

    let resp = svc
        .is_active(Request::new(scaled_object(&[("aggregationMethod", "sum")])))
        .await
        .unwrap();
    assert!(!resp.into_inner().result);
}

#[tokio::test]
async fn is_active_swallows_query_failures() {
    let svc = service(failing_monitoring().await, Arc::new(StaticToken));

    let resp = svc
        .is_active(Request::new(scaled_object(&[])))
        .await
        .unwrap();
    assert!(!resp.into_inner().result);
}

#[tokio::test]
async fn is_active_swallows_token_failures() {
    let (endpoint, hits) = monitoring(series(&[5.0])).await;
    let svc = service(endpoint, Arc::new(FailingToken));

    let resp = svc
        .is_active(Request::new(scaled_object(&[])))
        .await
        .unwrap();
    assert!(!resp.into_inner().result);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn is_active_swallows_data_errors() {
    let (endpoint, _) = monitoring(json!({"metrics": [{"timeseries": {"doubleValues": ["NaN"]}}]})).await;
    let svc = service(endpoint, Arc::new(StaticToken));

    let resp = svc
        .is_active(Request::new(scaled_object(&[("nanStrategy", "error")])))
        .await
        .unwrap();
    assert!(!resp.into_inner().result);
}

// ── GetMetricSpec ──────────────────────────────────────────────

#[tokio::test]
async fn metric_spec_uses_target_value() {
    let (endpoint, hits) = monitoring(series(&[1.0])).await;
    let svc = service(endpoint, Arc::new(StaticToken));

    let resp = svc
        .get_metric_spec(Request::new(scaled_object(&[("targetValue", "25.5")])))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(resp.metric_specs.len(), 1);
    assert_eq!(resp.metric_specs[0].metric_name, METRIC_NAME);
    assert_eq!(resp.metric_specs[0].target_size_float, 25.5);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn metric_spec_defaults_target() {
    let svc = service(failing_monitoring().await, Arc::new(FailingToken));

    for metadata in [vec![], vec![("targetValue", "eighty")]] {
        let resp = svc
            .get_metric_spec(Request::new(scaled_object(&metadata)))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(resp.metric_specs[0].target_size_float, 80.0);
    }
}

// ── GetMetrics ─────────────────────────────────────────────────

#[tokio::test]
async fn metrics_report_value_under_requested_name() {
    let (endpoint, _) = monitoring(json!({
        "metrics": [
            {"name": "a", "timeseries": {"doubleValues": [1.0, 2.0, 3.0]}},
            {"name": "b", "timeseries": {"doubleValues": [10.0, 20.0]}}
        ]
    }))
    .await;
    let svc = service(endpoint, Arc::new(StaticToken));

    let resp = svc
        .get_metrics(Request::new(GetMetricsRequest {
            scaled_object_ref: Some(scaled_object(&[
                ("timeSeriesAggregation", "avg"),
                ("aggregationMethod", "sum"),
                ("targetValue", "10"),
            ])),
            metric_name: "s0-yandex_monitoring_metric".to_string(),
        }))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(resp.metric_values.len(), 1);
    assert_eq!(resp.metric_values[0].metric_name, "s0-yandex_monitoring_metric");
    assert_eq!(resp.metric_values[0].metric_value_float, 17.0);
}

#[tokio::test]
async fn metrics_zero_strategy_reports_zero_for_empty_data() {
    let (endpoint, _) = monitoring(json!({"metrics": []})).await;
    let svc = service(endpoint, Arc::new(StaticToken));

    let resp = svc
        .get_metrics(Request::new(GetMetricsRequest {
            scaled_object_ref: Some(scaled_object(&[("nanStrategy", "zero")])),
            metric_name: METRIC_NAME.to_string(),
        }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(resp.metric_values[0].metric_value_float, 0.0);
}

#[tokio::test]
async fn metrics_surface_query_failures() {
    let svc = service(failing_monitoring().await, Arc::new(StaticToken));

    let status = svc
        .get_metrics(Request::new(GetMetricsRequest {
            scaled_object_ref: Some(scaled_object(&[])),
            metric_name: METRIC_NAME.to_string(),
        }))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::Internal);
    assert!(status.message().contains("500"), "{}", status.message());
}

#[tokio::test]
async fn metrics_surface_data_errors() {
    let (endpoint, _) = monitoring(json!({"metrics": [{"timeseries": {}}]})).await;
    let svc = service(endpoint, Arc::new(StaticToken));

    let status = svc
        .get_metrics(Request::new(GetMetricsRequest {
            scaled_object_ref: Some(scaled_object(&[])),
            metric_name: METRIC_NAME.to_string(),
        }))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::Internal);
    assert!(status.message().contains("no valid metric data available"));
}

#[tokio::test]
async fn metrics_without_scaled_object_ref_use_defaults() {
    let (endpoint, hits) = monitoring(series(&[4.0, 2.0])).await;
    let svc = service(endpoint, Arc::new(StaticToken));

    let resp = svc
        .get_metrics(Request::new(GetMetricsRequest {
            scaled_object_ref: None,
            metric_name: METRIC_NAME.to_string(),
        }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(resp.metric_values[0].metric_value_float, 4.0);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

// ── StreamIsActive ─────────────────────────────────────────────

#[tokio::test]
async fn stream_is_active_is_unimplemented() {
    let (endpoint, hits) = monitoring(series(&[1.0])).await;
    let svc = service(endpoint, Arc::new(StaticToken));

    match svc.stream_is_active(Request::new(scaled_object(&[]))).await {
        Ok(_) => panic!("StreamIsActive should not be served"),
        Err(status) => assert_eq!(status.code(), Code::Unimplemented),
    }
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn log_level_metadata_does_not_change_results() {
    let (endpoint, _) = monitoring(series(&[2.0, 6.0])).await;
    let svc = service(endpoint, Arc::new(StaticToken));

    for level in ["debug", "off", "bogus"] {
        let resp = svc
            .get_metrics(Request::new(GetMetricsRequest {
                scaled_object_ref: Some(scaled_object(&[
                    ("logLevel", level),
                    ("logMetrics", "true"),
                    ("logAggregation", "true"),
                ])),
                metric_name: METRIC_NAME.to_string(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(resp.metric_values[0].metric_value_float, 6.0, "{level}");
    }
}
