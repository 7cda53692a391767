//! Metric query pipeline — remote read plus scalar reduction.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use ycscaler_auth::TokenProvider;

use crate::aggregate::aggregate;
use crate::downsampling::DownsamplingPayload;
use crate::error::{DataError, PipelineError, QueryError};
use crate::extract::{NanStrategy, extract_values};
use crate::options::QueryOptions;
use crate::series::{RawSeries, decode_response};
use crate::window::QueryWindow;

/// The single scalar a call produces, with counters for logging.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationResult {
    pub value: f64,
    /// Samples seen across all series (valid or `NaN`).
    pub total_samples: usize,
    pub nan_samples: usize,
    /// Values that entered the cross-series reduction.
    pub contributing_values: usize,
}

/// Body of a `data/read` request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    query: &'a str,
    from_time: String,
    to_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    downsampling: Option<DownsamplingPayload>,
}

/// Reduce decoded series to one value.
///
/// Series are scanned in response order and the last valid value is
/// carried from one series into the next. With a per-series method each
/// non-empty series contributes one value; otherwise every extracted value
/// is pooled. The pool is then reduced with the cross-series method.
pub fn reduce_series(
    series: &[RawSeries],
    options: &QueryOptions,
) -> Result<AggregationResult, DataError> {
    if options.diagnostics.metrics_enabled() {
        debug!(series = ?series, "raw metrics");
    }

    let mut pooled = Vec::new();
    let mut carry = None;
    let mut total_samples = 0;
    let mut nan_samples = 0;

    for (index, s) in series.iter().enumerate() {
        total_samples += s.samples.len();
        nan_samples += s.nan_count();

        let (values, next_carry) = extract_values(&s.samples, options.nan_strategy, carry);
        carry = next_carry;

        debug!(
            index,
            name = %s.name,
            labels = ?s.labels,
            extracted = values.len(),
            "processed series"
        );

        match options.series_aggregation {
            Some(method) if !values.is_empty() => {
                let reduced = aggregate(&values, method)?;
                if options.diagnostics.aggregation_enabled() {
                    debug!(index, %method, values = ?values, result = reduced, "series aggregation");
                }
                pooled.push(reduced);
            }
            _ => pooled.extend(values),
        }
    }

    debug!(
        total = total_samples,
        nan = nan_samples,
        valid = pooled.len(),
        nan_strategy = %options.nan_strategy,
        "data summary"
    );

    if pooled.is_empty() {
        if options.nan_strategy == NanStrategy::Error && nan_samples > 0 {
            return Err(DataError::AllNaN);
        }

        warn!(
            total = total_samples,
            nan = nan_samples,
            "no valid values found after processing"
        );

        if options.nan_strategy == NanStrategy::Zero {
            info!("no data available with zero strategy, returning 0");
            return Ok(AggregationResult {
                value: 0.0,
                total_samples,
                nan_samples,
                contributing_values: 0,
            });
        }

        return Err(DataError::NoData);
    }

    let value = aggregate(&pooled, options.aggregation)?;

    if options.diagnostics.aggregation_enabled() {
        debug!(method = %options.aggregation, values = ?pooled, result = value, "cross-series aggregation");
    }

    Ok(AggregationResult {
        value,
        total_samples,
        nan_samples,
        contributing_values: pooled.len(),
    })
}

/// Runs one query against the monitoring API and reduces the answer.
///
/// Stateless apart from the shared token provider; one instance serves
/// every concurrent call.
#[derive(Clone)]
pub struct MetricQueryPipeline {
    client: reqwest::Client,
    endpoint: String,
    tokens: Arc<dyn TokenProvider>,
}

impl MetricQueryPipeline {
    /// `endpoint` is the full `data/read` URL without the `folderId` query.
    ///
    /// Requests are bounded by the timeout `client` was built with.
    pub fn new(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            tokens,
        }
    }

    /// Query and reduce, with the window ending relative to the current time.
    pub async fn run(&self, options: &QueryOptions) -> Result<AggregationResult, PipelineError> {
        self.run_at(options, Utc::now()).await
    }

    /// Query and reduce, with the window ending relative to `now`.
    pub async fn run_at(
        &self,
        options: &QueryOptions,
        now: DateTime<Utc>,
    ) -> Result<AggregationResult, PipelineError> {
        debug!(
            query = %options.query,
            folder = %options.folder_id,
            has_downsampling = options.downsampling.has_settings,
            window = ?options.window,
            offset = ?options.window_offset,
            "querying metric"
        );

        let window = QueryWindow::resolve(now, options.window, options.window_offset);
        let request = QueryRequest {
            query: &options.query,
            from_time: window.from_time(),
            to_time: window.to_time(),
            downsampling: options.downsampling.payload(),
        };

        let token = self.tokens.token().await?;
        let series = self.fetch(&token, &options.folder_id, &request).await?;
        let result = reduce_series(&series, options)?;

        info!(
            value = result.value,
            total = result.total_samples,
            nan = result.nan_samples,
            "final metric value"
        );

        Ok(result)
    }

    async fn fetch(
        &self,
        token: &str,
        folder_id: &str,
        request: &QueryRequest<'_>,
    ) -> Result<Vec<RawSeries>, QueryError> {
        let url = reqwest::Url::parse_with_params(&self.endpoint, &[("folderId", folder_id)])
            .map_err(|e| QueryError::Transport(format!("invalid endpoint: {e}")))?;

        debug!(%url, from = %request.from_time, to = %request.to_time, "API request");

        let resp = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(request)
            .send()
            .await
            .map_err(QueryError::from_reqwest)?;

        let status = resp.status();
        let body = resp.bytes().await.map_err(QueryError::from_reqwest)?;

        debug!(status = status.as_u16(), bytes = body.len(), "API response");

        if !status.is_success() {
            return Err(QueryError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        decode_response(&body).map_err(|e| QueryError::Decode(e.to_string()))
    }
}
