//! Monitoring API response decoding.
//!
//! The API returns `doubleValues` as a mix of JSON numbers and strings,
//! where the string `"NaN"` marks a missing point. Decoding turns every
//! element into a closed [`Sample`] so the extraction step never inspects
//! JSON types; elements that are neither numbers nor numeric strings are
//! dropped here.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

/// One decoded sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    Value(f64),
    /// The `"NaN"` sentinel.
    NaN,
}

impl Sample {
    /// Decode a raw JSON element. `None` for elements carrying no number.
    pub fn from_json(value: &Value) -> Option<Sample> {
        match value {
            Value::Number(n) => n.as_f64().map(Sample::Value),
            Value::String(s) if s == "NaN" => Some(Sample::NaN),
            Value::String(s) => match s.trim().parse::<f64>() {
                Ok(v) if v.is_nan() => Some(Sample::NaN),
                Ok(v) => Some(Sample::Value(v)),
                Err(_) => None,
            },
            _ => None,
        }
    }
}

/// One named series as returned by the monitoring API.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawSeries {
    pub name: String,
    pub labels: HashMap<String, String>,
    /// Declared metric type (`DGAUGE`, `IGAUGE`, ...).
    pub kind: String,
    pub timestamps: Vec<i64>,
    /// Double values first, then int64 values, in response order.
    pub samples: Vec<Sample>,
}

impl RawSeries {
    /// Number of `NaN` sentinels in this series.
    pub fn nan_count(&self) -> usize {
        self.samples.iter().filter(|s| matches!(s, Sample::NaN)).count()
    }
}

#[derive(Deserialize)]
struct WireResponse {
    metrics: Option<Vec<WireMetric>>,
}

#[derive(Deserialize)]
struct WireMetric {
    name: Option<String>,
    labels: Option<HashMap<String, String>>,
    #[serde(rename = "type")]
    kind: Option<String>,
    timeseries: Option<WireTimeseries>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTimeseries {
    timestamps: Option<Vec<i64>>,
    double_values: Option<Vec<Value>>,
    int64_values: Option<Vec<Value>>,
}

/// Decode a `data/read` response body into series, in response order.
pub fn decode_response(body: &[u8]) -> Result<Vec<RawSeries>, serde_json::Error> {
    let response: WireResponse = serde_json::from_slice(body)?;

    let series = response
        .metrics
        .unwrap_or_default()
        .into_iter()
        .map(|metric| {
            let (timestamps, samples) = match metric.timeseries {
                Some(ts) => {
                    let samples = ts
                        .double_values
                        .unwrap_or_default()
                        .into_iter()
                        .chain(ts.int64_values.unwrap_or_default())
                        .filter_map(|v| Sample::from_json(&v))
                        .collect();
                    (ts.timestamps.unwrap_or_default(), samples)
                }
                None => (Vec::new(), Vec::new()),
            };

            RawSeries {
                name: metric.name.unwrap_or_default(),
                labels: metric.labels.unwrap_or_default(),
                kind: metric.kind.unwrap_or_default(),
                timestamps,
                samples,
            }
        })
        .collect();

    Ok(series)
}
