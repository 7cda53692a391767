//! ycscaler-metrics — turns a scaler's metadata into one decision scalar.
//!
//! Parses the per-call metadata into typed [`QueryOptions`], reads the
//! matching series from the monitoring API, cleans each series under the
//! configured NaN policy, and reduces everything to a single value.
//!
//! # Pipeline
//!
//! ```text
//! metadata ──parse──► QueryOptions (+ fallback notices)
//!                        │
//!                        ├── QueryWindow  [now - offset - window, now - offset)
//!                        ├── DownsamplingConfig → optional "downsampling" block
//!                        ▼
//! TokenProvider ──► POST /monitoring/v2/data/read?folderId=...
//!                        │
//!                        ▼
//!                  RawSeries[] ──extract (carry lastValid across series)──►
//!                        │
//!       per-series aggregate (optional) ──► pooled values ──► cross-series aggregate
//!                        │
//!                        ▼
//!                 AggregationResult { value, total, nan, contributing }
//! ```

pub mod aggregate;
pub mod downsampling;
pub mod duration;
pub mod error;
pub mod extract;
pub mod options;
pub mod pipeline;
pub mod series;
pub mod window;

pub use aggregate::{AggregationMethod, aggregate};
pub use downsampling::{DownsamplingConfig, DownsamplingMode, GapFilling, GridAggregation};
pub use error::{DataError, PipelineError, QueryError};
pub use extract::{NanStrategy, extract_values};
pub use options::{Diagnostics, FallbackNotice, LogLevel, ParsedOptions, QueryOptions};
pub use pipeline::{AggregationResult, MetricQueryPipeline, reduce_series};
pub use series::{RawSeries, Sample};
pub use window::QueryWindow;
