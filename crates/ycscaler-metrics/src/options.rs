//! Typed query options parsed from scaler metadata.
//!
//! Metadata is an untyped string map supplied with every call. Parsing
//! never fails: a missing value takes its default silently, and a value
//! that is present but unusable takes its default with a
//! [`FallbackNotice`] the caller can log.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::aggregate::AggregationMethod;
use crate::downsampling::DownsamplingConfig;
use crate::duration::parse_duration;
use crate::extract::NanStrategy;
use crate::window::{DEFAULT_OFFSET, DEFAULT_WINDOW};

pub const QUERY_KEY: &str = "query";
pub const FOLDER_ID_KEY: &str = "folderId";
pub const NAN_STRATEGY_KEY: &str = "nanStrategy";
pub const AGGREGATION_KEY: &str = "aggregationMethod";
pub const SERIES_AGGREGATION_KEY: &str = "timeSeriesAggregation";
pub const TIME_WINDOW_KEY: &str = "timeWindow";
pub const TIME_WINDOW_OFFSET_KEY: &str = "timeWindowOffset";
pub const LOG_METRICS_KEY: &str = "logMetrics";
pub const LOG_AGGREGATION_KEY: &str = "logAggregation";
pub const LOG_LEVEL_KEY: &str = "logLevel";

/// A metadata value that was replaced by a default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackNotice {
    pub key: String,
    pub value: String,
    pub fallback: String,
}

impl FallbackNotice {
    pub fn new(
        key: impl Into<String>,
        value: impl Into<String>,
        fallback: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            fallback: fallback.into(),
        }
    }
}

impl fmt::Display for FallbackNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid {} '{}', using {}",
            self.key, self.value, self.fallback
        )
    }
}

/// Verbosity requested by a scaler through `logLevel`.
///
/// Process-wide filtering stays with the subscriber; the level is recorded
/// on each call's span so filter directives can select on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    /// Suppress the per-call dumps even when they are switched on.
    Off,
}

impl LogLevel {
    /// Case-insensitive parse; `None` for unrecognized input.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            "none" | "off" => Some(LogLevel::Off),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }

    /// Read `logLevel` from metadata. Unrecognized values fall back to `info`.
    pub fn from_metadata(metadata: &HashMap<String, String>) -> (Self, Option<FallbackNotice>) {
        match metadata.get(LOG_LEVEL_KEY).filter(|v| !v.is_empty()) {
            None => (LogLevel::default(), None),
            Some(raw) => match LogLevel::parse(raw) {
                Some(level) => (level, None),
                None => (
                    LogLevel::default(),
                    Some(FallbackNotice::new(LOG_LEVEL_KEY, raw.as_str(), "info")),
                ),
            },
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-call switches for verbose debug output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Diagnostics {
    /// Dump decoded series.
    pub log_metrics: bool,
    /// Dump pooled values and the reduction result.
    pub log_aggregation: bool,
    pub log_level: LogLevel,
}

impl Diagnostics {
    pub fn metrics_enabled(&self) -> bool {
        self.log_metrics && self.log_level != LogLevel::Off
    }

    pub fn aggregation_enabled(&self) -> bool {
        self.log_aggregation && self.log_level != LogLevel::Off
    }
}

/// Everything needed to run one query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    pub query: String,
    pub folder_id: String,
    pub nan_strategy: NanStrategy,
    /// Cross-series reduction.
    pub aggregation: AggregationMethod,
    /// Optional per-series reduction applied first.
    pub series_aggregation: Option<AggregationMethod>,
    pub window: Duration,
    pub window_offset: Duration,
    pub downsampling: DownsamplingConfig,
    pub diagnostics: Diagnostics,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            query: String::new(),
            folder_id: String::new(),
            nan_strategy: NanStrategy::default(),
            aggregation: AggregationMethod::default(),
            series_aggregation: None,
            window: DEFAULT_WINDOW,
            window_offset: DEFAULT_OFFSET,
            downsampling: DownsamplingConfig::default(),
            diagnostics: Diagnostics::default(),
        }
    }
}

/// Parsed options plus the defaults that had to be applied.
#[derive(Debug, Clone)]
pub struct ParsedOptions {
    pub options: QueryOptions,
    pub notices: Vec<FallbackNotice>,
}

impl QueryOptions {
    /// Build options from scaler metadata.
    pub fn from_metadata(metadata: &HashMap<String, String>) -> ParsedOptions {
        let get = |key: &str| {
            metadata
                .get(key)
                .map(String::as_str)
                .filter(|v| !v.is_empty())
        };
        let mut notices = Vec::new();

        let nan_strategy = match get(NAN_STRATEGY_KEY) {
            None => NanStrategy::default(),
            Some(raw) => NanStrategy::parse(raw).unwrap_or_else(|| {
                notices.push(FallbackNotice::new(NAN_STRATEGY_KEY, raw, "error"));
                NanStrategy::default()
            }),
        };

        let aggregation = match get(AGGREGATION_KEY) {
            None => AggregationMethod::default(),
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                notices.push(FallbackNotice::new(AGGREGATION_KEY, raw, "max"));
                AggregationMethod::default()
            }),
        };

        let series_aggregation = get(SERIES_AGGREGATION_KEY).map(|raw| {
            raw.parse().unwrap_or_else(|_| {
                notices.push(FallbackNotice::new(SERIES_AGGREGATION_KEY, raw, "max"));
                AggregationMethod::default()
            })
        });

        let window = match get(TIME_WINDOW_KEY) {
            None => DEFAULT_WINDOW,
            Some(raw) => parse_duration(raw)
                .filter(|d| !d.is_zero())
                .unwrap_or_else(|| {
                    notices.push(FallbackNotice::new(TIME_WINDOW_KEY, raw, "5m"));
                    DEFAULT_WINDOW
                }),
        };

        let window_offset = match get(TIME_WINDOW_OFFSET_KEY) {
            None => DEFAULT_OFFSET,
            Some(raw) => parse_duration(raw).unwrap_or_else(|| {
                notices.push(FallbackNotice::new(TIME_WINDOW_OFFSET_KEY, raw, "30s"));
                DEFAULT_OFFSET
            }),
        };

        let mut flag = |key: &str| match get(key) {
            None => false,
            Some(raw) => parse_bool(raw).unwrap_or_else(|| {
                notices.push(FallbackNotice::new(key, raw, "false"));
                false
            }),
        };
        let log_metrics = flag(LOG_METRICS_KEY);
        let log_aggregation = flag(LOG_AGGREGATION_KEY);

        let (log_level, level_notice) = LogLevel::from_metadata(metadata);
        notices.extend(level_notice);

        let diagnostics = Diagnostics {
            log_metrics,
            log_aggregation,
            log_level,
        };

        let (downsampling, downsampling_notices) = DownsamplingConfig::resolve(metadata);
        notices.extend(downsampling_notices);

        let options = QueryOptions {
            query: get(QUERY_KEY).unwrap_or_default().to_string(),
            folder_id: get(FOLDER_ID_KEY).unwrap_or_default().to_string(),
            nan_strategy,
            aggregation,
            series_aggregation,
            window,
            window_offset,
            downsampling,
            diagnostics,
        };

        ParsedOptions { options, notices }
    }
}

/// `true|yes|1|on` and `false|no|0|off`, case-insensitive.
pub(crate) fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Some(true),
        "false" | "no" | "0" | "off" => Some(false),
        _ => None,
    }
}
