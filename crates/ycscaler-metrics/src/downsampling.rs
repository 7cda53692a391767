//! Server-side downsampling settings.
//!
//! Five metadata keys control the optional `downsampling` block of a query.
//! None of them ever fails a call: unrecognized values are dropped or
//! replaced by a default and reported as [`FallbackNotice`]s.
//!
//! Mode selection among `maxPoints`, `gridInterval` and `disabled`:
//!
//! | resolvable modes | result |
//! |---|---|
//! | 0, no key present | no `downsampling` block at all |
//! | 0, other keys present | `maxPoints = 10` |
//! | 1 | that mode |
//! | 2 or more | `maxPoints = 10` |

use std::collections::HashMap;

use serde::Serialize;

use crate::options::{FallbackNotice, parse_bool};

pub const GRID_AGGREGATION_KEY: &str = "downsampling.gridAggregation";
pub const GAP_FILLING_KEY: &str = "downsampling.gapFilling";
pub const MAX_POINTS_KEY: &str = "downsampling.maxPoints";
pub const GRID_INTERVAL_KEY: &str = "downsampling.gridInterval";
pub const DISABLED_KEY: &str = "downsampling.disabled";

const SETTING_KEYS: [&str; 5] = [
    GRID_AGGREGATION_KEY,
    GAP_FILLING_KEY,
    MAX_POINTS_KEY,
    GRID_INTERVAL_KEY,
    DISABLED_KEY,
];

/// Smallest point count the API accepts; also the fallback.
pub const MIN_MAX_POINTS: u32 = 10;

/// Per-bucket aggregation applied by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridAggregation {
    Max,
    Min,
    Sum,
    Avg,
    Last,
    Count,
}

impl GridAggregation {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MAX" => Some(GridAggregation::Max),
            "MIN" => Some(GridAggregation::Min),
            "SUM" => Some(GridAggregation::Sum),
            "AVG" => Some(GridAggregation::Avg),
            "LAST" => Some(GridAggregation::Last),
            "COUNT" => Some(GridAggregation::Count),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GridAggregation::Max => "MAX",
            GridAggregation::Min => "MIN",
            GridAggregation::Sum => "SUM",
            GridAggregation::Avg => "AVG",
            GridAggregation::Last => "LAST",
            GridAggregation::Count => "COUNT",
        }
    }
}

/// How the server fills empty buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapFilling {
    Null,
    None,
    Previous,
}

impl GapFilling {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NULL" => Some(GapFilling::Null),
            "NONE" => Some(GapFilling::None),
            "PREVIOUS" => Some(GapFilling::Previous),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GapFilling::Null => "NULL",
            GapFilling::None => "NONE",
            GapFilling::Previous => "PREVIOUS",
        }
    }
}

/// Which downsampling method is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DownsamplingMode {
    /// Leave downsampling to the server.
    #[default]
    None,
    /// Target point count (≥ 10).
    MaxPoints(u32),
    /// Bucket width in milliseconds (> 0).
    GridInterval(u64),
    Disabled,
}

/// Resolved downsampling settings for one query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DownsamplingConfig {
    pub grid_aggregation: Option<GridAggregation>,
    pub gap_filling: Option<GapFilling>,
    pub mode: DownsamplingMode,
    /// Whether any downsampling key was given a non-empty value.
    pub has_settings: bool,
}

/// The `downsampling` object of a `data/read` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownsamplingPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid_aggregation: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gap_filling: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_points: Option<u32>,
    /// Milliseconds, sent as a decimal string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid_interval: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
}

impl DownsamplingConfig {
    /// Resolve settings from scaler metadata.
    pub fn resolve(metadata: &HashMap<String, String>) -> (Self, Vec<FallbackNotice>) {
        let get = |key: &str| {
            metadata
                .get(key)
                .map(String::as_str)
                .filter(|v| !v.is_empty())
        };

        if !SETTING_KEYS.iter().any(|key| get(key).is_some()) {
            return (Self::default(), Vec::new());
        }

        let mut notices = Vec::new();

        let grid_aggregation = get(GRID_AGGREGATION_KEY).and_then(|raw| {
            let parsed = GridAggregation::parse(raw);
            if parsed.is_none() {
                notices.push(FallbackNotice::new(GRID_AGGREGATION_KEY, raw, "omitted"));
            }
            parsed
        });

        let gap_filling = get(GAP_FILLING_KEY).and_then(|raw| {
            let parsed = GapFilling::parse(raw);
            if parsed.is_none() {
                notices.push(FallbackNotice::new(GAP_FILLING_KEY, raw, "omitted"));
            }
            parsed
        });

        let mut modes = Vec::new();

        if let Some(raw) = get(MAX_POINTS_KEY) {
            let points = match raw.trim().parse::<u32>() {
                Ok(n) if n >= MIN_MAX_POINTS => n,
                _ => {
                    notices.push(FallbackNotice::new(MAX_POINTS_KEY, raw, "10"));
                    MIN_MAX_POINTS
                }
            };
            modes.push(DownsamplingMode::MaxPoints(points));
        }

        if let Some(raw) = get(GRID_INTERVAL_KEY) {
            match raw.trim().parse::<i64>() {
                Ok(ms) if ms > 0 => modes.push(DownsamplingMode::GridInterval(ms as u64)),
                _ => notices.push(FallbackNotice::new(GRID_INTERVAL_KEY, raw, "ignored")),
            }
        }

        if let Some(raw) = get(DISABLED_KEY) {
            if !parse_bool(raw).unwrap_or(false) {
                notices.push(FallbackNotice::new(DISABLED_KEY, raw, "disabled"));
            }
            modes.push(DownsamplingMode::Disabled);
        }

        let mode = match modes.as_slice() {
            [single] => *single,
            [] => DownsamplingMode::MaxPoints(MIN_MAX_POINTS),
            _ => {
                let requested = modes
                    .iter()
                    .map(|m| format!("{m:?}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                notices.push(FallbackNotice::new("downsampling", requested, "maxPoints=10"));
                DownsamplingMode::MaxPoints(MIN_MAX_POINTS)
            }
        };

        let config = Self {
            grid_aggregation,
            gap_filling,
            mode,
            has_settings: true,
        };
        (config, notices)
    }

    /// The request block, or `None` when no settings were given.
    pub fn payload(&self) -> Option<DownsamplingPayload> {
        if !self.has_settings {
            return None;
        }

        let mut payload = DownsamplingPayload {
            grid_aggregation: self.grid_aggregation.map(|g| g.as_str()),
            gap_filling: self.gap_filling.map(|g| g.as_str()),
            max_points: None,
            grid_interval: None,
            disabled: None,
        };

        match self.mode {
            DownsamplingMode::MaxPoints(n) => payload.max_points = Some(n),
            DownsamplingMode::GridInterval(ms) => payload.grid_interval = Some(ms.to_string()),
            DownsamplingMode::Disabled => payload.disabled = Some(true),
            DownsamplingMode::None => {}
        }

        Some(payload)
    }
}
