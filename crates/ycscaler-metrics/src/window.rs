//! Query time range.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

/// Default look-back window.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Default distance between "now" and the end of the window.
pub const DEFAULT_OFFSET: Duration = Duration::from_secs(30);

/// Wire format of `fromTime`/`toTime`.
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Half-open range `[from, to)` sent with a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl QueryWindow {
    /// `to = now - offset`, `from = to - window`.
    pub fn resolve(now: DateTime<Utc>, window: Duration, offset: Duration) -> Self {
        let to = now
            .checked_sub_signed(to_delta(offset))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let from = to
            .checked_sub_signed(to_delta(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self { from, to }
    }

    pub fn from_time(&self) -> String {
        self.from.format(TIME_FORMAT).to_string()
    }

    pub fn to_time(&self) -> String {
        self.to.format(TIME_FORMAT).to_string()
    }
}

fn to_delta(d: Duration) -> TimeDelta {
    TimeDelta::from_std(d).unwrap_or(TimeDelta::MAX)
}
