//! Duration strings as written in scaler metadata and process config.
//!
//! Accepts a sequence of `<decimal><unit>` terms such as `30s`, `5m`,
//! `1h30m`, `1.5s` or `250ms`. Units: `ns`, `us` (`µs`), `ms`, `s`, `m`, `h`.
//! A bare `0` is zero; any other unitless number is rejected, as is a sign.
//! The total must fit in an `i64` nanosecond count (about 292 years).

use std::time::Duration;

/// Largest accepted total, in nanoseconds.
const MAX_NANOS: f64 = i64::MAX as f64;

/// Parse a duration string. Returns `None` for anything malformed.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s == "0" {
        return Some(Duration::ZERO);
    }
    if s.is_empty() {
        return None;
    }

    let mut rest = s;
    let mut total_nanos = 0f64;

    while !rest.is_empty() {
        let number_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_end == 0 {
            return None;
        }
        let value: f64 = rest[..number_end].parse().ok()?;
        rest = &rest[number_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit_nanos = match &rest[..unit_end] {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            _ => return None,
        };
        total_nanos += value * unit_nanos;
        if !total_nanos.is_finite() || total_nanos > MAX_NANOS {
            return None;
        }
        rest = &rest[unit_end..];
    }

    Some(Duration::from_nanos(total_nanos.round() as u64))
}
