//! Clean numeric values out of decoded samples.

use std::fmt;

use crate::series::Sample;

/// What to do with a `NaN` sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NanStrategy {
    /// Drop it.
    Skip,
    /// Replace it with `0.0`.
    Zero,
    /// Drop it; the call fails if nothing else survives.
    #[default]
    Error,
    /// Replace it with the last valid value carried in from earlier series.
    LastValid,
}

impl NanStrategy {
    /// Case-insensitive parse; `None` for unrecognized input.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "skip" => Some(NanStrategy::Skip),
            "zero" => Some(NanStrategy::Zero),
            "error" => Some(NanStrategy::Error),
            "lastvalid" | "last_valid" => Some(NanStrategy::LastValid),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NanStrategy::Skip => "skip",
            NanStrategy::Zero => "zero",
            NanStrategy::Error => "error",
            NanStrategy::LastValid => "lastValid",
        }
    }
}

impl fmt::Display for NanStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extract valid values from `samples` under `strategy`.
///
/// `carried` is the last valid value handed over from the series scanned
/// before this one. Under [`NanStrategy::LastValid`] every `NaN` in this
/// series is replaced by `carried` (or dropped when there is none). Valid
/// samples update the carry returned for the next series.
pub fn extract_values(
    samples: &[Sample],
    strategy: NanStrategy,
    carried: Option<f64>,
) -> (Vec<f64>, Option<f64>) {
    let mut values = Vec::with_capacity(samples.len());
    let mut last_valid = carried;

    for sample in samples {
        match *sample {
            Sample::Value(v) => {
                values.push(v);
                last_valid = Some(v);
            }
            Sample::NaN => match strategy {
                NanStrategy::Zero => values.push(0.0),
                NanStrategy::LastValid => {
                    if let Some(v) = carried {
                        values.push(v);
                    }
                }
                NanStrategy::Skip | NanStrategy::Error => {}
            },
        }
    }

    (values, last_valid)
}
