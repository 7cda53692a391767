//! Scalar reduction of a value sequence.

use std::fmt;
use std::str::FromStr;

use crate::error::DataError;

/// How a sequence of values is reduced to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AggregationMethod {
    Sum,
    Avg,
    #[default]
    Max,
    Min,
    /// Last element in input order.
    Last,
}

impl AggregationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationMethod::Sum => "sum",
            AggregationMethod::Avg => "avg",
            AggregationMethod::Max => "max",
            AggregationMethod::Min => "min",
            AggregationMethod::Last => "last",
        }
    }
}

impl fmt::Display for AggregationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregationMethod {
    type Err = DataError;

    /// Case-insensitive; accepts the common aliases (`average`, `mean`,
    /// `maximum`, `minimum`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sum" => Ok(AggregationMethod::Sum),
            "avg" | "average" | "mean" => Ok(AggregationMethod::Avg),
            "max" | "maximum" => Ok(AggregationMethod::Max),
            "min" | "minimum" => Ok(AggregationMethod::Min),
            "last" => Ok(AggregationMethod::Last),
            _ => Err(DataError::UnknownMethod(s.to_string())),
        }
    }
}

/// Reduce `values` with `method`. Fails on empty input.
pub fn aggregate(values: &[f64], method: AggregationMethod) -> Result<f64, DataError> {
    let (first, rest) = values.split_first().ok_or(DataError::EmptyInput)?;

    let result = match method {
        AggregationMethod::Sum => values.iter().sum(),
        AggregationMethod::Avg => values.iter().sum::<f64>() / values.len() as f64,
        AggregationMethod::Max => rest.iter().fold(*first, |acc, &v| if v > acc { v } else { acc }),
        AggregationMethod::Min => rest.iter().fold(*first, |acc, &v| if v < acc { v } else { acc }),
        AggregationMethod::Last => *rest.last().unwrap_or(first),
    };

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sum_avg_max_min() {
        assert_eq!(aggregate(&[1.0, 2.0, 3.0], AggregationMethod::Sum), Ok(6.0));
        assert_eq!(aggregate(&[2.0, 4.0, 6.0], AggregationMethod::Avg), Ok(4.0));
        assert_eq!(aggregate(&[5.0, 1.0, 9.0], AggregationMethod::Max), Ok(9.0));
        assert_eq!(aggregate(&[5.0, 1.0, 9.0], AggregationMethod::Min), Ok(1.0));
    }

    #[test]
    fn last_is_last_in_input_order() {
        let cases: [&[f64]; 4] = [&[7.0], &[1.0, 2.0], &[9.0, 3.0, 5.0], &[-1.0, 0.0, 4.5, -8.25]];
        for values in cases {
            assert_eq!(
                aggregate(values, AggregationMethod::Last),
                Ok(values[values.len() - 1])
            );
        }
    }

    #[test]
    fn single_value_is_identity_for_every_method() {
        for method in [
            AggregationMethod::Sum,
            AggregationMethod::Avg,
            AggregationMethod::Max,
            AggregationMethod::Min,
            AggregationMethod::Last,
        ] {
            assert_eq!(aggregate(&[42.5], method), Ok(42.5));
        }
    }

    #[test]
    fn empty_input_fails() {
        assert_eq!(
            aggregate(&[], AggregationMethod::Max),
            Err(DataError::EmptyInput)
        );
        assert_eq!(
            aggregate(&[], AggregationMethod::Last),
            Err(DataError::EmptyInput)
        );
    }

    #[test]
    fn parse_aliases_case_insensitively() {
        assert_eq!("SUM".parse(), Ok(AggregationMethod::Sum));
        assert_eq!("Average".parse(), Ok(AggregationMethod::Avg));
        assert_eq!("mean".parse(), Ok(AggregationMethod::Avg));
        assert_eq!("maximum".parse(), Ok(AggregationMethod::Max));
        assert_eq!("minimum".parse(), Ok(AggregationMethod::Min));
        assert_eq!("last".parse(), Ok(AggregationMethod::Last));
    }

    #[test]
    fn parse_unknown_method_fails() {
        assert_eq!(
            "median".parse::<AggregationMethod>(),
            Err(DataError::UnknownMethod("median".to_string()))
        );
    }

    #[test]
    fn default_is_max() {
        assert_eq!(AggregationMethod::default(), AggregationMethod::Max);
    }
}
