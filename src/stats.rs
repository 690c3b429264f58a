use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Mean of the values, `None` when empty
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Percentile (p is 0-100) with linear interpolation between closest ranks
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// How the measurements of one heatmap cell are folded into a single value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Aggregator {
    #[default]
    Mean,
    Min,
    Max,
    Median,
}

impl Aggregator {
    /// Aggregate the values. An empty slice or a NaN result has no data and
    /// yields `None`.
    pub fn apply(&self, values: &[f64]) -> Option<f64> {
        let aggregated = match self {
            Aggregator::Mean => mean(values),
            Aggregator::Min => values.iter().copied().reduce(f64::min),
            Aggregator::Max => values.iter().copied().reduce(f64::max),
            Aggregator::Median => percentile(values, 50.0),
        };
        aggregated.filter(|v| !v.is_nan())
    }
}

impl FromStr for Aggregator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "mean" => Ok(Aggregator::Mean),
            "min" => Ok(Aggregator::Min),
            "max" => Ok(Aggregator::Max),
            "median" | "50percent" => Ok(Aggregator::Median),
            other => Err(Error::unsupported("aggregator", other)),
        }
    }
}

impl fmt::Display for Aggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Aggregator::Mean => "mean",
            Aggregator::Min => "min",
            Aggregator::Max => "max",
            Aggregator::Median => "median",
        })
    }
}

/// Which direction of a value counts as winning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Comparator {
    /// Higher is better (throughput)
    #[default]
    GreaterWins,
    /// Lower is better (latency, memory)
    LesserWins,
}

impl Comparator {
    /// True when `candidate` strictly beats `current`
    pub fn improves(&self, candidate: f64, current: f64) -> bool {
        match self {
            Comparator::GreaterWins => candidate > current,
            Comparator::LesserWins => candidate < current,
        }
    }
}

impl FromStr for Comparator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "gt" | "greater" => Ok(Comparator::GreaterWins),
            "lt" | "lesser" => Ok(Comparator::LesserWins),
            other => Err(Error::unsupported("comparator", other)),
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Comparator::GreaterWins => "gt",
            Comparator::LesserWins => "lt",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregators() {
        let values = [10.0, 20.0, 15.0, 5.0];
        assert_eq!(Aggregator::Mean.apply(&values), Some(12.5));
        assert_eq!(Aggregator::Min.apply(&values), Some(5.0));
        assert_eq!(Aggregator::Max.apply(&values), Some(20.0));
        assert_eq!(Aggregator::Median.apply(&values), Some(12.5));
        assert_eq!(Aggregator::Median.apply(&[3.0, 1.0, 2.0]), Some(2.0));
    }

    #[test]
    fn test_empty_window_has_no_data() {
        for agg in [
            Aggregator::Mean,
            Aggregator::Min,
            Aggregator::Max,
            Aggregator::Median,
        ] {
            assert_eq!(agg.apply(&[]), None);
        }
    }

    #[test]
    fn test_nan_aggregate_has_no_data() {
        let values = [f64::NAN, 4.0];
        assert_eq!(Aggregator::Mean.apply(&values), None);
        assert_eq!(Aggregator::Mean.apply(&[f64::NAN]), None);
        assert_eq!(Aggregator::Max.apply(&[f64::NAN]), None);
        // min/max skip a NaN next to real values
        assert_eq!(Aggregator::Max.apply(&values), Some(4.0));
    }

    #[test]
    fn test_percentile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&values, 0.0), Some(1.0));
        assert_eq!(percentile(&values, 100.0), Some(5.0));
        assert_eq!(percentile(&values, 25.0), Some(2.0));
        assert_eq!(percentile(&[1.0, 2.0], 50.0), Some(1.5));
    }

    #[test]
    fn test_comparator_is_strict() {
        assert!(Comparator::GreaterWins.improves(2.0, 1.0));
        assert!(!Comparator::GreaterWins.improves(1.0, 1.0));
        assert!(Comparator::LesserWins.improves(1.0, 2.0));
        assert!(!Comparator::LesserWins.improves(2.0, 2.0));
    }

    #[test]
    fn test_parse_selectors() {
        assert_eq!("gt".parse::<Comparator>().unwrap(), Comparator::GreaterWins);
        assert_eq!("lt".parse::<Comparator>().unwrap(), Comparator::LesserWins);
        assert_eq!("50percent".parse::<Aggregator>().unwrap(), Aggregator::Median);
        assert!(matches!(
            "ge".parse::<Comparator>(),
            Err(Error::UnsupportedOption { kind: "comparator", .. })
        ));
        assert!(matches!(
            "sum".parse::<Aggregator>(),
            Err(Error::UnsupportedOption { kind: "aggregator", .. })
        ));
    }
}
