//! Empty-safe descriptive statistics

use serde::{Deserialize, Serialize};

/// Count, range and mean of a set of values.
///
/// `min`, `max` and `mean` are `None` for an empty set rather than zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Summary {
    /// Number of finite values
    pub count: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Arithmetic mean
    pub mean: Option<f64>,
}

impl Summary {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Summarise the finite values of `values`; NaN and infinities are skipped
pub fn summarize<I: IntoIterator<Item = f64>>(values: I) -> Summary {
    let mut count = 0usize;
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for v in values.into_iter().filter(|v| v.is_finite()) {
        count += 1;
        sum += v;
        min = min.min(v);
        max = max.max(v);
    }

    if count == 0 {
        return Summary::default();
    }

    Summary {
        count,
        min: Some(min),
        max: Some(max),
        mean: Some(sum / count as f64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_undefined() {
        let s = summarize(Vec::new());
        assert_eq!(s.count, 0);
        assert!(s.is_empty());
        assert_eq!(s.min, None);
        assert_eq!(s.max, None);
        assert_eq!(s.mean, None);
    }

    #[test]
    fn test_skips_nan() {
        let s = summarize([20.0, f64::NAN, 30.0, 10.0]);
        assert_eq!(s.count, 3);
        assert_eq!(s.min, Some(10.0));
        assert_eq!(s.max, Some(30.0));
        assert_eq!(s.mean, Some(20.0));
    }

    #[test]
    fn test_all_nan_is_empty() {
        assert!(summarize([f64::NAN, f64::NAN]).is_empty());
    }
}
