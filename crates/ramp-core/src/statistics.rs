//! Descriptive statistics over a sample set.
//!
//! The standard deviation uses the population denominator `n`, not `n − 1`.
//! Values feed legend display and break placement, where the sample is
//! treated as the population it was drawn to describe.

use serde::Serialize;

/// Statistics of a sample set.
///
/// `Empty` carries no numeric fields at all, so nothing downstream can pick
/// up a NaN bound by accident.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Statistics {
    Empty,
    Computed(Summary),
}

/// Numeric summary of a non-empty sample set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub minimum: f64,
    pub maximum: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl Summary {
    /// `maximum − minimum`.
    pub fn range(&self) -> f64 {
        self.maximum - self.minimum
    }
}

impl Statistics {
    /// Two-pass computation: extrema and mean, then the deviation.
    /// Non-finite values are ignored.
    pub fn calculate(values: &[f64]) -> Statistics {
        let mut count = 0usize;
        let mut minimum = f64::INFINITY;
        let mut maximum = f64::NEG_INFINITY;
        let mut sum = 0.0f64;
        for &v in values.iter().filter(|v| v.is_finite()) {
            count += 1;
            minimum = minimum.min(v);
            maximum = maximum.max(v);
            sum += v;
        }
        if count == 0 {
            return Statistics::Empty;
        }

        let n = count as f64;
        let finite = || values.iter().copied().filter(|v| v.is_finite());
        // A sum past f64::MAX falls back to summing `v / n`, whose partial
        // sums never exceed the largest magnitude.
        let mean = if sum.is_finite() {
            sum / n
        } else {
            finite().fold(0.0, |m, v| m + v / n)
        };
        // Rounding can push the mean of near-constant data just outside
        // the extrema.
        let mean = mean.clamp(minimum, maximum);

        let mut variance = finite().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let mut scale = 1.0;
        if !variance.is_finite() {
            // Deviations too large to square: work in units of the largest magnitude.
            scale = minimum.abs().max(maximum.abs());
            variance = finite().map(|v| (v / scale - mean / scale).powi(2)).sum::<f64>() / n;
        }

        Statistics::Computed(Summary {
            count,
            minimum,
            maximum,
            mean,
            std_dev: scale * variance.sqrt(),
        })
    }

    pub fn count(&self) -> usize {
        match self {
            Statistics::Empty => 0,
            Statistics::Computed(s) => s.count,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Statistics::Empty)
    }

    pub fn summary(&self) -> Option<&Summary> {
        match self {
            Statistics::Empty => None,
            Statistics::Computed(s) => Some(s),
        }
    }

    pub fn minimum(&self) -> Option<f64> {
        self.summary().map(|s| s.minimum)
    }

    pub fn maximum(&self) -> Option<f64> {
        self.summary().map(|s| s.maximum)
    }

    pub fn mean(&self) -> Option<f64> {
        self.summary().map(|s| s.mean)
    }

    pub fn std_dev(&self) -> Option<f64> {
        self.summary().map(|s| s.std_dev)
    }
}

/// Value at fraction `q` ∈ [0, 1] of an ascending slice, nearest-rank with
/// linear interpolation between neighbours. `None` for an empty slice.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let t = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * t)
}

/// Ascending copy of `values`.
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(f64::total_cmp);
    v
}
