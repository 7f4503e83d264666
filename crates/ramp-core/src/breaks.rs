//! Break algorithms: how a value domain is cut into intervals.
//!
//! A strategy returns ascending boundaries `b0 < b1 < … < bn` with `b0` and
//! `bn` equal to the domain ends. Interval `i` is `[bi, bi+1)`; the last one
//! also owns `bn`.

use serde::{Deserialize, Serialize};

use crate::statistics::{quantile, Summary};

/// Built-in break algorithms selectable from settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalMethod {
    #[default]
    EqualInterval,
    Quantile,
    StandardDeviation,
}

impl IntervalMethod {
    pub fn strategy(self) -> Box<dyn BreakStrategy> {
        match self {
            IntervalMethod::EqualInterval => Box::new(EqualInterval),
            IntervalMethod::Quantile => Box::new(Quantile),
            IntervalMethod::StandardDeviation => Box::new(StandardDeviation),
        }
    }
}

/// Post-processing applied to interior breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalSnap {
    #[default]
    None,
    /// Round to this many decimals; negative values round to tens, hundreds…
    Rounding(i32),
    SignificantFigures(u32),
    /// Move each break onto the nearest sampled value.
    DataValue,
}

/// Chooses interval boundaries for a classification.
pub trait BreakStrategy {
    fn name(&self) -> &'static str;

    /// Boundaries over `domain` for at most `count` intervals.
    /// `sorted` holds the sample set in ascending order; `count >= 1`.
    fn breaks(&self, sorted: &[f64], summary: &Summary, domain: (f64, f64), count: usize) -> Vec<f64>;
}

/// `count` intervals of equal width.
#[derive(Debug, Clone, Copy, Default)]
pub struct EqualInterval;

impl BreakStrategy for EqualInterval {
    fn name(&self) -> &'static str {
        "equal_interval"
    }

    fn breaks(&self, _sorted: &[f64], _summary: &Summary, domain: (f64, f64), count: usize) -> Vec<f64> {
        let (min, max) = domain;
        let n = count as f64;
        // Dividing each bound first keeps the step finite when `max - min`
        // exceeds f64::MAX.
        let step = max / n - min / n;
        let mut b: Vec<f64> = (0..count)
            .map(|i| {
                let v = min + step * i as f64;
                if v.is_finite() {
                    v
                } else {
                    let t = i as f64 / n;
                    min * (1.0 - t) + max * t
                }
            })
            .collect();
        b.push(max);
        b
    }
}

/// Boundaries at the `i / count` quantiles of the sample set, so each
/// interval holds roughly the same number of samples.
#[derive(Debug, Clone, Copy, Default)]
pub struct Quantile;

impl BreakStrategy for Quantile {
    fn name(&self) -> &'static str {
        "quantile"
    }

    fn breaks(&self, sorted: &[f64], summary: &Summary, domain: (f64, f64), count: usize) -> Vec<f64> {
        if sorted.is_empty() {
            return EqualInterval.breaks(sorted, summary, domain, count);
        }
        let mut b = vec![domain.0];
        for i in 1..count {
            if let Some(q) = quantile(sorted, i as f64 / count as f64) {
                b.push(q);
            }
        }
        b.push(domain.1);
        normalize(b, domain)
    }
}

/// Breaks one standard deviation apart, anchored on the mean. Keeps the
/// `count − 1` interior breaks nearest the mean.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardDeviation;

impl BreakStrategy for StandardDeviation {
    fn name(&self) -> &'static str {
        "standard_deviation"
    }

    fn breaks(&self, sorted: &[f64], summary: &Summary, domain: (f64, f64), count: usize) -> Vec<f64> {
        let (min, max) = domain;
        let sd = summary.std_dev;
        if !(sd > 0.0 && sd.is_finite()) || count < 2 {
            return EqualInterval.breaks(sorted, summary, domain, count);
        }

        // k = 0, +1, -1, +2, -2, ... The `count - 1` nearest in-domain breaks
        // all have |k| < count, so the walk stays bounded on wide domains.
        let ks = std::iter::once(0.0).chain((1..count).flat_map(|k| [k as f64, -(k as f64)]));
        let interior: Vec<f64> = ks
            .map(|k| summary.mean + k * sd)
            .filter(|&v| v > min && v < max)
            .take(count - 1)
            .collect();

        let mut b = vec![min];
        b.extend(interior);
        b.push(max);
        normalize(b, domain)
    }
}

/// Sort, pin the ends to `domain`, drop out-of-domain and repeated values.
pub fn normalize(mut breaks: Vec<f64>, domain: (f64, f64)) -> Vec<f64> {
    let (min, max) = domain;
    breaks.retain(|&v| v.is_finite() && v > min && v < max);
    breaks.sort_by(f64::total_cmp);
    breaks.dedup();
    let mut out = Vec::with_capacity(breaks.len() + 2);
    out.push(min);
    out.extend(breaks);
    if max > min {
        out.push(max);
    }
    out
}

fn round_to(v: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (v * factor).round() / factor
}

fn round_significant(v: f64, figures: u32) -> f64 {
    if v == 0.0 || figures == 0 {
        return v;
    }
    let magnitude = v.abs().log10().floor() as i32;
    round_to(v, figures as i32 - 1 - magnitude)
}

fn nearest(sorted: &[f64], v: f64) -> f64 {
    match sorted.binary_search_by(|x| x.total_cmp(&v)) {
        Ok(i) => sorted[i],
        Err(0) => sorted.first().copied().unwrap_or(v),
        Err(i) if i >= sorted.len() => sorted[sorted.len() - 1],
        Err(i) => {
            let (a, b) = (sorted[i - 1], sorted[i]);
            if v - a <= b - v { a } else { b }
        }
    }
}

/// Snap the interior breaks; the outer bounds never move.
pub fn snap(breaks: &[f64], sorted: &[f64], snap: IntervalSnap) -> Vec<f64> {
    if breaks.len() < 3 || snap == IntervalSnap::None {
        return breaks.to_vec();
    }
    let domain = (breaks[0], breaks[breaks.len() - 1]);
    let interior = breaks[1..breaks.len() - 1].iter().map(|&v| match snap {
        IntervalSnap::None => v,
        IntervalSnap::Rounding(d) => round_to(v, d),
        IntervalSnap::SignificantFigures(n) => round_significant(v, n),
        IntervalSnap::DataValue => nearest(sorted, v),
    });
    normalize(interior.collect(), domain)
}
