//! Value ranges and the categories built on them.

use std::fmt;

use crate::error::{Error, Result};
use crate::palette::{lerp_color, Color, TRANSPARENT};
use crate::raster::is_no_data;
use crate::settings::{CategoryStyle, EditorSettings};

/// A contiguous numeric interval with independent boundary inclusion.
///
/// Invariant: `min <= max`, both finite. When `min == max` both bounds are
/// inclusive and stay so, otherwise the range would contain nothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    min: f64,
    max: f64,
    min_inclusive: bool,
    max_inclusive: bool,
}

impl Range {
    /// Half-open `[min, max)`, or `[min, min]` when degenerate.
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if !min.is_finite() {
            return Err(Error::invalid("min", min, "range bounds must be finite"));
        }
        if !max.is_finite() {
            return Err(Error::invalid("max", max, "range bounds must be finite"));
        }
        if min > max {
            return Err(Error::InvalidRange { min, max });
        }
        Ok(Self {
            min,
            max,
            min_inclusive: true,
            max_inclusive: min == max,
        })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn min_inclusive(&self) -> bool {
        self.min_inclusive
    }

    pub fn max_inclusive(&self) -> bool {
        self.max_inclusive
    }

    pub fn is_degenerate(&self) -> bool {
        self.min == self.max
    }

    /// Ignored on a degenerate range.
    pub fn set_min_inclusive(&mut self, inclusive: bool) {
        self.min_inclusive = inclusive || self.is_degenerate();
    }

    /// Ignored on a degenerate range.
    pub fn set_max_inclusive(&mut self, inclusive: bool) {
        self.max_inclusive = inclusive || self.is_degenerate();
    }

    pub fn contains(&self, value: f64) -> bool {
        let above = if self.min_inclusive { value >= self.min } else { value > self.min };
        let below = if self.max_inclusive { value <= self.max } else { value < self.max };
        above && below
    }

    /// Position of `value` within the range, clamped to [0, 1]; 0 for a
    /// degenerate range.
    pub fn fraction(&self, value: f64) -> f64 {
        if self.is_degenerate() || value.is_nan() {
            return 0.0;
        }
        // Halved operands keep both differences finite for any finite bounds.
        ((value / 2.0 - self.min / 2.0) / (self.max / 2.0 - self.min / 2.0)).clamp(0.0, 1.0)
    }

    /// Interval notation with `decimals` digits: `[0.00, 5.00]`, `(5.00, 10.00]`,
    /// or `= 7.00` for a single point.
    pub fn legend_text(&self, decimals: usize) -> String {
        if self.is_degenerate() {
            return format!("= {:.*}", decimals, self.min);
        }
        let open = if self.min_inclusive { '[' } else { '(' };
        let close = if self.max_inclusive { ']' } else { ')' };
        format!("{}{:.*}, {:.*}{}", open, decimals, self.min, decimals, self.max, close)
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let open = if self.min_inclusive { '[' } else { '(' };
        let close = if self.max_inclusive { ']' } else { ')' };
        write!(f, "{open}{}, {}{close}", self.min, self.max)
    }
}

/// A range colored by interpolating between two boundary colors.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorCategory {
    pub range: Range,
    pub low_color: Color,
    pub high_color: Color,
    pub legend_text: String,
    pub style: CategoryStyle,
}

impl ColorCategory {
    pub fn new(min: f64, max: f64) -> Result<Self> {
        Ok(Self::from_range(Range::new(min, max)?))
    }

    /// Transparent until colors are applied.
    pub fn from_range(range: Range) -> Self {
        Self {
            range,
            low_color: TRANSPARENT,
            high_color: TRANSPARENT,
            legend_text: range.to_string(),
            style: CategoryStyle::default(),
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.range.contains(value)
    }

    pub fn apply_color_boundaries(&mut self, low: Color, high: Color) {
        self.low_color = low;
        self.high_color = high;
    }

    /// Linear per-channel blend; `fraction` is clamped to [0, 1]. A
    /// degenerate range always answers `low_color`.
    pub fn interpolate_color(&self, fraction: f64) -> Color {
        if self.range.is_degenerate() {
            return self.low_color;
        }
        lerp_color(self.low_color, self.high_color, fraction)
    }

    /// Color at `value`, positioned within this category's range.
    pub fn color_for(&self, value: f64) -> Color {
        self.interpolate_color(self.range.fraction(value))
    }

    /// Derive legend text and default styling from editor settings.
    pub fn apply_min_max(&mut self, settings: &EditorSettings) {
        self.legend_text = self.range.legend_text(settings.legend_decimals);
        self.style = settings.default_style.clone();
    }
}

/// The category standing in for a raster with no usable values. It owns
/// exactly the no-data sentinel.
#[derive(Debug, Clone, PartialEq)]
pub struct NoDataCategory {
    pub value: f64,
    pub color: Color,
    pub legend_text: String,
}

impl NoDataCategory {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            color: TRANSPARENT,
            legend_text: "No data".to_string(),
        }
    }
}

/// A category of a scheme.
#[derive(Debug, Clone, PartialEq)]
pub enum Category {
    Color(ColorCategory),
    NoData(NoDataCategory),
}

impl Category {
    pub fn contains(&self, value: f64) -> bool {
        match self {
            Category::Color(c) => c.contains(value),
            Category::NoData(n) => is_no_data(value, n.value),
        }
    }

    /// Color for `value`, or `None` if the category does not contain it.
    pub fn color_for(&self, value: f64) -> Option<Color> {
        if !self.contains(value) {
            return None;
        }
        Some(match self {
            Category::Color(c) => c.color_for(value),
            Category::NoData(n) => n.color,
        })
    }

    pub fn legend_text(&self) -> &str {
        match self {
            Category::Color(c) => &c.legend_text,
            Category::NoData(n) => &n.legend_text,
        }
    }

    pub fn as_color(&self) -> Option<&ColorCategory> {
        match self {
            Category::Color(c) => Some(c),
            Category::NoData(_) => None,
        }
    }

    pub fn range(&self) -> Option<&Range> {
        self.as_color().map(|c| &c.range)
    }
}

impl From<ColorCategory> for Category {
    fn from(c: ColorCategory) -> Self {
        Category::Color(c)
    }
}
