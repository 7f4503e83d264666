//! Editor settings consumed by the classification engine.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::breaks::{IntervalMethod, IntervalSnap};
use crate::error::{Error, Result};

/// Styling hints copied onto every category a classification creates.
/// The engine stores them but does not interpret them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryStyle {
    /// Hatch pattern name understood by the renderer, if any.
    pub hatch_pattern: Option<String>,
    pub outline: bool,
    pub outline_width: f64,
}

impl Default for CategoryStyle {
    fn default() -> Self {
        Self {
            hatch_pattern: None,
            outline: false,
            outline_width: 1.0,
        }
    }
}

/// Upper bound on `break_count`.
pub const MAX_BREAK_COUNT: usize = 256;

/// Classification settings. Every field has a default, so partial JSON
/// documents load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Upper bound on values read from a raster, default 10 000.
    pub max_sample_count: usize,
    /// Number of intervals for break classification, default 5.
    pub break_count: usize,
    pub interval_method: IntervalMethod,
    pub interval_snap: IntervalSnap,
    /// Palette used by break classification.
    pub palette: String,
    /// Decimals shown in legend text.
    pub legend_decimals: usize,
    pub default_style: CategoryStyle,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            max_sample_count: 10_000,
            break_count: 5,
            interval_method: IntervalMethod::EqualInterval,
            interval_snap: IntervalSnap::None,
            palette: "SummerMountains".to_string(),
            legend_decimals: 2,
            default_style: CategoryStyle::default(),
        }
    }
}

impl EditorSettings {
    pub fn from_json_str(s: &str) -> Result<Self> {
        let settings: EditorSettings = serde_json::from_str(s)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn read_json(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.max_sample_count == 0 {
            return Err(Error::invalid("max_sample_count", 0, "must be positive"));
        }
        if self.break_count == 0 {
            return Err(Error::invalid("break_count", 0, "must be positive"));
        }
        if self.break_count > MAX_BREAK_COUNT {
            return Err(Error::invalid(
                "break_count",
                self.break_count,
                format!("at most {MAX_BREAK_COUNT} classes are supported"),
            ));
        }
        if let IntervalSnap::SignificantFigures(0) = self.interval_snap {
            return Err(Error::invalid("interval_snap", "significant_figures(0)", "needs at least one figure"));
        }
        Ok(())
    }
}
