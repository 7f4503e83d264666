//! Named three-stop palettes and color interpolation.

use std::fmt;
use std::str::FromStr;

use rgb::RGBA8;

/// Color with straight 8-bit alpha.
pub type Color = RGBA8;

/// Fully transparent black, used for "no styling" and no-data.
pub const TRANSPARENT: Color = RGBA8 { r: 0, g: 0, b: 0, a: 0 };

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn lerp_channel(a: u8, b: u8, t: f64) -> u8 {
    lerp(a as f64, b as f64, t).round().clamp(0.0, 255.0) as u8
}

/// Per-channel linear interpolation, alpha included. `t` is clamped to
/// [0, 1], so `t = 0` yields `c0` and `t = 1` yields `c1` exactly.
pub fn lerp_color(c0: Color, c1: Color, t: f64) -> Color {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    RGBA8::new(
        lerp_channel(c0.r, c1.r, t),
        lerp_channel(c0.g, c1.g, t),
        lerp_channel(c0.b, c1.b, t),
        lerp_channel(c0.a, c1.a, t),
    )
}

/// Map an opacity in [0, 1] to an 8-bit alpha: `round(opacity × 255)`,
/// clamped to [0, 255].
pub fn alpha_from_opacity(opacity: f64) -> u8 {
    if opacity.is_nan() {
        return 0;
    }
    (opacity * 255.0).round().clamp(0.0, 255.0) as u8
}

/// The built-in palette presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaletteName {
    SummerMountains,
    FallLeaves,
    Desert,
    Glaciers,
    Meadow,
    ValleyFires,
    DeadSea,
    Highway,
}

impl PaletteName {
    /// All presets, in display order.
    pub const ALL: &[PaletteName] = &[
        Self::SummerMountains,
        Self::FallLeaves,
        Self::Desert,
        Self::Glaciers,
        Self::Meadow,
        Self::ValleyFires,
        Self::DeadSea,
        Self::Highway,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::SummerMountains => "SummerMountains",
            Self::FallLeaves => "FallLeaves",
            Self::Desert => "Desert",
            Self::Glaciers => "Glaciers",
            Self::Meadow => "Meadow",
            Self::ValleyFires => "ValleyFires",
            Self::DeadSea => "DeadSea",
            Self::Highway => "Highway",
        }
    }

    /// Opaque (low, mid, high) RGB stops.
    fn stops(&self) -> [[u8; 3]; 3] {
        match self {
            Self::SummerMountains => [[10, 100, 10], [153, 125, 25], [255, 255, 255]],
            Self::FallLeaves => [[10, 100, 10], [199, 130, 61], [241, 220, 133]],
            Self::Desert => [[211, 206, 97], [139, 120, 112], [255, 255, 255]],
            Self::Glaciers => [[105, 171, 224], [162, 234, 240], [255, 255, 255]],
            Self::Meadow => [[68, 128, 71], [43, 91, 30], [167, 220, 168]],
            Self::ValleyFires => [[164, 0, 0], [255, 128, 64], [255, 255, 191]],
            Self::DeadSea => [[51, 137, 208], [226, 227, 166], [151, 146, 117]],
            Self::Highway => [[51, 137, 208], [214, 207, 124], [54, 152, 69]],
        }
    }
}

impl fmt::Display for PaletteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

impl FromStr for PaletteName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = normalize(s);
        Self::ALL
            .iter()
            .copied()
            .find(|p| normalize(p.name()) == key)
            .ok_or_else(|| format!("unknown palette '{s}'"))
    }
}

/// A resolved three-stop gradient with alpha applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteStops {
    pub low: Color,
    pub mid: Color,
    pub high: Color,
}

impl PaletteStops {
    pub const TRANSPARENT: PaletteStops = PaletteStops {
        low: TRANSPARENT,
        mid: TRANSPARENT,
        high: TRANSPARENT,
    };

    /// Resolve a preset at the given opacity.
    pub fn from_preset(palette: PaletteName, opacity: f64) -> Self {
        let alpha = alpha_from_opacity(opacity);
        let [low, mid, high] = palette.stops().map(|[r, g, b]| RGBA8::new(r, g, b, alpha));
        Self { low, mid, high }
    }

    /// Color of `value` on a gradient spanning `[min, max]` with the mid
    /// stop at the domain midpoint. Values outside the domain clamp to the
    /// end stops; a degenerate domain yields `low`.
    pub fn ramp(&self, value: f64, min: f64, max: f64) -> Color {
        if !(max > min) {
            return self.low;
        }
        // Not `(max - min) / 2`: that overflows on domains wider than f64::MAX.
        let mid = min / 2.0 + max / 2.0;
        if value <= mid {
            lerp_color(self.low, self.mid, (value - min) / (mid - min))
        } else {
            lerp_color(self.mid, self.high, (value - mid) / (max - mid))
        }
    }
}

/// Look up a palette by name. Unknown or empty names resolve to a fully
/// transparent triple: callers use that to opt out of preset styling.
pub fn resolve(name: &str, opacity: f64) -> PaletteStops {
    match name.parse::<PaletteName>() {
        Ok(p) => PaletteStops::from_preset(p, opacity),
        Err(_) => PaletteStops::TRANSPARENT,
    }
}
