//! Classification: turning a value domain into colored categories.
//!
//! Two entry points:
//!   1. [`two_bucket`]: split `[min, max]` at its midpoint and color the
//!      halves low→mid and mid→high.
//!   2. [`from_raster`]: sample → statistics → breaks → categories, colored
//!      along the palette's three-stop gradient.
//!
//! Both return a complete category list or an error, never a partial result.

use tracing::{debug, info, warn};

use crate::breaks::{normalize, snap, BreakStrategy};
use crate::category::{Category, ColorCategory, NoDataCategory, Range};
use crate::error::{Error, Result};
use crate::palette::{resolve, PaletteStops};
use crate::raster::RasterSource;
use crate::sampler::sample;
use crate::settings::EditorSettings;
use crate::statistics::{sorted, Statistics, Summary};

/// Output of a statistics-driven classification.
#[derive(Debug, Clone)]
pub struct Classification {
    pub categories: Vec<Category>,
    pub statistics: Statistics,
    /// Interval boundaries actually used; empty for a no-data result.
    pub breaks: Vec<f64>,
}

fn check_bounds(min: f64, max: f64) -> Result<()> {
    if !min.is_finite() {
        return Err(Error::invalid("min", min, "must be finite"));
    }
    if !max.is_finite() {
        return Err(Error::invalid("max", max, "must be finite"));
    }
    if min > max {
        return Err(Error::InvalidRange { min, max });
    }
    Ok(())
}

fn point_category(value: f64, stops: &PaletteStops, settings: &EditorSettings) -> Result<Category> {
    let mut cat = ColorCategory::new(value, value)?;
    cat.apply_color_boundaries(stops.low, stops.low);
    cat.apply_min_max(settings);
    Ok(cat.into())
}

/// Split `[min, max]` into `[min, mid]` and `(mid, max]`.
///
/// The first category owns the midpoint and the last owns `max`. With
/// `min == max` a single point category results, colored with the
/// palette's low stop.
pub fn two_bucket(
    palette: &str,
    min: f64,
    max: f64,
    opacity: f64,
    settings: &EditorSettings,
) -> Result<Vec<Category>> {
    check_bounds(min, max)?;
    let stops = resolve(palette, opacity);

    if min == max {
        return Ok(vec![point_category(min, &stops, settings)?]);
    }

    let mut mid = min / 2.0 + max / 2.0;
    // Adjacent floats: the midpoint can round onto `max`.
    if mid >= max {
        mid = min;
    }

    let mut low_range = Range::new(min, mid)?;
    low_range.set_min_inclusive(true);
    low_range.set_max_inclusive(true);
    let mut low = ColorCategory::from_range(low_range);
    low.apply_color_boundaries(stops.low, stops.mid);
    low.apply_min_max(settings);

    let mut high_range = Range::new(mid, max)?;
    high_range.set_min_inclusive(false);
    high_range.set_max_inclusive(true);
    let mut high = ColorCategory::from_range(high_range);
    high.apply_color_boundaries(stops.mid, stops.high);
    high.apply_min_max(settings);

    debug!(palette, min, mid, max, "two-bucket classification");
    Ok(vec![low.into(), high.into()])
}

/// Value domain to classify over: the raster's own extrema when it is fully
/// loaded, otherwise the sample range in `summary`.
pub fn domain(raster: &dyn RasterSource, summary: &Summary) -> (f64, f64) {
    match (raster.is_in_ram(), raster.minimum(), raster.maximum()) {
        (true, Some(lo), Some(hi)) if lo <= hi => (lo, hi),
        _ => (summary.minimum, summary.maximum),
    }
}

/// Sample `raster`, compute statistics and cut the domain with `strategy`.
///
/// The domain is the raster's own extrema when it is fully loaded, so the
/// boundaries do not depend on which values the sampler happened to pick;
/// otherwise it is the sample range. No usable samples give a single
/// no-data category.
pub fn from_raster(
    raster: &dyn RasterSource,
    max_sample_count: usize,
    no_data: f64,
    settings: &EditorSettings,
    strategy: &dyn BreakStrategy,
    opacity: f64,
) -> Result<Classification> {
    settings.validate()?;
    let samples = sample(raster, max_sample_count, no_data)?;
    let statistics = Statistics::calculate(&samples);

    let Some(summary) = statistics.summary().copied() else {
        warn!("no usable samples, classifying as no data");
        return Ok(Classification {
            categories: vec![Category::NoData(NoDataCategory::new(no_data))],
            statistics,
            breaks: Vec::new(),
        });
    };

    let domain = domain(raster, &summary);
    let stops = resolve(&settings.palette, opacity);

    if domain.0 == domain.1 {
        return Ok(Classification {
            categories: vec![point_category(domain.0, &stops, settings)?],
            statistics,
            breaks: vec![domain.0],
        });
    }

    let ordered = sorted(&samples);
    let raw = strategy.breaks(&ordered, &summary, domain, settings.break_count);
    let breaks = snap(&normalize(raw, domain), &ordered, settings.interval_snap);
    debug!(strategy = strategy.name(), ?breaks, "computed breaks");

    let categories = build_categories(&breaks, domain, &stops, settings)?;
    info!(
        strategy = strategy.name(),
        samples = summary.count,
        categories = categories.len(),
        "classified raster"
    );

    Ok(Classification {
        categories,
        statistics,
        breaks,
    })
}

/// One category per interval: `[b0, b1)`, `[b1, b2)`, …, `[bn-1, bn]`.
fn build_categories(
    breaks: &[f64],
    domain: (f64, f64),
    stops: &PaletteStops,
    settings: &EditorSettings,
) -> Result<Vec<Category>> {
    let last = breaks.len().saturating_sub(2);
    breaks
        .windows(2)
        .enumerate()
        .map(|(i, w)| {
            let mut range = Range::new(w[0], w[1])?;
            range.set_min_inclusive(true);
            range.set_max_inclusive(i == last);
            let mut cat = ColorCategory::from_range(range);
            cat.apply_color_boundaries(
                stops.ramp(w[0], domain.0, domain.1),
                stops.ramp(w[1], domain.0, domain.1),
            );
            cat.apply_min_max(settings);
            Ok(cat.into())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breaks::{EqualInterval, IntervalSnap, Quantile, StandardDeviation};
    use crate::raster::Grid;
    use rgb::RGBA8;

    fn color(cat: &Category) -> &ColorCategory {
        cat.as_color().expect("color category")
    }

    fn owners(cats: &[Category], v: f64) -> usize {
        cats.iter().filter(|c| c.contains(v)).count()
    }

    #[test]
    fn summer_mountains_zero_to_ten() {
        let cats = two_bucket("SummerMountains", 0.0, 10.0, 1.0, &EditorSettings::default()).unwrap();
        assert_eq!(cats.len(), 2);

        let a = color(&cats[0]);
        assert_eq!((a.range.min(), a.range.max()), (0.0, 5.0));
        assert!(a.range.min_inclusive() && a.range.max_inclusive());
        assert_eq!(a.low_color, RGBA8::new(10, 100, 10, 255));
        assert_eq!(a.high_color, RGBA8::new(153, 125, 25, 255));

        let b = color(&cats[1]);
        assert_eq!((b.range.min(), b.range.max()), (5.0, 10.0));
        assert!(!b.range.min_inclusive() && b.range.max_inclusive());
        assert_eq!(b.low_color, RGBA8::new(153, 125, 25, 255));
        assert_eq!(b.high_color, RGBA8::new(255, 255, 255, 255));
    }

    #[test]
    fn equal_bounds_give_one_point_category() {
        let cats = two_bucket("Meadow", 7.0, 7.0, 0.5, &EditorSettings::default()).unwrap();
        assert_eq!(cats.len(), 1);
        let c = color(&cats[0]);
        assert!(c.range.min_inclusive() && c.range.max_inclusive());
        assert!(c.contains(7.0));
        assert_eq!(c.low_color, RGBA8::new(68, 128, 71, 128));
        assert_eq!(c.high_color, c.low_color);
    }

    #[test]
    fn two_buckets_cover_without_overlap() {
        let cases = [(0.0, 10.0), (-3.5, 2.25), (1e-9, 2e-9), (-1e6, 1e6), (1.0, f64::from_bits(1.0f64.to_bits() + 1))];
        for (min, max) in cases {
            let cats = two_bucket("Desert", min, max, 1.0, &EditorSettings::default()).unwrap();
            let mid = min / 2.0 + max / 2.0;
            for i in 0..=200 {
                let v = min + (max - min) * i as f64 / 200.0;
                assert_eq!(owners(&cats, v), 1, "value {v} in [{min}, {max}]");
            }
            assert_eq!(owners(&cats, min), 1);
            assert_eq!(owners(&cats, max), 1);
            assert_eq!(owners(&cats, mid), 1);
            assert_eq!(owners(&cats, max + 1.0), 0);
        }
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let err = two_bucket("Desert", 5.0, 1.0, 1.0, &EditorSettings::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidRange { .. }));
        assert!(two_bucket("Desert", f64::NAN, 1.0, 1.0, &EditorSettings::default()).is_err());
    }

    #[test]
    fn unknown_palette_is_transparent_not_an_error() {
        let cats = two_bucket("custom", 0.0, 1.0, 1.0, &EditorSettings::default()).unwrap();
        assert_eq!(color(&cats[0]).low_color.a, 0);
    }

    #[test]
    fn raster_equal_interval_partition() {
        let data: Vec<f64> = (0..=100).map(f64::from).collect();
        let g = Grid::from_values(101, 1, data, -9999.0).unwrap();
        let settings = EditorSettings::default();
        let out = from_raster(&g, 1000, -9999.0, &settings, &EqualInterval, 1.0).unwrap();

        assert_eq!(out.breaks, vec![0.0, 20.0, 40.0, 60.0, 80.0, 100.0]);
        assert_eq!(out.categories.len(), 5);
        for v in 0..=100 {
            assert_eq!(owners(&out.categories, v as f64), 1, "value {v}");
        }
        let first = color(&out.categories[0]);
        assert!(first.range.min_inclusive() && !first.range.max_inclusive());
        let last = color(&out.categories[4]);
        assert!(last.range.max_inclusive());
    }

    #[test]
    fn raster_colors_follow_the_three_stop_ramp() {
        let data: Vec<f64> = (0..=10).map(f64::from).collect();
        let g = Grid::from_values(11, 1, data, -1.0).unwrap();
        let mut settings = EditorSettings::default();
        settings.break_count = 2;
        let out = from_raster(&g, 100, -1.0, &settings, &EqualInterval, 1.0).unwrap();
        let stops = resolve("SummerMountains", 1.0);

        let a = color(&out.categories[0]);
        let b = color(&out.categories[1]);
        assert_eq!((a.low_color, a.high_color), (stops.low, stops.mid));
        assert_eq!((b.low_color, b.high_color), (stops.mid, stops.high));
    }

    #[test]
    fn empty_sample_set_is_one_no_data_category() {
        let g = Grid::filled(3, 3, -9999.0, -9999.0);
        let out = from_raster(&g, 100, -9999.0, &EditorSettings::default(), &EqualInterval, 1.0).unwrap();
        assert!(out.statistics.is_empty());
        assert_eq!(out.categories.len(), 1);
        assert!(matches!(out.categories[0], Category::NoData(_)));
        assert!(out.categories[0].contains(-9999.0));
    }

    #[test]
    fn constant_raster_is_one_point_category() {
        let g = Grid::filled(4, 4, 12.5, -1.0);
        let out = from_raster(&g, 100, -1.0, &EditorSettings::default(), &EqualInterval, 1.0).unwrap();
        assert_eq!(out.categories.len(), 1);
        assert!(out.categories[0].contains(12.5));
    }

    #[test]
    fn in_ram_extrema_make_breaks_independent_of_sampling() {
        let data: Vec<f64> = (0..5000).map(|i| ((i * 37) % 1000) as f64).collect();
        let g = Grid::from_values(100, 50, data, -1.0).unwrap();
        let settings = EditorSettings::default();
        let a = from_raster(&g, 50, -1.0, &settings, &EqualInterval, 0.8).unwrap();
        let b = from_raster(&g, 50, -1.0, &settings, &EqualInterval, 0.8).unwrap();
        assert_eq!(a.breaks, b.breaks);
        assert_eq!(a.categories, b.categories);
        assert_eq!(a.breaks.first(), Some(&0.0));
        assert_eq!(a.breaks.last(), Some(&999.0));
    }

    #[test]
    fn quantile_with_snapping_still_partitions() {
        let data: Vec<f64> = (0..200).map(|i| (i as f64).powf(1.5) / 7.0).collect();
        let g = Grid::from_values(20, 10, data.clone(), -1.0).unwrap();
        let mut settings = EditorSettings::default();
        settings.interval_snap = IntervalSnap::Rounding(0);
        let out = from_raster(&g, 1000, -1.0, &settings, &Quantile, 1.0).unwrap();
        for v in data {
            assert_eq!(owners(&out.categories, v), 1, "value {v}");
        }
    }

    #[test]
    fn zero_sample_count_is_an_argument_error() {
        let g = Grid::filled(2, 2, 1.0, -1.0);
        let err = from_raster(&g, 0, -1.0, &EditorSettings::default(), &EqualInterval, 1.0).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
    }

    #[test]
    fn in_ram_domain_covers_an_unsampled_outlier() {
        let mut data: Vec<f64> = (0..5000).map(|i| (i % 10) as f64).collect();
        data[2500] = 1e11;
        let g = Grid::from_values(100, 50, data.clone(), -1.0).unwrap().with_seed(3);
        let mut settings = EditorSettings::default();
        settings.max_sample_count = 100;
        let strategies: [&dyn BreakStrategy; 2] = [&Quantile, &StandardDeviation];
        for strategy in strategies {
            let out = from_raster(&g, 100, -1.0, &settings, strategy, 1.0).unwrap();
            assert_eq!(out.breaks.first(), Some(&0.0), "{}", strategy.name());
            assert_eq!(out.breaks.last(), Some(&1e11), "{}", strategy.name());
            assert!(out.breaks.windows(2).all(|w| w[0] < w[1]));
            for &v in data.iter().step_by(7).chain([1e11, 0.0, 9.0].iter()) {
                assert_eq!(owners(&out.categories, v), 1, "{} value {v}", strategy.name());
            }
        }
    }

    #[test]
    fn domain_wider_than_f64_max_classifies() {
        let g = Grid::from_values(3, 1, vec![-1e308, 0.0, 1e308], -1.0).unwrap();
        let out = from_raster(&g, 100, -1.0, &EditorSettings::default(), &EqualInterval, 1.0).unwrap();
        assert_eq!(out.breaks.len(), 6);
        assert_eq!(out.categories.len(), 5);
        assert!(out.breaks.iter().all(|b| b.is_finite()));
        assert_eq!(color(&out.categories[0]).low_color, RGBA8::new(10, 100, 10, 255));
        assert_eq!(color(&out.categories[4]).high_color, RGBA8::new(255, 255, 255, 255));
        for v in [-1e308, 0.0, 1e308] {
            assert_eq!(owners(&out.categories, v), 1, "value {v}");
        }
    }

    #[test]
    fn domain_prefers_in_ram_extrema() {
        let g = Grid::from_values(4, 1, vec![-5.0, 1.0, 2.0, 40.0], -1.0).unwrap();
        let summary = *Statistics::calculate(&[1.0, 2.0]).summary().unwrap();
        assert_eq!(domain(&g, &summary), (-5.0, 40.0));
    }
}
