//! Bounded random sampling of raster values.

use tracing::debug;

use crate::error::{Error, Result};
use crate::raster::{is_no_data, RasterSource};

/// Draw at most `max_sample_count` usable values from `source`.
///
/// Rasters no larger than `max_sample_count` are read in full; larger ones
/// are sampled through [`RasterSource::random_values`]. Values equal to
/// `no_data` and non-finite values are dropped afterwards, so the result can
/// be shorter than requested.
pub fn sample(source: &dyn RasterSource, max_sample_count: usize, no_data: f64) -> Result<Vec<f64>> {
    if max_sample_count == 0 {
        return Err(Error::invalid("max_sample_count", 0, "must be positive"));
    }

    let total = source.total_value_count();
    let raw = if total <= max_sample_count {
        source.values()?
    } else {
        source.random_values(max_sample_count)?
    };

    let mut samples: Vec<f64> = raw
        .into_iter()
        .filter(|&v| v.is_finite() && !is_no_data(v, no_data))
        .collect();
    // A source may hand back more than it was asked for.
    samples.truncate(max_sample_count);

    debug!(total, requested = max_sample_count, kept = samples.len(), "sampled raster");
    Ok(samples)
}
