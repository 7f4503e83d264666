//! Raster sources consumed by the sampler and the classification engine.

use std::fs;
use std::io;
use std::path::Path;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A readable grid of numeric samples.
///
/// Implementations may be backed by storage that is slower than memory;
/// read failures surface as [`io::Error`] and are never retried here.
pub trait RasterSource {
    /// Total number of cells, no-data cells included.
    fn total_value_count(&self) -> usize;

    /// Every cell value, no-data cells included.
    fn values(&self) -> io::Result<Vec<f64>>;

    /// Up to `max_count` cell values picked without regard to position.
    fn random_values(&self, max_count: usize) -> io::Result<Vec<f64>>;

    /// The sentinel marking cells without a measurement.
    fn no_data_value(&self) -> f64;

    /// Smallest valid value, if the source knows it.
    fn minimum(&self) -> Option<f64>;

    /// Largest valid value, if the source knows it.
    fn maximum(&self) -> Option<f64>;

    /// True when the whole raster is loaded and `minimum`/`maximum` are
    /// exact over the full population.
    fn is_in_ram(&self) -> bool;
}

/// True if `v` is the no-data sentinel. A NaN sentinel matches NaN cells.
#[inline]
pub fn is_no_data(v: f64, no_data: f64) -> bool {
    v == no_data || (no_data.is_nan() && v.is_nan())
}

fn null_as_nan_vec<'de, D: serde::Deserializer<'de>>(
    d: D,
) -> std::result::Result<Vec<f64>, D::Error> {
    let v: Vec<Option<f64>> = Vec::deserialize(d)?;
    Ok(v.into_iter().map(|x| x.unwrap_or(f64::NAN)).collect())
}

fn default_no_data() -> f64 {
    f64::NAN
}

/// An in-memory raster storing f64 values, row-major.
///
/// JSON `null` cells load as NaN, which the sampler always drops. The
/// extrema of the valid cells are computed once, when the grid is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "GridDoc")]
pub struct Grid {
    data: Vec<f64>,
    width: usize,
    height: usize,
    no_data: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    sample_seed: Option<u64>,
    #[serde(skip_serializing)]
    extrema: Option<(f64, f64)>,
}

/// JSON form of a [`Grid`], validated on conversion.
#[derive(Deserialize)]
struct GridDoc {
    #[serde(deserialize_with = "null_as_nan_vec")]
    data: Vec<f64>,
    width: usize,
    height: usize,
    #[serde(default = "default_no_data")]
    no_data: f64,
    /// Seed for `random_values`; entropy-seeded when absent.
    #[serde(default)]
    sample_seed: Option<u64>,
}

impl TryFrom<GridDoc> for Grid {
    type Error = Error;

    fn try_from(doc: GridDoc) -> Result<Self> {
        let grid = Grid::from_values(doc.width, doc.height, doc.data, doc.no_data)?;
        Ok(Grid {
            sample_seed: doc.sample_seed,
            ..grid
        })
    }
}

fn scan_extrema(data: &[f64], no_data: f64) -> Option<(f64, f64)> {
    data.iter()
        .copied()
        .filter(|&v| v.is_finite() && !is_no_data(v, no_data))
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

impl Grid {
    /// Create a grid filled with `fill`.
    pub fn filled(width: usize, height: usize, fill: f64, no_data: f64) -> Self {
        let data = vec![fill; width * height];
        Self {
            extrema: scan_extrema(&data, no_data),
            data,
            width,
            height,
            no_data,
            sample_seed: None,
        }
    }

    /// Wrap existing row-major values. Fails if the length does not match.
    pub fn from_values(width: usize, height: usize, data: Vec<f64>, no_data: f64) -> Result<Self> {
        if data.len() != width * height {
            return Err(Error::invalid(
                "data",
                data.len(),
                format!("expected {width}x{height} = {} values", width * height),
            ));
        }
        Ok(Self {
            extrema: scan_extrema(&data, no_data),
            data,
            width,
            height,
            no_data,
            sample_seed: None,
        })
    }

    /// Fix the seed used for random sampling.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.sample_seed = Some(seed);
        self
    }

    /// Replace the no-data sentinel; the extrema are recomputed.
    pub fn with_no_data(mut self, no_data: f64) -> Self {
        self.no_data = no_data;
        self.extrema = scan_extrema(&self.data, no_data);
        self
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Load a grid from a JSON document.
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Load a grid from a JSON file.
    pub fn read_json(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Load the first band of a GeoTIFF. The GDAL no-data tag is honoured
    /// unless `no_data` overrides it.
    #[cfg(feature = "geotiff")]
    pub fn read_geotiff(path: impl AsRef<Path>, no_data: Option<f64>) -> Result<Self> {
        use tiff::decoder::{Decoder, DecodingResult};
        use tiff::tags::Tag;

        // GDAL_NODATA, stored as ASCII.
        const GDAL_NODATA_TAG: u16 = 42113;

        let file = io::BufReader::new(fs::File::open(path)?);
        let mut decoder = Decoder::new(file)?;
        let (width, height) = decoder.dimensions()?;

        let tagged = match decoder.find_tag(Tag::Unknown(GDAL_NODATA_TAG))? {
            Some(tiff::decoder::ifd::Value::Ascii(s)) => s.trim_end_matches('\0').trim().parse::<f64>().ok(),
            _ => None,
        };

        let data: Vec<f64> = match decoder.read_image()? {
            DecodingResult::F32(v) => v.into_iter().map(f64::from).collect(),
            DecodingResult::F64(v) => v,
            DecodingResult::U8(v) => v.into_iter().map(f64::from).collect(),
            DecodingResult::U16(v) => v.into_iter().map(f64::from).collect(),
            DecodingResult::I16(v) => v.into_iter().map(f64::from).collect(),
            DecodingResult::I32(v) => v.into_iter().map(f64::from).collect(),
            _ => return Err(Error::Decode("unsupported TIFF sample type".into())),
        };

        let width = width as usize;
        let height = height as usize;
        if data.len() < width * height {
            return Err(Error::Decode(format!(
                "expected {} samples for a {width}x{height} band, got {}",
                width * height,
                data.len()
            )));
        }
        // Multi-band images interleave samples; keep the first band.
        let bands = data.len() / (width * height);
        let data = if bands > 1 {
            data.into_iter().step_by(bands).collect()
        } else {
            data
        };

        let no_data = no_data.or(tagged).unwrap_or(f64::NAN);
        Self::from_values(width, height, data, no_data)
    }

    fn check_shape(&self) -> io::Result<()> {
        if self.data.len() != self.width * self.height {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "grid holds {} values but declares {}x{}",
                    self.data.len(),
                    self.width,
                    self.height
                ),
            ));
        }
        Ok(())
    }
}

impl RasterSource for Grid {
    fn total_value_count(&self) -> usize {
        self.data.len()
    }

    fn values(&self) -> io::Result<Vec<f64>> {
        self.check_shape()?;
        Ok(self.data.clone())
    }

    fn random_values(&self, max_count: usize) -> io::Result<Vec<f64>> {
        self.check_shape()?;
        let amount = max_count.min(self.data.len());
        let mut rng = match self.sample_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let picked = rand::seq::index::sample(&mut rng, self.data.len(), amount);
        Ok(picked.into_iter().map(|i| self.data[i]).collect())
    }

    fn no_data_value(&self) -> f64 {
        self.no_data
    }

    fn minimum(&self) -> Option<f64> {
        self.extrema.map(|(lo, _)| lo)
    }

    fn maximum(&self) -> Option<f64> {
        self.extrema.map(|(_, hi)| hi)
    }

    fn is_in_ram(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extrema_skip_no_data() {
        let g = Grid::from_values(3, 2, vec![4.0, -9999.0, 2.0, 8.0, f64::NAN, 5.0], -9999.0).unwrap();
        assert_eq!(g.minimum(), Some(2.0));
        assert_eq!(g.maximum(), Some(8.0));
    }

    #[test]
    fn extrema_of_all_no_data_are_none() {
        let g = Grid::filled(2, 2, -1.0, -1.0);
        assert_eq!(g.minimum(), None);
        assert_eq!(g.maximum(), None);
    }

    #[test]
    fn from_values_rejects_bad_length() {
        assert!(Grid::from_values(2, 2, vec![1.0; 3], 0.0).is_err());
    }

    #[test]
    fn random_values_respects_count_and_seed() {
        let data: Vec<f64> = (0..100).map(f64::from).collect();
        let g = Grid::from_values(10, 10, data, -1.0).unwrap().with_seed(7);
        let a = g.random_values(10).unwrap();
        let b = g.random_values(10).unwrap();
        assert_eq!(a.len(), 10);
        assert_eq!(a, b);
    }

    #[test]
    fn json_nulls_load_as_nan() {
        let g = Grid::from_json_str(r#"{"data":[1.0,null,3.0,4.0],"width":2,"height":2,"no_data":-9999.0}"#)
            .unwrap();
        let v = g.values().unwrap();
        assert!(v[1].is_nan());
        assert_eq!(v[3], 4.0);
        assert_eq!((g.minimum(), g.maximum()), (Some(1.0), Some(4.0)));
    }

    #[test]
    fn replacing_no_data_recomputes_extrema() {
        let g = Grid::from_values(2, 2, vec![-1.0, 3.0, 7.0, 2.0], -9999.0).unwrap();
        assert_eq!((g.minimum(), g.maximum()), (Some(-1.0), Some(7.0)));
        let g = g.with_no_data(-1.0).with_no_data(7.0);
        assert_eq!((g.minimum(), g.maximum()), (Some(-1.0), Some(3.0)));
        assert_eq!(g.no_data_value(), 7.0);
    }

    #[test]
    fn json_shape_mismatch_is_rejected_on_load() {
        let err = Grid::from_json_str(r#"{"data":[1.0,2.0,3.0],"width":2,"height":2}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn json_seed_is_kept() {
        let g = Grid::from_json_str(r#"{"data":[1,2,3,4],"width":4,"height":1,"sample_seed":9}"#).unwrap();
        assert_eq!(g.random_values(2).unwrap(), g.random_values(2).unwrap());
        assert!(g.no_data_value().is_nan());
        assert_eq!((g.width(), g.height()), (4, 1));
    }

    #[test]
    fn shape_mismatch_is_an_io_error() {
        let g = Grid {
            data: vec![1.0, 2.0],
            width: 2,
            height: 2,
            no_data: 0.0,
            sample_seed: None,
            extrema: None,
        };
        let err = g.values().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn nan_sentinel_matches_nan() {
        assert!(is_no_data(f64::NAN, f64::NAN));
        assert!(!is_no_data(1.0, f64::NAN));
        assert!(is_no_data(-9999.0, -9999.0));
    }
}
