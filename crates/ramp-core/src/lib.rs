//! ramp-core: color-ramp classification of raster values.
//!
//! Pipeline:
//!   raster → sampler (bounded, no-data filtered) → statistics → breaks
//!          → categories (ranges + interpolated colors) → scheme
//!
//! A [`Scheme`] owns the categories and notifies observers when a
//! classification replaces them. Everything below it is plain functions
//! over values.

pub mod breaks;
pub mod category;
pub mod classify;
pub mod error;
pub mod palette;
pub mod raster;
pub mod sampler;
pub mod scheme;
pub mod settings;
pub mod statistics;

pub use breaks::{BreakStrategy, IntervalMethod, IntervalSnap};
pub use category::{Category, ColorCategory, NoDataCategory, Range};
pub use classify::Classification;
pub use error::{Error, Result};
pub use palette::{Color, PaletteName, PaletteStops};
pub use raster::{Grid, RasterSource};
pub use scheme::{ChangeKind, Scheme, SchemeBatch, SchemeEvent, SchemeObserver};
pub use settings::{CategoryStyle, EditorSettings};
pub use statistics::{Statistics, Summary};
