//! A scheme: the ordered categories of one classification, plus opacity
//! and change notification.
//!
//! A scheme is not internally synchronised. Mutation takes `&mut self`, so
//! a caller sharing one scheme across threads has to serialise access
//! itself (e.g. behind a `Mutex`).

use std::fmt;
use std::ops::{Deref, DerefMut};

use tracing::debug;

use crate::breaks::BreakStrategy;
use crate::category::Category;
use crate::classify::{from_raster, two_bucket};
use crate::error::Result;
use crate::palette::Color;
use crate::raster::RasterSource;
use crate::settings::EditorSettings;
use crate::statistics::Statistics;

/// What kind of change an event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// The category collection was replaced by a classification.
    Classified,
    /// Categories or opacity were edited directly.
    Edited,
}

/// Delivered to observers after a change (or after a batch of changes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemeEvent {
    pub kind: ChangeKind,
    pub category_count: usize,
}

/// Receives scheme change notifications. Implemented for closures.
pub trait SchemeObserver {
    fn scheme_changed(&self, event: &SchemeEvent);
}

impl<F: Fn(&SchemeEvent)> SchemeObserver for F {
    fn scheme_changed(&self, event: &SchemeEvent) {
        self(event)
    }
}

pub struct Scheme {
    categories: Vec<Category>,
    opacity: f64,
    settings: EditorSettings,
    observers: Vec<Box<dyn SchemeObserver>>,
    suspended: usize,
    pending: Option<ChangeKind>,
}

impl Scheme {
    pub fn new(settings: EditorSettings) -> Self {
        Self {
            categories: Vec::new(),
            opacity: 1.0,
            settings,
            observers: Vec::new(),
            suspended: 0,
            pending: None,
        }
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    /// Clamped to [0, 1]; NaN is treated as fully transparent.
    pub fn set_opacity(&mut self, opacity: f64) {
        self.opacity = if opacity.is_nan() { 0.0 } else { opacity.clamp(0.0, 1.0) };
        self.notify(ChangeKind::Edited);
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: EditorSettings) {
        self.settings = settings;
    }

    pub fn subscribe(&mut self, observer: impl SchemeObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn add_category(&mut self, category: Category) {
        self.categories.push(category);
        self.notify(ChangeKind::Edited);
    }

    pub fn remove_category(&mut self, index: usize) -> Option<Category> {
        if index >= self.categories.len() {
            return None;
        }
        let removed = self.categories.remove(index);
        self.notify(ChangeKind::Edited);
        Some(removed)
    }

    pub fn clear_categories(&mut self) {
        self.categories.clear();
        self.notify(ChangeKind::Edited);
    }

    /// Start a batch: notifications are held back until the returned handle
    /// is dropped, then delivered once.
    pub fn batch(&mut self) -> SchemeBatch<'_> {
        self.suspended += 1;
        SchemeBatch { scheme: self }
    }

    /// Replace the categories with a midpoint split of `[min, max]` colored
    /// from `palette` at the scheme's opacity.
    pub fn apply_scheme(&mut self, palette: &str, min: f64, max: f64) -> Result<()> {
        let categories = two_bucket(palette, min, max, self.opacity, &self.settings)?;
        self.replace(categories);
        Ok(())
    }

    /// Classify a raster with the settings' sample count and break method.
    pub fn classify_raster(&mut self, raster: &dyn RasterSource) -> Result<Statistics> {
        let strategy = self.settings.interval_method.strategy();
        self.classify_raster_with(raster, strategy.as_ref())
    }

    /// Classify a raster with an explicit break strategy.
    pub fn classify_raster_with(
        &mut self,
        raster: &dyn RasterSource,
        strategy: &dyn BreakStrategy,
    ) -> Result<Statistics> {
        let max_sample_count = self.settings.max_sample_count;
        self.classify_from_samples(raster, max_sample_count, raster.no_data_value(), strategy)
    }

    /// Sample at most `max_sample_count` values (excluding `no_data`) and
    /// replace the categories with a break classification of them.
    pub fn classify_from_samples(
        &mut self,
        raster: &dyn RasterSource,
        max_sample_count: usize,
        no_data: f64,
        strategy: &dyn BreakStrategy,
    ) -> Result<Statistics> {
        let out = from_raster(
            raster,
            max_sample_count,
            no_data,
            &self.settings,
            strategy,
            self.opacity,
        )?;
        self.replace(out.categories);
        Ok(out.statistics)
    }

    /// Color of the first category containing `value`.
    pub fn color_for(&self, value: f64) -> Option<Color> {
        self.categories.iter().find_map(|c| c.color_for(value))
    }

    fn replace(&mut self, categories: Vec<Category>) {
        self.categories = categories;
        self.notify(ChangeKind::Classified);
    }

    fn notify(&mut self, kind: ChangeKind) {
        if self.suspended > 0 {
            self.pending = Some(match self.pending {
                Some(ChangeKind::Classified) => ChangeKind::Classified,
                _ => kind,
            });
            return;
        }
        let event = SchemeEvent {
            kind,
            category_count: self.categories.len(),
        };
        debug!(
            kind = ?event.kind,
            categories = event.category_count,
            observers = self.observers.len(),
            "scheme changed"
        );
        for observer in &self.observers {
            observer.scheme_changed(&event);
        }
    }
}

impl Default for Scheme {
    fn default() -> Self {
        Self::new(EditorSettings::default())
    }
}

impl fmt::Debug for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheme")
            .field("categories", &self.categories)
            .field("opacity", &self.opacity)
            .field("settings", &self.settings)
            .field("observers", &self.observers.len())
            .finish()
    }
}

/// Scoped bulk-mutation handle from [`Scheme::batch`]. Derefs to the
/// scheme; fires one notification on drop if anything changed.
pub struct SchemeBatch<'a> {
    scheme: &'a mut Scheme,
}

impl Deref for SchemeBatch<'_> {
    type Target = Scheme;

    fn deref(&self) -> &Scheme {
        self.scheme
    }
}

impl DerefMut for SchemeBatch<'_> {
    fn deref_mut(&mut self) -> &mut Scheme {
        self.scheme
    }
}

impl Drop for SchemeBatch<'_> {
    fn drop(&mut self) {
        self.scheme.suspended -= 1;
        if self.scheme.suspended == 0 {
            if let Some(kind) = self.scheme.pending.take() {
                self.scheme.notify(kind);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::ColorCategory;
    use crate::error::Error;
    use crate::raster::Grid;
    use rgb::RGBA8;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder(scheme: &mut Scheme) -> Rc<RefCell<Vec<SchemeEvent>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        scheme.subscribe(move |e: &SchemeEvent| sink.borrow_mut().push(*e));
        log
    }

    #[test]
    fn apply_scheme_notifies_once() {
        let mut scheme = Scheme::default();
        let log = recorder(&mut scheme);
        scheme.apply_scheme("SummerMountains", 0.0, 10.0).unwrap();
        assert_eq!(
            *log.borrow(),
            vec![SchemeEvent { kind: ChangeKind::Classified, category_count: 2 }]
        );
    }

    #[test]
    fn failed_classification_leaves_scheme_untouched() {
        let mut scheme = Scheme::default();
        scheme.apply_scheme("Glaciers", 0.0, 4.0).unwrap();
        let before = scheme.categories().to_vec();
        let log = recorder(&mut scheme);

        let err = scheme.apply_scheme("Glaciers", 9.0, 1.0).unwrap_err();
        assert!(matches!(err, Error::InvalidRange { .. }));
        assert_eq!(scheme.categories(), before.as_slice());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn batch_coalesces_notifications() {
        let mut scheme = Scheme::default();
        let log = recorder(&mut scheme);
        {
            let mut batch = scheme.batch();
            batch.clear_categories();
            batch.add_category(ColorCategory::new(0.0, 1.0).unwrap().into());
            batch.add_category(ColorCategory::new(1.0, 2.0).unwrap().into());
            batch.set_opacity(0.5);
            assert!(log.borrow().is_empty());
        }
        assert_eq!(
            *log.borrow(),
            vec![SchemeEvent { kind: ChangeKind::Edited, category_count: 2 }]
        );
    }

    #[test]
    fn batch_with_classification_reports_classified() {
        let mut scheme = Scheme::default();
        let log = recorder(&mut scheme);
        {
            let mut batch = scheme.batch();
            batch.apply_scheme("Desert", 0.0, 1.0).unwrap();
            batch.set_opacity(0.2);
        }
        assert_eq!(log.borrow().len(), 1);
        assert_eq!(log.borrow()[0].kind, ChangeKind::Classified);
    }

    #[test]
    fn empty_batch_is_silent() {
        let mut scheme = Scheme::default();
        let log = recorder(&mut scheme);
        drop(scheme.batch());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn opacity_flows_into_colors() {
        let mut scheme = Scheme::default();
        scheme.set_opacity(0.5);
        scheme.apply_scheme("Highway", 7.0, 7.0).unwrap();
        assert_eq!(scheme.color_for(7.0), Some(RGBA8::new(51, 137, 208, 128)));
        assert_eq!(scheme.color_for(8.0), None);
    }

    #[test]
    fn classify_raster_example() {
        let g = Grid::from_values(3, 2, vec![1.0, 2.0, 3.0, 4.0, 5.0, -9999.0], -9999.0).unwrap();
        let mut scheme = Scheme::default();
        let log = recorder(&mut scheme);
        let stats = scheme.classify_raster(&g).unwrap();
        let s = stats.summary().unwrap();
        assert_eq!((s.count, s.minimum, s.maximum, s.mean), (5, 1.0, 5.0, 3.0));
        assert_eq!(scheme.categories().len(), 5);
        assert_eq!(log.borrow().len(), 1);
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            assert_eq!(scheme.categories().iter().filter(|c| c.contains(v)).count(), 1);
        }
    }

    #[test]
    fn reclassifying_is_deterministic() {
        let data: Vec<f64> = (0..20_000).map(|i| ((i * 7919) % 4001) as f64 - 2000.0).collect();
        let g = Grid::from_values(200, 100, data, -9999.0).unwrap();
        let mut a = Scheme::default();
        let mut b = Scheme::default();
        a.classify_raster(&g).unwrap();
        b.classify_raster(&g).unwrap();
        assert_eq!(a.categories(), b.categories());
    }

    #[test]
    fn remove_out_of_range_is_none() {
        let mut scheme = Scheme::default();
        let log = recorder(&mut scheme);
        assert!(scheme.remove_category(3).is_none());
        assert!(log.borrow().is_empty());
    }
}
