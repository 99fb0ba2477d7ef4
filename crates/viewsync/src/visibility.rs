use std::collections::BTreeMap;

use foundation::EntryId;

use crate::config::SpyConfig;
use crate::surface::{ScrollGeometry, VisibilityEntry};

/// Vertical extent of one list element in content coordinates.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ItemBox {
    pub top: f64,
    pub height: f64,
}

impl ItemBox {
    pub fn new(top: f64, height: f64) -> Self {
        Self { top, height }
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn center(&self) -> f64 {
        self.top + self.height * 0.5
    }
}

/// Central band of the viewport that counts as "being read".
///
/// The band is the viewport shrunk by `margin_top` and `margin_bottom`
/// (fractions of `client_height`), so the defaults keep the middle 60%.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FocusBand {
    pub margin_top: f64,
    pub margin_bottom: f64,
}

impl Default for FocusBand {
    fn default() -> Self {
        Self {
            margin_top: 0.2,
            margin_bottom: 0.2,
        }
    }
}

impl FocusBand {
    pub fn from_config(config: &SpyConfig) -> Self {
        Self {
            margin_top: config.band_margin_top,
            margin_bottom: config.band_margin_bottom,
        }
    }

    /// `(start, end)` of the band in content coordinates.
    pub fn range(&self, geometry: &ScrollGeometry) -> (f64, f64) {
        let start = geometry.scroll_top + geometry.client_height * self.margin_top;
        let end = geometry.scroll_top + geometry.client_height * (1.0 - self.margin_bottom);
        (start, end)
    }

    /// Fraction of `item` inside the band. Zero-height items never count.
    pub fn ratio(&self, item: ItemBox, geometry: &ScrollGeometry) -> f64 {
        if item.height <= 0.0 {
            return 0.0;
        }
        let (start, end) = self.range(geometry);
        let overlap = (end.min(item.bottom()) - start.max(item.top)).max(0.0);
        (overlap / item.height).clamp(0.0, 1.0)
    }
}

/// Threshold-crossing visibility reporter.
///
/// Mirrors intersection-observer semantics: the first update reports every
/// element, later updates only the elements whose ratio crossed one of the
/// `1 / steps` thresholds (or entered / left the band).
#[derive(Debug, Clone)]
pub struct VisibilityTracker {
    band: FocusBand,
    steps: u32,
    buckets: BTreeMap<EntryId, u32>,
}

impl VisibilityTracker {
    pub fn new(band: FocusBand, steps: u32) -> Self {
        Self {
            band,
            steps: steps.max(1),
            buckets: BTreeMap::new(),
        }
    }

    pub fn band(&self) -> FocusBand {
        self.band
    }

    fn bucket(&self, ratio: f64) -> u32 {
        if ratio <= 0.0 {
            return 0;
        }
        1 + (ratio * f64::from(self.steps)).floor() as u32
    }

    /// Ratios of every item, without touching the crossing state.
    pub fn snapshot(
        &self,
        items: &[(EntryId, ItemBox)],
        geometry: &ScrollGeometry,
    ) -> Vec<VisibilityEntry> {
        items
            .iter()
            .map(|(id, item)| VisibilityEntry::new(id.clone(), self.band.ratio(*item, geometry)))
            .collect()
    }

    /// Ratios of the items that crossed a threshold since the last update.
    pub fn update(
        &mut self,
        items: &[(EntryId, ItemBox)],
        geometry: &ScrollGeometry,
    ) -> Vec<VisibilityEntry> {
        self.buckets
            .retain(|id, _| items.iter().any(|(item_id, _)| item_id == id));

        let mut batch = Vec::new();
        for (id, item) in items {
            let ratio = self.band.ratio(*item, geometry);
            let bucket = self.bucket(ratio);
            if self.buckets.insert(id.clone(), bucket) != Some(bucket) {
                batch.push(VisibilityEntry::new(id.clone(), ratio));
            }
        }
        batch
    }
}
