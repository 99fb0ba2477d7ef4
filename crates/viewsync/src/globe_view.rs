use std::sync::Arc;

use catalog::CatalogProvider;
use foundation::{EntryId, GeoPoint};
use interaction::{Changed, InteractionStore, SelectionToken, Subscription};
use parking_lot::Mutex;

use crate::navigation::{NavigationCoordinator, NavigationError, SelectionOrigin};

pub const MARKER_SIZE: f64 = 1.0;
pub const DIMMED_MARKER_SCALE: f64 = 0.5;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MarkerStyle {
    Normal,
    /// Entry excluded by the active filters.
    Dimmed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlobeMarker {
    pub id: EntryId,
    pub point: GeoPoint,
    pub label: String,
    pub style: MarkerStyle,
    pub size: f64,
}

/// Globe-side interaction model: markers, hover, tooltip and the click entry
/// points feeding the navigation coordinator.
///
/// Marker styling ignores selection so markers stay stable while the active
/// entry moves; the active entry is highlighted by the renderer.
pub struct GlobeView {
    store: Arc<InteractionStore>,
    catalog: Arc<dyn CatalogProvider + Send + Sync>,
    coordinator: Arc<NavigationCoordinator>,
    hovered: Arc<Mutex<Option<EntryId>>>,
    _clear_hover: Subscription,
}

impl GlobeView {
    pub fn new(
        store: Arc<InteractionStore>,
        catalog: Arc<dyn CatalogProvider + Send + Sync>,
        coordinator: Arc<NavigationCoordinator>,
    ) -> Self {
        let hovered = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&hovered);
        let clear_hover = store.subscribe(move |change| {
            if change.changed.contains(Changed::ACTIVE_ITEM) {
                *sink.lock() = None;
            }
        });
        Self {
            store,
            catalog,
            coordinator,
            hovered,
            _clear_hover: clear_hover,
        }
    }

    /// One marker per catalog entry, dimmed when filtered out.
    pub fn markers(&self) -> Vec<GlobeMarker> {
        let state = self.store.snapshot();
        let visible: Vec<&str> = self
            .catalog
            .filtered(&state.active_filters, state.active_country.as_deref())
            .into_iter()
            .map(|e| e.id.as_str())
            .collect();
        self.catalog
            .entries()
            .iter()
            .map(|entry| {
                let style = if visible.contains(&entry.id.as_str()) {
                    MarkerStyle::Normal
                } else {
                    MarkerStyle::Dimmed
                };
                let size = match style {
                    MarkerStyle::Normal => MARKER_SIZE,
                    MarkerStyle::Dimmed => MARKER_SIZE * DIMMED_MARKER_SCALE,
                };
                GlobeMarker {
                    id: entry.entry_id(),
                    point: entry.point(),
                    label: entry.title.clone(),
                    style,
                    size,
                }
            })
            .collect()
    }

    pub fn on_marker_hover(&self, id: Option<EntryId>) {
        *self.hovered.lock() = id;
    }

    pub fn hovered(&self) -> Option<EntryId> {
        self.hovered.lock().clone()
    }

    /// Entry the tooltip card shows: the hovered marker, else the active one.
    pub fn tooltip_target(&self) -> Option<EntryId> {
        self.hovered().or_else(|| self.store.active_item_id())
    }

    pub fn on_marker_click(&self, id: &EntryId) -> Result<SelectionToken, NavigationError> {
        self.coordinator.select(id, SelectionOrigin::GlobeMarker)
    }

    /// Selects whatever the tooltip currently shows; `Ok(None)` if it shows
    /// nothing.
    pub fn on_tooltip_click(&self) -> Result<Option<SelectionToken>, NavigationError> {
        match self.tooltip_target() {
            Some(id) => self
                .coordinator
                .select(&id, SelectionOrigin::GlobeTooltip)
                .map(Some),
            None => Ok(None),
        }
    }
}
