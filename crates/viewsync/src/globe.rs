use std::sync::{Arc, Weak};
use std::time::Duration;

use catalog::CatalogProvider;
use foundation::GeoPoint;
use interaction::{Changed, InteractionStore, StateChange, Subscription};
use parking_lot::Mutex;
use tracing::debug;

use crate::config::GlobeConfig;

/// Camera side of the 3D globe renderer.
pub trait GlobeRenderer: Send + Sync {
    /// Animates the camera to look at `point` from `altitude` (globe radii).
    fn set_point_of_view(&self, point: GeoPoint, altitude: f64, duration: Duration);
    fn set_auto_rotate(&self, enabled: bool);
}

#[derive(Debug, Clone, PartialEq)]
pub enum RendererCommand {
    PointOfView {
        point: GeoPoint,
        altitude: f64,
        duration: Duration,
    },
    AutoRotate(bool),
}

/// Renderer that only records the commands it receives.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    commands: Mutex<Vec<RendererCommand>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<RendererCommand> {
        self.commands.lock().clone()
    }

    pub fn drain(&self) -> Vec<RendererCommand> {
        std::mem::take(&mut *self.commands.lock())
    }

    /// Most recent auto-rotation setting, if any was issued.
    pub fn auto_rotate(&self) -> Option<bool> {
        self.commands.lock().iter().rev().find_map(|c| match c {
            RendererCommand::AutoRotate(enabled) => Some(*enabled),
            RendererCommand::PointOfView { .. } => None,
        })
    }
}

impl GlobeRenderer for RecordingRenderer {
    fn set_point_of_view(&self, point: GeoPoint, altitude: f64, duration: Duration) {
        self.commands.lock().push(RendererCommand::PointOfView {
            point,
            altitude,
            duration,
        });
    }

    fn set_auto_rotate(&self, enabled: bool) {
        self.commands.lock().push(RendererCommand::AutoRotate(enabled));
    }
}

/// Keeps the globe camera on the active entry.
///
/// - Active item changes to a known entry: the focus point follows it (unless
///   the selection already set the same point).
/// - Focus point set: auto-rotation off, camera animates to it.
/// - Focus point cleared: auto-rotation back on.
///
/// Detaches when dropped.
pub struct GlobeFocusAdapter {
    _subscription: Subscription,
}

impl GlobeFocusAdapter {
    pub fn attach(
        store: &Arc<InteractionStore>,
        catalog: Arc<dyn CatalogProvider + Send + Sync>,
        renderer: Arc<dyn GlobeRenderer>,
        config: GlobeConfig,
    ) -> Self {
        let current = store.snapshot();
        apply_focus(renderer.as_ref(), &config, current.focus_point);
        // An entry activated before the adapter existed still gets the camera.
        let pending_focus = match current.focus_point {
            None => current
                .active_item_id
                .as_ref()
                .and_then(|id| catalog.point_of(id)),
            Some(_) => None,
        };

        let weak = Arc::downgrade(store);
        let subscription = store.subscribe(move |change| {
            on_change(&weak, catalog.as_ref(), renderer.as_ref(), &config, change);
        });
        if pending_focus.is_some() {
            store.set_focus_point(pending_focus);
        }

        Self {
            _subscription: subscription,
        }
    }
}

fn on_change(
    store: &Weak<InteractionStore>,
    catalog: &(dyn CatalogProvider + Send + Sync),
    renderer: &dyn GlobeRenderer,
    config: &GlobeConfig,
    change: &StateChange,
) {
    if change.changed.contains(Changed::ACTIVE_ITEM) {
        let target = change
            .state
            .active_item_id
            .as_ref()
            .and_then(|id| catalog.point_of(id));
        if let Some(point) = target {
            if change.state.focus_point != Some(point) {
                if let Some(store) = store.upgrade() {
                    store.set_focus_point(Some(point));
                }
            }
        }
    }
    if change.changed.contains(Changed::FOCUS_POINT) {
        apply_focus(renderer, config, change.state.focus_point);
    }
}

fn apply_focus(renderer: &dyn GlobeRenderer, config: &GlobeConfig, focus: Option<GeoPoint>) {
    match focus {
        Some(point) => {
            debug!(lat = point.lat, lng = point.lng, "globe focusing");
            renderer.set_auto_rotate(false);
            renderer.set_point_of_view(point, config.focus_altitude, config.animation());
        }
        None => {
            debug!("globe focus cleared; auto-rotating");
            renderer.set_auto_rotate(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use catalog::Catalog;
    use foundation::{EntryId, GeoPoint};
    use interaction::InteractionStore;
    use pretty_assertions::assert_eq;

    use super::{GlobeFocusAdapter, RecordingRenderer, RendererCommand};
    use crate::config::GlobeConfig;

    const PARIS: GeoPoint = GeoPoint {
        lat: 48.8566,
        lng: 2.3522,
    };
    const KYOTO: GeoPoint = GeoPoint {
        lat: 35.0116,
        lng: 135.7681,
    };

    fn catalog() -> Arc<Catalog> {
        Arc::new(
            Catalog::from_json_str(
                r#"[
                    {"id": "paris", "coordinates": {"lat": 48.8566, "lng": 2.3522}},
                    {"id": "kyoto", "coordinates": {"lat": 35.0116, "lng": 135.7681}}
                ]"#,
            )
            .unwrap(),
        )
    }

    fn pov(point: GeoPoint) -> RendererCommand {
        RendererCommand::PointOfView {
            point,
            altitude: 1.5,
            duration: Duration::from_millis(1000),
        }
    }

    #[test]
    fn attach_starts_auto_rotating_without_focus() {
        let store = InteractionStore::new();
        let renderer = Arc::new(RecordingRenderer::new());
        let _adapter =
            GlobeFocusAdapter::attach(&store, catalog(), renderer.clone(), GlobeConfig::default());
        assert_eq!(renderer.commands(), vec![RendererCommand::AutoRotate(true)]);
    }

    #[test]
    fn active_item_change_derives_focus_and_moves_camera() {
        let store = InteractionStore::new();
        let renderer = Arc::new(RecordingRenderer::new());
        let _adapter =
            GlobeFocusAdapter::attach(&store, catalog(), renderer.clone(), GlobeConfig::default());
        renderer.drain();

        store.set_active_item(Some(EntryId::from("kyoto")));
        assert_eq!(store.focus_point(), Some(KYOTO));
        assert_eq!(
            renderer.drain(),
            vec![RendererCommand::AutoRotate(false), pov(KYOTO)]
        );

        // Unknown ids leave the camera where it is.
        store.set_active_item(Some(EntryId::from("nowhere")));
        assert_eq!(store.focus_point(), Some(KYOTO));
        assert!(renderer.drain().is_empty());
    }

    #[test]
    fn selection_sets_focus_once() {
        let store = InteractionStore::new();
        let renderer = Arc::new(RecordingRenderer::new());
        let _adapter =
            GlobeFocusAdapter::attach(&store, catalog(), renderer.clone(), GlobeConfig::default());
        renderer.drain();

        store.begin_navigation(EntryId::from("paris"), PARIS);
        assert_eq!(
            renderer.drain(),
            vec![RendererCommand::AutoRotate(false), pov(PARIS)]
        );
    }

    #[test]
    fn clearing_focus_resumes_auto_rotation() {
        let store = InteractionStore::new();
        let renderer = Arc::new(RecordingRenderer::new());
        let _adapter =
            GlobeFocusAdapter::attach(&store, catalog(), renderer.clone(), GlobeConfig::default());

        store.set_active_item(Some(EntryId::from("paris")));
        assert_eq!(renderer.auto_rotate(), Some(false));
        store.set_focus_point(None);
        assert_eq!(renderer.auto_rotate(), Some(true));
    }

    #[test]
    fn attach_focuses_entry_already_active() {
        let store = InteractionStore::new();
        store.set_active_item(Some(EntryId::from("paris")));
        let renderer = Arc::new(RecordingRenderer::new());
        let _adapter =
            GlobeFocusAdapter::attach(&store, catalog(), renderer.clone(), GlobeConfig::default());

        assert_eq!(store.focus_point(), Some(PARIS));
        assert_eq!(
            renderer.commands(),
            vec![
                RendererCommand::AutoRotate(true),
                RendererCommand::AutoRotate(false),
                pov(PARIS)
            ]
        );
    }

    #[test]
    fn dropping_adapter_detaches() {
        let store = InteractionStore::new();
        let renderer = Arc::new(RecordingRenderer::new());
        let adapter =
            GlobeFocusAdapter::attach(&store, catalog(), renderer.clone(), GlobeConfig::default());
        drop(adapter);
        renderer.drain();

        store.set_active_item(Some(EntryId::from("paris")));
        assert_eq!(store.focus_point(), None);
        assert!(renderer.commands().is_empty());
    }
}
