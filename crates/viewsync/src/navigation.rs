use std::sync::Arc;

use catalog::CatalogProvider;
use foundation::EntryId;
use interaction::{InteractionMode, InteractionStore, SelectionToken};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::NavigationTimings;
use crate::surface::{ScrollBehavior, ScrollSurface};

/// Where an explicit selection came from. All origins run the same protocol.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SelectionOrigin {
    ListCard,
    GlobeMarker,
    GlobeTooltip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationError {
    UnknownEntry(EntryId),
}

impl std::fmt::Display for NavigationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NavigationError::UnknownEntry(id) => write!(f, "no catalog entry with id {id}"),
        }
    }
}

impl std::error::Error for NavigationError {}

struct InFlight {
    token: SelectionToken,
    task: JoinHandle<()>,
}

/// Drives both views to an explicitly selected entry while keeping the
/// scroll-spy from reverting the selection mid-animation.
///
/// At most one navigation timeline runs at a time: a new selection aborts the
/// previous timeline, and the store discards any transition still carrying the
/// old token. Dropping the coordinator aborts the running timeline and
/// releases its guard.
pub struct NavigationCoordinator {
    store: Arc<InteractionStore>,
    catalog: Arc<dyn CatalogProvider + Send + Sync>,
    surface: Arc<dyn ScrollSurface>,
    timings: NavigationTimings,
    in_flight: Mutex<Option<InFlight>>,
}

impl NavigationCoordinator {
    pub fn new(
        store: Arc<InteractionStore>,
        catalog: Arc<dyn CatalogProvider + Send + Sync>,
        surface: Arc<dyn ScrollSurface>,
        timings: NavigationTimings,
    ) -> Self {
        Self {
            store,
            catalog,
            surface,
            timings,
            in_flight: Mutex::new(None),
        }
    }

    /// Selects `id`: narrative mode, optimistic activation, focus point and
    /// guard in one store mutation, then the timed scroll / settle / lock
    /// timeline on a spawned task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn select(
        &self,
        id: &EntryId,
        origin: SelectionOrigin,
    ) -> Result<SelectionToken, NavigationError> {
        let Some(point) = self.catalog.point_of(id) else {
            warn!(%id, ?origin, "selection of unknown entry ignored");
            return Err(NavigationError::UnknownEntry(id.clone()));
        };

        let token = self.store.begin_navigation(id.clone(), point);
        info!(%id, ?origin, token = token.value(), "navigating to entry");

        let task = tokio::spawn(run_timeline(
            Arc::clone(&self.store),
            Arc::clone(&self.surface),
            self.timings.clone(),
            id.clone(),
            token,
        ));
        if let Some(previous) = self.in_flight.lock().replace(InFlight { token, task }) {
            if !previous.task.is_finished() {
                debug!(
                    superseded = previous.token.value(),
                    token = token.value(),
                    "aborting superseded navigation"
                );
                previous.task.abort();
            }
        }
        Ok(token)
    }

    /// Hands visual emphasis to the globe and lets the camera roam again.
    pub fn enter_explore(&self) {
        self.store.set_mode(InteractionMode::Explore);
        self.store.set_focus_point(None);
    }

    /// "Back to timeline".
    pub fn return_to_narrative(&self) {
        self.store.set_mode(InteractionMode::Narrative);
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
            .lock()
            .as_ref()
            .is_some_and(|f| !f.task.is_finished())
    }
}

impl Drop for NavigationCoordinator {
    fn drop(&mut self) {
        if let Some(in_flight) = self.in_flight.lock().take() {
            if !in_flight.task.is_finished() {
                in_flight.task.abort();
                self.store.abandon_navigation(in_flight.token);
            }
        }
    }
}

/// Steps 5-7 of a selection, one suspension point per named delay.
async fn run_timeline(
    store: Arc<InteractionStore>,
    surface: Arc<dyn ScrollSurface>,
    timings: NavigationTimings,
    id: EntryId,
    token: SelectionToken,
) {
    // Give a view brought back by the mode switch time to lay out the element.
    sleep(timings.scroll_delay()).await;
    if !surface.scroll_into_view(&id, ScrollBehavior::Smooth) {
        debug!(%id, "selected entry has no list element; scroll skipped");
    }

    sleep(timings.settle()).await;
    store.settle_navigation(token);

    // The centring scroll can stop short of the target (last element, short
    // list); the re-assertion undoes the one mis-read that produces.
    sleep(timings.lock_after_settle()).await;
    store.finish_navigation(token, &id);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use catalog::Catalog;
    use foundation::{EntryId, GeoPoint};
    use interaction::{InteractionMode, InteractionStore};
    use pretty_assertions::assert_eq;
    use tokio::time::sleep;

    use super::{NavigationCoordinator, NavigationError, SelectionOrigin};
    use crate::config::NavigationTimings;
    use crate::list::VirtualList;
    use crate::visibility::FocusBand;

    const CATALOG: &str = r#"[
        {"id": "lisbon", "coordinates": {"lat": 38.7223, "lng": -9.1393}},
        {"id": "paris", "coordinates": {"lat": 48.8566, "lng": 2.3522}},
        {"id": "rome", "coordinates": {"lat": 41.9028, "lng": 12.4964}},
        {"id": "oslo", "coordinates": {"lat": 59.9139, "lng": 10.7522}}
    ]"#;

    struct Fixture {
        store: Arc<InteractionStore>,
        list: Arc<VirtualList>,
        coordinator: NavigationCoordinator,
    }

    fn fixture() -> Fixture {
        let store = InteractionStore::new();
        let catalog = Arc::new(Catalog::from_json_str(CATALOG).unwrap());
        let list = Arc::new(VirtualList::new(500.0, FocusBand::default(), 10));
        list.set_items(
            ["lisbon", "paris", "rome", "oslo"]
                .into_iter()
                .map(|id| (EntryId::from(id), 400.0)),
        );
        let coordinator = NavigationCoordinator::new(
            Arc::clone(&store),
            catalog,
            list.clone(),
            NavigationTimings::default(),
        );
        Fixture {
            store,
            list,
            coordinator,
        }
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[tokio::test(start_paused = true)]
    async fn selection_runs_the_timed_protocol() {
        let f = fixture();
        f.store.set_mode(InteractionMode::Explore);

        f.coordinator
            .select(&EntryId::from("paris"), SelectionOrigin::GlobeMarker)
            .unwrap();
        let s = f.store.snapshot();
        assert_eq!(s.mode, InteractionMode::Narrative);
        assert_eq!(s.active_item_id, Some(EntryId::from("paris")));
        assert_eq!(s.focus_point, Some(GeoPoint::new(48.8566, 2.3522)));
        assert!(s.is_scrolling_programmatically());
        assert!(s.is_active_item_locked());
        assert!(f.list.scroll_requests().is_empty());

        sleep(ms(150)).await;
        let requests = f.list.scroll_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].id, EntryId::from("paris"));

        sleep(ms(1000)).await; // t = 1150
        assert!(!f.store.is_scrolling_programmatically());
        assert!(f.store.is_active_item_locked());

        sleep(ms(1000)).await; // t = 2150
        assert!(!f.store.is_active_item_locked());
        assert_eq!(f.store.active_item_id(), Some(EntryId::from("paris")));
        assert!(!f.coordinator.is_in_flight());
    }

    #[tokio::test(start_paused = true)]
    async fn lock_reasserts_selection_over_interim_writes() {
        let f = fixture();
        f.coordinator
            .select(&EntryId::from("oslo"), SelectionOrigin::ListCard)
            .unwrap();

        sleep(ms(1150)).await;
        // Only the lock holds now; a direct write (not through the spy) can
        // still land and is corrected by the re-assertion.
        f.store.set_active_item(Some(EntryId::from("rome")));
        sleep(ms(1000)).await;
        assert_eq!(f.store.active_item_id(), Some(EntryId::from("oslo")));
    }

    #[tokio::test(start_paused = true)]
    async fn newer_selection_wins_over_stale_timers() {
        let f = fixture();
        f.coordinator
            .select(&EntryId::from("lisbon"), SelectionOrigin::GlobeMarker)
            .unwrap();
        sleep(ms(1500)).await;
        f.coordinator
            .select(&EntryId::from("rome"), SelectionOrigin::GlobeTooltip)
            .unwrap();

        // The first selection's lock would have fired at t = 2100.
        sleep(ms(700)).await; // t = 2200
        assert_eq!(f.store.active_item_id(), Some(EntryId::from("rome")));
        assert!(f.store.is_active_item_locked());

        sleep(ms(2000)).await;
        assert!(!f.store.suppresses_spy());
        assert_eq!(f.store.active_item_id(), Some(EntryId::from("rome")));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_list_element_still_focuses() {
        let f = fixture();
        f.list.set_items([(EntryId::from("lisbon"), 400.0)]);
        f.coordinator
            .select(&EntryId::from("oslo"), SelectionOrigin::GlobeMarker)
            .unwrap();
        assert_eq!(f.store.focus_point(), Some(GeoPoint::new(59.9139, 10.7522)));

        sleep(ms(2500)).await;
        assert!(f.list.scroll_requests().is_empty());
        assert!(!f.store.suppresses_spy());
        assert_eq!(f.store.active_item_id(), Some(EntryId::from("oslo")));
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_entry_is_rejected_without_state_change() {
        let f = fixture();
        let err = f
            .coordinator
            .select(&EntryId::from("atlantis"), SelectionOrigin::GlobeMarker)
            .unwrap_err();
        assert_eq!(err, NavigationError::UnknownEntry(EntryId::from("atlantis")));
        assert_eq!(f.store.revision(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_coordinator_releases_guard() {
        let f = fixture();
        f.coordinator
            .select(&EntryId::from("paris"), SelectionOrigin::ListCard)
            .unwrap();
        let store = Arc::clone(&f.store);
        drop(f);

        assert!(!store.suppresses_spy());
        assert_eq!(store.active_item_id(), Some(EntryId::from("paris")));
        sleep(ms(3000)).await;
        assert!(!store.suppresses_spy());
    }

    #[tokio::test(start_paused = true)]
    async fn explore_clears_focus_and_back_restores_narrative() {
        let f = fixture();
        f.coordinator
            .select(&EntryId::from("rome"), SelectionOrigin::GlobeMarker)
            .unwrap();
        f.coordinator.enter_explore();
        assert_eq!(f.store.mode(), InteractionMode::Explore);
        assert_eq!(f.store.focus_point(), None);
        assert_eq!(f.store.active_item_id(), Some(EntryId::from("rome")));

        f.coordinator.return_to_narrative();
        assert_eq!(f.store.mode(), InteractionMode::Narrative);
    }
}
