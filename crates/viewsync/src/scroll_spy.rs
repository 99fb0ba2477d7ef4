use std::sync::Arc;

use foundation::EntryId;
use interaction::InteractionStore;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::config::SpyConfig;
use crate::surface::{ScrollSurface, SpyEvent, VisibilityEntry};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SpyReason {
    TopEdge,
    BottomEdge,
    MostVisible,
}

/// What one evaluation of the scroll-spy did.
#[derive(Debug, Clone, PartialEq)]
pub enum SpyOutcome {
    /// The navigation guard was up; nothing was evaluated.
    Suppressed,
    Activated(EntryId, SpyReason),
    /// An edge matched but the list has no tagged element.
    EdgeWithoutItem(SpyReason),
    /// The store refused the write (the guard went up mid-evaluation).
    Refused(EntryId),
    /// No edge matched and no element is visible in the band.
    Nothing,
}

/// Infers the entry being read from the list scroll position and writes it to
/// the store as the active item.
pub struct ScrollSpy {
    store: Arc<InteractionStore>,
    surface: Arc<dyn ScrollSurface>,
    config: SpyConfig,
}

impl ScrollSpy {
    pub fn new(
        store: Arc<InteractionStore>,
        surface: Arc<dyn ScrollSurface>,
        config: SpyConfig,
    ) -> Self {
        Self {
            store,
            surface,
            config,
        }
    }

    /// Scroll-tick handler: edge checks only.
    pub fn on_scroll(&self) -> SpyOutcome {
        if self.store.suppresses_spy() {
            trace!("scroll ignored while navigation guard is up");
            return SpyOutcome::Suppressed;
        }
        self.check_edges().unwrap_or(SpyOutcome::Nothing)
    }

    /// Visibility-batch handler: edge checks first, then the most visible
    /// element of the batch.
    pub fn on_visibility(&self, batch: &[VisibilityEntry]) -> SpyOutcome {
        if self.store.suppresses_spy() {
            trace!(batch = batch.len(), "visibility ignored while navigation guard is up");
            return SpyOutcome::Suppressed;
        }
        if let Some(outcome) = self.check_edges() {
            return outcome;
        }
        match most_visible(batch) {
            Some(entry) => self.activate(entry.id.clone(), SpyReason::MostVisible),
            None => SpyOutcome::Nothing,
        }
    }

    /// Near the container boundaries the focus band under-reports the first
    /// and last elements, so position wins over ratios there.
    fn check_edges(&self) -> Option<SpyOutcome> {
        let geometry = self.surface.geometry();
        let (reason, target) = if geometry.scroll_top <= self.config.top_threshold_px {
            (SpyReason::TopEdge, self.surface.first_tagged())
        } else if geometry.remaining() < self.config.bottom_threshold_px {
            (SpyReason::BottomEdge, self.surface.last_tagged())
        } else {
            return None;
        };
        Some(match target {
            Some(id) => self.activate(id, reason),
            None => SpyOutcome::EdgeWithoutItem(reason),
        })
    }

    fn activate(&self, id: EntryId, reason: SpyReason) -> SpyOutcome {
        if self.store.spy_activate(id.clone()) {
            trace!(%id, ?reason, "scroll-spy activated entry");
            SpyOutcome::Activated(id, reason)
        } else {
            SpyOutcome::Refused(id)
        }
    }

    /// Runs the spy over `events` on a background task.
    ///
    /// Edges are checked once up front, so a list resting at the top starts
    /// with its first entry active. The task ends when the event source closes
    /// or the returned handle is dropped.
    pub fn spawn(self, mut events: UnboundedReceiver<SpyEvent>) -> SpyHandle {
        let task = tokio::spawn(async move {
            self.on_scroll();
            while let Some(event) = events.recv().await {
                match event {
                    SpyEvent::Scroll => self.on_scroll(),
                    SpyEvent::Visibility(batch) => self.on_visibility(&batch),
                };
            }
            debug!("scroll-spy event source closed");
        });
        SpyHandle { task }
    }
}

/// Highest ratio in the batch, first one winning ties; `None` unless that
/// ratio is positive.
pub fn most_visible(batch: &[VisibilityEntry]) -> Option<&VisibilityEntry> {
    let mut best: Option<&VisibilityEntry> = None;
    for entry in batch {
        if best.is_none_or(|b| entry.ratio > b.ratio) {
            best = Some(entry);
        }
    }
    best.filter(|b| b.ratio > 0.0)
}

/// Owns the spy task; dropping it stops the spy.
pub struct SpyHandle {
    task: JoinHandle<()>,
}

impl SpyHandle {
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for SpyHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use foundation::{EntryId, GeoPoint};
    use interaction::InteractionStore;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    use super::{ScrollSpy, SpyOutcome, SpyReason, most_visible};
    use crate::config::SpyConfig;
    use crate::surface::{ScrollBehavior, ScrollGeometry, ScrollSurface, VisibilityEntry};

    /// Container with fixed geometry and tagged ids, like a mocked DOM node.
    struct FakeContainer {
        geometry: Mutex<ScrollGeometry>,
        ids: Vec<EntryId>,
    }

    impl FakeContainer {
        fn new(scroll_top: f64, ids: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                geometry: Mutex::new(ScrollGeometry::new(scroll_top, 1000.0, 500.0)),
                ids: ids.iter().map(|s| EntryId::from(*s)).collect(),
            })
        }

        fn set_scroll_top(&self, px: f64) {
            self.geometry.lock().scroll_top = px;
        }
    }

    impl ScrollSurface for FakeContainer {
        fn geometry(&self) -> ScrollGeometry {
            *self.geometry.lock()
        }

        fn tagged_items(&self) -> Vec<EntryId> {
            self.ids.clone()
        }

        fn scroll_into_view(&self, _id: &EntryId, _behavior: ScrollBehavior) -> bool {
            false
        }
    }

    fn spy(store: &Arc<InteractionStore>, container: &Arc<FakeContainer>) -> ScrollSpy {
        ScrollSpy::new(Arc::clone(store), container.clone(), SpyConfig::default())
    }

    fn id(s: &str) -> EntryId {
        EntryId::from(s)
    }

    #[test]
    fn top_edge_activates_first_regardless_of_ratios() {
        let store = InteractionStore::new();
        let container = FakeContainer::new(50.0, &["1", "2", "3"]);
        let spy = spy(&store, &container);

        let outcome = spy.on_visibility(&[VisibilityEntry::new("3", 1.0)]);
        assert_eq!(outcome, SpyOutcome::Activated(id("1"), SpyReason::TopEdge));
        assert_eq!(store.active_item_id(), Some(id("1")));
    }

    #[test]
    fn bottom_edge_activates_last() {
        let store = InteractionStore::new();
        let container = FakeContainer::new(100.0, &["1", "2"]);
        let spy = spy(&store, &container);

        container.set_scroll_top(496.0);
        assert_eq!(
            spy.on_scroll(),
            SpyOutcome::Activated(id("2"), SpyReason::BottomEdge)
        );

        // 1000 - 495 - 500 = 5 is not below the threshold.
        store.set_active_item(None);
        container.set_scroll_top(495.0);
        assert_eq!(spy.on_scroll(), SpyOutcome::Nothing);
        assert_eq!(store.active_item_id(), None);
    }

    #[test]
    fn middle_uses_most_visible_entry() {
        let store = InteractionStore::new();
        let container = FakeContainer::new(200.0, &["1", "2", "3"]);
        let spy = spy(&store, &container);

        let batch = [
            VisibilityEntry::new("1", 0.2),
            VisibilityEntry::new("2", 0.7),
            VisibilityEntry::new("3", 0.7),
        ];
        assert_eq!(
            spy.on_visibility(&batch),
            SpyOutcome::Activated(id("2"), SpyReason::MostVisible)
        );
        // Scroll ticks never consult ratios.
        store.set_active_item(None);
        assert_eq!(spy.on_scroll(), SpyOutcome::Nothing);
    }

    #[test]
    fn zero_ratios_and_empty_batches_write_nothing() {
        let store = InteractionStore::new();
        let container = FakeContainer::new(200.0, &["1"]);
        let spy = spy(&store, &container);

        assert_eq!(spy.on_visibility(&[]), SpyOutcome::Nothing);
        assert_eq!(
            spy.on_visibility(&[VisibilityEntry::new("1", 0.0)]),
            SpyOutcome::Nothing
        );
        assert_eq!(store.active_item_id(), None);
    }

    #[test]
    fn edges_without_items_are_noops() {
        let store = InteractionStore::new();
        let container = FakeContainer::new(0.0, &[]);
        let spy = spy(&store, &container);
        assert_eq!(
            spy.on_scroll(),
            SpyOutcome::EdgeWithoutItem(SpyReason::TopEdge)
        );
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn suppressed_while_guard_is_up() {
        let store = InteractionStore::new();
        let container = FakeContainer::new(0.0, &["1", "2"]);
        let spy = spy(&store, &container);

        let token = store.begin_navigation(id("2"), GeoPoint::new(0.0, 0.0));
        assert_eq!(spy.on_scroll(), SpyOutcome::Suppressed);
        assert_eq!(
            spy.on_visibility(&[VisibilityEntry::new("1", 1.0)]),
            SpyOutcome::Suppressed
        );

        store.settle_navigation(token);
        assert_eq!(spy.on_scroll(), SpyOutcome::Suppressed);
        assert_eq!(store.active_item_id(), Some(id("2")));
    }

    #[test]
    fn repeated_evaluation_is_idempotent() {
        let store = InteractionStore::new();
        let container = FakeContainer::new(0.0, &["1", "2"]);
        let spy = spy(&store, &container);

        spy.on_scroll();
        let revision = store.revision();
        let first = store.active_item_id();
        spy.on_scroll();
        spy.on_scroll();
        assert_eq!(store.active_item_id(), first);
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn most_visible_prefers_first_on_ties() {
        let batch = [
            VisibilityEntry::new("a", 0.4),
            VisibilityEntry::new("b", 0.9),
            VisibilityEntry::new("c", 0.9),
        ];
        assert_eq!(most_visible(&batch).map(|e| e.id.as_str()), Some("b"));
        assert_eq!(most_visible(&[]), None);
    }
}
