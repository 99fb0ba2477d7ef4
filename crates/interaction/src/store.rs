use std::cell::Cell;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use foundation::{EntryId, GeoPoint};
use parking_lot::{Mutex, ReentrantMutex};
use tracing::{debug, trace};

use crate::guard::{SelectionToken, Transition};
use crate::metrics::{Counter, Metrics, MetricsSnapshot};
use crate::state::{Changed, InteractionMode, InteractionState, StateChange, ViewMode};

type Listener = Arc<dyn Fn(&StateChange) + Send + Sync>;

struct Inner {
    state: InteractionState,
    revision: u64,
}

/// Authoritative container for the session's [`InteractionState`].
///
/// Delivery contract:
/// - Each mutation is applied atomically under one lock.
/// - A mutation that leaves the state equal produces no notification.
/// - Notifications are delivered in mutation order. A mutation issued from
///   inside a listener is queued and delivered once the current round is done,
///   so the outermost call returns only after every queued change reached
///   every listener.
/// - Listeners run on the mutating thread. A mutation from another thread
///   waits for the running delivery round, so it too returns only after its
///   change was delivered.
/// - A panicking listener does not wedge delivery: later changes still reach
///   every listener.
pub struct InteractionStore {
    inner: Mutex<Inner>,
    metrics: Mutex<Metrics>,
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_listener: AtomicU64,
    pending: Mutex<VecDeque<StateChange>>,
    /// Held by the delivering thread; the flag marks a round in progress so
    /// nested mutations only enqueue.
    delivery: ReentrantMutex<Cell<bool>>,
}

impl Default for InteractionStore {
    fn default() -> Self {
        Self::with_state(InteractionState::default())
    }
}

impl InteractionStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_state(state: InteractionState) -> Self {
        Self {
            inner: Mutex::new(Inner { state, revision: 0 }),
            metrics: Mutex::new(Metrics::new()),
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(0),
            pending: Mutex::new(VecDeque::new()),
            delivery: ReentrantMutex::new(Cell::new(false)),
        }
    }

    pub fn snapshot(&self) -> InteractionState {
        self.inner.lock().state.clone()
    }

    pub fn revision(&self) -> u64 {
        self.inner.lock().revision
    }

    pub fn active_item_id(&self) -> Option<EntryId> {
        self.inner.lock().state.active_item_id.clone()
    }

    pub fn focus_point(&self) -> Option<GeoPoint> {
        self.inner.lock().state.focus_point
    }

    pub fn mode(&self) -> InteractionMode {
        self.inner.lock().state.mode
    }

    pub fn is_scrolling_programmatically(&self) -> bool {
        self.inner.lock().state.is_scrolling_programmatically()
    }

    pub fn is_active_item_locked(&self) -> bool {
        self.inner.lock().state.is_active_item_locked()
    }

    pub fn suppresses_spy(&self) -> bool {
        self.inner.lock().state.suppresses_spy()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.lock().snapshot()
    }

    /// Registers `listener` for every subsequent change.
    ///
    /// The listener stays registered until the returned [`Subscription`] is
    /// dropped.
    pub fn subscribe(
        self: &Arc<Self>,
        listener: impl Fn(&StateChange) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().push((id, Arc::new(listener)));
        Subscription {
            store: Arc::downgrade(self),
            id,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn set_mode(&self, mode: InteractionMode) {
        self.mutate(|s| s.mode = mode);
    }

    pub fn set_view_mode(&self, view_mode: ViewMode) {
        self.mutate(|s| s.view_mode = view_mode);
    }

    pub fn set_active_item(&self, id: Option<EntryId>) {
        self.mutate(|s| s.active_item_id = id);
    }

    pub fn set_focus_point(&self, point: Option<GeoPoint>) {
        self.mutate(|s| s.focus_point = point);
    }

    /// Adds `tag` to the active filters, or removes it if already present.
    pub fn toggle_filter(&self, tag: &str) {
        self.mutate(|s| {
            if !s.active_filters.remove(tag) {
                s.active_filters.insert(tag.to_string());
            }
        });
    }

    /// Clears the tag filters and the country filter.
    pub fn clear_filters(&self) {
        self.mutate(|s| {
            s.active_filters.clear();
            s.active_country = None;
        });
    }

    pub fn set_active_country(&self, country: Option<String>) {
        self.mutate(|s| s.active_country = country);
    }

    /// Scroll-spy write path: sets the active item unless the navigation guard
    /// suppresses the spy. The check and the write happen under the same lock.
    ///
    /// Returns `false` if the write was refused.
    pub fn spy_activate(&self, id: EntryId) -> bool {
        let accepted = self.mutate(|s| {
            if s.suppresses_spy() {
                return false;
            }
            s.active_item_id = Some(id);
            true
        });
        let counter = if accepted {
            Counter::SpyWrites
        } else {
            Counter::SpySuppressed
        };
        self.metrics.lock().incr(counter);
        accepted
    }

    /// Applies the optimistic half of a selection as one mutation: narrative
    /// mode, active item, focus point, and an engaged guard.
    pub fn begin_navigation(&self, id: EntryId, point: GeoPoint) -> SelectionToken {
        let token = self.mutate(|s| {
            s.mode = InteractionMode::Narrative;
            s.active_item_id = Some(id);
            s.focus_point = Some(point);
            s.guard.engage()
        });
        self.metrics.lock().incr(Counter::NavigationsStarted);
        debug!(token = token.value(), "navigation guard engaged");
        token
    }

    /// Ends the programmatic-scroll phase; the active item stays locked.
    pub fn settle_navigation(&self, token: SelectionToken) -> Transition {
        let transition = self.mutate(|s| s.guard.settle(token));
        self.note_transition("settle", token, transition);
        transition
    }

    /// Re-asserts `id` as the active item and releases the guard.
    ///
    /// Stale tokens change nothing, including the active item.
    pub fn finish_navigation(&self, token: SelectionToken, id: &EntryId) -> Transition {
        let transition = self.mutate(|s| {
            let transition = s.guard.release(token);
            if transition == Transition::Applied {
                s.active_item_id = Some(id.clone());
            }
            transition
        });
        self.note_transition("finish", token, transition);
        transition
    }

    /// Releases the guard without re-asserting the selection (teardown).
    pub fn abandon_navigation(&self, token: SelectionToken) -> Transition {
        let transition = self.mutate(|s| s.guard.release(token));
        self.note_transition("abandon", token, transition);
        transition
    }

    fn note_transition(&self, step: &'static str, token: SelectionToken, transition: Transition) {
        match transition {
            Transition::Applied => debug!(token = token.value(), step, "navigation guard advanced"),
            Transition::Stale => {
                self.metrics.lock().incr(Counter::StaleTransitions);
                debug!(token = token.value(), step, "stale navigation transition ignored");
            }
        }
    }

    fn mutate<R>(&self, apply: impl FnOnce(&mut InteractionState) -> R) -> R {
        let result = {
            let mut inner = self.inner.lock();
            let before = inner.state.clone();
            let result = apply(&mut inner.state);
            let changed = Changed::between(&before, &inner.state);
            if changed.is_empty() {
                return result;
            }
            inner.revision += 1;
            let change = StateChange {
                revision: inner.revision,
                changed,
                state: inner.state.clone(),
            };
            trace!(revision = change.revision, changed = ?change.changed, "state changed");
            // Enqueued under the state lock so queue order is revision order.
            self.pending.lock().push_back(change);
            result
        };
        self.dispatch();
        result
    }

    fn dispatch(&self) {
        let delivery = self.delivery.lock();
        if delivery.replace(true) {
            return;
        }
        let _round = DeliveryRound(&delivery);
        loop {
            let next = self.pending.lock().pop_front();
            let Some(change) = next else {
                break;
            };
            let listeners: Vec<Listener> = self
                .listeners
                .lock()
                .iter()
                .map(|(_, l)| Arc::clone(l))
                .collect();
            for listener in listeners {
                listener(&change);
            }
        }
    }

    fn unsubscribe(&self, id: u64) {
        self.listeners.lock().retain(|(lid, _)| *lid != id);
    }
}

/// Ends a delivery round, also when a listener unwinds.
struct DeliveryRound<'a>(&'a Cell<bool>);

impl Drop for DeliveryRound<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Scoped store subscription; dropping it removes the listener.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    store: Weak<InteractionStore>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(store) = self.store.upgrade() {
            store.unsubscribe(self.id);
        }
    }
}
