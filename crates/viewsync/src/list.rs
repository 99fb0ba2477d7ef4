use foundation::EntryId;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::trace;

use crate::config::SpyConfig;
use crate::surface::{ScrollBehavior, ScrollGeometry, ScrollSurface, SpyEvent};
use crate::visibility::{FocusBand, ItemBox, VisibilityTracker};

/// One `scroll_into_view` call as the list saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollRequest {
    pub id: EntryId,
    pub behavior: ScrollBehavior,
    /// Clamped `scroll_top` the request resolved to.
    pub target_top: f64,
}

struct ListInner {
    items: Vec<(EntryId, ItemBox)>,
    content_height: f64,
    scroll_top: f64,
    client_height: f64,
    tracker: VisibilityTracker,
    observers: Vec<UnboundedSender<SpyEvent>>,
    requests: Vec<ScrollRequest>,
}

impl ListInner {
    fn geometry(&self) -> ScrollGeometry {
        ScrollGeometry::new(
            self.scroll_top,
            self.content_height.max(self.client_height),
            self.client_height,
        )
    }

    fn clamp_scroll(&self, px: f64) -> f64 {
        px.clamp(0.0, self.geometry().max_scroll_top())
    }

    /// Reports a scroll tick (if `scrolled`) followed by any threshold
    /// crossings.
    fn emit(&mut self, scrolled: bool) {
        let geometry = self.geometry();
        let batch = self.tracker.update(&self.items, &geometry);
        trace!(
            scroll_top = geometry.scroll_top,
            scrolled,
            crossings = batch.len(),
            "list changed"
        );
        if scrolled {
            self.observers.retain(|tx| tx.send(SpyEvent::Scroll).is_ok());
        }
        if !batch.is_empty() {
            let event = SpyEvent::Visibility(batch);
            self.observers.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }
}

/// In-memory scrollable list: stacked elements of known height inside a
/// viewport of `client_height`.
///
/// Stands in for a rendered list wherever no real view exists (replay, tests).
/// Scrolling is applied immediately; smooth scrolling is recorded but not
/// animated.
pub struct VirtualList {
    inner: Mutex<ListInner>,
}

impl VirtualList {
    pub fn new(client_height: f64, band: FocusBand, ratio_steps: u32) -> Self {
        Self {
            inner: Mutex::new(ListInner {
                items: Vec::new(),
                content_height: 0.0,
                scroll_top: 0.0,
                client_height: client_height.max(0.0),
                tracker: VisibilityTracker::new(band, ratio_steps),
                observers: Vec::new(),
                requests: Vec::new(),
            }),
        }
    }

    pub fn from_config(client_height: f64, config: &SpyConfig) -> Self {
        Self::new(client_height, FocusBand::from_config(config), config.ratio_steps)
    }

    /// Replaces the list content with `items` (id, height) stacked top to
    /// bottom. The scroll offset is re-clamped to the new content.
    pub fn set_items(&self, items: impl IntoIterator<Item = (EntryId, f64)>) {
        let mut inner = self.inner.lock();
        let mut top = 0.0;
        inner.items = items
            .into_iter()
            .map(|(id, height)| {
                let height = height.max(0.0);
                let item = ItemBox::new(top, height);
                top += height;
                (id, item)
            })
            .collect();
        inner.content_height = top;
        let clamped = inner.clamp_scroll(inner.scroll_top);
        let scrolled = clamped != inner.scroll_top;
        inner.scroll_top = clamped;
        inner.emit(scrolled);
    }

    /// User scroll. Out-of-range offsets are clamped; an unchanged offset
    /// produces no events.
    pub fn set_scroll_top(&self, px: f64) {
        let mut inner = self.inner.lock();
        let clamped = inner.clamp_scroll(px);
        if clamped == inner.scroll_top {
            return;
        }
        inner.scroll_top = clamped;
        inner.emit(true);
    }

    pub fn scroll_top(&self) -> f64 {
        self.inner.lock().scroll_top
    }

    pub fn item_box(&self, id: &EntryId) -> Option<ItemBox> {
        self.inner
            .lock()
            .items
            .iter()
            .find(|(item_id, _)| item_id == id)
            .map(|(_, item)| *item)
    }

    /// Starts observing the list. The first event is a visibility batch
    /// covering every element, like an intersection observer's initial
    /// callback.
    pub fn observe(&self) -> UnboundedReceiver<SpyEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock();
        let initial = inner.tracker.snapshot(&inner.items, &inner.geometry());
        if tx.send(SpyEvent::Visibility(initial)).is_ok() {
            inner.observers.push(tx);
        }
        rx
    }

    pub fn scroll_requests(&self) -> Vec<ScrollRequest> {
        self.inner.lock().requests.clone()
    }
}

impl ScrollSurface for VirtualList {
    fn geometry(&self) -> ScrollGeometry {
        self.inner.lock().geometry()
    }

    fn tagged_items(&self) -> Vec<EntryId> {
        self.inner
            .lock()
            .items
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }

    fn scroll_into_view(&self, id: &EntryId, behavior: ScrollBehavior) -> bool {
        let mut inner = self.inner.lock();
        let Some(item) = inner
            .items
            .iter()
            .find(|(item_id, _)| item_id == id)
            .map(|(_, item)| *item)
        else {
            return false;
        };
        let target_top = inner.clamp_scroll(item.center() - inner.client_height * 0.5);
        inner.requests.push(ScrollRequest {
            id: id.clone(),
            behavior,
            target_top,
        });
        if target_top != inner.scroll_top {
            inner.scroll_top = target_top;
            inner.emit(true);
        }
        true
    }
}
