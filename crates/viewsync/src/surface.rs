use foundation::EntryId;

/// Scroll metrics of the list container, in pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ScrollGeometry {
    pub scroll_top: f64,
    pub scroll_height: f64,
    pub client_height: f64,
}

impl ScrollGeometry {
    pub fn new(scroll_top: f64, scroll_height: f64, client_height: f64) -> Self {
        Self {
            scroll_top,
            scroll_height,
            client_height,
        }
    }

    /// Distance still scrollable below the viewport.
    pub fn remaining(&self) -> f64 {
        self.scroll_height - self.scroll_top - self.client_height
    }

    pub fn max_scroll_top(&self) -> f64 {
        (self.scroll_height - self.client_height).max(0.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ScrollBehavior {
    Smooth,
    Instant,
}

/// The scrollable list view as seen by the sync engine.
///
/// Implementations tag each child element with an [`EntryId`]; the engine only
/// reads geometry and ids and asks for an element to be centred.
pub trait ScrollSurface: Send + Sync {
    fn geometry(&self) -> ScrollGeometry;

    /// Tagged element ids in document order.
    fn tagged_items(&self) -> Vec<EntryId>;

    fn first_tagged(&self) -> Option<EntryId> {
        self.tagged_items().into_iter().next()
    }

    fn last_tagged(&self) -> Option<EntryId> {
        self.tagged_items().pop()
    }

    /// Scrolls the element tagged `id` to the vertical centre of the viewport,
    /// as far as the container allows.
    ///
    /// Returns `false` if no element carries `id`.
    fn scroll_into_view(&self, id: &EntryId, behavior: ScrollBehavior) -> bool;
}

/// Visibility of one tagged element within the focus band (`0.0..=1.0`).
#[derive(Debug, Clone, PartialEq)]
pub struct VisibilityEntry {
    pub id: EntryId,
    pub ratio: f64,
}

impl VisibilityEntry {
    pub fn new(id: impl Into<EntryId>, ratio: f64) -> Self {
        Self {
            id: id.into(),
            ratio,
        }
    }
}

/// Events the scroll-spy consumes from a list view.
#[derive(Debug, Clone, PartialEq)]
pub enum SpyEvent {
    /// One batch of visibility changes, as an intersection observer reports
    /// them.
    Visibility(Vec<VisibilityEntry>),
    /// The container scrolled.
    Scroll,
}
