use std::collections::BTreeSet;

use bitflags::bitflags;
use foundation::{EntryId, GeoPoint};

use crate::guard::NavigationGuard;

/// Which view currently has primary visual emphasis.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum InteractionMode {
    #[default]
    Narrative,
    Explore,
}

/// Full-screen view toggle (timeline list vs. globe).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Timeline,
    Globe,
}

/// Session-wide interaction state.
///
/// The two suppression flags are not stored directly: they are views over the
/// [`NavigationGuard`] phase.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InteractionState {
    pub mode: InteractionMode,
    pub view_mode: ViewMode,
    pub active_item_id: Option<EntryId>,
    pub focus_point: Option<GeoPoint>,
    pub guard: NavigationGuard,
    pub active_filters: BTreeSet<String>,
    pub active_country: Option<String>,
}

impl InteractionState {
    pub fn is_scrolling_programmatically(&self) -> bool {
        self.guard.is_scrolling_programmatically()
    }

    pub fn is_active_item_locked(&self) -> bool {
        self.guard.is_active_item_locked()
    }

    pub fn suppresses_spy(&self) -> bool {
        self.guard.suppresses_spy()
    }
}

bitflags! {
    /// Fields touched by one store mutation.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct Changed: u8 {
        const MODE = 1 << 0;
        const VIEW_MODE = 1 << 1;
        const ACTIVE_ITEM = 1 << 2;
        const FOCUS_POINT = 1 << 3;
        const GUARD = 1 << 4;
        const FILTERS = 1 << 5;
    }
}

impl Changed {
    pub fn between(before: &InteractionState, after: &InteractionState) -> Self {
        let mut changed = Changed::empty();
        changed.set(Changed::MODE, before.mode != after.mode);
        changed.set(Changed::VIEW_MODE, before.view_mode != after.view_mode);
        changed.set(
            Changed::ACTIVE_ITEM,
            before.active_item_id != after.active_item_id,
        );
        changed.set(Changed::FOCUS_POINT, before.focus_point != after.focus_point);
        changed.set(Changed::GUARD, before.guard != after.guard);
        changed.set(
            Changed::FILTERS,
            before.active_filters != after.active_filters
                || before.active_country != after.active_country,
        );
        changed
    }
}

/// Notification delivered to store subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct StateChange {
    /// Strictly increasing per store.
    pub revision: u64,
    pub changed: Changed,
    /// State right after the mutation that produced this change.
    pub state: InteractionState,
}
