/// Monotonic id handed out for every explicit selection.
///
/// Timeouts carry the token of the selection that scheduled them; the guard
/// drops any transition whose token is no longer current.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SelectionToken(u64);

impl SelectionToken {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Phase of the scroll-spy suppression guard.
///
/// | phase       | scrolling programmatically | active item locked |
/// |-------------|----------------------------|--------------------|
/// | `Idle`      | false                      | false              |
/// | `Scrolling` | true                       | true               |
/// | `Locked`    | false                      | true               |
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum GuardPhase {
    #[default]
    Idle,
    Scrolling,
    Locked,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Transition {
    Applied,
    /// The token belongs to a superseded or already released selection.
    Stale,
}

/// State machine replacing the pair of independent "scrolling" / "locked"
/// booleans.
///
/// Transitions:
/// - `engage`: any phase -> `Scrolling`, issues a fresh token.
/// - `settle(token)`: `Scrolling` -> `Locked` (no-op in `Locked`).
/// - `release(token)`: `Scrolling | Locked` -> `Idle`.
///
/// `settle` and `release` with a token other than the current one are stale
/// and leave the guard untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NavigationGuard {
    phase: GuardPhase,
    current: Option<SelectionToken>,
    issued: u64,
}

impl NavigationGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> GuardPhase {
        self.phase
    }

    pub fn current_token(&self) -> Option<SelectionToken> {
        self.current
    }

    pub fn is_scrolling_programmatically(&self) -> bool {
        self.phase == GuardPhase::Scrolling
    }

    pub fn is_active_item_locked(&self) -> bool {
        self.phase != GuardPhase::Idle
    }

    /// `true` while the scroll-spy must not write the active item.
    pub fn suppresses_spy(&self) -> bool {
        self.is_scrolling_programmatically() || self.is_active_item_locked()
    }

    pub fn engage(&mut self) -> SelectionToken {
        self.issued = self.issued.wrapping_add(1);
        let token = SelectionToken(self.issued);
        self.current = Some(token);
        self.phase = GuardPhase::Scrolling;
        token
    }

    pub fn settle(&mut self, token: SelectionToken) -> Transition {
        if self.current != Some(token) {
            return Transition::Stale;
        }
        self.phase = GuardPhase::Locked;
        Transition::Applied
    }

    pub fn release(&mut self, token: SelectionToken) -> Transition {
        if self.current != Some(token) {
            return Transition::Stale;
        }
        self.phase = GuardPhase::Idle;
        self.current = None;
        Transition::Applied
    }
}
