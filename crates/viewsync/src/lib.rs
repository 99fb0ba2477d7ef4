//! Cross-view synchronization for the travel log: keeps the chronological list
//! and the globe focused on the same entry.
//!
//! - [`scroll_spy`]: infers the entry being read from the list scroll position.
//! - [`navigation`]: explicit selections with timed scroll-spy suppression.
//! - [`globe`]: camera follow for the active entry.
//! - [`globe_view`]: markers, hover and tooltip on the globe side.

pub mod config;
pub mod globe;
pub mod globe_view;
pub mod list;
pub mod navigation;
pub mod scroll_spy;
pub mod surface;
pub mod visibility;

pub use config::*;
pub use globe::*;
pub use globe_view::*;
pub use list::*;
pub use navigation::*;
pub use scroll_spy::*;
pub use surface::*;
pub use visibility::*;
