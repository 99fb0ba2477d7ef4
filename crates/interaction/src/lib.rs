pub mod guard;
pub mod metrics;
pub mod state;
pub mod store;

pub use guard::*;
pub use state::*;
pub use store::*;
