//! Cart synchronization.

mod engine;
mod sync;

pub use engine::{CartEngine, CartUpdate, Hydration};
pub use sync::{RemoteSync, SyncStatus};
