//! Session context tracking
//!
//! Provides the per-session article context with:
//! - Serialized, transactional mutations per session (track/pin/unpin/move/clear)
//! - Read projections for the UI tray and for chat grounding
//! - JSON and CSV export
//! - Optional idle-session expiry

mod clock;
pub mod export;
pub mod grounding;
mod locks;
pub mod query;
pub mod store;
pub mod sweeper;

pub use clock::MonotonicClock;
pub use export::ExportPayload;
pub use grounding::{ContextBuilder, GroundingContext, GroundingProvider};
pub use locks::SessionLocks;
pub use query::ContextQuery;
pub use store::ContextStore;
