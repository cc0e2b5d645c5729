pub mod context;

pub use context::{ContextBuilder, ContextQuery, ContextStore, GroundingProvider};
