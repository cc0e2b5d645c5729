pub mod article;
pub mod context;

pub use article::{ArticleInput, ArticleRef, GroundingItem};
pub use context::{
    ContextSnapshot, ContextStats, ExportFormat, ListResponse, MoveDirection, MutationResponse,
    StatsResponse,
};
