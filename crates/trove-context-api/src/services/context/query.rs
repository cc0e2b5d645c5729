use async_trait::async_trait;
use std::sync::Arc;

use super::grounding::GroundingProvider;
use super::store::ContextStore;
use crate::models::{ContextSnapshot, GroundingItem};
use crate::session::SessionId;
use crate::utils::error::ContextError;

/// Read-side projections over the store.
#[derive(Clone)]
pub struct ContextQuery {
    store: Arc<ContextStore>,
    grounding_limit: usize,
    snippet_chars: usize,
}

impl ContextQuery {
    pub fn new(store: Arc<ContextStore>) -> Self {
        let config = store.config();
        let grounding_limit = config.grounding_limit;
        let snippet_chars = config.grounding_snippet_chars;
        Self {
            store,
            grounding_limit,
            snippet_chars,
        }
    }

    /// Pinned first, then most recent tracked, capped and trimmed for prompts.
    pub async fn grounding(&self, session: &SessionId) -> Result<Vec<GroundingItem>, ContextError> {
        if self.grounding_limit == 0 {
            return Ok(Vec::new());
        }

        let items = self
            .store
            .list_limited(session, Some(self.grounding_limit))
            .await?;

        Ok(items
            .iter()
            .map(|item| GroundingItem::from_article(item, self.snippet_chars))
            .collect())
    }

    /// Full listing for the UI tray.
    pub async fn tray(&self, session: &SessionId) -> Result<ContextSnapshot, ContextError> {
        self.store.snapshot(session).await
    }
}

#[async_trait]
impl GroundingProvider for ContextQuery {
    async fn grounding_items(&self, session: &SessionId) -> Result<Vec<GroundingItem>, ContextError> {
        self.grounding(session).await
    }
}
