use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::models::GroundingItem;
use crate::session::SessionId;
use crate::utils::error::ContextError;
use crate::utils::token_estimator::TokenBudget;

/// Source of grounding items for the chat subsystem.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GroundingProvider: Send + Sync {
    async fn grounding_items(&self, session: &SessionId) -> Result<Vec<GroundingItem>, ContextError>;
}

/// What a chat turn receives from the session context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroundingContext {
    pub items: Vec<GroundingItem>,
    pub prompt: String,
    /// Set when the store failed and the turn proceeds without context
    pub degraded: bool,
}

/// Renders grounding items into a prompt block within a token budget.
pub struct ContextBuilder {
    max_tokens: usize,
}

impl ContextBuilder {
    pub fn new(max_tokens: usize) -> Self {
        Self { max_tokens }
    }

    pub fn header() -> &'static str {
        "Research context from the user's session (pinned articles first, then recently viewed):"
    }

    pub async fn build_for_session(
        &self,
        provider: &dyn GroundingProvider,
        session: &SessionId,
    ) -> GroundingContext {
        match provider.grounding_items(session).await {
            Ok(items) => self.build(items),
            Err(e) => {
                warn!("Grounding unavailable for session {}, continuing without context: {}", session, e);
                GroundingContext {
                    degraded: true,
                    ..GroundingContext::default()
                }
            }
        }
    }

    /// Items are kept in order until the next one would pass the budget.
    pub fn build(&self, items: Vec<GroundingItem>) -> GroundingContext {
        if items.is_empty() {
            return GroundingContext::default();
        }

        let mut prompt = Self::header().to_string();
        let mut budget = TokenBudget::new(self.max_tokens);
        if !budget.try_spend(&prompt) {
            return GroundingContext::default();
        }
        let mut kept = Vec::with_capacity(items.len());

        for item in items {
            let entry = Self::render_entry(kept.len() + 1, &item);
            if !budget.try_spend(&entry) {
                debug!(
                    "Grounding budget reached after {} items ({} tokens)",
                    kept.len(),
                    budget.used()
                );
                break;
            }
            prompt.push('\n');
            prompt.push_str(&entry);
            kept.push(item);
        }

        if kept.is_empty() {
            return GroundingContext::default();
        }

        GroundingContext {
            items: kept,
            prompt,
            degraded: false,
        }
    }

    fn render_entry(index: usize, item: &GroundingItem) -> String {
        let mut heading: Vec<&str> = Vec::with_capacity(3);
        for part in [item.title.as_str(), item.source.as_str(), item.date.as_str()] {
            if !part.is_empty() {
                heading.push(part);
            }
        }

        let mut entry = format!("[{}] {} (id: {})", index, heading.join(" | "), item.id);
        if item.pinned {
            entry.push_str(" [pinned]");
        }
        if !item.snippet.is_empty() {
            entry.push_str("\n    ");
            entry.push_str(&item.snippet);
        }
        entry
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new(1_500)
    }
}
