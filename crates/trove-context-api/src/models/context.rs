use serde::{Deserialize, Serialize};

use super::article::ArticleRef;
use crate::utils::error::ContextError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextStats {
    pub pinned: usize,
    pub tracked: usize,
    pub total: usize,
}

impl ContextStats {
    pub fn from_items(items: &[ArticleRef]) -> Self {
        let pinned = items.iter().filter(|item| item.pinned).count();
        Self {
            pinned,
            tracked: items.len() - pinned,
            total: items.len(),
        }
    }
}

/// Listing plus the stats derived from it, taken from one transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContextSnapshot {
    pub items: Vec<ArticleRef>,
    pub stats: ContextStats,
}

impl ContextSnapshot {
    pub fn new(items: Vec<ArticleRef>) -> Self {
        let stats = ContextStats::from_items(&items);
        Self { items, stats }
    }

    pub fn ids(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.id.as_str()).collect()
    }

    pub fn pinned_ids(&self) -> Vec<&str> {
        self.items
            .iter()
            .filter(|item| item.pinned)
            .map(|item| item.id.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl std::str::FromStr for ExportFormat {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(ContextError::InvalidInput(format!(
                "unsupported export format: {}",
                other
            ))),
        }
    }
}

// ===== RESPONSE MODELS =====

#[derive(Debug, Serialize)]
pub struct MutationResponse {
    pub ok: bool,
    pub items: Vec<ArticleRef>,
    pub stats: ContextStats,
}

impl From<ContextSnapshot> for MutationResponse {
    fn from(snapshot: ContextSnapshot) -> Self {
        Self {
            ok: true,
            items: snapshot.items,
            stats: snapshot.stats,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub ok: bool,
    pub sid: String,
    pub items: Vec<ArticleRef>,
    pub stats: ContextStats,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub stats: ContextStats,
}
