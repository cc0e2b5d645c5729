use sqlx::FromRow;

use crate::models::ArticleRef;

#[derive(Debug, Clone, FromRow)]
pub struct ContextItemRow {
    pub article_id: String,
    pub title: String,
    pub date: String,
    pub source: String,
    pub url: String,
    pub snippet: String,
    pub pinned: i64,
    pub last_seen: i64,
    pub pin_order: i64,
}

impl From<ContextItemRow> for ArticleRef {
    fn from(row: ContextItemRow) -> Self {
        Self {
            id: row.article_id,
            title: row.title,
            date: row.date,
            source: row.source,
            url: row.url,
            snippet: row.snippet,
            pinned: row.pinned != 0,
            last_seen: row.last_seen,
            pin_order: row.pin_order,
        }
    }
}
