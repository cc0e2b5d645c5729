use serde::{Deserialize, Deserializer, Serialize};

use crate::utils::error::ContextError;

// ===== BOUNDARY MODEL =====

/// Article payload as posted by the UI or mobile client.
///
/// Archive records carry many more fields; anything not listed here is
/// dropped during deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleInput {
    #[serde(default, alias = "article_id", deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, alias = "heading")]
    pub title: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub snippet: String,
}

impl ArticleInput {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    /// Trim the id and reject it when missing. Other fields are stored as sent.
    pub fn validate(self) -> Result<Self, ContextError> {
        let id = self.id.trim();
        if id.is_empty() {
            return Err(ContextError::InvalidInput("article id is required".to_string()));
        }

        Ok(Self {
            id: id.to_string(),
            ..self
        })
    }
}

pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Int(i64),
        UInt(u64),
        Float(f64),
        Missing(()),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Text(s) => Ok(s),
        RawId::Int(n) => Ok(n.to_string()),
        RawId::UInt(n) => Ok(n.to_string()),
        RawId::Float(f) => integral_id(f).ok_or_else(|| {
            serde::de::Error::custom(format!("article id {} is not a whole number", f))
        }),
        RawId::Missing(()) => Ok(String::new()),
    }
}

/// Largest float below which every whole number is exact (2^53).
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

fn integral_id(f: f64) -> Option<String> {
    if f.is_finite() && f.fract() == 0.0 && f.abs() <= MAX_EXACT_FLOAT {
        Some(format!("{}", f as i64))
    } else {
        None
    }
}

// ===== STORED MODEL =====

/// One entry of a session context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRef {
    pub id: String,
    pub title: String,
    pub date: String,
    pub source: String,
    pub url: String,
    pub snippet: String,
    pub pinned: bool,
    /// Epoch millis from the store's monotonic clock
    pub last_seen: i64,
    /// 1-based rank among pinned entries, 0 when tracked
    pub pin_order: i64,
}

/// Compact projection handed to the chat subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroundingItem {
    pub id: String,
    pub title: String,
    pub date: String,
    pub source: String,
    pub snippet: String,
    pub pinned: bool,
}

impl GroundingItem {
    pub fn from_article(article: &ArticleRef, snippet_chars: usize) -> Self {
        Self {
            id: article.id.clone(),
            title: article.title.clone(),
            date: article.date.clone(),
            source: article.source.clone(),
            snippet: truncate_chars(&article.snippet, snippet_chars),
            pinned: article.pinned,
        }
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", text[..idx].trim_end()),
        None => text.to_string(),
    }
}
