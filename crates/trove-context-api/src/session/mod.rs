//! Session resolution: every context request is keyed by a [`SessionId`].

mod resolver;

pub use resolver::{session_middleware, ResolvedSession, SessionResolver};

use serde::Serialize;
use std::fmt;

use crate::utils::error::ContextError;

const MAX_SESSION_ID_LEN: usize = 128;

/// Validated, non-empty session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn parse(raw: &str) -> Result<Self, ContextError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ContextError::InvalidInput("session id is required".to_string()));
        }
        if raw.len() > MAX_SESSION_ID_LEN {
            return Err(ContextError::InvalidInput(format!(
                "session id longer than {} bytes",
                MAX_SESSION_ID_LEN
            )));
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ContextError::InvalidInput(
                "session id may only contain letters, digits, '-' and '_'".to_string(),
            ));
        }

        Ok(Self(raw.to_string()))
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
