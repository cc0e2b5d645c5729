use axum::{
    extract::{Request, State},
    http::{
        header::{COOKIE, SET_COOKIE},
        HeaderMap, HeaderName, HeaderValue,
    },
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, warn};

use super::SessionId;
use crate::config::SessionConfig;
use crate::utils::error::{ApiError, ContextError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSession {
    pub id: SessionId,
    /// True when no usable id arrived and a fresh one was issued
    pub minted: bool,
}

/// Maps request headers to a session id: header first, then cookie.
#[derive(Debug, Clone)]
pub struct SessionResolver {
    cookie_name: String,
    header_name: HeaderName,
    cookie_max_age_secs: u64,
}

impl SessionResolver {
    pub fn new(config: &SessionConfig) -> Result<Self, ContextError> {
        let header_name = HeaderName::from_bytes(config.header_name.to_lowercase().as_bytes())
            .map_err(|e| {
                ContextError::InvalidInput(format!(
                    "invalid session header name {}: {}",
                    config.header_name, e
                ))
            })?;

        Ok(Self {
            cookie_name: config.cookie_name.clone(),
            header_name,
            cookie_max_age_secs: u64::from(config.cookie_max_age_days) * 24 * 60 * 60,
        })
    }

    pub fn header_name(&self) -> &HeaderName {
        &self.header_name
    }

    pub fn resolve(&self, headers: &HeaderMap) -> Result<ResolvedSession, ContextError> {
        // An explicit header is a client contract, so a malformed one is an error
        if let Some(value) = headers.get(&self.header_name) {
            let raw = value
                .to_str()
                .map_err(|_| ContextError::InvalidInput("session header is not ASCII".to_string()))?;
            if !raw.trim().is_empty() {
                return Ok(ResolvedSession {
                    id: SessionId::parse(raw)?,
                    minted: false,
                });
            }
        }

        if let Some(raw) = self.cookie_value(headers) {
            match SessionId::parse(&raw) {
                Ok(id) => return Ok(ResolvedSession { id, minted: false }),
                Err(e) => warn!("Ignoring unusable session cookie: {}", e),
            }
        }

        let id = SessionId::generate();
        debug!("Issued new session {}", id);
        Ok(ResolvedSession { id, minted: true })
    }

    fn cookie_value(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.cookie_name)
            .map(|(_, value)| value.trim().trim_matches('"').to_string())
    }

    pub fn set_cookie(&self, id: &SessionId) -> Result<HeaderValue, ContextError> {
        HeaderValue::from_str(&format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            self.cookie_name, id, self.cookie_max_age_secs
        ))
        .map_err(|e| ContextError::InvalidInput(format!("invalid session cookie: {}", e)))
    }
}

/// Resolve the session, expose it to handlers as an extension and hand a
/// cookie back when a new id was issued.
pub async fn session_middleware(
    State(resolver): State<Arc<SessionResolver>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let resolved = resolver.resolve(request.headers())?;
    let id = resolved.id.clone();
    request.extensions_mut().insert(resolved.id);

    let mut response = next.run(request).await;

    if resolved.minted {
        let cookie = resolver.set_cookie(&id)?;
        let headers = response.headers_mut();
        headers.append(SET_COOKIE, cookie);
        if let Ok(value) = HeaderValue::from_str(id.as_str()) {
            headers.insert(resolver.header_name().clone(), value);
        }
    }

    Ok(response)
}
