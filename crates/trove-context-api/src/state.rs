use axum::extract::FromRef;
use std::sync::Arc;

use crate::config::Settings;
use crate::database::DbPool;
use crate::services::{ContextBuilder, ContextQuery, ContextStore};
use crate::session::SessionResolver;
use crate::utils::error::ContextError;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub store: Arc<ContextStore>,
    pub query: Arc<ContextQuery>,
    pub context_builder: Arc<ContextBuilder>,
    pub session_resolver: Arc<SessionResolver>,
    pub settings: Settings,
}

impl AppState {
    pub async fn new(settings: Settings, db_pool: DbPool) -> Result<Self, ContextError> {
        let store = Arc::new(ContextStore::open(db_pool.clone(), settings.context.clone()).await?);
        let query = Arc::new(ContextQuery::new(store.clone()));
        let context_builder = Arc::new(ContextBuilder::new(settings.context.grounding_max_tokens));
        let session_resolver = Arc::new(SessionResolver::new(&settings.session)?);

        Ok(Self {
            db_pool,
            store,
            query,
            context_builder,
            session_resolver,
            settings,
        })
    }
}

impl FromRef<AppState> for Arc<ContextStore> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Arc<ContextQuery> {
    fn from_ref(state: &AppState) -> Self {
        state.query.clone()
    }
}

impl FromRef<AppState> for Arc<ContextBuilder> {
    fn from_ref(state: &AppState) -> Self {
        state.context_builder.clone()
    }
}

impl FromRef<AppState> for Arc<SessionResolver> {
    fn from_ref(state: &AppState) -> Self {
        state.session_resolver.clone()
    }
}

impl FromRef<AppState> for DbPool {
    fn from_ref(state: &AppState) -> Self {
        state.db_pool.clone()
    }
}
