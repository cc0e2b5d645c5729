use axum::{
    extract::{Extension, FromRequest, Query, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::models::{
    ArticleInput, ExportFormat, GroundingItem, ListResponse, MoveDirection, MutationResponse,
    StatsResponse,
};
use crate::services::{ContextBuilder, ContextQuery, ContextStore};
use crate::session::SessionId;
use crate::utils::error::ApiError;

// ===== REQUEST MODELS =====

/// `Json` whose rejection is reported as an `ApiError`.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ContextJson<T>(pub T);

#[derive(Debug, Deserialize)]
pub struct ArticleIdRequest {
    #[serde(default, deserialize_with = "crate::models::article::string_or_number")]
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    #[serde(default, deserialize_with = "crate::models::article::string_or_number")]
    pub id: String,
    pub direction: MoveDirection,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
}

// ===== RESPONSE MODELS =====

#[derive(Debug, Serialize)]
pub struct GroundingResponse {
    pub ok: bool,
    pub sid: String,
    pub items: Vec<GroundingItem>,
    pub prompt: String,
    pub degraded: bool,
}

// ===== MUTATIONS =====

pub async fn track_handler(
    State(store): State<Arc<ContextStore>>,
    Extension(session): Extension<SessionId>,
    ContextJson(article): ContextJson<ArticleInput>,
) -> Result<Json<MutationResponse>, ApiError> {
    let snapshot = store.track(&session, article).await?;
    Ok(Json(snapshot.into()))
}

pub async fn pin_handler(
    State(store): State<Arc<ContextStore>>,
    Extension(session): Extension<SessionId>,
    ContextJson(request): ContextJson<ArticleIdRequest>,
) -> Result<Json<MutationResponse>, ApiError> {
    let snapshot = store.pin(&session, &request.id).await?;
    Ok(Json(snapshot.into()))
}

pub async fn unpin_handler(
    State(store): State<Arc<ContextStore>>,
    Extension(session): Extension<SessionId>,
    ContextJson(request): ContextJson<ArticleIdRequest>,
) -> Result<Json<MutationResponse>, ApiError> {
    let snapshot = store.unpin(&session, &request.id).await?;
    Ok(Json(snapshot.into()))
}

pub async fn move_handler(
    State(store): State<Arc<ContextStore>>,
    Extension(session): Extension<SessionId>,
    ContextJson(request): ContextJson<MoveRequest>,
) -> Result<Json<MutationResponse>, ApiError> {
    let snapshot = store
        .move_pinned(&session, &request.id, request.direction)
        .await?;
    Ok(Json(snapshot.into()))
}

pub async fn clear_all_handler(
    State(store): State<Arc<ContextStore>>,
    Extension(session): Extension<SessionId>,
) -> Result<Json<MutationResponse>, ApiError> {
    info!("Clear-all requested for session {}", session);
    let snapshot = store.clear_all(&session).await?;
    Ok(Json(snapshot.into()))
}

pub async fn clear_tracked_handler(
    State(store): State<Arc<ContextStore>>,
    Extension(session): Extension<SessionId>,
) -> Result<Json<MutationResponse>, ApiError> {
    let snapshot = store.clear_tracked(&session).await?;
    Ok(Json(snapshot.into()))
}

pub async fn search_started_handler(
    State(store): State<Arc<ContextStore>>,
    Extension(session): Extension<SessionId>,
) -> Result<Json<MutationResponse>, ApiError> {
    let snapshot = store.begin_search(&session).await?;
    Ok(Json(snapshot.into()))
}

// ===== READS =====

pub async fn list_handler(
    State(query): State<Arc<ContextQuery>>,
    Extension(session): Extension<SessionId>,
) -> Result<Json<ListResponse>, ApiError> {
    let snapshot = query.tray(&session).await?;
    Ok(Json(ListResponse {
        ok: true,
        sid: session.to_string(),
        items: snapshot.items,
        stats: snapshot.stats,
    }))
}

pub async fn stats_handler(
    State(store): State<Arc<ContextStore>>,
    Extension(session): Extension<SessionId>,
) -> Result<Json<StatsResponse>, ApiError> {
    let stats = store.stats(&session).await?;
    Ok(Json(StatsResponse { ok: true, stats }))
}

/// Never fails on storage errors; chat proceeds with `degraded: true`.
pub async fn grounding_handler(
    State(query): State<Arc<ContextQuery>>,
    State(builder): State<Arc<ContextBuilder>>,
    Extension(session): Extension<SessionId>,
) -> Json<GroundingResponse> {
    let context = builder.build_for_session(&*query, &session).await;
    Json(GroundingResponse {
        ok: true,
        sid: session.to_string(),
        items: context.items,
        prompt: context.prompt,
        degraded: context.degraded,
    })
}

pub async fn export_handler(
    State(store): State<Arc<ContextStore>>,
    Extension(session): Extension<SessionId>,
    Query(params): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let format = params
        .format
        .as_deref()
        .unwrap_or("json")
        .parse::<ExportFormat>()?;

    let payload = store.export(&session, format).await?;
    info!("Exported session {} as {:?}", session, format);

    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, payload.content_type.to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", payload.filename),
            ),
        ],
        payload.body,
    )
        .into_response())
}
