use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::{
    cors::CorsLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::handlers;
use crate::session::session_middleware;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let request_timeout = Duration::from_secs(state.settings.server.request_timeout_seconds.max(1));

    // Public routes (no session)
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/health/ready", get(handlers::health::readiness_check));

    // Session-scoped context routes
    let context_routes = Router::new()
        .route("/api/context", get(handlers::context::list_handler))
        .route("/api/context/stats", get(handlers::context::stats_handler))
        .route("/api/context/grounding", get(handlers::context::grounding_handler))
        .route("/api/context/export", get(handlers::context::export_handler))
        .route("/api/context/track", post(handlers::context::track_handler))
        .route("/api/context/pin", post(handlers::context::pin_handler))
        .route("/api/context/unpin", post(handlers::context::unpin_handler))
        .route("/api/context/move", post(handlers::context::move_handler))
        .route("/api/context/clear", post(handlers::context::clear_all_handler))
        .route(
            "/api/context/clear-tracked",
            post(handlers::context::clear_tracked_handler),
        )
        .route("/api/context/search", post(handlers::context::search_started_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(context_routes)
        .with_state(state)
        // CORS
        .layer(CorsLayer::permissive())
        // Tracing
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
}
