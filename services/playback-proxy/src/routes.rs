//! Router assembly and route handlers
//!
//! Four thin protected handlers (one upstream call each), the public home /
//! health / metrics routes, and the middleware stack: access guard on the
//! protected subtree, then body limit, security headers, permissive CORS,
//! request accounting, and a concurrency limit over everything.

use axum::extract::{DefaultBodyLimit, Query, Request, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::error;

use spotify_auth::TokenStore;

use crate::config::BODY_LIMIT_BYTES;
use crate::guard;
use crate::metrics::{self, ServiceMetrics};
use crate::spotify::SpotifyApi;

/// Upstream page size for the top-tracks route
const TOP_TRACKS_LIMIT: usize = 10;

/// Shared application state accessible from all handlers
#[derive(Clone)]
pub struct AppState {
    pub spotify: SpotifyApi,
    pub tokens: Arc<TokenStore>,
    pub metrics: ServiceMetrics,
    pub prometheus: PrometheusHandle,
}

/// Build the axum router with all routes, the access guard on the protected
/// subtree, and the shared middleware stack.
pub fn build_router(state: AppState, max_connections: usize) -> Router {
    let protected = Router::new()
        .route("/spotify/top-tracks", get(top_tracks_handler))
        .route("/spotify/currently-playing", get(currently_playing_handler))
        .route("/spotify/pause", get(pause_handler))
        .route("/spotify/play", get(play_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            guard::ensure_valid_access_token,
        ));

    Router::new()
        .route("/", get(home_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .merge(protected)
        .layer(middleware::from_fn_with_state(state.clone(), track_requests))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=15552000; includeSubDomains"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(CorsLayer::permissive())
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

/// Request accounting: in-process atomics for /health plus Prometheus
/// counter and duration histogram per completed request.
async fn track_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let start = Instant::now();
    state.metrics.requests_total.fetch_add(1, Ordering::Relaxed);

    let response = next.run(request).await;

    if response.status().is_server_error() {
        state.metrics.errors_total.fetch_add(1, Ordering::Relaxed);
    }
    metrics::record_request(
        response.status().as_u16(),
        method.as_str(),
        start.elapsed().as_secs_f64(),
    );
    response
}

async fn home_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "Hello app" }))
}

/// Health endpoint: uptime and request counters. Always 200 — the service
/// has no degraded mode; upstream trouble shows per-request.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = state.metrics.started_at.elapsed().as_secs();
    let requests = state.metrics.requests_total.load(Ordering::Relaxed);
    let errors = state.metrics.errors_total.load(Ordering::Relaxed);

    Json(serde_json::json!({
        "status": "healthy",
        "uptime_seconds": uptime,
        "requests_served": requests,
        "errors_total": errors,
    }))
}

/// Prometheus metrics endpoint — text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}

async fn top_tracks_handler(State(state): State<AppState>) -> Response {
    let token = state.tokens.current().await;
    match state.spotify.top_tracks(&token.token, TOP_TRACKS_LIMIT).await {
        Ok(tracks) => Json(tracks).into_response(),
        Err(e) => {
            error!(error = %e, "failed to fetch top tracks");
            metrics::record_upstream_error("top_tracks");
            (StatusCode::INTERNAL_SERVER_ERROR, "Error fetching top tracks").into_response()
        }
    }
}

async fn currently_playing_handler(State(state): State<AppState>) -> Response {
    let token = state.tokens.current().await;
    match state.spotify.currently_playing(&token.token).await {
        // None serializes to a bare `null`, matching "nothing playing"
        Ok(track) => Json(track).into_response(),
        Err(e) => {
            error!(error = %e, "failed to fetch currently playing track");
            metrics::record_upstream_error("currently_playing");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error fetching currently playing song",
            )
                .into_response()
        }
    }
}

async fn pause_handler(State(state): State<AppState>) -> Response {
    let token = state.tokens.current().await;
    match state.spotify.pause(&token.token).await {
        Ok(()) => (StatusCode::OK, "Playback paused successfully!").into_response(),
        Err(e) => {
            error!(error = %e, "failed to pause playback");
            metrics::record_upstream_error("pause");
            (StatusCode::INTERNAL_SERVER_ERROR, "Error pausing playback").into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct PlayParams {
    uri: Option<String>,
}

async fn play_handler(
    State(state): State<AppState>,
    Query(params): Query<PlayParams>,
) -> Response {
    let Some(uri) = params.uri else {
        return (StatusCode::BAD_REQUEST, "Missing track URI").into_response();
    };

    let token = state.tokens.current().await;
    match state.spotify.play(&token.token, &uri).await {
        Ok(()) => (StatusCode::OK, format!("Playback started for {uri}")).into_response(),
        Err(e) => {
            error!(error = %e, uri, "failed to start playback");
            metrics::record_upstream_error("play");
            (StatusCode::INTERNAL_SERVER_ERROR, "Error starting playback").into_response()
        }
    }
}
