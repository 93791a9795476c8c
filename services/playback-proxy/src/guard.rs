//! Access guard middleware
//!
//! Runs in front of every protected route. Probes the upstream `/me`
//! endpoint with the current access token:
//!
//! - 2xx: token is live, run the handler.
//! - 401: refresh once through the token store (coalesced across concurrent
//!   requests), then run the handler whether or not the refresh succeeded —
//!   a failed refresh leaves the stale token in place and the handler's own
//!   upstream call reports the failure.
//! - anything else (unexpected status, transport error): respond 500 without
//!   running the handler.

use axum::Json;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::{error, info, warn};

use crate::metrics;
use crate::routes::AppState;

pub async fn ensure_valid_access_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let observed = state.tokens.current().await;

    let probe_status = match state.spotify.probe(&observed.token).await {
        Ok(status) => status,
        Err(e) => {
            error!(error = %e, "token probe transport failure");
            metrics::record_upstream_error("probe");
            return validation_failed();
        }
    };

    if probe_status == reqwest::StatusCode::UNAUTHORIZED {
        warn!(
            generation = observed.generation,
            "access token rejected upstream, refreshing"
        );
        match state.tokens.refresh(observed.generation).await {
            Ok(refreshed) => {
                info!(generation = refreshed.generation, "proceeding with refreshed token");
                metrics::record_token_refresh("success");
            }
            Err(e) => {
                // Swallowed: the stale token stays in place and the route's
                // own upstream call surfaces the failure
                error!(error = %e, "token refresh failed, continuing with stale token");
                metrics::record_token_refresh("failure");
            }
        }
        return next.run(request).await;
    }

    if probe_status.is_success() {
        return next.run(request).await;
    }

    error!(status = %probe_status, "token probe returned unexpected status");
    metrics::record_upstream_error("probe");
    validation_failed()
}

fn validation_failed() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"error": "Failed to validate access token"})),
    )
        .into_response()
}
