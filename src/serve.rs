//! HTTP boundary for impact analysis
//!
//! `POST /analysis/impact` runs one analysis; `GET /health` is a liveness
//! probe. Every request owns its cancellation token, so a dropped
//! connection abandons its graph queries.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::impact::{AnalysisError, ImpactAnalyzer};
use crate::request::{ErrorBody, ImpactRequest, RequestLimits};

/// Envelope allowance on top of the diff limit
const BODY_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Shared, read-only server state
pub struct AppState {
    pub analyzer: ImpactAnalyzer,
    pub limits: RequestLimits,
}

/// Build the router. Exposed for in-process tests.
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.limits.max_diff_bytes.saturating_add(BODY_OVERHEAD_BYTES);
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(body_limit));

    Router::new()
        .route("/analysis/impact", post(handle_impact))
        .route("/health", get(handle_health))
        .layer(middleware)
        .with_state(state)
}

/// True for loopback addresses the server may bind without opt-in
pub fn is_localhost(bind: &str) -> bool {
    matches!(bind, "127.0.0.1" | "localhost" | "::1")
}

/// Serve until Ctrl-C
pub async fn serve_http(state: Arc<AppState>, bind: &str, port: u16) -> std::io::Result<()> {
    let addr = format!("{bind}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "HTTP server listening");
    eprintln!("testradar listening on http://{addr}");

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        eprintln!("\nShutting down HTTP server...");
    };
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

fn error_response(err: &AnalysisError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorBody::from(err))).into_response()
}

/// Handle POST /analysis/impact
async fn handle_impact(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ImpactRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            let err = AnalysisError::InvalidRequest(rejection.body_text());
            tracing::warn!(error = %err, "Rejected malformed request");
            return error_response(&err);
        }
    };

    let (change_set, related_tests) = match request.into_change_set(&state.limits) {
        Ok(parts) => parts,
        Err(err) => {
            tracing::warn!(error = %err, "Rejected invalid request");
            return error_response(&err);
        }
    };

    // Dropping the handler (client gone) cancels the analysis
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    match state
        .analyzer
        .analyze(&change_set, &related_tests, &cancel)
        .await
    {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(err) => {
            tracing::error!(error = %err, code = err.error_code(), "Impact analysis failed");
            error_response(&err)
        }
    }
}

/// Handle GET /health
async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
