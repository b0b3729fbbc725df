// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Security Level: None
// Route Prefix: No /api prefix (/, /health, /auth/*)
pub mod auth;

pub use auth::*;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET / - Service description
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "caregate",
            "version": version,
            "description": "Login gate with attempt governor and supervisor/professional/patient scopes",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "login": "/auth/login (public - token acquisition, rate limited)",
                "whoami": "/api/auth/whoami (protected)",
                "scope": "/api/scope (protected)",
                "principals": "/api/principals/:id (protected, scope checked)",
                "governor": "/api/governor/:identity (supervisors only)",
            }
        }
    }))
}

/// GET /health - Store reachability and governor load
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();
    let tracked = state.governor.tracked_identities();

    match state.store.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "store": "ok",
                    "tracked_identities": tracked
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "store unavailable",
                    "code": "SERVICE_UNAVAILABLE",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "tracked_identities": tracked
                    }
                })),
            )
        }
    }
}
