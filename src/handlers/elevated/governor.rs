// handlers/elevated/governor.rs - Attempt window administration

use axum::{
    extract::{Path, State},
    Extension,
};
use serde::Serialize;

use crate::error::ApiError;
use crate::governor::{ClientIdentity, WindowStatus};
use crate::handlers::current_principal;
use crate::identity::{Principal, Role};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub identity: String,
    pub cleared: bool,
}

async fn require_supervisor(state: &AppState, user: &AuthUser) -> Result<Principal, ApiError> {
    let (principal, _) = current_principal(state, user).await?;
    if principal.role != Role::Supervisor {
        tracing::warn!(principal = %principal.id, "Governor administration refused for non-supervisor");
        return Err(ApiError::forbidden("Supervisor access required"));
    }
    Ok(principal)
}

/// GET /api/governor/:identity - Current attempt window for a client identity
pub async fn window_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(identity): Path<String>,
) -> ApiResult<WindowStatus> {
    require_supervisor(&state, &user).await?;

    let identity = ClientIdentity::new(identity);
    state
        .governor
        .window(&identity)
        .map(ApiResponse::success)
        .ok_or_else(|| ApiError::not_found("No open attempt window for this identity"))
}

/// DELETE /api/governor/:identity - Clear a client identity's attempt window
pub async fn window_delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(identity): Path<String>,
) -> ApiResult<ResetResponse> {
    let supervisor = require_supervisor(&state, &user).await?;

    let identity = ClientIdentity::new(identity);
    let cleared = state.governor.reset(&identity);
    tracing::info!(
        supervisor = %supervisor.id,
        client = %identity.fingerprint(),
        cleared,
        "Attempt window reset"
    );

    Ok(ApiResponse::success(ResetResponse {
        identity: identity.as_str().to_string(),
        cleared,
    }))
}
