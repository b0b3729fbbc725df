// handlers/protected/auth/whoami.rs - GET /api/auth/whoami handler

use axum::{extract::State, Extension};
use serde::Serialize;

use crate::handlers::current_principal;
use crate::identity::{Principal, Scope};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct WhoamiResponse {
    pub principal: Principal,
    pub scope: Scope,
}

/// GET /api/auth/whoami - The caller as currently stored, with its scope
pub async fn whoami_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<WhoamiResponse> {
    let (principal, scope) = current_principal(&state, &user).await?;
    Ok(ApiResponse::success(WhoamiResponse { principal, scope }))
}
