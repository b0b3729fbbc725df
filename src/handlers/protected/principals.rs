// handlers/protected/principals.rs - Scope-checked principal reads

use axum::{
    extract::{Path, State},
    Extension,
};
use uuid::Uuid;

use crate::handlers::current_principal;
use crate::identity::{Principal, PrincipalId, Scope};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

/// GET /api/scope - Principals the caller may act upon
pub async fn scope_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Scope> {
    let (_, scope) = current_principal(&state, &user).await?;
    Ok(ApiResponse::success(scope))
}

/// GET /api/principals/:id - A principal inside the caller's scope
///
/// Anything outside the scope answers 403, whether or not it exists.
pub async fn principal_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Principal> {
    let (_, scope) = current_principal(&state, &user).await?;
    let target = PrincipalId(id);

    scope.permits(target)?;
    let principal = state.store.lookup_principal(target).await?;

    Ok(ApiResponse::success(principal))
}
