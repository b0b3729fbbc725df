// handlers/mod.rs - 3-Tier Handler Architecture
//
// Public (no auth) → Protected (JWT auth) → Elevated (Supervisor JWT auth)
pub mod public; // Tier 1: No authentication required (/, /health, /auth/*)
pub mod protected; // Tier 2: JWT authentication required (/api/*)
pub mod elevated; // Tier 3: Supervisor role required (/api/governor/*)

use crate::error::ApiError;
use crate::identity::{Principal, Scope};
use crate::middleware::AuthUser;
use crate::state::AppState;

/// Reload the caller from the store and resolve its current scope.
///
/// Tokens carry only the principal id; ownership is always read fresh so a
/// re-parented or removed principal loses access immediately.
pub(crate) async fn current_principal(state: &AppState, user: &AuthUser) -> Result<(Principal, Scope), ApiError> {
    Ok(state.graph.resolve(user.principal_id).await?)
}
