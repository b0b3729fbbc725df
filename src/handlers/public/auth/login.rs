// handlers/public/auth/login.rs - POST /auth/login handler

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::error::ApiError;
use crate::identity::{Principal, Scope};
use crate::middleware::{client_identity, ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub secret: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: u64,
    pub principal: Principal,
    pub scope: Scope,
}

/// POST /auth/login - Authenticate a principal and receive a JWT token
///
/// Expected Input:
/// ```json
/// { "identifier": "head@clinic.example", "secret": "..." }
/// ```
///
/// Expected Output (Success):
/// ```json
/// {
///   "success": true,
///   "data": {
///     "token": "eyJhbGciOiJIUzI1NiI...",
///     "expires_in": 604800,
///     "principal": { "id": "...", "identifier": "...", "role": "SUPERVISOR" },
///     "scope": { "principal": "...", "members": ["..."] }
///   }
/// }
/// ```
///
/// Errors: 400 malformed body, 401 invalid credentials, 403 broken ownership
/// graph, 429 with `Retry-After` once the attempt window is exhausted, 503
/// when the credential store is down.
pub async fn login_post(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<LoginResponse> {
    let Json(request) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;

    if request.identifier.trim().is_empty() || request.secret.is_empty() {
        return Err(ApiError::bad_request("identifier and secret are required"));
    }

    let client = client_identity(
        state.key_policy,
        &headers,
        peer.map(|ConnectInfo(addr)| addr),
        &request.identifier,
    );

    let authenticated = state
        .gate
        .authenticate(&client, &request.identifier, &request.secret)
        .await?;

    let issued = state.tokens.issue(&authenticated.principal)?;

    Ok(ApiResponse::success(LoginResponse {
        token: issued.token,
        expires_in: issued.expires_in,
        principal: authenticated.principal,
        scope: authenticated.scope,
    }))
}
