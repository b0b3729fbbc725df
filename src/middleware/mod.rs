pub mod auth;
pub mod client_identity;
pub mod response;

pub use auth::{jwt_auth_middleware, AuthUser};
pub use client_identity::client_identity;
pub use response::{ApiResponse, ApiResult};
