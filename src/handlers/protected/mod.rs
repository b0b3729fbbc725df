// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Route Prefix: /api/*
// Middleware: jwt_auth_middleware injects AuthUser
pub mod auth; // Session introspection
pub mod principals; // Scope-checked principal reads

pub use auth::*;
pub use principals::*;
