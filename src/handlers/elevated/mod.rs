// handlers/elevated/mod.rs - Elevated handlers (Supervisor role required)
//
// Route Prefix: /api/governor/*
// Middleware: jwt_auth_middleware, then a role check in each handler against
// the principal as currently stored
pub mod governor; // Attempt window inspection and reset

pub use governor::*;
