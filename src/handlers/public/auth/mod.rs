// handlers/public/auth/mod.rs - Public authentication handlers
//
// Token acquisition. Every attempt passes through the login gate.
pub mod login; // POST /auth/login - authenticate and get JWT

pub use login::login_post;
