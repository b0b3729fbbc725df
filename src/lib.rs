pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod gate;
pub mod governor;
pub mod handlers;
pub mod identity;
pub mod middleware;
pub mod state;
pub mod store;

pub use app::app;
pub use state::AppState;
