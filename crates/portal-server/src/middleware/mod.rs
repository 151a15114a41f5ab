//! Middleware for the portal server.

pub mod auth;
pub mod timing;

pub use auth::{require_admin, require_plugin};
pub use timing::timing_layer;
