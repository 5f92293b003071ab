//! HTTP routes for Harbor

pub mod auth_routes;
pub mod health;
pub mod storages;

pub use auth_routes::handle_auth_request;
pub use health::{health_check, readiness_check, version_info};
pub use storages::handle_storages_request;
