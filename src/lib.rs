//! Harbor - per-user registry of named object-storage endpoints
//!
//! Harbor lets an authenticated user list their registered storage
//! endpoints, fetch one by identifier, and register new ones. A default
//! entry is provisioned automatically when an account is created.
//!
//! ## Services
//!
//! - **Registry**: ownership-scoped create/list/get over the storages collection
//! - **Auth**: JWT-based authentication with Argon2 password hashing
//! - **Ops**: health/readiness probes and build version reporting

pub mod auth;
pub mod config;
pub mod db;
pub mod registry;
pub mod routes;
pub mod server;
pub mod types;

pub use config::Args;
pub use registry::StorageRegistry;
pub use server::{run, AppState};
pub use types::{HarborError, Result};
