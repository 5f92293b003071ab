//! HTTP server for Harbor

pub mod http;

pub use http::{run, AppState};
