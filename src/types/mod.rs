//! Shared types for Harbor

mod error;

pub use error::{HarborError, Result};
