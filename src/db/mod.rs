//! Database layer for Harbor
//!
//! MongoDB client wrapper and typed document schemas.

pub mod mongo;
pub mod schemas;

pub use mongo::{IntoIndexes, MongoClient, MongoCollection, MutMetadata};
