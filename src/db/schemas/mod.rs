//! Database schemas for Harbor
//!
//! Defines MongoDB document structures for users and storage entries.

mod metadata;
mod storage;
mod user;

pub use metadata::Metadata;
pub use storage::{NewStorageEntry, StorageEntryDoc, StorageEntrySummary, STORAGE_COLLECTION};
pub use user::{UserDoc, USER_COLLECTION};
