//! Storage entry document schema
//!
//! One entry describes a named external object-storage location (a
//! bucket/prefix path) owned by exactly one user. Entries are created and
//! read; there is no update or delete.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for storage entries
pub const STORAGE_COLLECTION: &str = "storages";

/// Storage entry document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct StorageEntryDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Human-readable label
    pub title: String,

    /// Owning user's id. Set by the server from the authenticated identity,
    /// never from client input.
    pub owner: Uuid,

    /// Location of the external storage resource (e.g. "s3://bucket/prefix/")
    pub endpoint_url: String,

    /// Visibility flag; entries are private unless marked public
    #[serde(default)]
    pub is_public: bool,
}

impl StorageEntryDoc {
    /// Create a new storage entry document
    pub fn new(title: String, owner: Uuid, endpoint_url: String, is_public: bool) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            title,
            owner,
            endpoint_url,
            is_public,
        }
    }

    /// Owner-facing projection: id, title and endpoint_url only.
    /// Returns None if the document has no id (never inserted).
    pub fn summary(&self) -> Option<StorageEntrySummary> {
        self._id.map(|oid| StorageEntrySummary {
            id: oid.to_hex(),
            title: self.title.clone(),
            endpoint_url: self.endpoint_url.clone(),
        })
    }
}

impl IntoIndexes for StorageEntryDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Every read is owner-filtered
            (
                doc! { "owner": 1 },
                Some(
                    IndexOptions::builder()
                        .name("owner_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for StorageEntryDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

/// Caller-supplied payload for registering a new entry.
///
/// There is deliberately no owner field: unknown JSON keys (including a
/// client-supplied "owner" or "user") are dropped at deserialization, and
/// ownership always comes from the authenticated identity.
#[derive(Debug, Clone, Deserialize)]
pub struct NewStorageEntry {
    pub title: String,
    pub endpoint_url: String,
    #[serde(default)]
    pub is_public: Option<bool>,
}

/// Projected record returned by list/get: owner and visibility are stripped
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StorageEntrySummary {
    pub id: String,
    pub title: String,
    pub endpoint_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_ignores_client_owner() {
        // A payload smuggling owner/user keys deserializes identically to
        // one without them
        let raw = r#"{"title":"docs","endpoint_url":"s3://b/docs/","owner":"attacker","user":"someone-else"}"#;
        let payload: NewStorageEntry = serde_json::from_str(raw).unwrap();
        assert_eq!(payload.title, "docs");
        assert_eq!(payload.endpoint_url, "s3://b/docs/");
        assert_eq!(payload.is_public, None);
    }

    #[test]
    fn test_payload_visibility_optional() {
        let payload: NewStorageEntry =
            serde_json::from_str(r#"{"title":"t","endpoint_url":"s3://b/"}"#).unwrap();
        assert_eq!(payload.is_public, None);

        let payload: NewStorageEntry =
            serde_json::from_str(r#"{"title":"t","endpoint_url":"s3://b/","is_public":true}"#)
                .unwrap();
        assert_eq!(payload.is_public, Some(true));
    }

    #[test]
    fn test_summary_projection_strips_owner_and_visibility() {
        let owner = Uuid::new_v4();
        let mut doc = StorageEntryDoc::new("docs".into(), owner, "s3://b/docs/".into(), true);
        doc._id = Some(ObjectId::new());

        let summary = doc.summary().unwrap();
        assert_eq!(summary.title, "docs");
        assert_eq!(summary.endpoint_url, "s3://b/docs/");

        let json = serde_json::to_value(&summary).unwrap();
        assert!(json.get("owner").is_none());
        assert!(json.get("is_public").is_none());
        assert_eq!(json["id"], doc._id.unwrap().to_hex());
    }

    #[test]
    fn test_summary_requires_id() {
        let doc = StorageEntryDoc::new("docs".into(), Uuid::new_v4(), "s3://b/".into(), false);
        assert!(doc.summary().is_none());
    }

    #[test]
    fn test_entry_defaults_to_private() {
        let raw = r#"{"title":"t","owner":"6b29fc40-ca47-1067-b31d-00dd010662da","endpoint_url":"s3://b/"}"#;
        let doc: StorageEntryDoc = serde_json::from_str(raw).unwrap();
        assert!(!doc.is_public);
    }
}
