//! Storage registry
//!
//! Owns all reads and writes to the storages collection and enforces
//! ownership-scoped access: a user only ever sees entries they own.
//!
//! Constructed once at startup with the typed collection handle and shared
//! across requests; each operation is a single persistence call.

use bson::{doc, oid::ObjectId};
use tracing::info;

use crate::auth::AuthUser;
use crate::db::schemas::{NewStorageEntry, StorageEntryDoc, StorageEntrySummary};
use crate::db::MongoCollection;
use crate::types::HarborError;

/// Upper bound on listing results. Listings past this bound are truncated;
/// callers must not assume completeness beyond it.
pub const LIST_LIMIT: i64 = 1000;

/// Ownership-scoped access to the storage entry collection
pub struct StorageRegistry {
    storages: MongoCollection<StorageEntryDoc>,
    endpoint_prefix: String,
}

impl StorageRegistry {
    /// Create a registry over the given collection.
    ///
    /// `endpoint_prefix` is the configured bucket prefix that default
    /// entries are derived from.
    pub fn new(
        storages: MongoCollection<StorageEntryDoc>,
        endpoint_prefix: impl Into<String>,
    ) -> Self {
        Self {
            storages,
            endpoint_prefix: endpoint_prefix.into(),
        }
    }

    /// Create the default entry for a freshly provisioned user.
    ///
    /// The endpoint URL is `<prefix>/<user id>/` with exactly one separator
    /// at the join and one trailing separator. Persistence failures
    /// propagate to the caller.
    pub async fn create_default_entry(&self, user: &AuthUser) -> Result<(), HarborError> {
        let endpoint_url = join_endpoint_url(&self.endpoint_prefix, &user.id.to_string());
        let entry = StorageEntryDoc::new("default".into(), user.id, endpoint_url.clone(), false);

        self.storages.insert_one(entry).await?;
        info!("Created default storage endpoint at {}", endpoint_url);

        Ok(())
    }

    /// Register a caller-supplied entry and return its new identifier.
    ///
    /// Ownership always comes from the authenticated identity; the payload
    /// carries no owner field. Nothing is persisted if validation fails.
    pub async fn add_entry(
        &self,
        payload: NewStorageEntry,
        user: &AuthUser,
    ) -> Result<ObjectId, HarborError> {
        validate_payload(&payload)?;

        let entry = StorageEntryDoc::new(
            payload.title,
            user.id,
            payload.endpoint_url,
            payload.is_public.unwrap_or(false),
        );

        let id = self.storages.insert_one(entry).await?;
        info!("Registered storage entry {} for user {}", id.to_hex(), user.id);

        Ok(id)
    }

    /// List the caller's entries, in the collection's natural order.
    ///
    /// At most [`LIST_LIMIT`] entries are returned.
    pub async fn list_entries(
        &self,
        user: &AuthUser,
    ) -> Result<Vec<StorageEntrySummary>, HarborError> {
        let docs = self
            .storages
            .find_many(doc! { "owner": user.id.to_string() }, LIST_LIMIT)
            .await?;

        docs.iter()
            .map(|doc| {
                doc.summary()
                    .ok_or_else(|| HarborError::Database("Stored entry missing _id".into()))
            })
            .collect()
    }

    /// Fetch one entry by identifier, scoped to the caller.
    ///
    /// Lookup is a single filtered query on both id and owner: an entry
    /// owned by another user is indistinguishable from a missing one.
    /// A string that cannot be an entry id at all fails with
    /// [`HarborError::InvalidIdentifier`], distinct from an absent result.
    pub async fn get_entry(
        &self,
        id: &str,
        user: &AuthUser,
    ) -> Result<Option<StorageEntrySummary>, HarborError> {
        let oid = parse_entry_id(id)?;

        let doc = self
            .storages
            .find_one(doc! { "_id": oid, "owner": user.id.to_string() })
            .await?;

        match doc {
            Some(entry) => entry
                .summary()
                .map(Some)
                .ok_or_else(|| HarborError::Database("Stored entry missing _id".into())),
            None => Ok(None),
        }
    }
}

/// Parse a caller-supplied entry identifier.
///
/// A string that is not syntactically an ObjectId fails with
/// `InvalidIdentifier` before any lookup happens.
fn parse_entry_id(id: &str) -> Result<ObjectId, HarborError> {
    ObjectId::parse_str(id)
        .map_err(|_| HarborError::InvalidIdentifier(format!("'{}' is not a valid entry id", id)))
}

/// Validate a caller-supplied entry payload
fn validate_payload(payload: &NewStorageEntry) -> Result<(), HarborError> {
    if payload.title.is_empty() {
        return Err(HarborError::Validation(
            "title must be a non-empty string".into(),
        ));
    }

    if payload.endpoint_url.is_empty() {
        return Err(HarborError::Validation(
            "endpoint_url must be a non-empty string".into(),
        ));
    }

    Ok(())
}

/// Join the configured prefix and a user id into a default endpoint URL,
/// normalizing so exactly one separator appears at the join and one
/// trailing separator is present.
fn join_endpoint_url(prefix: &str, user_id: &str) -> String {
    format!(
        "{}/{}/",
        prefix.trim_end_matches('/'),
        user_id.trim_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_endpoint_url() {
        assert_eq!(join_endpoint_url("s3://bucket", "u1"), "s3://bucket/u1/");
    }

    #[test]
    fn test_join_endpoint_url_normalizes_separators() {
        // A trailing separator on the prefix must not double up
        assert_eq!(join_endpoint_url("s3://bucket/", "u1"), "s3://bucket/u1/");
        assert_eq!(join_endpoint_url("s3://bucket//", "u1"), "s3://bucket/u1/");
    }

    #[test]
    fn test_join_endpoint_url_with_nested_prefix() {
        assert_eq!(
            join_endpoint_url("s3://bucket/tenants", "u1"),
            "s3://bucket/tenants/u1/"
        );
    }

    #[test]
    fn test_validate_rejects_empty_title() {
        let payload = NewStorageEntry {
            title: "".into(),
            endpoint_url: "s3://b/docs/".into(),
            is_public: None,
        };
        let err = validate_payload(&payload).unwrap_err();
        assert!(matches!(err, HarborError::Validation(_)));
    }

    #[test]
    fn test_validate_rejects_empty_endpoint_url() {
        let payload = NewStorageEntry {
            title: "docs".into(),
            endpoint_url: "".into(),
            is_public: None,
        };
        let err = validate_payload(&payload).unwrap_err();
        assert!(matches!(err, HarborError::Validation(_)));
    }

    #[test]
    fn test_parse_entry_id_accepts_object_id_hex() {
        let oid = ObjectId::new();
        assert_eq!(parse_entry_id(&oid.to_hex()).unwrap(), oid);
    }

    #[test]
    fn test_malformed_id_is_an_error_not_absent() {
        // A garbage id is InvalidIdentifier, never an empty result
        let err = parse_entry_id("not-a-valid-id").unwrap_err();
        assert!(matches!(err, HarborError::InvalidIdentifier(_)));
    }

    #[test]
    fn test_validate_accepts_minimal_payload() {
        let payload = NewStorageEntry {
            title: "docs".into(),
            endpoint_url: "s3://b/docs/".into(),
            is_public: None,
        };
        assert!(validate_payload(&payload).is_ok());
    }
}
