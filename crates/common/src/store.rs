//! Storage seams for lead documents and attachment blobs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::ids::{BlobId, LeadId};
use crate::models::Lead;

/// Outcome of a versioned replace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceOutcome {
    /// The stored version matched and the new document is in place
    Replaced,
    /// No lead with that id exists
    NotFound,
    /// Someone else wrote first
    Conflict { found: u64 },
}

/// Persistence for lead documents.
///
/// Implementations must be `Send + Sync` and safe for concurrent access.
#[async_trait]
pub trait LeadRepository: Send + Sync {
    /// Insert a brand-new lead. Fails if the id is already taken.
    async fn insert(&self, lead: &Lead) -> Result<()>;

    async fn get(&self, id: &LeadId) -> Result<Option<Lead>>;

    /// Replace the stored lead only if its version still equals `expected_version`.
    async fn replace(&self, lead: &Lead, expected_version: u64) -> Result<ReplaceOutcome>;

    /// Delete a lead. Returns `true` if it existed.
    async fn delete(&self, id: &LeadId) -> Result<bool>;

    /// All leads, newest first.
    async fn list(&self) -> Result<Vec<Lead>>;
}

/// Metadata kept next to a stored blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobMeta {
    pub filename: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    pub size: u64,

    pub uploaded_at: DateTime<Utc>,
}

/// A blob read back from the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub id: BlobId,
    pub meta: BlobMeta,
    pub data: Vec<u8>,
}

/// Binary storage for uploaded files
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Durably store `data`, allocating a fresh id for it
    async fn put(&self, filename: &str, content_type: Option<&str>, data: &[u8]) -> Result<BlobId>;

    async fn get(&self, id: &BlobId) -> Result<Option<Blob>>;

    /// Delete a blob. Returns `false` if it was already gone.
    async fn delete(&self, id: &BlobId) -> Result<bool>;
}
