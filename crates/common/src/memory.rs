//! In-memory storage backends for development and tests

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::ids::{BlobId, LeadId};
use crate::models::Lead;
use crate::store::{Blob, BlobMeta, BlobStore, LeadRepository, ReplaceOutcome};

/// [`LeadRepository`] kept in a map behind a lock
#[derive(Debug, Default)]
pub struct MemoryLeadStore {
    leads: RwLock<HashMap<LeadId, Lead>>,
    accesses: AtomicUsize,
}

impl MemoryLeadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of repository calls served so far
    pub fn accesses(&self) -> usize {
        self.accesses.load(Ordering::SeqCst)
    }

    fn touch(&self) {
        self.accesses.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl LeadRepository for MemoryLeadStore {
    async fn insert(&self, lead: &Lead) -> Result<()> {
        self.touch();
        let mut leads = self.leads.write().await;
        if leads.contains_key(&lead.id) {
            return Err(Error::storage(format!("Lead already exists: {}", lead.id)));
        }
        leads.insert(lead.id, lead.clone());
        Ok(())
    }

    async fn get(&self, id: &LeadId) -> Result<Option<Lead>> {
        self.touch();
        Ok(self.leads.read().await.get(id).cloned())
    }

    async fn replace(&self, lead: &Lead, expected_version: u64) -> Result<ReplaceOutcome> {
        self.touch();
        let mut leads = self.leads.write().await;
        match leads.get_mut(&lead.id) {
            None => Ok(ReplaceOutcome::NotFound),
            Some(stored) if stored.version != expected_version => Ok(ReplaceOutcome::Conflict {
                found: stored.version,
            }),
            Some(stored) => {
                *stored = lead.clone();
                Ok(ReplaceOutcome::Replaced)
            }
        }
    }

    async fn delete(&self, id: &LeadId) -> Result<bool> {
        self.touch();
        Ok(self.leads.write().await.remove(id).is_some())
    }

    async fn list(&self) -> Result<Vec<Lead>> {
        self.touch();
        let mut leads: Vec<Lead> = self.leads.read().await.values().cloned().collect();
        leads.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(leads)
    }
}

/// [`BlobStore`] kept in memory, with switches to simulate backend failures
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<BlobId, Blob>>,
    puts: AtomicUsize,
    deletes: AtomicUsize,
    fail_puts: AtomicBool,
    fail_deletes: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `put` calls attempted
    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Number of `delete` calls attempted
    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn set_fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub async fn contains(&self, id: &BlobId) -> bool {
        self.blobs.read().await.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, filename: &str, content_type: Option<&str>, data: &[u8]) -> Result<BlobId> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(Error::storage("blob store unavailable"));
        }

        let id = BlobId::new();
        let blob = Blob {
            id,
            meta: BlobMeta {
                filename: filename.to_string(),
                content_type: content_type.map(str::to_string),
                size: data.len() as u64,
                uploaded_at: Utc::now(),
            },
            data: data.to_vec(),
        };
        self.blobs.write().await.insert(id, blob);
        Ok(id)
    }

    async fn get(&self, id: &BlobId) -> Result<Option<Blob>> {
        Ok(self.blobs.read().await.get(id).cloned())
    }

    async fn delete(&self, id: &BlobId) -> Result<bool> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(Error::storage("blob store unavailable"));
        }
        Ok(self.blobs.write().await.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachments::AttachmentSet;
    use crate::models::LeadDetails;

    #[tokio::test]
    async fn test_replace_checks_version() {
        let store = MemoryLeadStore::new();
        let lead = Lead::new(LeadDetails::default(), AttachmentSet::new());
        store.insert(&lead).await.unwrap();

        let next = lead.next_revision();
        assert_eq!(store.replace(&next, 1).await.unwrap(), ReplaceOutcome::Replaced);

        let stale = lead.next_revision();
        assert_eq!(
            store.replace(&stale, 1).await.unwrap(),
            ReplaceOutcome::Conflict { found: 2 }
        );

        let stranger = Lead::new(LeadDetails::default(), AttachmentSet::new());
        assert_eq!(store.replace(&stranger, 1).await.unwrap(), ReplaceOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_duplicate_insert_fails() {
        let store = MemoryLeadStore::new();
        let lead = Lead::new(LeadDetails::default(), AttachmentSet::new());
        store.insert(&lead).await.unwrap();
        assert!(matches!(store.insert(&lead).await, Err(Error::Storage(_))));
    }

    #[tokio::test]
    async fn test_deleting_absent_blob_is_not_an_error() {
        let store = MemoryBlobStore::new();
        let id = store.put("logo.png", Some("image/png"), b"png").await.unwrap();

        assert!(store.delete(&id).await.unwrap());
        assert!(!store.delete(&id).await.unwrap());
        assert!(store.get(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_blob_roundtrip_keeps_metadata() {
        let store = MemoryBlobStore::new();
        let id = store.put("vat.pdf", Some("application/pdf"), b"%PDF").await.unwrap();

        let blob = store.get(&id).await.unwrap().unwrap();
        assert_eq!(blob.meta.filename, "vat.pdf");
        assert_eq!(blob.meta.content_type.as_deref(), Some("application/pdf"));
        assert_eq!(blob.meta.size, 4);
        assert_eq!(blob.data, b"%PDF");
    }
}
