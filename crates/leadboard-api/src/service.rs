//! Lead lifecycle operations
//!
//! Every write that touches attachments follows the same order: store new
//! blobs, persist the lead, then delete the blobs the lead no longer
//! references. Blob deletion is best-effort and never fails the request.

use chrono::{Datelike, Utc};
use leadboard_common::{
    reconcile, Attachment, Blob, BlobId, BlobStore, Error, FileUploads, Lead, LeadChanges,
    LeadDetails, LeadId, LeadRepository, LeadStatus, ReplaceOutcome, Result, SlotMap,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A blob that could not be removed after the owning write succeeded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialCleanupWarning {
    pub blob_id: BlobId,
    pub reason: String,
}

/// Result of a write that may have left blobs to clean up
#[derive(Debug, Clone)]
pub struct WriteReport {
    /// The lead as persisted (or as it was, for deletions)
    pub lead: Lead,

    /// Blobs that were deleted or found already absent
    pub removed_blobs: Vec<BlobId>,

    /// Blobs that could not be deleted
    pub cleanup_warnings: Vec<PartialCleanupWarning>,
}

/// Paging limits applied to list requests
#[derive(Debug, Clone, Copy)]
pub struct PageLimits {
    pub default_limit: u32,
    pub max_limit: u32,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_limit: 50,
            max_limit: 200,
        }
    }
}

/// Parameters for listing leads
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

#[derive(Debug, Clone)]
pub struct LeadPage {
    pub leads: Vec<Lead>,
    pub pagination: Pagination,
}

/// Leads created in one calendar month
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyCount {
    /// Month number, 1 for January; the dashboard chart keys on `_id`
    #[serde(rename = "_id")]
    pub month: u32,
    pub count: u64,
}

/// Lead counts by status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    pub total: u64,
    pub pending: u64,
    pub completed: u64,
    pub ongoing: u64,
}

/// Lead operations over a repository and a blob store
#[derive(Clone)]
pub struct LeadService {
    leads: Arc<dyn LeadRepository>,
    blobs: Arc<dyn BlobStore>,
    limits: PageLimits,
}

impl LeadService {
    pub fn new(leads: Arc<dyn LeadRepository>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            leads,
            blobs,
            limits: PageLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: PageLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> PageLimits {
        self.limits
    }

    /// Create a pending lead from an intake submission
    pub async fn create_lead<'a, I>(&self, scalars: I, files: FileUploads) -> Result<Lead>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let changes = LeadChanges::from_form(scalars)?;

        let mut details = LeadDetails::default();
        let mut status = LeadStatus::Pending;
        changes.apply(&mut details, &mut status);

        let missing = details.missing_required();
        if !missing.is_empty() {
            let names: Vec<&str> = missing.iter().map(|field| field.as_str()).collect();
            return Err(Error::validation(format!(
                "Missing required fields: {}",
                names.join(", ")
            )));
        }

        let staged = self.store_uploads(files).await?;
        let attachments = reconcile(&SlotMap::new(), &staged).next;

        let mut lead = Lead::new(details, attachments);
        lead.status = status;

        // Blobs stored above stay orphaned if this fails; the insert outcome is unknown.
        self.leads.insert(&lead).await?;

        info!(
            "Created lead: {} with {} attachment(s)",
            lead.id,
            lead.attachments.len()
        );
        Ok(lead)
    }

    pub async fn get_lead(&self, id: &str) -> Result<Lead> {
        let id = LeadId::parse(id)?;
        self.load(&id).await
    }

    /// Apply a partial update: merge scalars, swap in uploaded files, and
    /// clean up the blobs they replace.
    pub async fn update_lead<'a, I>(
        &self,
        id: &str,
        scalars: I,
        files: FileUploads,
        expected_version: Option<u64>,
    ) -> Result<WriteReport>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let id = LeadId::parse(id)?;
        let changes = LeadChanges::from_form(scalars)?;

        let current = self.load(&id).await?;
        if let Some(expected) = expected_version {
            if expected != current.version {
                return Err(Error::Conflict {
                    expected,
                    found: current.version,
                });
            }
        }

        let staged = self.store_uploads(files).await?;
        let reconciliation = reconcile(&current.attachments, &staged);

        let mut next = current.next_revision();
        changes.apply(&mut next.details, &mut next.status);
        next.attachments = reconciliation.next;

        if let Err(err) = self.persist(&next, current.version).await {
            // Only discard staged blobs when the write definitely did not happen.
            if matches!(err, Error::NotFound(_) | Error::Conflict { .. }) {
                self.discard_staged(&staged).await;
            }
            return Err(err);
        }

        let (removed_blobs, cleanup_warnings) = self.purge_blobs(&reconciliation.obsolete).await;

        info!(
            "Updated lead: {} to version {} ({} field(s), {} file(s), {} blob(s) retired)",
            next.id,
            next.version,
            changes.fields.len(),
            staged.len(),
            reconciliation.obsolete.len()
        );

        Ok(WriteReport {
            lead: next,
            removed_blobs,
            cleanup_warnings,
        })
    }

    /// Set a lead's status without touching its attachments
    pub async fn set_status(&self, id: &str, status: LeadStatus) -> Result<Lead> {
        let id = LeadId::parse(id)?;
        let current = self.load(&id).await?;

        let mut next = current.next_revision();
        next.status = status;
        self.persist(&next, current.version).await?;

        info!("Lead {} status: {} -> {}", id, current.status, status);
        Ok(next)
    }

    /// Delete a lead and every blob it owns
    pub async fn delete_lead(&self, id: &str) -> Result<WriteReport> {
        let id = LeadId::parse(id)?;
        let lead = self.load(&id).await?;

        // The record goes first so it can never point at a deleted blob.
        if !self.leads.delete(&id).await? {
            return Err(Error::not_found(format!("Lead not found: {}", id)));
        }

        let (removed_blobs, cleanup_warnings) =
            self.purge_blobs(&lead.attachments.blob_ids()).await;

        info!("Deleted lead: {} ({} blob(s))", id, removed_blobs.len());

        Ok(WriteReport {
            lead,
            removed_blobs,
            cleanup_warnings,
        })
    }

    /// Page through leads, newest first, optionally filtered by a search term
    pub async fn list_leads(&self, query: ListQuery) -> Result<LeadPage> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query
            .limit
            .unwrap_or(self.limits.default_limit)
            .clamp(1, self.limits.max_limit);

        let mut leads = self.leads.list().await?;

        if let Some(search) = query.search.as_deref().map(str::trim) {
            if !search.is_empty() {
                leads.retain(|lead| lead.details.matches_search(search));
            }
        }

        let total = leads.len() as u64;
        let total_pages = total.div_ceil(u64::from(limit));
        let skip = (page as usize - 1).saturating_mul(limit as usize);

        let leads: Vec<Lead> = leads.into_iter().skip(skip).take(limit as usize).collect();

        debug!(
            "Listed {} of {} lead(s) (page {}, limit {})",
            leads.len(),
            total,
            page,
            limit
        );

        Ok(LeadPage {
            leads,
            pagination: Pagination {
                page,
                limit,
                total,
                total_pages,
            },
        })
    }

    /// Leads created per month of `year` (UTC), January first
    pub async fn monthly_counts(&self, year: i32) -> Result<Vec<MonthlyCount>> {
        let mut counts = [0u64; 12];
        for lead in self.leads.list().await? {
            if lead.created_at.year() == year {
                counts[lead.created_at.month0() as usize] += 1;
            }
        }

        Ok(counts
            .iter()
            .enumerate()
            .map(|(index, count)| MonthlyCount {
                month: index as u32 + 1,
                count: *count,
            })
            .collect())
    }

    /// The `limit` most recently created leads, newest first
    pub async fn recent_leads(&self, limit: usize) -> Result<Vec<Lead>> {
        let mut leads = self.leads.list().await?;
        leads.truncate(limit);
        Ok(leads)
    }

    pub async fn status_summary(&self) -> Result<StatusSummary> {
        let mut summary = StatusSummary::default();
        for lead in self.leads.list().await? {
            summary.total += 1;
            match lead.status {
                LeadStatus::Pending => summary.pending += 1,
                LeadStatus::Completed => summary.completed += 1,
                LeadStatus::Ongoing => summary.ongoing += 1,
            }
        }
        Ok(summary)
    }

    /// Fetch a stored attachment for viewing or download
    pub async fn get_blob(&self, id: &str) -> Result<Blob> {
        let id = BlobId::parse(id)?;
        self.blobs
            .get(&id)
            .await?
            .ok_or_else(|| Error::not_found(format!("File not found: {}", id)))
    }

    pub fn current_year() -> i32 {
        Utc::now().year()
    }

    async fn load(&self, id: &LeadId) -> Result<Lead> {
        self.leads
            .get(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Lead not found: {}", id)))
    }

    async fn persist(&self, next: &Lead, expected_version: u64) -> Result<()> {
        match self.leads.replace(next, expected_version).await? {
            ReplaceOutcome::Replaced => Ok(()),
            ReplaceOutcome::NotFound => Err(Error::not_found(format!("Lead not found: {}", next.id))),
            ReplaceOutcome::Conflict { found } => Err(Error::Conflict {
                expected: expected_version,
                found,
            }),
        }
    }

    /// Write every upload to the blob store. If one fails, the ones already
    /// written are discarded and the error is returned.
    async fn store_uploads(&self, files: FileUploads) -> Result<SlotMap<Attachment>> {
        let mut staged = SlotMap::new();

        for (slot, upload) in files.into_entries() {
            let stored = self
                .blobs
                .put(&upload.filename, upload.content_type.as_deref(), &upload.data)
                .await;

            match stored {
                Ok(blob_id) => {
                    debug!("Stored {} upload {} as blob {}", slot, upload.filename, blob_id);
                    staged.insert(
                        slot,
                        Attachment {
                            slot,
                            filename: upload.filename,
                            blob_id,
                            content_type: upload.content_type,
                            size: upload.data.len() as u64,
                        },
                    );
                }
                Err(err) => {
                    warn!("Failed to store {} upload: {}", slot, err);
                    self.discard_staged(&staged).await;
                    return Err(match err {
                        Error::Storage(_) => err,
                        other => Error::storage(other),
                    });
                }
            }
        }

        Ok(staged)
    }

    async fn discard_staged(&self, staged: &SlotMap<Attachment>) {
        let ids: Vec<BlobId> = staged.iter().map(|(_, a)| a.blob_id).collect();
        if ids.is_empty() {
            return;
        }
        let (_, warnings) = self.purge_blobs(&ids).await;
        if warnings.is_empty() {
            debug!("Discarded {} staged blob(s)", ids.len());
        }
    }

    /// Best-effort deletion. A blob that is already gone counts as removed.
    async fn purge_blobs(&self, ids: &[BlobId]) -> (Vec<BlobId>, Vec<PartialCleanupWarning>) {
        let mut removed = Vec::new();
        let mut warnings = Vec::new();

        for id in ids {
            match self.blobs.delete(id).await {
                Ok(true) => removed.push(*id),
                Ok(false) => {
                    debug!("Blob {} was already deleted", id);
                    removed.push(*id);
                }
                Err(err) => {
                    warn!("Failed to delete blob {}: {}", id, err);
                    warnings.push(PartialCleanupWarning {
                        blob_id: *id,
                        reason: err.to_string(),
                    });
                }
            }
        }

        (removed, warnings)
    }
}
