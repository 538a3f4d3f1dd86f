//! Shared domain types for Leadboard
//!
//! Lead records, their fixed attachment slots, the reconciliation rules for
//! replacing attachments, and the storage traits the API service is built on.

pub mod attachments;
pub mod error;
pub mod ids;
pub mod memory;
pub mod models;
pub mod reconcile;
pub mod store;

pub use attachments::{Attachment, AttachmentSet, FileUpload, FileUploads, Slot, SlotMap};
pub use error::{Error, Result};
pub use ids::{BlobId, LeadId};
pub use memory::{MemoryBlobStore, MemoryLeadStore};
pub use models::{Lead, LeadChanges, LeadDetails, LeadField, LeadStatus};
pub use reconcile::{reconcile, Reconciliation};
pub use store::{Blob, BlobMeta, BlobStore, LeadRepository, ReplaceOutcome};
