//! The four fixed attachment slots of a lead

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::BlobId;

/// One of the fixed attachment categories a lead can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Slot {
    CompanyLogo,
    ClientLogo,
    VatCertificate,
    TradeLicense,
}

impl Slot {
    pub const ALL: [Slot; 4] = [
        Slot::CompanyLogo,
        Slot::ClientLogo,
        Slot::VatCertificate,
        Slot::TradeLicense,
    ];

    /// Canonical wire name
    pub fn as_str(self) -> &'static str {
        match self {
            Slot::CompanyLogo => "companyLogo",
            Slot::ClientLogo => "clientLogo",
            Slot::VatCertificate => "vatCertificate",
            Slot::TradeLicense => "tradeLicense",
        }
    }

    /// Resolve a multipart field name to a slot.
    ///
    /// The edit form names its logo inputs `logoCompany`/`logoClient`, so those
    /// are accepted next to the canonical names.
    pub fn from_form_name(name: &str) -> Option<Slot> {
        match name {
            "companyLogo" | "logoCompany" => Some(Slot::CompanyLogo),
            "clientLogo" | "logoClient" => Some(Slot::ClientLogo),
            "vatCertificate" => Some(Slot::VatCertificate),
            "tradeLicense" => Some(Slot::TradeLicense),
            _ => None,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed-shape map with exactly one optional entry per [`Slot`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "T: Deserialize<'de>"))]
pub struct SlotMap<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_logo: Option<T>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_logo: Option<T>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vat_certificate: Option<T>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade_license: Option<T>,
}

impl<T> Default for SlotMap<T> {
    fn default() -> Self {
        Self {
            company_logo: None,
            client_logo: None,
            vat_certificate: None,
            trade_license: None,
        }
    }
}

impl<T> SlotMap<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slot: Slot) -> Option<&T> {
        self.entry(slot).as_ref()
    }

    fn entry(&self, slot: Slot) -> &Option<T> {
        match slot {
            Slot::CompanyLogo => &self.company_logo,
            Slot::ClientLogo => &self.client_logo,
            Slot::VatCertificate => &self.vat_certificate,
            Slot::TradeLicense => &self.trade_license,
        }
    }

    fn entry_mut(&mut self, slot: Slot) -> &mut Option<T> {
        match slot {
            Slot::CompanyLogo => &mut self.company_logo,
            Slot::ClientLogo => &mut self.client_logo,
            Slot::VatCertificate => &mut self.vat_certificate,
            Slot::TradeLicense => &mut self.trade_license,
        }
    }

    /// Put `value` into `slot`, returning whatever was there before
    pub fn insert(&mut self, slot: Slot, value: T) -> Option<T> {
        self.entry_mut(slot).replace(value)
    }

    pub fn take(&mut self, slot: Slot) -> Option<T> {
        self.entry_mut(slot).take()
    }

    pub fn contains(&self, slot: Slot) -> bool {
        self.entry(slot).is_some()
    }

    pub fn is_empty(&self) -> bool {
        Slot::ALL.iter().all(|slot| !self.contains(*slot))
    }

    pub fn len(&self) -> usize {
        Slot::ALL.iter().filter(|slot| self.contains(**slot)).count()
    }

    /// Occupied entries in slot order
    pub fn iter(&self) -> impl Iterator<Item = (Slot, &T)> {
        Slot::ALL
            .into_iter()
            .filter_map(move |slot| self.get(slot).map(|value| (slot, value)))
    }

    /// Consume the map, yielding occupied entries in slot order
    pub fn into_entries(mut self) -> Vec<(Slot, T)> {
        Slot::ALL
            .into_iter()
            .filter_map(|slot| self.take(slot).map(|value| (slot, value)))
            .collect()
    }
}

/// A stored file bound to a lead slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub slot: Slot,

    /// Name of the file as uploaded
    pub filename: String,

    pub blob_id: BlobId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    #[serde(default)]
    pub size: u64,
}

/// The attachments a lead owns, at most one per slot
pub type AttachmentSet = SlotMap<Attachment>;

impl SlotMap<Attachment> {
    /// Every blob referenced by the set
    pub fn blob_ids(&self) -> Vec<BlobId> {
        self.iter().map(|(_, attachment)| attachment.blob_id).collect()
    }
}

/// An uploaded file that has not reached the blob store yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl FileUpload {
    pub fn new(filename: impl Into<String>, content_type: Option<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type,
            data,
        }
    }
}

/// Files submitted with a single intake or edit request
pub type FileUploads = SlotMap<FileUpload>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_aliases_resolve_to_logo_slots() {
        assert_eq!(Slot::from_form_name("logoCompany"), Some(Slot::CompanyLogo));
        assert_eq!(Slot::from_form_name("clientLogo"), Some(Slot::ClientLogo));
        assert_eq!(Slot::from_form_name("attachments"), None);
        assert_eq!(Slot::from_form_name("VatCertificate"), None);
    }

    #[test]
    fn test_slot_map_insert_replaces_single_entry() {
        let mut map: SlotMap<u32> = SlotMap::new();
        assert!(map.is_empty());

        assert_eq!(map.insert(Slot::TradeLicense, 1), None);
        assert_eq!(map.insert(Slot::TradeLicense, 2), Some(1));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(Slot::TradeLicense), Some(&2));
        assert_eq!(map.get(Slot::CompanyLogo), None);
    }

    #[test]
    fn test_attachment_set_serializes_only_present_slots() {
        let mut set = AttachmentSet::new();
        let blob_id = BlobId::new();
        set.insert(
            Slot::VatCertificate,
            Attachment {
                slot: Slot::VatCertificate,
                filename: "vat.pdf".to_string(),
                blob_id,
                content_type: Some("application/pdf".to_string()),
                size: 3,
            },
        );

        let json = serde_json::to_value(&set).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 1);
        assert_eq!(json["vatCertificate"]["filename"], "vat.pdf");
        assert_eq!(json["vatCertificate"]["blobId"], blob_id.to_string());

        let back: AttachmentSet = serde_json::from_value(json).unwrap();
        assert_eq!(back, set);
    }
}
