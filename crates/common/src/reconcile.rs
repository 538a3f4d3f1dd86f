//! Attachment reconciliation
//!
//! Given the attachments a lead holds today and the uploads that were just
//! written to the blob store, work out the attachment set to persist and the
//! blobs that become garbage once it is persisted.
//!
//! The caller is responsible for ordering: new blobs are stored before
//! `reconcile` runs, the lead is persisted with [`Reconciliation::next`], and
//! only then are the [`Reconciliation::obsolete`] blobs deleted. A crash in
//! between leaves an orphaned blob, never a lead pointing at a missing one.

use crate::attachments::{Attachment, AttachmentSet, Slot, SlotMap};
use crate::ids::BlobId;

/// Result of reconciling an attachment set with incoming uploads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Attachment set to persist
    pub next: AttachmentSet,

    /// Blobs no longer referenced once `next` is persisted, each listed once
    pub obsolete: Vec<BlobId>,
}

/// Reconcile `current` with freshly stored `incoming` attachments, slot by slot.
///
/// A slot without an incoming entry is carried over untouched. A slot with
/// one takes the new attachment, and the blob it displaces is queued for
/// deletion.
pub fn reconcile(current: &AttachmentSet, incoming: &SlotMap<Attachment>) -> Reconciliation {
    let mut next = current.clone();
    let mut obsolete: Vec<BlobId> = Vec::new();

    for slot in Slot::ALL {
        let Some(upload) = incoming.get(slot) else {
            continue;
        };

        let mut attachment = upload.clone();
        attachment.slot = slot;

        if let Some(previous) = next.insert(slot, attachment) {
            if previous.blob_id != upload.blob_id && !obsolete.contains(&previous.blob_id) {
                obsolete.push(previous.blob_id);
            }
        }
    }

    Reconciliation { next, obsolete }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment(slot: Slot, filename: &str) -> Attachment {
        Attachment {
            slot,
            filename: filename.to_string(),
            blob_id: BlobId::new(),
            content_type: None,
            size: 0,
        }
    }

    fn full_set() -> AttachmentSet {
        let mut set = AttachmentSet::new();
        set.insert(Slot::CompanyLogo, attachment(Slot::CompanyLogo, "company.png"));
        set.insert(Slot::ClientLogo, attachment(Slot::ClientLogo, "client.png"));
        set.insert(Slot::VatCertificate, attachment(Slot::VatCertificate, "vat.pdf"));
        set.insert(Slot::TradeLicense, attachment(Slot::TradeLicense, "license.pdf"));
        set
    }

    #[test]
    fn test_empty_incoming_is_identity() {
        let current = full_set();
        let result = reconcile(&current, &SlotMap::new());

        assert_eq!(result.next, current);
        assert!(result.obsolete.is_empty());
    }

    #[test]
    fn test_replacing_company_logo_queues_old_blob() {
        let current = full_set();
        let old_blob = current.company_logo.as_ref().unwrap().blob_id;

        let mut incoming = SlotMap::new();
        let replacement = attachment(Slot::CompanyLogo, "new-company.png");
        incoming.insert(Slot::CompanyLogo, replacement.clone());

        let result = reconcile(&current, &incoming);

        let next_logo = result.next.company_logo.as_ref().unwrap();
        assert_eq!(next_logo.blob_id, replacement.blob_id);
        assert_ne!(next_logo.blob_id, old_blob);
        assert_eq!(next_logo.filename, "new-company.png");
        assert_eq!(result.obsolete, vec![old_blob]);

        assert_eq!(result.next.client_logo, current.client_logo);
        assert_eq!(result.next.vat_certificate, current.vat_certificate);
        assert_eq!(result.next.trade_license, current.trade_license);
    }

    #[test]
    fn test_filling_empty_slot_deletes_nothing() {
        let current = AttachmentSet::new();
        let mut incoming = SlotMap::new();
        incoming.insert(Slot::TradeLicense, attachment(Slot::TradeLicense, "license.pdf"));

        let result = reconcile(&current, &incoming);

        assert!(result.obsolete.is_empty());
        assert_eq!(result.next.len(), 1);
        assert_eq!(result.next.trade_license.as_ref().unwrap().filename, "license.pdf");
    }

    #[test]
    fn test_every_replaced_slot_listed_exactly_once() {
        let current = full_set();
        let mut incoming = SlotMap::new();
        for slot in Slot::ALL {
            incoming.insert(slot, attachment(slot, "fresh"));
        }

        let result = reconcile(&current, &incoming);

        let mut expected = current.blob_ids();
        let mut obsolete = result.obsolete.clone();
        expected.sort();
        obsolete.sort();
        assert_eq!(obsolete, expected);

        for slot in Slot::ALL {
            assert_eq!(
                result.next.get(slot).map(|a| a.blob_id),
                incoming.get(slot).map(|a| a.blob_id)
            );
        }
    }

    #[test]
    fn test_shared_blob_reference_is_not_queued_twice() {
        let mut current = AttachmentSet::new();
        let shared = attachment(Slot::CompanyLogo, "logo.png");
        let mut copy = shared.clone();
        copy.slot = Slot::ClientLogo;
        current.insert(Slot::CompanyLogo, shared.clone());
        current.insert(Slot::ClientLogo, copy);

        let mut incoming = SlotMap::new();
        incoming.insert(Slot::CompanyLogo, attachment(Slot::CompanyLogo, "a.png"));
        incoming.insert(Slot::ClientLogo, attachment(Slot::ClientLogo, "b.png"));

        let result = reconcile(&current, &incoming);
        assert_eq!(result.obsolete, vec![shared.blob_id]);
    }

    #[test]
    fn test_reinserting_same_blob_is_not_obsolete() {
        let current = full_set();
        let mut incoming = SlotMap::new();
        incoming.insert(Slot::ClientLogo, current.client_logo.clone().unwrap());

        let result = reconcile(&current, &incoming);
        assert!(result.obsolete.is_empty());
        assert_eq!(result.next, current);
    }
}
