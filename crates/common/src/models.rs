//! Lead records and their scalar fields

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::attachments::AttachmentSet;
use crate::error::{Error, Result};
use crate::ids::LeadId;

/// Lifecycle status of a lead
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    #[default]
    Pending,
    Completed,
    /// Legacy value still present on older records
    Ongoing,
}

impl LeadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LeadStatus::Pending => "pending",
            LeadStatus::Completed => "completed",
            LeadStatus::Ongoing => "ongoing",
        }
    }
}

impl FromStr for LeadStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(LeadStatus::Pending),
            "completed" => Ok(LeadStatus::Completed),
            "ongoing" => Ok(LeadStatus::Ongoing),
            other => Err(Error::validation(format!("Invalid status: {other}"))),
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declares the scalar lead fields once and derives both the field-name enum
/// and the details struct from that list.
macro_rules! lead_fields {
    ($($variant:ident => $field:ident : $wire:literal),+ $(,)?) => {
        /// Name of a scalar lead field as submitted by the intake form
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum LeadField {
            $($variant),+
        }

        impl LeadField {
            pub const ALL: &'static [LeadField] = &[$(LeadField::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(LeadField::$variant => $wire),+
                }
            }

            pub fn from_name(name: &str) -> Option<LeadField> {
                match name {
                    $($wire => Some(LeadField::$variant),)+
                    _ => None,
                }
            }
        }

        /// Scalar fields of a lead, stored as the form submits them
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase", default)]
        pub struct LeadDetails {
            $(pub $field: String),+
        }

        impl LeadDetails {
            pub fn get(&self, field: LeadField) -> &str {
                match field {
                    $(LeadField::$variant => &self.$field),+
                }
            }

            pub fn set(&mut self, field: LeadField, value: String) {
                match field {
                    $(LeadField::$variant => self.$field = value),+
                }
            }
        }
    };
}

lead_fields! {
    LocationName => location_name: "locationName",
    Capacity => capacity: "capacity",
    WaitTime => wait_time: "waitTime",
    MapsUrl => maps_url: "mapsUrl",
    Latitude => latitude: "latitude",
    Longitude => longitude: "longitude",
    Timing => timing: "timing",
    Address => address: "address",
    Lobbies => lobbies: "lobbies",
    KeyRooms => key_rooms: "keyRooms",
    Distance => distance: "distance",
    SupervisorUser => supervisor_user: "supervisorUser",
    ValidationUser => validation_user: "validationUser",
    ReportUser => report_user: "reportUser",
    TicketType => ticket_type: "ticketType",
    FeeType => fee_type: "feeType",
    TicketPricing => ticket_pricing: "ticketPricing",
    VatType => vat_type: "vatType",
    DriverCount => driver_count: "driverCount",
    DriverList => driver_list: "driverList",
    AdminName => admin_name: "adminName",
    AdminEmail => admin_email: "adminEmail",
    AdminPhone => admin_phone: "adminPhone",
    TrainingRequired => training_required: "trainingRequired",
    DocumentSubmitMethod => document_submit_method: "documentSubmitMethod",
}

impl LeadField {
    /// Fields the intake wizard refuses to submit blank
    pub const REQUIRED: [LeadField; 5] = [
        LeadField::LocationName,
        LeadField::Capacity,
        LeadField::AdminName,
        LeadField::AdminEmail,
        LeadField::AdminPhone,
    ];

    pub fn is_required(self) -> bool {
        Self::REQUIRED.contains(&self)
    }
}

impl Default for LeadDetails {
    fn default() -> Self {
        Self {
            location_name: String::new(),
            capacity: String::new(),
            wait_time: String::new(),
            maps_url: String::new(),
            latitude: String::new(),
            longitude: String::new(),
            timing: String::new(),
            address: String::new(),
            lobbies: String::new(),
            key_rooms: String::new(),
            distance: String::new(),
            supervisor_user: "no".to_string(),
            validation_user: "no".to_string(),
            report_user: "no".to_string(),
            ticket_type: "pre-printed".to_string(),
            fee_type: "fixed".to_string(),
            ticket_pricing: String::new(),
            vat_type: "inclusive".to_string(),
            driver_count: String::new(),
            driver_list: String::new(),
            admin_name: String::new(),
            admin_email: String::new(),
            admin_phone: String::new(),
            training_required: "yes".to_string(),
            document_submit_method: String::new(),
        }
    }
}

impl LeadDetails {
    /// Required fields that are currently blank
    pub fn missing_required(&self) -> Vec<LeadField> {
        LeadField::REQUIRED
            .into_iter()
            .filter(|field| self.get(*field).trim().is_empty())
            .collect()
    }

    /// Case-insensitive substring match over the columns the leads table searches
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        [
            &self.admin_name,
            &self.admin_email,
            &self.admin_phone,
            &self.location_name,
        ]
        .iter()
        .any(|value| value.to_lowercase().contains(&needle))
    }
}

/// A lead record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: LeadId,

    #[serde(flatten)]
    pub details: LeadDetails,

    #[serde(default)]
    pub status: LeadStatus,

    #[serde(default)]
    pub attachments: AttachmentSet,

    /// Bumped on every persisted change; used for compare-and-swap writes
    pub version: u64,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Lead {
    /// Create a new pending lead
    pub fn new(details: LeadDetails, attachments: AttachmentSet) -> Self {
        let now = Utc::now();
        Self {
            id: LeadId::new(),
            details,
            status: LeadStatus::Pending,
            attachments,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// Produce the next revision of this lead, ready for a compare-and-swap write
    pub fn next_revision(&self) -> Lead {
        let mut next = self.clone();
        next.version = self.version + 1;
        next.updated_at = Utc::now();
        next
    }
}

/// Keys the merge never touches even when a client sends them
const RESERVED_KEYS: &[&str] = &[
    "attachments",
    "_id",
    "id",
    "version",
    "expectedVersion",
    "createdAt",
    "updatedAt",
];

/// Scalar changes decoded from a form submission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadChanges {
    pub fields: Vec<(LeadField, String)>,
    pub status: Option<LeadStatus>,
}

impl LeadChanges {
    /// Decode form key/value pairs.
    ///
    /// Unknown keys are ignored. A required field that is present must not be
    /// blank, and `status` must name a known status.
    pub fn from_form<'a, I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut changes = LeadChanges::default();
        let mut blank = Vec::new();

        for (key, value) in pairs {
            if RESERVED_KEYS.contains(&key) {
                continue;
            }

            if key == "status" {
                changes.status = Some(value.parse()?);
                continue;
            }

            let Some(field) = LeadField::from_name(key) else {
                tracing::debug!("Ignoring unknown lead field: {}", key);
                continue;
            };

            if field.is_required() && value.trim().is_empty() {
                blank.push(field.as_str());
            }

            changes.fields.retain(|(existing, _)| *existing != field);
            changes.fields.push((field, value.to_string()));
        }

        if !blank.is_empty() {
            return Err(Error::validation(format!(
                "Required fields cannot be blank: {}",
                blank.join(", ")
            )));
        }

        Ok(changes)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.status.is_none()
    }

    /// Merge into a lead's scalars
    pub fn apply(&self, details: &mut LeadDetails, status: &mut LeadStatus) {
        for (field, value) in &self.fields {
            details.set(*field, value.clone());
        }
        if let Some(next) = self.status {
            *status = next;
        }
    }
}
