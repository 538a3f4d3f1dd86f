//! Decoding of intake/edit form submissions

use axum::extract::Multipart;
use axum::http::{header, HeaderMap};
use leadboard_common::{FileUpload, FileUploads, Slot};
use tracing::debug;

use crate::handlers::ApiError;

/// Form field carrying the version the client last saw
pub const EXPECTED_VERSION_FIELD: &str = "expectedVersion";

/// A decoded `multipart/form-data` lead submission
#[derive(Debug, Default)]
pub struct LeadForm {
    /// Text parts in submission order
    pub fields: Vec<(String, String)>,

    /// File parts keyed by slot
    pub files: FileUploads,
}

impl LeadForm {
    /// Text parts as borrowed key/value pairs
    pub fn scalars(&self) -> impl Iterator<Item = (&str, &str)> + Send + '_ {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Remove a text part, returning its last value
    pub fn take_field(&mut self, name: &str) -> Option<String> {
        let mut taken = None;
        self.fields.retain(|(key, value)| {
            if key == name {
                taken = Some(value.clone());
                false
            } else {
                true
            }
        });
        taken
    }

    /// Version precondition from `If-Match` or the `expectedVersion` field
    pub fn take_expected_version(&mut self, headers: &HeaderMap) -> Result<Option<u64>, ApiError> {
        let from_field = self.take_field(EXPECTED_VERSION_FIELD);

        let raw = match headers.get(header::IF_MATCH) {
            Some(value) => Some(
                value
                    .to_str()
                    .map_err(|_| ApiError::bad_request("Invalid If-Match header"))?
                    .to_string(),
            ),
            None => from_field,
        };

        match raw {
            None => Ok(None),
            // `*` matches any current version
            Some(raw) if raw.trim() == "*" => Ok(None),
            Some(raw) => parse_version(&raw)
                .map(Some)
                .ok_or_else(|| ApiError::bad_request(format!("Invalid version: {}", raw))),
        }
    }
}

/// Accepts `3`, `"3"` and `W/"3"`
fn parse_version(raw: &str) -> Option<u64> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix("W/").unwrap_or(trimmed);
    trimmed.trim_matches('"').parse().ok()
}

/// Read every part of a lead form.
///
/// Parts named after an attachment slot are files. A slot part with neither a
/// filename nor content is the browser's "no file chosen" and is skipped; one
/// with content but no filename is stored under the slot name. Anything else
/// is a text field.
pub async fn read_lead_form(mut multipart: Multipart) -> Result<LeadForm, ApiError> {
    let mut form = LeadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| ApiError {
        status: e.status(),
        message: format!("Invalid form data: {}", e.body_text()),
    })? {
        let name = field.name().unwrap_or_default().to_string();

        if let Some(slot) = Slot::from_form_name(&name) {
            let filename = field.file_name().unwrap_or_default().trim().to_string();
            let content_type = field.content_type().map(str::to_string);
            let data = field.bytes().await.map_err(|e| ApiError {
                status: e.status(),
                message: format!("Failed to read {}: {}", slot, e.body_text()),
            })?;

            if filename.is_empty() && data.is_empty() {
                debug!("Skipping {} part without a file", slot);
                continue;
            }

            let filename = if filename.is_empty() {
                slot.as_str().to_string()
            } else {
                filename
            };

            if form.files.contains(slot) {
                return Err(ApiError::bad_request(format!(
                    "Only one file may be uploaded for {}",
                    slot
                )));
            }

            form.files
                .insert(slot, FileUpload::new(filename, content_type, data.to_vec()));
            continue;
        }

        let value = field.text().await.map_err(|e| ApiError {
            status: e.status(),
            message: format!("Invalid value for {}: {}", name, e.body_text()),
        })?;
        form.fields.push((name, value));
    }

    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, StatusCode};

    #[test]
    fn test_parse_version_forms() {
        assert_eq!(parse_version("3"), Some(3));
        assert_eq!(parse_version("\"7\""), Some(7));
        assert_eq!(parse_version(" W/\"12\" "), Some(12));
        assert_eq!(parse_version("abc"), None);
    }

    #[test]
    fn test_if_match_wins_over_form_field() {
        let mut form = LeadForm {
            fields: vec![
                ("capacity".to_string(), "10".to_string()),
                (EXPECTED_VERSION_FIELD.to_string(), "4".to_string()),
            ],
            files: FileUploads::new(),
        };

        let mut headers = HeaderMap::new();
        headers.insert(header::IF_MATCH, HeaderValue::from_static("\"5\""));

        assert_eq!(form.take_expected_version(&headers).unwrap(), Some(5));
        assert_eq!(form.fields.len(), 1);
        assert!(form.scalars().all(|(key, _)| key != EXPECTED_VERSION_FIELD));
    }

    #[test]
    fn test_expected_version_from_field() {
        let mut form = LeadForm {
            fields: vec![(EXPECTED_VERSION_FIELD.to_string(), "2".to_string())],
            files: FileUploads::new(),
        };

        assert_eq!(form.take_expected_version(&HeaderMap::new()).unwrap(), Some(2));
        assert!(form.fields.is_empty());
    }

    #[test]
    fn test_garbage_version_is_bad_request() {
        let mut form = LeadForm::default();
        let mut headers = HeaderMap::new();
        headers.insert(header::IF_MATCH, HeaderValue::from_static("v-two"));

        let err = form.take_expected_version(&headers).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_if_match_any_is_no_precondition() {
        let mut form = LeadForm {
            fields: vec![(EXPECTED_VERSION_FIELD.to_string(), "4".to_string())],
            files: FileUploads::new(),
        };
        let mut headers = HeaderMap::new();
        headers.insert(header::IF_MATCH, HeaderValue::from_static("*"));

        assert_eq!(form.take_expected_version(&headers).unwrap(), None);
        assert!(form.fields.is_empty());
    }
}
