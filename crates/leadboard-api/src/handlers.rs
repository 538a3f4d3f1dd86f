//! API request handlers for Leadboard

use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::{JsonRejection, QueryRejection},
        Multipart, Path, Query, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use leadboard_common::{Error, Lead, LeadStatus};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::{
    config::Config,
    multipart::read_lead_form,
    service::{LeadService, ListQuery, MonthlyCount, PageLimits, Pagination, StatusSummary},
};

/// Shared application state
pub struct AppState {
    pub service: LeadService,

    /// Whether `/api` routes demand an admin session
    pub require_admin: bool,

    /// Request body cap, multipart uploads included
    pub max_upload_bytes: usize,

    /// Rows in the dashboard's recent leads table
    pub recent_leads_limit: usize,
}

impl AppState {
    pub fn new(service: LeadService, config: &Config) -> Self {
        Self {
            service: service.with_limits(PageLimits {
                default_limit: config.default_page_limit,
                max_limit: config.max_page_limit,
            }),
            require_admin: config.require_admin,
            max_upload_bytes: config.max_upload_bytes,
            recent_leads_limit: config.recent_leads_limit,
        }
    }
}

/// API Error type
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: message.into(),
        }
    }

    /// Extractor failures keep their status, except that a well-formed body
    /// with the wrong shape is reported as a plain bad request.
    fn rejected(status: StatusCode, message: String) -> Self {
        let status = if status == StatusCode::UNPROCESSABLE_ENTITY {
            StatusCode::BAD_REQUEST
        } else {
            status
        };
        Self { status, message }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::rejected(rejection.status(), rejection.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::rejected(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::rejected(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "success": false,
            "message": self.message
        });

        (self.status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict { .. } => StatusCode::CONFLICT,
            Error::Storage(_) | Error::JsonSerialization(_) | Error::Other(_) => {
                error!("Request failed: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let message = match err {
            Error::Validation(message) | Error::NotFound(message) => message,
            other => other.to_string(),
        };

        ApiError { status, message }
    }
}

/// Single lead response
#[derive(Debug, Serialize)]
pub struct LeadResponse {
    pub success: bool,
    pub lead: Lead,
}

impl LeadResponse {
    fn ok(lead: Lead) -> Json<Self> {
        Json(Self {
            success: true,
            lead,
        })
    }
}

/// Page of leads
#[derive(Debug, Serialize)]
pub struct LeadListResponse {
    pub success: bool,
    pub leads: Vec<Lead>,
    pub pagination: Pagination,
}

/// Plain acknowledgement
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

/// Query parameters for the leads table
#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
}

/// Body of a status change
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

/// Query parameters for file retrieval
#[derive(Debug, Deserialize)]
pub struct FileParams {
    #[serde(default)]
    pub download: bool,
}

/// Query parameters for the monthly chart
#[derive(Debug, Deserialize)]
pub struct AnalyticsParams {
    pub year: Option<i32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyAnalyticsResponse {
    pub success: bool,
    pub year: i32,
    pub data: Vec<MonthlyCount>,
    pub recent_leads: Vec<Lead>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub success: bool,
    pub summary: StatusSummary,
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "leadboard-api"
    }))
}

/// List leads, newest first
pub async fn list_leads_handler(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<LeadListResponse>, ApiError> {
    let Query(params) = params?;
    let page = state
        .service
        .list_leads(ListQuery {
            page: params.page,
            limit: params.limit,
            search: params.search,
        })
        .await?;

    Ok(Json(LeadListResponse {
        success: true,
        leads: page.leads,
        pagination: page.pagination,
    }))
}

/// Create a lead from the intake wizard
pub async fn create_lead_handler(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<LeadResponse>), ApiError> {
    let mut form = read_lead_form(multipart?).await?;
    info!(
        "Creating lead ({} field(s), {} file(s))",
        form.fields.len(),
        form.files.len()
    );

    let files = std::mem::take(&mut form.files);
    let lead = state.service.create_lead(form.scalars(), files).await?;

    Ok((StatusCode::CREATED, LeadResponse::ok(lead)))
}

/// Get a single lead
pub async fn get_lead_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<LeadResponse>, ApiError> {
    let lead = state.service.get_lead(&id).await?;
    Ok(LeadResponse::ok(lead))
}

/// Apply an edit-form submission to a lead
pub async fn update_lead_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<LeadResponse>, ApiError> {
    info!("Updating lead: {}", id);

    let mut form = read_lead_form(multipart?).await?;
    let expected_version = form.take_expected_version(&headers)?;
    let files = std::mem::take(&mut form.files);

    let report = state
        .service
        .update_lead(&id, form.scalars(), files, expected_version)
        .await?;

    if !report.cleanup_warnings.is_empty() {
        warn!(
            "Lead {} updated with {} obsolete blob(s) left behind",
            id,
            report.cleanup_warnings.len()
        );
    }

    Ok(LeadResponse::ok(report.lead))
}

/// Toggle a lead's status
pub async fn set_status_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<StatusRequest>, JsonRejection>,
) -> Result<Json<LeadResponse>, ApiError> {
    let Json(payload) = payload?;
    let status: LeadStatus = payload.status.parse()?;
    let lead = state.service.set_status(&id, status).await?;
    Ok(LeadResponse::ok(lead))
}

/// Delete a lead and its files
pub async fn delete_lead_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    info!("Deleting lead: {}", id);

    let report = state.service.delete_lead(&id).await?;

    if !report.cleanup_warnings.is_empty() {
        warn!(
            "Lead {} deleted with {} blob(s) left behind",
            id,
            report.cleanup_warnings.len()
        );
    }

    Ok(Json(MessageResponse {
        success: true,
        message: format!("Lead deleted: {}", id),
    }))
}

/// Stream a stored attachment for inline viewing or download
pub async fn get_file_handler(
    State(state): State<Arc<AppState>>,
    Path(blob_id): Path<String>,
    params: Result<Query<FileParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = params?;
    let blob = state.service.get_blob(&blob_id).await?;

    let disposition = if params.download { "attachment" } else { "inline" };
    let content_type = blob
        .meta
        .content_type
        .clone()
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let headers = [
        (header::CONTENT_TYPE, content_type),
        (
            header::CONTENT_DISPOSITION,
            format!(
                "{}; filename=\"{}\"",
                disposition,
                header_safe_filename(&blob.meta.filename)
            ),
        ),
        (header::X_CONTENT_TYPE_OPTIONS, "nosniff".to_string()),
    ];

    Ok((headers, blob.data).into_response())
}

/// Monthly lead counts for the bar chart, plus the recent leads table
pub async fn monthly_analytics_handler(
    State(state): State<Arc<AppState>>,
    params: Result<Query<AnalyticsParams>, QueryRejection>,
) -> Result<Json<MonthlyAnalyticsResponse>, ApiError> {
    let Query(params) = params?;
    let year = params.year.unwrap_or_else(LeadService::current_year);
    let data = state.service.monthly_counts(year).await?;
    let recent_leads = state.service.recent_leads(state.recent_leads_limit).await?;

    Ok(Json(MonthlyAnalyticsResponse {
        success: true,
        year,
        data,
        recent_leads,
    }))
}

/// Lead counts by status for the metric cards
pub async fn status_summary_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let summary = state.service.status_summary().await?;
    Ok(Json(SummaryResponse {
        success: true,
        summary,
    }))
}

/// Keep a filename usable inside a quoted header parameter
fn header_safe_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();

    if cleaned.trim().is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_safe_filename() {
        assert_eq!(header_safe_filename("vat cert.pdf"), "vat cert.pdf");
        assert_eq!(header_safe_filename("a\"b\\c.png"), "a_b_c.png");
        assert_eq!(header_safe_filename("شعار.png"), "____.png");
        assert_eq!(header_safe_filename(""), "file");
    }

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (Error::validation("bad"), StatusCode::BAD_REQUEST),
            (Error::not_found("gone"), StatusCode::NOT_FOUND),
            (
                Error::Conflict {
                    expected: 1,
                    found: 2,
                },
                StatusCode::CONFLICT,
            ),
            (Error::storage("down"), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn test_rejection_statuses() {
        let shape = ApiError::rejected(StatusCode::UNPROCESSABLE_ENTITY, "missing field".into());
        assert_eq!(shape.status, StatusCode::BAD_REQUEST);

        let too_large = ApiError::rejected(StatusCode::PAYLOAD_TOO_LARGE, "too big".into());
        assert_eq!(too_large.status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_validation_message_is_passed_through() {
        let api_error = ApiError::from(Error::validation("Invalid ID: x"));
        assert_eq!(api_error.message, "Invalid ID: x");
    }
}
