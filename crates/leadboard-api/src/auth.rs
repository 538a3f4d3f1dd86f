//! Admin session gate for the `/api` routes

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use crate::handlers::{ApiError, AppState};

pub const TOKEN_COOKIE: &str = "token";
pub const ROLE_COOKIE: &str = "role";
pub const ADMIN_ROLE: &str = "admin";

/// Caller identity taken from the request cookies
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub token: Option<String>,
    pub role: Option<String>,
}

impl Session {
    /// Collect the session cookies from every `Cookie` header
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut session = Session::default();

        let pairs = headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|raw| raw.split(';'))
            .filter_map(|pair| pair.split_once('='));

        for (name, value) in pairs {
            let value = value.trim().trim_matches('"');
            if value.is_empty() {
                continue;
            }

            match name.trim() {
                TOKEN_COOKIE => session.token = Some(value.to_string()),
                ROLE_COOKIE => session.role = Some(value.to_string()),
                _ => {}
            }
        }

        session
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some(ADMIN_ROLE)
    }
}

/// Reject requests without an admin session.
///
/// The token is only checked for presence; issuing and verifying it belongs
/// to the login service.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let session = Session::from_headers(request.headers());

    if state.require_admin {
        if !session.is_authenticated() {
            debug!("Rejected {} {}: no session", request.method(), request.uri().path());
            return Err(ApiError::unauthorized("Authentication required"));
        }

        if !session.is_admin() {
            debug!(
                "Rejected {} {}: role {:?}",
                request.method(),
                request.uri().path(),
                session.role
            );
            return Err(ApiError::forbidden("Admin access required"));
        }
    }

    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(cookies: &[&'static str]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for cookie in cookies {
            headers.append(header::COOKIE, HeaderValue::from_static(cookie));
        }
        headers
    }

    #[test]
    fn test_session_from_single_header() {
        let session = Session::from_headers(&headers(&["theme=dark; token=abc123; role=admin"]));

        assert_eq!(session.token.as_deref(), Some("abc123"));
        assert!(session.is_admin());
    }

    #[test]
    fn test_session_across_headers() {
        let session = Session::from_headers(&headers(&["token=abc", "role=\"viewer\""]));

        assert!(session.is_authenticated());
        assert_eq!(session.role.as_deref(), Some("viewer"));
        assert!(!session.is_admin());
    }

    #[test]
    fn test_empty_token_is_no_session() {
        let session = Session::from_headers(&headers(&["token=; role=admin"]));
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_no_cookies() {
        assert_eq!(Session::from_headers(&HeaderMap::new()), Session::default());
    }
}
