// ============================
// chat-backend-lib/src/auth/mod.rs
// ============================
//! Authentication module. Account creation and password login live in an
//! external HTTP layer; this core only resolves an opaque session credential
//! (the `sid` cookie) to a user identity.

mod service;
mod session;

pub use service::{AuthService, SessionAuth};
pub use session::{SessionManager, SESSION_TTL};

use axum::http::HeaderMap;

/// Name of the session cookie set by the external auth layer.
pub const SESSION_COOKIE: &str = "sid";

/// Extract the session token from the upgrade request's Cookie header.
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(axum::http::header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::COOKIE;

    #[test]
    fn test_session_cookie_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, "theme=dark; sid=abc123; lang=en".parse().unwrap());
        assert_eq!(session_cookie(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn test_session_cookie_missing() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_cookie(&headers), None);

        headers.insert(COOKIE, "theme=dark".parse().unwrap());
        assert_eq!(session_cookie(&headers), None);
    }
}
