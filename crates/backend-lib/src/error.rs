// ============================
// chat-backend-lib/src/error.rs
// ============================
//! Central error type + Axum integration.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Application error taxonomy.
///
/// Failures surface to clients either as connection closure (auth) or as a
/// per-request `error` event; they never take down the broadcast path for
/// unrelated rooms or sessions.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("authentication failed")]
    AuthFailure,

    #[error("message store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("unknown room: {0}")]
    UnknownRoom(String),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ChatError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ChatError::AuthFailure => StatusCode::UNAUTHORIZED,
            ChatError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            ChatError::UnknownRoom(_) => StatusCode::NOT_FOUND,
            ChatError::ConnectionClosed => StatusCode::GONE,
            ChatError::StoreUnavailable(_) | ChatError::Io(_) | ChatError::Json(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        }
    }

    /// Stable error identifier, also used in the `error` wire event
    pub fn error_code(&self) -> &'static str {
        match self {
            ChatError::AuthFailure => "AUTH_FAILURE",
            ChatError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            ChatError::MalformedRequest(_) => "MALFORMED_REQUEST",
            ChatError::UnknownRoom(_) => "UNKNOWN_ROOM",
            ChatError::ConnectionClosed => "CONNECTION_CLOSED",
            ChatError::Io(_) => "IO_ERROR",
            ChatError::Json(_) => "JSON_ERROR",
        }
    }

    /// Get a sanitized message suitable for production use
    pub fn sanitized_message(&self) -> String {
        match self {
            ChatError::AuthFailure => "Authentication failed".to_string(),
            ChatError::StoreUnavailable(_) => "Message store unavailable".to_string(),
            ChatError::MalformedRequest(_) => "Invalid request format".to_string(),
            ChatError::UnknownRoom(_) => "Room does not exist".to_string(),
            ChatError::ConnectionClosed => "Connection closed".to_string(),
            ChatError::Io(_) => "Internal server error".to_string(),
            ChatError::Json(_) => "Invalid request format".to_string(),
        }
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Use detailed messages in development, sanitized in production
        let message = if cfg!(debug_assertions) {
            self.to_string()
        } else {
            self.sanitized_message()
        };

        let body = serde_json::json!({
            "id": self.error_code(),
            "message": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

// A send fails only when the session's queue receiver is gone, i.e. the
// connection is on its way down.
impl<T> From<tokio::sync::mpsc::error::SendError<T>> for ChatError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        ChatError::ConnectionClosed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn test_error_display() {
        assert_eq!(ChatError::AuthFailure.to_string(), "authentication failed");
        assert_eq!(
            ChatError::UnknownRoom("nope".to_string()).to_string(),
            "unknown room: nope"
        );

        let io_error = ChatError::Io(IoError::new(ErrorKind::NotFound, "missing log"));
        assert!(io_error.to_string().contains("IO error"));
    }

    #[test]
    fn test_error_status_codes() {
        assert_eq!(ChatError::AuthFailure.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ChatError::MalformedRequest("bad".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ChatError::UnknownRoom("x".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ChatError::StoreUnavailable("down".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(ChatError::AuthFailure.error_code(), "AUTH_FAILURE");
        assert_eq!(
            ChatError::StoreUnavailable("down".to_string()).error_code(),
            "STORE_UNAVAILABLE"
        );
        assert_eq!(
            ChatError::MalformedRequest("bad".to_string()).error_code(),
            "MALFORMED_REQUEST"
        );
        assert_eq!(
            ChatError::UnknownRoom("x".to_string()).error_code(),
            "UNKNOWN_ROOM"
        );
    }

    #[tokio::test]
    async fn test_closed_queue_maps_to_connection_closed() {
        let (tx, rx) = tokio::sync::mpsc::channel::<()>(1);
        drop(rx);

        let err: ChatError = tx.send(()).await.unwrap_err().into();
        assert!(matches!(err, ChatError::ConnectionClosed));
        assert_eq!(err.error_code(), "CONNECTION_CLOSED");
    }

    #[test]
    fn test_error_into_response() {
        let response = ChatError::AuthFailure.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response_headers = response.headers();
        assert!(response_headers
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap()
            .contains("application/json"));
    }
}
