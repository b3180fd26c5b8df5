//! Error types for route handlers.
//!
//! [`RouteError`] bridges handler failures and HTTP responses. Bind failures are rendered
//! separately by [`parsing_error_response`], since they carry a list of messages rather
//! than one.

use axum::{
    Json,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use route_bind_core::BindErrors;
use serde::Serialize;
use std::fmt;

/// Header carrying the handler error message in development mode.
pub const HANDLER_ERROR_HEADER: &str = "x-handler-error";

/// Error returned by route handlers.
///
/// The message is only sent to clients in development mode; the code always is.
///
/// # Examples
///
/// ```ignore
/// async fn find(ctx: RequestContext, request: FindUser) -> Result<Reply<User>, RouteError> {
///     let user = users.get(request.id).ok_or_else(|| RouteError::not_found("User", request.id))?;
///     Ok(Reply::ok(user))
/// }
/// ```
#[derive(Debug)]
pub struct RouteError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (development mode only)
    message: String,
    /// Error code (for client error handling)
    code: String,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl RouteError {
    /// Create a new route error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: String) -> Self {
        Self {
            status,
            message,
            code,
            source: None,
        }
    }

    /// Attach a source error.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            message.into(),
            "BAD_REQUEST".to_string(),
        )
    }

    /// Create a 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            message.into(),
            "UNAUTHORIZED".to_string(),
        )
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(resource: impl fmt::Display, id: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            format!("{resource} with id {id} not found"),
            "NOT_FOUND".to_string(),
        )
    }

    /// Create a 409 Conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::CONFLICT,
            message.into(),
            "CONFLICT".to_string(),
        )
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.into(),
            "INTERNAL_SERVER_ERROR".to_string(),
        )
    }

    /// Create a 502 Bad Gateway error.
    #[must_use]
    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_GATEWAY,
            message.into(),
            "BAD_GATEWAY".to_string(),
        )
    }

    /// HTTP status of this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Client-facing error code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Render as a response, exposing the message only in development mode.
    #[must_use]
    pub fn render(self, development: bool) -> Response {
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    error = %source,
                    "Handler failed"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    "Handler failed"
                );
            }
        }

        let header = development
            .then(|| HeaderValue::from_str(&self.message).ok())
            .flatten();
        let body = ErrorResponse {
            code: self.code,
            message: development.then_some(self.message),
            status_code: development.then_some(self.status.as_u16()),
        };
        let mut response = (self.status, Json(body)).into_response();
        if let Some(value) = header {
            response.headers_mut().insert(HANDLER_ERROR_HEADER, value);
        }
        response
    }
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for RouteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status_code: Option<u16>,
}

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        self.render(false)
    }
}

/// Convert `anyhow::Error` to `RouteError`.
impl From<anyhow::Error> for RouteError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}

/// Bind failure response body (JSON).
#[derive(Debug, Serialize)]
struct ParsingErrorResponse {
    parsing_errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status_code: Option<u16>,
}

/// `400 Bad Request` listing every bind failure.
#[must_use]
pub fn parsing_error_response(errors: &BindErrors, development: bool) -> Response {
    let status = StatusCode::BAD_REQUEST;
    let body = ParsingErrorResponse {
        parsing_errors: errors.messages(),
        message: development.then(|| errors.to_string()),
        status_code: development.then_some(status.as_u16()),
    };
    (status, Json(body)).into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code
mod tests {
    use super::*;
    use route_bind_core::BindingError;

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[test]
    fn test_error_display() {
        let err = RouteError::bad_request("Invalid input");
        assert_eq!(err.to_string(), "[BAD_REQUEST] Invalid input");
    }

    #[test]
    fn test_not_found() {
        let err = RouteError::not_found("User", "123");
        assert_eq!(err.to_string(), "[NOT_FOUND] User with id 123 not found");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_message_hidden_in_production() {
        let response = RouteError::conflict("duplicate order").render(false);
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert!(response.headers().get(HANDLER_ERROR_HEADER).is_none());
        let body = json_body(response).await;
        assert_eq!(body, serde_json::json!({ "code": "CONFLICT" }));
    }

    #[tokio::test]
    async fn test_message_shown_in_development() {
        let response = RouteError::conflict("duplicate order").render(true);
        assert_eq!(response.headers()[HANDLER_ERROR_HEADER], "duplicate order");
        let body = json_body(response).await;
        assert_eq!(body["message"], "duplicate order");
        assert_eq!(body["status_code"], 409);
    }

    #[tokio::test]
    async fn test_parsing_errors() {
        let mut errors = BindErrors::new();
        errors.push(BindingError::MissingHeader {
            name: "apikey".to_string(),
        });
        errors.push(BindingError::MissingQuery {
            name: "q".to_string(),
        });

        let response = parsing_error_response(&errors, false);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["parsing_errors"].as_array().map(Vec::len), Some(2));
        assert!(body.get("message").is_none());

        let body = json_body(parsing_error_response(&errors, true)).await;
        assert_eq!(body["status_code"], 400);
        assert!(body["message"].as_str().is_some_and(|m| m.contains('\n')));
    }
}
