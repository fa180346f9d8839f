//! Maps pipeline outcomes onto the three HTTP responses the endpoint emits.

use http::StatusCode;

use crate::error::RequestError;

/// Body of a non-debug 404.
pub const NOT_FOUND_BODY: &str = "File not found";

/// Body of the root-path 403.
pub const FORBIDDEN_BODY: &str = "Forbidden";

const TEXT_PLAIN: &str = "text/plain";

/// Filler appended to debug 404s: 16 x (newline + 32 spaces) = 528 bytes.
fn debug_padding() -> String {
    format!("\n{}", " ".repeat(32)).repeat(16)
}

/// A fully buffered response, independent of any HTTP framework.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailResponse {
    /// HTTP status
    pub status: StatusCode,
    /// `Location` header (redirects only)
    pub location: Option<String>,
    /// `Content-Type` header, if the response has a body
    pub content_type: Option<&'static str>,
    /// Response body
    pub body: String,
}

/// Turns decoder/verifier/resolver outcomes into responses.
#[derive(Debug, Clone, Copy)]
pub struct ResponseMapper {
    debug: bool,
}

impl ResponseMapper {
    /// Create a mapper; `debug` appends error detail to 404 bodies.
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }

    /// 403 for the bare root path.
    pub fn forbidden() -> ThumbnailResponse {
        ThumbnailResponse {
            status: StatusCode::FORBIDDEN,
            location: None,
            content_type: Some(TEXT_PLAIN),
            body: FORBIDDEN_BODY.to_string(),
        }
    }

    /// 302 back to the request URI, now servable as a static file.
    pub fn found(request_uri: &str) -> ThumbnailResponse {
        ThumbnailResponse {
            status: StatusCode::FOUND,
            location: Some(request_uri.to_string()),
            content_type: None,
            body: String::new(),
        }
    }

    /// 404, with padded error detail in debug mode.
    pub fn not_found(&self, error: &RequestError) -> ThumbnailResponse {
        let body = if self.debug {
            format!("{}: {}{}", NOT_FOUND_BODY, error, debug_padding())
        } else {
            NOT_FOUND_BODY.to_string()
        };
        ThumbnailResponse {
            status: StatusCode::NOT_FOUND,
            location: None,
            content_type: Some(TEXT_PLAIN),
            body,
        }
    }

    /// Map the result of a request to its response.
    ///
    /// Failures take their status from [`RequestError::status`].
    pub fn respond<T>(
        &self,
        request_uri: &str,
        outcome: &Result<T, RequestError>,
    ) -> ThumbnailResponse {
        match outcome {
            Ok(_) => Self::found(request_uri),
            Err(e) => match e.status() {
                StatusCode::FORBIDDEN => Self::forbidden(),
                _ => self.not_found(e),
            },
        }
    }
}
