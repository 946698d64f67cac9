use axum::http::StatusCode;
use std::fmt;

/// Application error classification: a wire code plus the HTTP status it maps to.
///
/// The predefined constants use the HTTP status as the code. Applications declare
/// finer-grained codes with [`ErrorCode::new`]:
///
/// ```
/// use springwheel::exception::ErrorCode;
///
/// const WIDGET_NOT_FOUND: ErrorCode = ErrorCode::new(40401, 404);
/// assert_eq!(WIDGET_NOT_FOUND.status().as_u16(), 404);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode {
    pub code: i32,
    pub http_status: u16,
}

impl ErrorCode {
    pub const BAD_REQUEST: ErrorCode = ErrorCode::new(400, 400);
    pub const UNAUTHORIZED: ErrorCode = ErrorCode::new(401, 401);
    pub const FORBIDDEN: ErrorCode = ErrorCode::new(403, 403);
    pub const NOT_FOUND: ErrorCode = ErrorCode::new(404, 404);
    pub const CONFLICT: ErrorCode = ErrorCode::new(409, 409);
    pub const INTERNAL_SERVER_ERROR: ErrorCode = ErrorCode::new(500, 500);
    pub const SERVICE_UNAVAILABLE: ErrorCode = ErrorCode::new(503, 503);

    pub const fn new(code: i32, http_status: u16) -> Self {
        Self { code, http_status }
    }

    /// The HTTP status; an invalid declared status degrades to 500.
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.http_status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (HTTP {})", self.code, self.http_status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status() {
        assert_eq!(ErrorCode::BAD_REQUEST.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::new(42201, 422).status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(ErrorCode::new(1, 42).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
