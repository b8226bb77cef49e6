//! Bearer key boundary for the HTTP transport.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::warn;

/// Expected `Authorization` value for protected routes.
///
/// A blank or missing key disables the check.
#[derive(Debug, Clone, Default)]
pub struct ApiKeyAuth {
    expected: Option<Arc<str>>,
}

impl ApiKeyAuth {
    #[must_use]
    pub fn new(api_key: Option<&str>) -> Self {
        let expected = api_key
            .filter(|key| !key.is_empty())
            .map(|key| Arc::from(format!("Bearer {key}")));
        Self { expected }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.expected.is_some()
    }

    /// Returns true when the headers carry exactly `Bearer <key>`.
    #[must_use]
    pub fn authorize(&self, headers: &HeaderMap) -> bool {
        let Some(expected) = self.expected.as_deref() else {
            return true;
        };
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value == expected)
    }
}

#[derive(Debug, Serialize)]
struct UnauthorizedBody {
    error: &'static str,
    message: &'static str,
}

#[derive(Debug)]
struct Unauthorized;

impl IntoResponse for Unauthorized {
    fn into_response(self) -> Response {
        let payload = Json(UnauthorizedBody {
            error: "Unauthorized",
            message: "Invalid or missing API key",
        });
        (StatusCode::UNAUTHORIZED, payload).into_response()
    }
}

/// Middleware rejecting requests without the configured bearer key.
pub async fn require_api_key(
    State(auth): State<ApiKeyAuth>,
    request: Request,
    next: Next,
) -> Response {
    if auth.authorize(request.headers()) {
        return next.run(request).await;
    }
    warn!(path = %request.uri().path(), "rejected request with invalid or missing API key");
    Unauthorized.into_response()
}
