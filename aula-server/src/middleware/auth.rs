//! Bearer-token authentication middleware.

use axum::extract::Request;
use axum::http::{StatusCode, header};
use axum::middleware::Next;
use axum::response::Response;

/// Authentication layer state.
///
/// When no API token is configured the layer is a pass-through, which is how
/// local development and handler tests run. The processing trigger endpoint
/// additionally checks its own shared secret in the handler.
#[derive(Clone)]
pub struct AuthLayer {
    api_token: Option<String>,
}

impl AuthLayer {
    /// Create a layer that requires the given bearer token on API routes.
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: Some(api_token.into()),
        }
    }

    /// Create a disabled layer (local development, tests).
    pub fn disabled() -> Self {
        Self { api_token: None }
    }
}

/// Extract the bearer token from the Authorization header.
pub(crate) fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Authentication middleware for API routes.
pub async fn auth_middleware(
    axum::Extension(auth_layer): axum::Extension<AuthLayer>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if let Some(ref expected) = auth_layer.api_token {
        match bearer_token(&request) {
            Some(token) if token == expected => {}
            Some(_) => {
                tracing::debug!("Rejected request with wrong API token");
                return Err(StatusCode::UNAUTHORIZED);
            }
            None => {
                tracing::debug!("Rejected request without API token");
                return Err(StatusCode::UNAUTHORIZED);
            }
        }
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with_auth(value: &str) -> Request {
        Request::builder()
            .header(header::AUTHORIZATION, value)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn extracts_bearer_token() {
        let request = request_with_auth("Bearer secret-123");
        assert_eq!(bearer_token(&request), Some("secret-123"));
    }

    #[test]
    fn rejects_non_bearer_scheme() {
        let request = request_with_auth("Basic dXNlcjpwYXNz");
        assert_eq!(bearer_token(&request), None);
    }

    #[test]
    fn missing_header_yields_none() {
        let request = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(bearer_token(&request), None);
    }
}
