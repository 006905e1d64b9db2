//! Credential verification for the HTTP boundary.
//!
//! Composition is decided at construction: the boundary either checks
//! credentials before dispatch or it does not. The router itself never
//! sees an unauthorized request.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Outcome of verifying one request's credentials.
pub enum Verdict {
    /// Request may proceed, optionally tagged with a caller identity.
    Allow { identity: Option<String> },
    /// Request is rejected with this response.
    Deny(Response),
}

/// Pluggable credential check for callers that need more than static
/// bearer tokens.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// `bearer` is the token extracted from the Authorization header, if
    /// any; `headers` is the raw inbound header map.
    async fn verify(&self, bearer: Option<&str>, headers: &HeaderMap) -> Verdict;
}

/// How the boundary authorizes inbound requests.
#[derive(Clone)]
pub enum AuthMode {
    /// No credential check; every request reaches the router.
    Disabled,
    /// Static bearer-token allow-set.
    Bearer(HashSet<String>),
    /// Caller-supplied verification callback.
    Verifier(Arc<dyn CredentialVerifier>),
}

impl AuthMode {
    /// Convenience constructor for a static token set.
    pub fn bearer<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Bearer(tokens.into_iter().map(Into::into).collect())
    }

    /// Authorize one request. `Err` carries the response to return
    /// without dispatching.
    pub async fn authorize(&self, headers: &HeaderMap) -> Result<Option<String>, Response> {
        match self {
            Self::Disabled => Ok(None),
            Self::Bearer(tokens) => {
                // An enabled auth layer with nothing to match against is a
                // misconfiguration; fail closed rather than open.
                if tokens.is_empty() {
                    tracing::error!(
                        "bearer auth enabled with an empty token set; rejecting all requests"
                    );
                    return Err(misconfigured_response());
                }
                match bearer_token(headers) {
                    Some(token) if tokens.contains(token) => Ok(None),
                    _ => Err(unauthorized_response()),
                }
            }
            Self::Verifier(verifier) => {
                match verifier.verify(bearer_token(headers), headers).await {
                    Verdict::Allow { identity } => Ok(identity),
                    Verdict::Deny(response) => Err(response),
                }
            }
        }
    }
}

/// Extract the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn unauthorized_response() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(WWW_AUTHENTICATE, "Bearer")],
        Json(json!({"error": "unauthorized", "code": "unauthorized"})),
    )
        .into_response()
}

fn misconfigured_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": "server auth misconfigured", "code": "auth_misconfigured"})),
    )
        .into_response()
}
