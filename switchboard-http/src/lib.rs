//! switchboard-http - HTTP transport boundary for the switchboard adapter
//!
//! Frames the core router for platforms that deliver one HTTP request per
//! invocation: decodes the inbound request into a protocol envelope,
//! dispatches it, and encodes the outcome. Owns everything the core does
//! not: content-type and verb checks, CORS, credential verification, and
//! HTTP status mapping.
//!
//! Status mapping: transport faults (bad content type, unparseable body,
//! malformed envelope) are non-200 with an error envelope; everything the
//! router answers - including protocol-level errors - rides a 200, and
//! notifications return 202 with no body.

pub mod auth;

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use switchboard::{error, protocol, Router, RpcRequest, RpcResponse};

pub use auth::{AuthMode, CredentialVerifier, Verdict};

/// Static boundary configuration, resolved before the server starts.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Path the RPC endpoint is mounted on.
    pub rpc_path: String,
    pub auth: AuthMode,
    pub cors: CorsConfig,
}

/// Cross-origin policy, static configuration data.
#[derive(Clone)]
pub enum CorsConfig {
    Permissive,
    /// Explicit allow-list of origins.
    Origins(Vec<String>),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            rpc_path: "/".to_string(),
            auth: AuthMode::Disabled,
            cors: CorsConfig::Permissive,
        }
    }
}

impl AppConfig {
    /// Resolve configuration from `SWITCHBOARD_*` environment variables.
    ///
    /// - `SWITCHBOARD_HOST`, `SWITCHBOARD_PORT`, `SWITCHBOARD_RPC_PATH`
    /// - `SWITCHBOARD_AUTH_TOKENS`: comma-separated bearer tokens; setting
    ///   the variable (even empty) enables bearer auth
    /// - `SWITCHBOARD_CORS_ORIGINS`: comma-separated origin allow-list
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let auth = match std::env::var("SWITCHBOARD_AUTH_TOKENS") {
            Ok(raw) => AuthMode::bearer(
                raw.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string),
            ),
            Err(_) => AuthMode::Disabled,
        };

        let cors = match std::env::var("SWITCHBOARD_CORS_ORIGINS") {
            Ok(raw) => CorsConfig::Origins(
                raw.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
            Err(_) => CorsConfig::Permissive,
        };

        Self {
            host: std::env::var("SWITCHBOARD_HOST").unwrap_or(defaults.host),
            port: std::env::var("SWITCHBOARD_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            rpc_path: std::env::var("SWITCHBOARD_RPC_PATH").unwrap_or(defaults.rpc_path),
            auth,
            cors,
        }
    }
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    router: Arc<Router>,
    auth: AuthMode,
}

/// Build the boundary router around a dispatch core.
pub fn app(router: Router, config: &AppConfig) -> axum::Router {
    let state = AppState {
        router: Arc::new(router),
        auth: config.auth.clone(),
    };

    axum::Router::new()
        .route(
            &config.rpc_path,
            post(handle_rpc).fallback(method_not_allowed),
        )
        .route("/health", get(health_check))
        .with_state(state)
        .layer(cors_layer(&config.cors))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "ok"
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    match config {
        CorsConfig::Permissive => CorsLayer::permissive(),
        CorsConfig::Origins(origins) => {
            let origins: Vec<_> = origins
                .iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        }
    }
}

/// Decode, authorize, dispatch, encode - one request, no retained state.
async fn handle_rpc(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(denied) = state.auth.authorize(&headers).await {
        return denied;
    }

    if !is_json_content_type(&headers) {
        return transport_fault(
            None,
            error::PARSE_ERROR,
            "Content-Type must be application/json",
        );
    }

    let value: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            return transport_fault(None, error::PARSE_ERROR, format!("Parse error: {e}"));
        }
    };

    let request = match RpcRequest::from_value(&value) {
        Ok(r) => r,
        Err(e) => {
            return transport_fault(protocol::extract_id(&value), error::INVALID_REQUEST, e.to_string());
        }
    };

    match state.router.dispatch(request).await {
        Some(response) => (StatusCode::OK, Json(response)).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// Any verb other than POST on the RPC endpoint.
async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(RpcResponse::error(
            None,
            error::METHOD_NOT_ALLOWED,
            "Method not allowed; use POST",
        )),
    )
        .into_response()
}

fn is_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| {
            ct.split(';')
                .next()
                .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
        })
}

fn transport_fault(
    id: Option<switchboard::RpcId>,
    code: i32,
    message: impl Into<String>,
) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(RpcResponse::error(id, code, message)),
    )
        .into_response()
}
