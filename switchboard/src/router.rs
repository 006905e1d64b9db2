//! Method router - maps request envelopes onto the capability registry.
//!
//! Stateless across invocations: every request is dispatched independently
//! against the frozen registry, and no session is carried between calls.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::{Map, Value};

use crate::error;
use crate::protocol::{RpcId, RpcRequest, RpcResponse};
use crate::registry::{CapabilityServer, InvokeError};

/// Protocol revisions this server can negotiate, newest first.
pub const SUPPORTED_PROTOCOL_VERSIONS: [&str; 3] = ["2025-06-18", "2025-03-26", "2024-11-05"];

/// Version offered when the client requests nothing or something unknown.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2025-06-18";

/// Identity reported during the initialize handshake.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: "switchboard".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: String::new(),
        }
    }
}

/// Dispatches request envelopes to the appropriate capability.
pub struct Router {
    server: CapabilityServer,
    info: ServerInfo,
}

// ---------------------------------------------------------------------------
// Param / result types
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct InitializeParams {
    #[serde(rename = "protocolVersion", default)]
    protocol_version: Option<String>,
}

#[derive(Debug, Serialize)]
struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    protocol_version: String,
    capabilities: Value,
    #[serde(rename = "serverInfo")]
    server_info: ServerInfo,
}

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct ReadParams {
    uri: String,
}

#[derive(Debug, Deserialize)]
struct GetParams {
    name: String,
    #[serde(default)]
    arguments: Option<Map<String, Value>>,
}

impl Router {
    pub fn new(server: CapabilityServer, info: ServerInfo) -> Self {
        Self { server, info }
    }

    /// Access the frozen registry.
    pub fn server(&self) -> &CapabilityServer {
        &self.server
    }

    /// Dispatch a request to the appropriate handler.
    ///
    /// Returns `None` for notifications, which receive no response body.
    pub async fn dispatch(&self, request: RpcRequest) -> Option<RpcResponse> {
        // Notifications (no id) are fire-and-forget.
        if request.is_notification() {
            match request.method.as_str() {
                "notifications/initialized" => { /* no-op ack */ }
                other => {
                    tracing::debug!(method = other, "ignoring unknown notification");
                }
            }
            return None;
        }

        let id = request.id.clone();
        let params = request.params.as_deref();

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(id, params),
            // Some clients send the handshake ack with an id; it still
            // gets no response body.
            "notifications/initialized" => return None,
            "operations/list" => self.handle_operations_list(id),
            "operations/call" => self.handle_operations_call(id, params).await,
            "datasources/list" => self.handle_data_sources_list(id),
            "datasources/read" => self.handle_data_sources_read(id, params).await,
            "templates/list" => self.handle_templates_list(id),
            "templates/get" => self.handle_templates_get(id, params).await,
            other => RpcResponse::error(
                id,
                error::METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            ),
        };

        Some(response)
    }

    /// Version negotiation plus capability flags. Never fails: an unknown
    /// requested version falls back to the server default instead of
    /// rejecting the handshake.
    fn handle_initialize(&self, id: Option<RpcId>, params: Option<&RawValue>) -> RpcResponse {
        let requested = params
            .and_then(|raw| serde_json::from_str::<InitializeParams>(raw.get()).ok())
            .unwrap_or_default()
            .protocol_version;

        let negotiated = match requested {
            Some(v) if SUPPORTED_PROTOCOL_VERSIONS.contains(&v.as_str()) => v,
            _ => DEFAULT_PROTOCOL_VERSION.to_string(),
        };

        let mut capabilities = Map::new();
        if self.server.has_operations() {
            capabilities.insert("operations".to_string(), Value::Object(Map::new()));
        }
        if self.server.has_data_sources() {
            capabilities.insert("datasources".to_string(), Value::Object(Map::new()));
        }
        if self.server.has_templates() {
            capabilities.insert("templates".to_string(), Value::Object(Map::new()));
        }

        RpcResponse::success(
            id,
            InitializeResult {
                protocol_version: negotiated,
                capabilities: Value::Object(capabilities),
                server_info: self.info.clone(),
            },
        )
    }

    fn handle_operations_list(&self, id: Option<RpcId>) -> RpcResponse {
        RpcResponse::success(
            id,
            serde_json::json!({"operations": self.server.list_operations()}),
        )
    }

    /// Invoke an operation. Validation failures and handler faults are
    /// both rendered as an `isError` result so the caller can inspect them
    /// as content; only a missing or unknown name is a protocol error.
    async fn handle_operations_call(
        &self,
        id: Option<RpcId>,
        params: Option<&RawValue>,
    ) -> RpcResponse {
        let params: CallParams = match parse_params(params) {
            Ok(p) => p,
            Err(resp) => return resp.with_id(id),
        };

        let Some(operation) = self.server.find_operation(&params.name) else {
            return RpcResponse::error(
                id,
                error::INVALID_PARAMS,
                format!("Unknown operation: {}", params.name),
            );
        };

        let arguments = params.arguments.unwrap_or_default();
        match operation.invoke(&arguments).await {
            Ok(output) => RpcResponse::success(id, output),
            Err(InvokeError::Validation(failure)) => {
                tracing::debug!(
                    operation = %params.name,
                    reason = %failure.summary(),
                    "operation arguments rejected"
                );
                RpcResponse::success(
                    id,
                    crate::content::OperationOutput::error_text(format!(
                        "Invalid arguments: {}",
                        failure.summary()
                    )),
                )
            }
            Err(InvokeError::Handler(fault)) => {
                tracing::warn!(operation = %params.name, error = %fault, "operation handler failed");
                RpcResponse::success(id, crate::content::OperationOutput::error_text(fault.to_string()))
            }
        }
    }

    fn handle_data_sources_list(&self, id: Option<RpcId>) -> RpcResponse {
        RpcResponse::success(
            id,
            serde_json::json!({"datasources": self.server.list_data_sources()}),
        )
    }

    /// Read a data source by URI. Unlike operations, a handler fault here
    /// is an operational fault of the adapter and surfaces as a protocol
    /// error.
    async fn handle_data_sources_read(
        &self,
        id: Option<RpcId>,
        params: Option<&RawValue>,
    ) -> RpcResponse {
        let params: ReadParams = match parse_params(params) {
            Ok(p) => p,
            Err(resp) => return resp.with_id(id),
        };

        let Some(source) = self.server.find_data_source(&params.uri) else {
            return RpcResponse::error(
                id,
                error::INVALID_PARAMS,
                format!("Unknown data source: {}", params.uri),
            );
        };

        match source.read(&params.uri).await {
            Ok(contents) => RpcResponse::success(id, contents),
            Err(fault) => {
                tracing::warn!(uri = %params.uri, error = %fault, "data source read failed");
                RpcResponse::error(
                    id,
                    error::INTERNAL_ERROR,
                    format!("Failed to read {}: {fault}", params.uri),
                )
            }
        }
    }

    fn handle_templates_list(&self, id: Option<RpcId>) -> RpcResponse {
        RpcResponse::success(
            id,
            serde_json::json!({"templates": self.server.list_templates()}),
        )
    }

    /// Expand a template. Validation failures are caller errors here,
    /// unlike `operations/call`.
    async fn handle_templates_get(
        &self,
        id: Option<RpcId>,
        params: Option<&RawValue>,
    ) -> RpcResponse {
        let params: GetParams = match parse_params(params) {
            Ok(p) => p,
            Err(resp) => return resp.with_id(id),
        };

        let Some(template) = self.server.find_template(&params.name) else {
            return RpcResponse::error(
                id,
                error::INVALID_PARAMS,
                format!("Unknown template: {}", params.name),
            );
        };

        let arguments = params.arguments.unwrap_or_default();
        match template.invoke(&arguments).await {
            Ok(output) => RpcResponse::success(id, output),
            Err(InvokeError::Validation(failure)) => RpcResponse::error(
                id,
                error::INVALID_PARAMS,
                format!("Invalid arguments: {}", failure.summary()),
            ),
            Err(InvokeError::Handler(fault)) => {
                tracing::warn!(template = %params.name, error = %fault, "template handler failed");
                RpcResponse::error(
                    id,
                    error::INTERNAL_ERROR,
                    format!("Failed to expand {}: {fault}", params.name),
                )
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Parse typed params from a `RawValue`, returning an error response on
/// failure.
fn parse_params<T: serde::de::DeserializeOwned>(
    params: Option<&RawValue>,
) -> Result<T, RpcResponse> {
    let raw = params
        .ok_or_else(|| RpcResponse::error(None, error::INVALID_PARAMS, "Missing params"))?;
    serde_json::from_str(raw.get()).map_err(|e| {
        RpcResponse::error(None, error::INVALID_PARAMS, format!("Invalid params: {e}"))
    })
}

/// Extension to set the id on a response built before the id was at hand.
trait RpcResponseExt {
    fn with_id(self, id: Option<RpcId>) -> Self;
}

impl RpcResponseExt for RpcResponse {
    fn with_id(mut self, id: Option<RpcId>) -> Self {
        self.id = id;
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
