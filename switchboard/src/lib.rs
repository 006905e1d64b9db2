//! switchboard - capability adapter core
//!
//! A registry of named operations, data sources, and message templates
//! served through a single stateless JSON-RPC 2.0 entry point. Capability
//! shapes are declared once, translated to portable JSON Schema for client
//! introspection, and enforced against untrusted arguments before any
//! user handler runs.
//!
//! The transport (HTTP framing, CORS, credential checks) lives in the
//! `switchboard-http` crate; this crate is transport-agnostic.

pub mod content;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod router;
pub mod schema;
pub mod validate;

pub use content::{
    ContentItem, OperationOutput, Role, SourceContents, SourceItem, TemplateMessage,
    TemplateOutput,
};
pub use protocol::{EnvelopeError, RpcError, RpcId, RpcRequest, RpcResponse, JSONRPC_VERSION};
pub use registry::{
    Args, CapabilityServer, DataSourceInfo, HandlerError, InvokeError, OperationInfo,
    ServerBuilder, TemplateArgument, TemplateInfo,
};
pub use router::{Router, ServerInfo, DEFAULT_PROTOCOL_VERSION, SUPPORTED_PROTOCOL_VERSIONS};
pub use schema::{FieldKind, FieldSpec, Shape, TextFormat};
pub use validate::{validate, FieldError, ValidationFailure};
