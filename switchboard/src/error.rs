//! JSON-RPC error codes.
//!
//! The numeric values are fixed by the wire protocol; existing clients
//! match on them, so they must not drift.

/// Standard JSON-RPC error: invalid JSON or wrong content type
pub const PARSE_ERROR: i32 = -32700;
/// Standard JSON-RPC error: not a valid request object
pub const INVALID_REQUEST: i32 = -32600;
/// Standard JSON-RPC error: method does not exist
pub const METHOD_NOT_FOUND: i32 = -32601;
/// Standard JSON-RPC error: invalid method parameters
pub const INVALID_PARAMS: i32 = -32602;
/// Standard JSON-RPC error: internal error
pub const INTERNAL_ERROR: i32 = -32603;
/// Transport-level error: HTTP verb not supported by the endpoint
pub const METHOD_NOT_ALLOWED: i32 = -32000;
