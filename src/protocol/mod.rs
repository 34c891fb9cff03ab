//! Tool protocol: every operation exposed as a callable tool over
//! line-delimited JSON on stdin/stdout.

pub mod schema;
pub mod server;

use thiserror::Error;

pub use schema::{input_schema, tool_definitions, validate_arguments, FieldSpec, FieldType, ToolDefinition};
pub use server::ProtocolServer;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    MalformedFrame(String),
    #[error("unknown method '{0}'")]
    UnknownMethod(String),
    #[error("unknown tool '{0}'")]
    UnknownTool(String),
    #[error("{tool}: missing required argument '{field}'")]
    MissingField { tool: String, field: String },
    #[error("{tool}: unexpected argument '{field}'")]
    UnexpectedField { tool: String, field: String },
    #[error("{tool}: argument '{field}' must be {expected}")]
    WrongType {
        tool: String,
        field: String,
        expected: String,
    },
}

impl ProtocolError {
    /// JSON-RPC style error code for the response frame.
    pub fn code(&self) -> i64 {
        match self {
            ProtocolError::MalformedFrame(_) => -32700,
            ProtocolError::UnknownMethod(_) => -32601,
            _ => -32602,
        }
    }
}
