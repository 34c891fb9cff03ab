//! Line-delimited JSON server
//!
//! One request object per input line, one response object per output line:
//!
//! ```text
//! {"id":1,"method":"tools/list"}
//! {"id":2,"method":"tools/call","params":{"name":"status","arguments":{"short":true}}}
//! ```
//!
//! Stdout carries protocol frames only; logs go to stderr.

use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use super::schema::{tool_definitions, validate_arguments, TIMEOUT_MS, WORKING_DIRECTORY};
use super::ProtocolError;
use crate::engine::GitEngine;
use crate::request::{Operation, OperationRequest};

pub const SERVER_NAME: &str = "gitmate";

pub struct ProtocolServer {
    engine: GitEngine,
    default_directory: PathBuf,
}

impl ProtocolServer {
    /// `default_directory` is used when a call omits `workingDirectory` and
    /// anchors relative ones.
    pub fn new(engine: GitEngine, default_directory: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            default_directory: default_directory.into(),
        }
    }

    /// Serve until the reader reaches end of input.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(directory = %self.default_directory.display(), "Protocol server listening on stdin");
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            let Some(response) = self.handle_line(&line).await else {
                continue;
            };
            writer.write_all(response.to_string().as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
        info!("Input closed, protocol server stopping");
        Ok(())
    }

    /// Response frame for one input line; blank lines get none.
    pub async fn handle_line(&self, line: &str) -> Option<Value> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let frame = match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(frame)) => frame,
            Ok(_) => {
                return Some(error_frame(
                    Value::Null,
                    &ProtocolError::MalformedFrame("expected a JSON object".to_string()),
                ))
            }
            Err(e) => return Some(error_frame(Value::Null, &ProtocolError::MalformedFrame(e.to_string()))),
        };
        Some(self.handle_frame(frame).await)
    }

    pub async fn handle_frame(&self, frame: Map<String, Value>) -> Value {
        let id = frame.get("id").cloned().unwrap_or(Value::Null);
        let Some(method) = frame.get("method").and_then(Value::as_str) else {
            return error_frame(id, &ProtocolError::MalformedFrame("missing 'method'".to_string()));
        };
        debug!(method, %id, "Handling frame");

        let params = frame.get("params").cloned().unwrap_or_else(|| json!({}));
        let result = match method {
            "initialize" => Ok(json!({
                "serverInfo": {"name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION")},
                "capabilities": {"tools": {}},
            })),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": tool_definitions() })),
            "tools/call" => self.call_tool(&params).await,
            other => Err(ProtocolError::UnknownMethod(other.to_string())),
        };

        match result {
            Ok(result) => json!({"id": id, "result": result}),
            Err(e) => {
                warn!(method, error = %e, "Rejected frame");
                error_frame(id, &e)
            }
        }
    }

    async fn call_tool(&self, params: &Value) -> Result<Value, ProtocolError> {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| ProtocolError::MalformedFrame("tools/call needs params.name".to_string()))?;
        let operation = Operation::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == name)
            .ok_or_else(|| ProtocolError::UnknownTool(name.to_string()))?;
        let arguments = match params.get("arguments") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(arguments)) => arguments.clone(),
            Some(_) => {
                return Err(ProtocolError::MalformedFrame(
                    "params.arguments must be an object".to_string(),
                ))
            }
        };
        validate_arguments(operation, &arguments)?;

        let request = self.request(operation, arguments);
        info!(tool = name, cwd = %request.working_directory.display(), "Tool call");

        let (text, structured, is_error) = match self.engine.dispatch(&request).await {
            Ok(outcome) => {
                let value = serde_json::to_value(&outcome).unwrap_or(Value::Null);
                let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| outcome.render());
                (text, value, outcome.is_error())
            }
            Err(e) => (e.to_string(), Value::Null, true),
        };

        Ok(json!({
            "content": [{"type": "text", "text": text}],
            "structuredContent": structured,
            "isError": is_error,
        }))
    }

    /// Split reserved keys off validated arguments. Nulls mean "not given".
    fn request(&self, operation: Operation, mut arguments: Map<String, Value>) -> OperationRequest {
        let working_directory = arguments
            .remove(WORKING_DIRECTORY)
            .and_then(|v| v.as_str().map(|s| resolve_directory(&self.default_directory, s)))
            .unwrap_or_else(|| self.default_directory.clone());
        let timeout_ms = arguments.remove(TIMEOUT_MS).and_then(|v| v.as_u64());
        arguments.retain(|_, value| !value.is_null());

        OperationRequest {
            operation,
            working_directory,
            arguments,
            timeout_ms,
        }
    }
}

fn resolve_directory(base: &Path, requested: &str) -> PathBuf {
    let requested = Path::new(requested);
    if requested.is_absolute() {
        requested.to_path_buf()
    } else {
        base.join(requested)
    }
}

fn error_frame(id: Value, error: &ProtocolError) -> Value {
    json!({
        "id": id,
        "error": {"code": error.code(), "message": error.to_string()},
    })
}
