//! Tool registry: one tool per operation with a JSON Schema for its input.
//!
//! Field names match the serde names of the options structs, so a validated
//! argument map deserializes straight into them.

use serde::Serialize;
use serde_json::{json, Map, Value};

use super::ProtocolError;
use crate::engine::MERGE_STRATEGIES;
use crate::request::Operation;

/// Keys every tool accepts besides its own fields.
pub const WORKING_DIRECTORY: &str = "workingDirectory";
pub const TIMEOUT_MS: &str = "timeoutMs";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Boolean,
    Integer,
    StringArray,
    Enum(&'static [&'static str]),
}

impl FieldType {
    fn schema(self) -> Value {
        match self {
            FieldType::String => json!({"type": "string"}),
            FieldType::Boolean => json!({"type": "boolean"}),
            FieldType::Integer => json!({"type": "integer", "minimum": 0}),
            FieldType::StringArray => json!({"type": "array", "items": {"type": "string"}}),
            FieldType::Enum(values) => json!({"type": "string", "enum": values}),
        }
    }

    fn describe(self) -> String {
        match self {
            FieldType::String => "string".to_string(),
            FieldType::Boolean => "boolean".to_string(),
            FieldType::Integer => "non-negative integer".to_string(),
            FieldType::StringArray => "array of strings".to_string(),
            FieldType::Enum(values) => format!("one of {}", values.join(", ")),
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Integer => value.as_u64().is_some_and(|n| n <= u64::from(u32::MAX)),
            FieldType::StringArray => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
            FieldType::Enum(values) => value.as_str().is_some_and(|v| values.contains(&v)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldType,
    pub required: bool,
}

const fn field(name: &'static str, kind: FieldType) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        required: false,
    }
}

const fn required(name: &'static str, kind: FieldType) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        required: true,
    }
}

use FieldType::{Boolean, Integer, String as Str, StringArray};

const BRANCH_ACTIONS: FieldType = FieldType::Enum(&["list", "create", "delete", "rename"]);
const TAG_ACTIONS: FieldType = FieldType::Enum(&["list", "create", "delete"]);
const STASH_ACTIONS: FieldType = FieldType::Enum(&["push", "pop", "apply", "list", "drop", "clear", "show"]);
const RESET_MODES: FieldType = FieldType::Enum(&["soft", "mixed", "hard"]);
const CONFLICT_KINDS: FieldType = FieldType::Enum(&["merge", "rebase", "cherry-pick"]);
const RESUME_ACTIONS: FieldType = FieldType::Enum(&["continue", "abort", "skip"]);
const BISECT_ACTIONS: FieldType = FieldType::Enum(&["start", "good", "bad", "skip", "reset", "log"]);
const REMOTE_ACTIONS: FieldType = FieldType::Enum(&["list", "add", "remove", "set-url", "show"]);

/// Input fields of `operation`.
pub fn fields(operation: Operation) -> Vec<FieldSpec> {
    match operation {
        Operation::Status => vec![field("short", Boolean)],
        Operation::Add => vec![field("paths", StringArray), field("all", Boolean)],
        Operation::Commit => vec![
            field("message", Str),
            field("all", Boolean),
            field("amend", Boolean),
            field("allow_empty", Boolean),
        ],
        Operation::Push => vec![
            field("remote", Str),
            field("branch", Str),
            field("set_upstream", Boolean),
            field("force_with_lease", Boolean),
            field("tags", Boolean),
        ],
        Operation::Pull => vec![
            field("remote", Str),
            field("branch", Str),
            field("rebase", Boolean),
            field("ff_only", Boolean),
        ],
        Operation::Fetch => vec![
            field("remote", Str),
            field("all", Boolean),
            field("prune", Boolean),
            field("tags", Boolean),
        ],
        Operation::Branch => vec![
            field("action", BRANCH_ACTIONS),
            field("name", Str),
            field("new_name", Str),
            field("start_point", Str),
            field("force", Boolean),
            field("all", Boolean),
        ],
        Operation::Checkout => vec![
            required("target", Str),
            field("create", Boolean),
            field("start_point", Str),
        ],
        Operation::Log => vec![
            field("max_count", Integer),
            field("oneline", Boolean),
            field("author", Str),
            field("reference", Str),
            field("path", Str),
        ],
        Operation::Diff => vec![
            field("staged", Boolean),
            field("stat", Boolean),
            field("reference", Str),
            field("paths", StringArray),
        ],
        Operation::Stash => vec![
            field("action", STASH_ACTIONS),
            field("message", Str),
            field("include_untracked", Boolean),
            field("index", Integer),
        ],
        Operation::Reset => vec![
            field("mode", RESET_MODES),
            field("target", Str),
            field("paths", StringArray),
        ],
        Operation::Tag => vec![
            field("action", TAG_ACTIONS),
            field("name", Str),
            field("message", Str),
            field("target", Str),
            field("pattern", Str),
        ],
        Operation::Merge => vec![
            required("branch", Str),
            field("strategy", FieldType::Enum(MERGE_STRATEGIES)),
            field("no_ff", Boolean),
            field("ff_only", Boolean),
            field("squash", Boolean),
            field("message", Str),
        ],
        Operation::Rebase => vec![
            required("upstream", Str),
            field("onto", Str),
            field("autostash", Boolean),
        ],
        Operation::CherryPick => vec![
            required("commits", StringArray),
            field("no_commit", Boolean),
            field("mainline", Integer),
        ],
        Operation::Resume => vec![required("kind", CONFLICT_KINDS), field("action", RESUME_ACTIONS)],
        Operation::Blame => vec![
            required("file", Str),
            field("start_line", Integer),
            field("end_line", Integer),
            field("reference", Str),
        ],
        Operation::Bisect => vec![
            field("action", BISECT_ACTIONS),
            field("bad", Str),
            field("good", StringArray),
            field("revision", Str),
        ],
        Operation::Remote => vec![field("action", REMOTE_ACTIONS), field("name", Str), field("url", Str)],
        Operation::Clone => vec![
            required("url", Str),
            field("directory", Str),
            field("branch", Str),
            field("depth", Integer),
            field("bare", Boolean),
        ],
        Operation::Init => vec![field("bare", Boolean), field("initial_branch", Str)],
        Operation::Compare => vec![field("upstream", Str)],
        Operation::Flow => vec![
            required("message", Str),
            field("paths", StringArray),
            field("remote", Str),
            field("branch", Str),
            field("dry_run", Boolean),
        ],
        Operation::Sync => vec![field("remote", Str), field("rebase", Boolean), field("dry_run", Boolean)],
        Operation::Release => vec![
            required("version", Str),
            field("message", Str),
            field("remote", Str),
            field("dry_run", Boolean),
        ],
        Operation::Clean => vec![field("remote", Str), field("base", Str), field("dry_run", Boolean)],
        Operation::Dev => vec![
            required("branch", Str),
            field("base", Str),
            field("remote", Str),
            field("rebase", Boolean),
            field("dry_run", Boolean),
        ],
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// JSON Schema of the tool input for `operation`.
pub fn input_schema(operation: Operation) -> Value {
    let fields = fields(operation);
    let mut properties = Map::new();
    properties.insert(
        WORKING_DIRECTORY.to_string(),
        json!({"type": "string", "description": "Repository directory (server's directory when omitted)"}),
    );
    properties.insert(
        TIMEOUT_MS.to_string(),
        json!({"type": "integer", "minimum": 1, "description": "Per-command timeout in milliseconds"}),
    );
    for spec in &fields {
        properties.insert(spec.name.to_string(), spec.kind.schema());
    }
    let required: Vec<&str> = fields.iter().filter(|f| f.required).map(|f| f.name).collect();

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}

pub fn tool_definitions() -> Vec<ToolDefinition> {
    Operation::ALL
        .iter()
        .map(|&operation| ToolDefinition {
            name: operation.as_str().to_string(),
            description: operation.description().to_string(),
            input_schema: input_schema(operation),
        })
        .collect()
}

/// Check `arguments` against the tool schema: no unknown keys, required
/// keys present, every value of the declared type.
pub fn validate_arguments(operation: Operation, arguments: &Map<String, Value>) -> Result<(), ProtocolError> {
    let tool = operation.as_str().to_string();
    let fields = fields(operation);

    for (key, value) in arguments {
        match key.as_str() {
            WORKING_DIRECTORY if value.is_string() => continue,
            TIMEOUT_MS if value.as_u64().is_some_and(|n| n > 0) => continue,
            WORKING_DIRECTORY => {
                return Err(ProtocolError::WrongType {
                    tool,
                    field: key.clone(),
                    expected: "string".to_string(),
                })
            }
            TIMEOUT_MS => {
                return Err(ProtocolError::WrongType {
                    tool,
                    field: key.clone(),
                    expected: "positive integer".to_string(),
                })
            }
            _ => {}
        }

        let Some(spec) = fields.iter().find(|f| f.name == key) else {
            return Err(ProtocolError::UnexpectedField {
                tool,
                field: key.clone(),
            });
        };
        // null stands for "not given" on optional fields
        if value.is_null() && !spec.required {
            continue;
        }
        if !spec.kind.accepts(value) {
            return Err(ProtocolError::WrongType {
                tool,
                field: key.clone(),
                expected: spec.kind.describe(),
            });
        }
    }

    if let Some(missing) = fields
        .iter()
        .find(|f| f.required && arguments.get(f.name).map_or(true, Value::is_null))
    {
        return Err(ProtocolError::MissingField {
            tool,
            field: missing.name.to_string(),
        });
    }
    Ok(())
}
