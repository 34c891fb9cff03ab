// gitmate library - guarded git primitives, workflows and the tool protocol
// This exposes the core components for the binary, tests and embedding

pub mod cli;
pub mod config;
pub mod engine;
pub mod external;
pub mod identity;
pub mod observability;
pub mod protocol;
pub mod request;
pub mod telemetry;
pub mod workflows;

// Re-export key types for easy access
pub use config::{config, GitmateConfig};
pub use engine::{
    ConflictKind, ConflictReport, EngineError, EngineSettings, ErrorKind, GitEngine, OperationResult,
    OperationStatus,
};
pub use external::{CommandError, CommandExecutor, GitCommand, ProcessCommandExecutor};
pub use identity::{IdentityResolver, InvocationContext, Resolution, ResolutionSource};
pub use observability::{create_workflow_span, executor_metrics, ExecutorMetrics};
pub use protocol::{ProtocolError, ProtocolServer, ToolDefinition};
pub use request::{DispatchOutcome, Operation, OperationRequest, RequestError};
pub use telemetry::{generate_correlation_id, init_telemetry};
pub use workflows::WorkflowRun;
