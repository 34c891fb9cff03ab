//! External tool abstractions
//!
//! Trait-based abstraction over spawning the version-control tool, enabling
//! testable code through dependency injection and mock implementations.

pub mod command;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use command::{
    quote_arg, CommandError, CommandExecutor, CommandOutput, GitCommand, ProcessCommandExecutor,
    DEFAULT_PROGRAM,
};
#[cfg(any(test, feature = "testing"))]
pub use command::MockCommandExecutor;
#[cfg(any(test, feature = "testing"))]
pub use testing::ScriptedExecutor;
