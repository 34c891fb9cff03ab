//! Invocation identity: which operation an alias entry point stands for.

pub mod aliases;
pub mod context;
pub mod resolver;

pub use aliases::{alias_table, lookup, Alias};
pub use context::{InvocationContext, WrapperAccess};
pub use resolver::{IdentityResolver, Resolution, ResolutionSource};
