pub mod aliases;
pub mod run;
pub mod serve;

pub use aliases::{link_aliases, AliasesCommand};
pub use run::{exit_code, RunCommand};
pub use serve::ServeCommand;
