//! CLI command implementations

pub mod collect;
pub mod error;
pub mod regions;

pub use collect::{Cli, CollectArgs, Commands, OutputFormat};
pub use error::CliError;
pub use regions::RegionsCommand;
