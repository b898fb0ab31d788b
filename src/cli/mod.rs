//! Command-line interface for `pullcache`.
//!
//! The binary is an operator tool over the same cache a node agent embeds:
//! it lists, shows, forgets, and sweeps records under a root directory.

pub mod args;
pub mod commands;

pub use args::{Cli, Commands};
pub use commands::{Command, CommandDispatcher, CommandResult};
