//! CLI command implementations.
//!
//! Each command implements the [`Command`] trait, which provides a uniform
//! interface for executing commands and reporting results. Commands are
//! routed by [`CommandDispatcher`].

pub mod dispatcher;
pub mod forget;
pub mod list;
pub mod schema;
pub mod show;
pub mod sweep;

pub use dispatcher::{Command, CommandDispatcher, CommandResult};
pub use forget::ForgetCommand;
pub use list::ListCommand;
pub use schema::SchemaCommand;
pub use show::ShowCommand;
pub use sweep::SweepCommand;
