//! Command dispatching.
//!
//! This module provides the core command infrastructure:
//! - [`Command`] trait for implementing commands
//! - [`CommandResult`] for uniform result reporting
//! - [`CommandDispatcher`] for routing CLI subcommands

use std::io::Write;

use crate::cli::args::{Cli, Commands};
use crate::config::CacheConfig;
use crate::error::Result;

use super::{ForgetCommand, ListCommand, SchemaCommand, ShowCommand, SweepCommand};

/// Trait for command implementations.
pub trait Command {
    /// Execute the command, writing human or JSON output to `out`.
    fn execute(&self, config: &CacheConfig, out: &mut dyn Write) -> Result<CommandResult>;
}

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult {
    /// Whether the command succeeded.
    pub success: bool,

    /// Exit code to use (0 for success, non-zero for failure).
    pub exit_code: i32,
}

impl CommandResult {
    /// Create a successful result.
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: 0,
        }
    }

    /// Create a failure result.
    pub fn failure(exit_code: i32) -> Self {
        Self {
            success: false,
            exit_code,
        }
    }

    pub(crate) fn from_exit_code(exit_code: i32) -> Self {
        if exit_code == 0 {
            Self::success()
        } else {
            Self::failure(exit_code)
        }
    }
}

/// Dispatches CLI commands to their implementations.
pub struct CommandDispatcher {
    config: CacheConfig,
}

impl CommandDispatcher {
    /// Create a dispatcher working against `config`.
    pub fn new(config: CacheConfig) -> Self {
        Self { config }
    }

    /// The effective configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Dispatch and execute a command.
    pub fn dispatch(&self, cli: &Cli, out: &mut dyn Write) -> Result<CommandResult> {
        match &cli.command {
            Commands::List(args) => ListCommand::new(args.clone()).execute(&self.config, out),
            Commands::Show(args) => ShowCommand::new(args.clone()).execute(&self.config, out),
            Commands::Forget(args) => ForgetCommand::new(args.clone()).execute(&self.config, out),
            Commands::Sweep(args) => SweepCommand::new(args.clone()).execute(&self.config, out),
            Commands::Schema => SchemaCommand.execute(&self.config, out),
        }
    }
}
