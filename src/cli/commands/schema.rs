//! `pullcache schema` implementation.

use std::io::Write;

use crate::config::CacheConfig;

use super::dispatcher::{Command, CommandResult};

/// Prints the JSON Schema of the config file.
pub struct SchemaCommand;

impl Command for SchemaCommand {
    fn execute(
        &self,
        _config: &CacheConfig,
        out: &mut dyn Write,
    ) -> crate::error::Result<CommandResult> {
        let schema = schemars::schema_for!(CacheConfig);
        let json = serde_json::to_string_pretty(&schema).map_err(anyhow::Error::from)?;
        writeln!(out, "{}", json).map_err(anyhow::Error::from)?;
        Ok(CommandResult::success())
    }
}
