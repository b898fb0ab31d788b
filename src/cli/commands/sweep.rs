//! `pullcache sweep` implementation.

use chrono::Utc;
use console::style;
use std::io::Write;

use crate::cache::{ImagePullCache, RecheckPolicy};
use crate::cli::args::SweepArgs;
use crate::config::{format_duration, parse_duration, CacheConfig};

use super::dispatcher::{Command, CommandResult};

/// The sweep command implementation.
pub struct SweepCommand {
    args: SweepArgs,
}

impl SweepCommand {
    /// Create a new sweep command.
    pub fn new(args: SweepArgs) -> Self {
        Self { args }
    }

    fn policy(&self, config: &CacheConfig) -> crate::error::Result<RecheckPolicy> {
        match &self.args.period {
            Some(period) => Ok(RecheckPolicy::every(parse_duration(period)?)),
            None => config.recheck_policy(),
        }
    }
}

impl Command for SweepCommand {
    fn execute(
        &self,
        config: &CacheConfig,
        out: &mut dyn Write,
    ) -> crate::error::Result<CommandResult> {
        let policy = self.policy(config)?;
        if !policy.is_active() {
            writeln!(out, "Recheck is disabled; nothing to sweep").map_err(anyhow::Error::from)?;
            return Ok(CommandResult::success());
        }

        let cache = ImagePullCache::open_existing(&config.root_dir)?;
        let report = cache.refresh_at(policy, Utc::now())?;

        writeln!(
            out,
            "{} Swept {} records with period {}: expired {} entries, rewrote {} records",
            style("✓").green(),
            report.records_scanned,
            format_duration(policy.period),
            report.entries_expired,
            report.records_persisted
        )
        .map_err(anyhow::Error::from)?;
        Ok(CommandResult::success())
    }
}
