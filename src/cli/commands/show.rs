//! `pullcache show` implementation.

use anyhow::Result;
use chrono::Utc;
use console::style;
use std::io::Write;

use crate::cache::{PullRecord, RecordFiles, STATE_DIR_NAME};
use crate::cli::args::ShowArgs;
use crate::config::{format_duration, CacheConfig};

use super::dispatcher::{Command, CommandResult};

/// The show command implementation.
pub struct ShowCommand {
    args: ShowArgs,
}

impl ShowCommand {
    /// Create a new show command.
    pub fn new(args: ShowArgs) -> Self {
        Self { args }
    }
}

impl Command for ShowCommand {
    fn execute(
        &self,
        config: &CacheConfig,
        out: &mut dyn Write,
    ) -> crate::error::Result<CommandResult> {
        // Read straight from disk; showing a record must not create the
        // cache directory.
        let files = RecordFiles::new(config.root_dir.join(STATE_DIR_NAME));
        let record = files.load(&self.args.image)?;
        let exit_code = show_record(&self.args.image, record.as_ref(), self.args.json, out)?;
        Ok(CommandResult::from_exit_code(exit_code))
    }
}

fn show_record(
    image: &str,
    record: Option<&PullRecord>,
    json: bool,
    out: &mut dyn Write,
) -> Result<i32> {
    let Some(record) = record else {
        writeln!(out, "No record for {}", image)?;
        return Ok(1);
    };

    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(record)?)?;
        return Ok(0);
    }

    writeln!(out, "{}", style(image).bold())?;
    if record.is_empty() {
        writeln!(out, "  (no ensured credentials)")?;
        return Ok(0);
    }

    let now = Utc::now();
    let mut hashes: Vec<_> = record.auths.iter().collect();
    hashes.sort_by(|a, b| a.0.cmp(b.0));
    for (hash, entry) in hashes {
        let status = if entry.ensured {
            style("ensured").green()
        } else {
            style("not ensured").yellow()
        };
        writeln!(
            out,
            "  {}  {}  {} ({} ago)",
            hash,
            status,
            entry.last_ensured_date.to_rfc3339(),
            format_duration(entry.age(now))
        )?;
    }

    Ok(0)
}
