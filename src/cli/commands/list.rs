//! `pullcache list` implementation.

use anyhow::Result;
use console::style;
use serde::Serialize;
use std::collections::HashMap;
use std::io::Write;

use crate::cache::{EnsuredEntry, RecordFiles, StoredRecord, STATE_DIR_NAME};
use crate::cli::args::ListArgs;
use crate::config::CacheConfig;

use super::dispatcher::{Command, CommandResult};

/// The list command implementation.
pub struct ListCommand {
    args: ListArgs,
}

#[derive(Serialize)]
struct ListedRecord<'a> {
    image: Option<&'a str>,
    file: String,
    auths: &'a HashMap<String, EnsuredEntry>,
}

impl ListCommand {
    /// Create a new list command.
    pub fn new(args: ListArgs) -> Self {
        Self { args }
    }
}

impl Command for ListCommand {
    fn execute(
        &self,
        config: &CacheConfig,
        out: &mut dyn Write,
    ) -> crate::error::Result<CommandResult> {
        let files = RecordFiles::new(config.root_dir.join(STATE_DIR_NAME));
        let records = files.list()?;
        let exit_code = list_records(&files, &records, self.args.json, out)?;
        Ok(CommandResult::from_exit_code(exit_code))
    }
}

fn list_records(
    files: &RecordFiles,
    records: &[StoredRecord],
    json: bool,
    out: &mut dyn Write,
) -> Result<i32> {
    if json {
        let listed: Vec<ListedRecord<'_>> = records
            .iter()
            .map(|stored| ListedRecord {
                image: stored.image.as_deref(),
                file: stored.path.display().to_string(),
                auths: &stored.record.auths,
            })
            .collect();
        writeln!(out, "{}", serde_json::to_string_pretty(&listed)?)?;
        return Ok(0);
    }

    if records.is_empty() {
        writeln!(out, "No records in {}", files.dir().display())?;
        return Ok(0);
    }

    writeln!(out, "{} records in {}:\n", records.len(), files.dir().display())?;
    for stored in records {
        let name = stored
            .image
            .clone()
            .unwrap_or_else(|| format!("<unnamed {}>", stored.path.display()));
        let latest = stored
            .record
            .auths
            .values()
            .map(|entry| entry.last_ensured_date)
            .max();
        let latest = latest
            .map(|at| at.to_rfc3339())
            .unwrap_or_else(|| "never".to_string());

        writeln!(
            out,
            "  {}  {} auths, last ensured {}",
            style(name).bold(),
            stored.record.len(),
            latest
        )?;
    }

    Ok(0)
}
