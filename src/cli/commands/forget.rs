//! `pullcache forget` implementation.

use console::style;
use std::io::Write;

use crate::cache::{ImagePullCache, PullInfoWriter};
use crate::cli::args::ForgetArgs;
use crate::config::CacheConfig;

use super::dispatcher::{Command, CommandResult};

/// The forget command implementation.
pub struct ForgetCommand {
    args: ForgetArgs,
}

impl ForgetCommand {
    /// Create a new forget command.
    pub fn new(args: ForgetArgs) -> Self {
        Self { args }
    }
}

impl Command for ForgetCommand {
    fn execute(
        &self,
        config: &CacheConfig,
        out: &mut dyn Write,
    ) -> crate::error::Result<CommandResult> {
        let image = self.args.image.as_str();
        let cache = ImagePullCache::from_config(config, [image])?;
        cache.delete_image_pull_info(image)?;

        writeln!(out, "{} Forgot {}", style("✓").green(), image).map_err(anyhow::Error::from)?;
        Ok(CommandResult::success())
    }
}
