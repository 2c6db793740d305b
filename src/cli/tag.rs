//! Tag command: tag metadata and the commits since the previous tag.

use anyhow::{Context, Result};
use clap::Parser;

use crate::data::{TagReport, DEFAULT_MAX_SUBJECT_LENGTH};
use crate::git::Git;

/// Tag command options.
#[derive(Parser)]
pub struct TagCommand {
    /// Tag name, with or without the refs/tags/ prefix.
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Truncate commit subjects to this many characters.
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_SUBJECT_LENGTH)]
    pub max_subject: usize,
}

impl TagCommand {
    /// Executes the tag command.
    pub fn execute(self, git: &Git) -> Result<()> {
        let name = self.name.trim_start_matches("refs/tags/");
        let rev = format!("refs/tags/{name}");

        let report = TagReport::build(git, name, &rev, self.max_subject)
            .with_context(|| format!("Failed to read tag {name}"))?;

        let yaml_output = crate::data::to_yaml(&report)?;
        println!("{yaml_output}");

        Ok(())
    }
}
