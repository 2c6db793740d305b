//! Range command: commits introduced and discarded by a ref update.

use anyhow::{Context, Result};
use clap::Parser;

use crate::data::{RangeReport, DEFAULT_MAX_SUBJECT_LENGTH};
use crate::git::{Git, PushEvent};
use crate::utils::Settings;

/// Range command options.
#[derive(Parser)]
pub struct RangeCommand {
    /// Previous tip (all zeros when the ref was created).
    #[arg(value_name = "OLD")]
    pub old: String,

    /// New tip (all zeros when the ref was deleted).
    #[arg(value_name = "NEW")]
    pub new: String,

    /// The updated ref, e.g. refs/heads/main.
    #[arg(value_name = "REF")]
    pub ref_name: String,

    /// Leave out commits already reachable from other branches.
    #[arg(long)]
    pub unique: bool,

    /// Truncate commit subjects to this many characters.
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_SUBJECT_LENGTH)]
    pub max_subject: usize,
}

impl RangeCommand {
    /// Executes the range command.
    pub fn execute(self, git: &Git) -> Result<()> {
        let settings = Settings::load()?;
        let event = PushEvent::new(&self.old, &self.new, &self.ref_name);

        let report = RangeReport::build(
            git,
            &event,
            self.unique || settings.unique_to_branch,
            self.max_subject,
        )
        .with_context(|| format!("Failed to resolve commits for {}", self.ref_name))?;

        let yaml_output = crate::data::to_yaml(&report)?;
        println!("{yaml_output}");

        Ok(())
    }
}
