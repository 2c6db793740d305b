//! Changes command: files touched between two revisions.

use anyhow::{Context, Result};
use clap::Parser;

use crate::data::ChangeReport;
use crate::git::{Git, WhitespacePolicy};
use crate::utils::Settings;

/// Changes command options.
#[derive(Parser)]
pub struct ChangesCommand {
    /// Older revision; all zeros covers the whole history of REV2.
    #[arg(value_name = "REV1")]
    pub rev1: String,

    /// Newer revision.
    #[arg(value_name = "REV2")]
    pub rev2: String,

    /// Rename similarity threshold between 0.0 and 1.0.
    #[arg(long, value_name = "F")]
    pub similarity: Option<f64>,

    /// Whitespace differences to ignore (all or change).
    #[arg(long, value_name = "POLICY")]
    pub ignore_whitespace: Option<WhitespacePolicy>,

    /// Also print the blob id of every renamed path.
    #[arg(long)]
    pub blobs: bool,
}

impl ChangesCommand {
    /// Executes the changes command.
    pub fn execute(self, git: &Git) -> Result<()> {
        let settings = Settings::load()?;

        let mut options = settings.classify_options();
        if let Some(similarity) = self.similarity {
            options.similarity_threshold = similarity;
        }
        if let Some(policy) = self.ignore_whitespace {
            options.whitespace = Some(policy);
        }

        let report = ChangeReport::build(
            git,
            Some(self.rev1.as_str()),
            &self.rev2,
            &options,
            self.blobs,
        )
        .with_context(|| format!("Failed to classify changes {}..{}", self.rev1, self.rev2))?;

        let yaml_output = crate::data::to_yaml(&report)?;
        println!("{yaml_output}");

        Ok(())
    }
}
