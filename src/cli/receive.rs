//! Receive command: reports pushes read from a post-receive style stdin.

use std::io::{self, Read};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use crate::data::{PushReport, ReportOptions, DEFAULT_MAX_SUBJECT_LENGTH};
use crate::git::{Git, PushEvent};
use crate::utils::Settings;

/// Receive command options.
#[derive(Parser)]
pub struct ReceiveCommand {
    /// Leave out commits already reachable from other branches.
    #[arg(long)]
    pub unique: bool,

    /// Truncate commit subjects to this many characters.
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_SUBJECT_LENGTH)]
    pub max_subject: usize,
}

impl ReceiveCommand {
    /// Executes the receive command.
    pub fn execute(self, git: &Git) -> Result<()> {
        let settings = Settings::load()?;
        let options = ReportOptions {
            restrict_to_branch: self.unique || settings.unique_to_branch,
            classify: settings.classify_options(),
            max_subject_length: self.max_subject,
        };

        let mut input = String::new();
        io::stdin()
            .read_to_string(&mut input)
            .context("Failed to read push events from stdin")?;

        let events = PushEvent::parse_all(&input);
        info!(events = events.len(), "Read push events");

        let reports = events
            .iter()
            .map(|event| {
                PushReport::build(git, event, &options)
                    .with_context(|| format!("Failed to build report for {}", event.ref_name))
            })
            .collect::<Result<Vec<_>>>()?;

        let yaml_output = crate::data::to_yaml(&reports)?;
        println!("{yaml_output}");

        Ok(())
    }
}
