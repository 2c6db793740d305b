//! CLI interface for push-scope.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::git::Git;

pub mod changes;
pub mod range;
pub mod receive;
pub mod tag;

/// push-scope: shows what a push notification hook would report.
#[derive(Parser)]
#[command(name = "push-scope")]
#[command(about = "Inspects the commits and changes introduced by a push", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Run as if started in this directory.
    #[arg(short = 'C', global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// The command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Lists the commits introduced and discarded by a ref update.
    Range(range::RangeCommand),
    /// Classifies the files changed between two revisions.
    Changes(changes::ChangesCommand),
    /// Shows tag metadata and the commits since the previous tag.
    Tag(tag::TagCommand),
    /// Reports every push read from stdin as `old new ref` lines.
    Receive(receive::ReceiveCommand),
}

impl Cli {
    /// Executes the CLI command.
    pub fn execute(self) -> Result<()> {
        let directory = self.directory.unwrap_or_else(|| PathBuf::from("."));
        let git = Git::discover(&directory).with_context(|| {
            format!(
                "Failed to open git repository at {}. Make sure you're in a git repository.",
                directory.display()
            )
        })?;

        match self.command {
            Commands::Range(range_cmd) => range_cmd.execute(&git),
            Commands::Changes(changes_cmd) => changes_cmd.execute(&git),
            Commands::Tag(tag_cmd) => tag_cmd.execute(&git),
            Commands::Receive(receive_cmd) => receive_cmd.execute(&git),
        }
    }
}
