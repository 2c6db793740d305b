//! Error types for repository queries.

use thiserror::Error;

/// Errors raised while querying a repository.
#[derive(Error, Debug)]
pub enum GitError {
    /// A git command exited with a non-zero status.
    #[error("git {command} exited with status {exit_code}: {stderr}")]
    CommandFailure {
        /// The command line that failed, for reporting only.
        command: String,
        /// Exit status, or -1 if the process was terminated by a signal.
        exit_code: i32,
        /// Trimmed standard error output.
        stderr: String,
    },

    /// The git executable could not be started.
    #[error("Failed to execute git: {0}")]
    Spawn(#[from] std::io::Error),

    /// A ref or expression did not resolve to an object.
    #[error("Cannot resolve '{0}'")]
    Resolution(String),

    /// A line of git output did not have the expected shape.
    #[error("Malformed {kind} record: {line:?}")]
    MalformedRecord {
        /// What kind of record was being parsed.
        kind: &'static str,
        /// The offending line.
        line: String,
    },

    /// A revision, path or option value was rejected before running git.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The repository could not be located.
    #[error("Failed to locate git repository: {0}")]
    Discover(#[from] git2::Error),
}

impl GitError {
    /// Returns the exit code when this is a command failure.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            GitError::CommandFailure { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }
}

/// Result alias for repository queries.
pub type Result<T> = std::result::Result<T, GitError>;
