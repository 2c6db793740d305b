//! Command gateway: the only place that spawns git.
//!
//! Each query is built with [`GitCommand`] as an argument vector. Revision
//! arguments are validated before anything is executed, so ref names from a
//! push event can never be interpreted as options.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use git2::Repository;
use tracing::debug;

use crate::git::error::{GitError, Result};

/// A single read-only git query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitCommand {
    args: Vec<String>,
}

impl GitCommand {
    /// Starts a query for the given git subcommand (e.g. `rev-list`).
    pub fn new(subcommand: &str) -> Self {
        Self {
            args: vec![subcommand.to_string()],
        }
    }

    /// Appends a literal option. Only use for values chosen by this crate.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends a validated revision expression.
    pub fn revision(mut self, rev: impl Into<String>) -> Result<Self> {
        let rev = rev.into();
        validate_revision(&rev)?;
        self.args.push(rev);
        Ok(self)
    }

    /// Appends a validated revision in negated (`^rev`) form.
    pub fn excluded_revision(mut self, rev: &str) -> Result<Self> {
        validate_revision(rev)?;
        self.args.push(format!("^{rev}"));
        Ok(self)
    }

    /// Appends a validated `from..to` range.
    pub fn revision_range(mut self, from: &str, to: &str) -> Result<Self> {
        validate_revision(from)?;
        validate_revision(to)?;
        self.args.push(format!("{from}..{to}"));
        Ok(self)
    }

    /// Appends a `rev:path` object expression.
    pub fn object_at_path(mut self, rev: &str, path: &str) -> Result<Self> {
        validate_revision(rev)?;
        validate_path(path)?;
        self.args.push(format!("{rev}:{path}"));
        Ok(self)
    }

    /// Returns the argument vector, excluding the `git` executable.
    pub fn as_args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for GitCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.args.join(" "))
    }
}

/// Rejects revision arguments that git could misread as options or that
/// cannot be a single argv entry.
pub fn validate_revision(rev: &str) -> Result<()> {
    if rev.is_empty() {
        return Err(GitError::InvalidArgument(
            "revision cannot be empty".to_string(),
        ));
    }
    if rev.starts_with('-') {
        return Err(GitError::InvalidArgument(format!(
            "revision '{rev}' must not start with '-'"
        )));
    }
    if rev.contains(['\0', '\n', '\r']) {
        return Err(GitError::InvalidArgument(format!(
            "revision {rev:?} contains control characters"
        )));
    }
    Ok(())
}

fn validate_path(path: &str) -> Result<()> {
    if path.is_empty() || path.contains(['\0', '\n']) {
        return Err(GitError::InvalidArgument(format!("invalid path {path:?}")));
    }
    Ok(())
}

/// Executes git queries.
pub trait CommandRunner {
    /// Runs a query and returns its standard output, lossily decoded.
    fn run(&self, command: &GitCommand) -> Result<String>;

    /// Runs a query and returns its output split into lines.
    fn run_lines(&self, command: &GitCommand) -> Result<Vec<String>> {
        Ok(self.run(command)?.lines().map(str::to_string).collect())
    }
}

impl<T: CommandRunner + ?Sized> CommandRunner for &T {
    fn run(&self, command: &GitCommand) -> Result<String> {
        (**self).run(command)
    }
}

/// Runs queries with the `git` executable against one repository.
///
/// Paths in the output are printed verbatim (`core.quotePath=false`), so
/// non-ASCII file names come back as UTF-8 rather than octal escapes.
#[derive(Debug, Clone)]
pub struct Git {
    dir: PathBuf,
}

impl Git {
    /// Uses `dir` as the repository directory without checking it.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Locates the repository containing `path`.
    ///
    /// Bare repositories (the usual home of a post-receive hook) are run
    /// from their git directory, others from their work tree.
    pub fn discover<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Repository::discover(path)?;
        let dir = repo.workdir().unwrap_or_else(|| repo.path()).to_path_buf();
        debug!(dir = %dir.display(), "Discovered repository");
        Ok(Self { dir })
    }
}

impl CommandRunner for Git {
    fn run(&self, command: &GitCommand) -> Result<String> {
        debug!(command = %command, "Running git query");

        let output = Command::new("git")
            .arg("-C")
            .arg(&self.dir)
            .args(["-c", "core.quotePath=false"])
            .arg("--no-pager")
            .args(command.as_args())
            .output()?;

        if !output.status.success() {
            let exit_code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            debug!(command = %command, exit_code, "git query failed");
            return Err(GitError::CommandFailure {
                command: command.to_string(),
                exit_code,
                stderr,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
