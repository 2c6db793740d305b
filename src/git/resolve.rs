//! Resolves symbolic references to object ids.

use crate::git::command::{CommandRunner, GitCommand};
use crate::git::error::{GitError, Result};
use crate::git::types::{is_zero_id, CommitId, ObjectType};

/// Identifier resolver backed by a command runner.
pub struct Resolver<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
}

impl<'a, R: CommandRunner + ?Sized> Resolver<'a, R> {
    /// Creates a resolver that queries through `runner`.
    pub fn new(runner: &'a R) -> Self {
        Self { runner }
    }

    /// Resolves `rev` to its full object id.
    pub fn resolve(&self, rev: &str) -> Result<CommitId> {
        let cmd = GitCommand::new("rev-parse")
            .arg("--verify")
            .arg("--quiet")
            .revision(rev)?;
        self.resolve_with(&cmd, rev)
    }

    /// Resolves `rev` to an abbreviated object id.
    pub fn resolve_short(&self, rev: &str) -> Result<CommitId> {
        let cmd = GitCommand::new("rev-parse")
            .arg("--verify")
            .arg("--quiet")
            .arg("--short")
            .revision(rev)?;
        self.resolve_with(&cmd, rev)
    }

    /// Resolves `rev` to the full id of the commit it ultimately points at,
    /// peeling annotated tags.
    pub fn resolve_commit(&self, rev: &str) -> Result<CommitId> {
        let cmd = GitCommand::new("rev-parse")
            .arg("--verify")
            .arg("--quiet")
            .revision(format!("{rev}^{{commit}}"))?;
        self.resolve_with(&cmd, rev)
    }

    fn resolve_with(&self, cmd: &GitCommand, rev: &str) -> Result<CommitId> {
        match self.runner.run(cmd) {
            Ok(output) => {
                let id = output.trim();
                if id.is_empty() {
                    Err(GitError::Resolution(rev.to_string()))
                } else {
                    Ok(CommitId::new(id))
                }
            }
            Err(GitError::CommandFailure { .. }) => Err(GitError::Resolution(rev.to_string())),
            Err(e) => Err(e),
        }
    }

    /// Returns the type of object `id`, or `None` if it does not exist.
    pub fn object_type(&self, id: &str) -> Result<Option<ObjectType>> {
        if is_zero_id(id) {
            return Ok(None);
        }
        let cmd = GitCommand::new("cat-file").arg("-t").revision(id)?;
        match self.runner.run(&cmd) {
            Ok(output) => Ok(ObjectType::parse(&output)),
            Err(GitError::CommandFailure { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Describes `rev` relative to the nearest annotated tag, falling back to
    /// an abbreviated id when no tag is reachable. For display only.
    pub fn describe(&self, rev: &str) -> Result<String> {
        let cmd = GitCommand::new("describe").arg("--always").revision(rev)?;
        Ok(self.runner.run(&cmd)?.trim().to_string())
    }
}
