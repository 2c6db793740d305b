//! Branch membership: which commits belong to exactly one branch.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::git::command::{CommandRunner, GitCommand};
use crate::git::error::{GitError, Result};
use crate::git::resolve::Resolver;
use crate::git::types::CommitId;

/// Computes branch heads and commits unique to one branch.
pub struct BranchMembership<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
}

impl<'a, R: CommandRunner + ?Sized> BranchMembership<'a, R> {
    /// Creates a calculator that queries through `runner`.
    pub fn new(runner: &'a R) -> Self {
        Self { runner }
    }

    /// Returns every local branch, keyed by full ref name, with its tip.
    pub fn branch_tips(&self) -> Result<BTreeMap<String, CommitId>> {
        let cmd = GitCommand::new("for-each-ref")
            .arg("--format=%(refname) %(objectname)")
            .arg("refs/heads");

        let mut tips = BTreeMap::new();
        for line in self.runner.run_lines(&cmd)? {
            match parse_tip(&line) {
                Ok((name, id)) => {
                    tips.insert(name, id);
                }
                Err(e) => warn!("Skipping branch: {e}"),
            }
        }
        Ok(tips)
    }

    /// Returns the set of all branch tip commits.
    pub fn branch_heads(&self) -> Result<BTreeSet<CommitId>> {
        Ok(self.branch_tips()?.into_values().collect())
    }

    /// Returns commits reachable from `tip` but from no other branch head.
    pub fn unique_to_branch(&self, tip: &str) -> Result<BTreeSet<CommitId>> {
        let tip_id = Resolver::new(self.runner).resolve_commit(tip)?;

        let mut cmd = GitCommand::new("rev-list").revision(tip_id.as_str())?;
        for head in self.branch_heads()? {
            if head != tip_id {
                cmd = cmd.excluded_revision(head.as_str())?;
            }
        }

        let unique: BTreeSet<CommitId> = self
            .runner
            .run_lines(&cmd)?
            .into_iter()
            .filter(|line| !line.is_empty())
            .map(CommitId::new)
            .collect();
        debug!(tip, count = unique.len(), "Computed commits unique to branch");
        Ok(unique)
    }
}

fn parse_tip(line: &str) -> Result<(String, CommitId)> {
    match line.split_once(' ') {
        Some((name, id)) if !name.is_empty() && !id.is_empty() => {
            Ok((name.to_string(), CommitId::new(id.trim())))
        }
        _ => Err(GitError::MalformedRecord {
            kind: "branch",
            line: line.to_string(),
        }),
    }
}
