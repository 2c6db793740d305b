//! Revision range resolution for push events.
//!
//! Determines which commits a push introduced, oldest first. When a
//! deployment only wants commits unique to the pushed branch, every other
//! branch head is excluded as well, so commits merged in from a branch that
//! was already announced are not announced twice.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::git::branches::BranchMembership;
use crate::git::command::{CommandRunner, GitCommand};
use crate::git::error::{GitError, Result};
use crate::git::push::{PushEvent, PushKind};
use crate::git::types::CommitId;

/// Ordered commits, oldest first, without duplicates.
pub type CommitRange = Vec<CommitId>;

/// Commits per `git show` invocation when looking up subjects.
const SUBJECT_BATCH: usize = 256;

/// A commit with its subject line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSubject {
    /// The commit.
    pub commit: CommitId,
    /// First line of its message.
    pub subject: String,
}

/// Resolves push events into commit ranges.
pub struct RangeResolver<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
}

impl<'a, R: CommandRunner + ?Sized> RangeResolver<'a, R> {
    /// Creates a resolver that queries through `runner`.
    pub fn new(runner: &'a R) -> Self {
        Self { runner }
    }

    /// Returns the commits introduced by `event`, oldest first.
    ///
    /// With `restrict_to_branch`, commits reachable from any other branch
    /// head are left out. A deletion introduces nothing.
    pub fn resolve(&self, event: &PushEvent, restrict_to_branch: bool) -> Result<CommitRange> {
        let Some(new) = &event.new else {
            debug!(ref_name = %event.ref_name, "Deleted ref introduces no commits");
            return Ok(Vec::new());
        };

        let mut exclusions: Vec<CommitId> = Vec::new();
        if restrict_to_branch {
            let own = event.ref_name.full_name();
            for (name, head) in BranchMembership::new(self.runner).branch_tips()? {
                if name != own && !exclusions.contains(&head) {
                    exclusions.push(head);
                }
            }
        }
        if let Some(old) = &event.old {
            if !exclusions.contains(old) {
                exclusions.push(old.clone());
            }
        }

        let mut cmd = GitCommand::new("rev-list").arg("--reverse");
        for excluded in &exclusions {
            cmd = cmd.excluded_revision(excluded.as_str())?;
        }
        let cmd = cmd.revision(new.as_str())?;

        let range = self.collect(&cmd)?;
        debug!(
            ref_name = %event.ref_name,
            excluded = exclusions.len(),
            commits = range.len(),
            "Resolved push range"
        );
        Ok(range)
    }

    /// Returns commits that were on the ref before the push but are no longer
    /// reachable from it, oldest first. Only updates can discard commits.
    pub fn discarded(&self, event: &PushEvent) -> Result<CommitRange> {
        let (Some(old), Some(new)) = (&event.old, &event.new) else {
            return Ok(Vec::new());
        };
        let cmd = GitCommand::new("rev-list")
            .arg("--reverse")
            .excluded_revision(new.as_str())?
            .revision(old.as_str())?;
        self.collect(&cmd)
    }

    /// Returns whether the update kept every previously reachable commit.
    ///
    /// Creations are trivially fast-forwards; deletions never are.
    pub fn is_fast_forward(&self, event: &PushEvent) -> Result<bool> {
        let (old, new) = match (event.kind(), &event.old, &event.new) {
            (PushKind::Update, Some(old), Some(new)) => (old, new),
            (PushKind::Create, _, _) => return Ok(true),
            _ => return Ok(false),
        };
        let cmd = GitCommand::new("merge-base")
            .arg("--is-ancestor")
            .revision(old.as_str())?
            .revision(new.as_str())?;
        match self.runner.run(&cmd) {
            Ok(_) => Ok(true),
            Err(GitError::CommandFailure { exit_code: 1, .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Looks up the subject line of every commit in `range`, keeping order.
    pub fn subjects(&self, range: &[CommitId]) -> Result<Vec<CommitSubject>> {
        let mut subjects = Vec::with_capacity(range.len());
        for batch in range.chunks(SUBJECT_BATCH) {
            let mut cmd = GitCommand::new("show")
                .arg("--no-patch")
                .arg("--no-walk=unsorted")
                .arg("--format=%H%x1f%s");
            for id in batch {
                cmd = cmd.revision(id.as_str())?;
            }
            for line in self.runner.run_lines(&cmd)? {
                match line.split_once('\u{1f}') {
                    Some((commit, subject)) => subjects.push(CommitSubject {
                        commit: CommitId::new(commit),
                        subject: subject.to_string(),
                    }),
                    None if line.is_empty() => {}
                    None => warn!(line = %line, "Skipping malformed commit summary"),
                }
            }
        }
        Ok(subjects)
    }

    fn collect(&self, cmd: &GitCommand) -> Result<CommitRange> {
        Ok(self
            .runner
            .run_lines(cmd)?
            .into_iter()
            .filter(|line| !line.is_empty())
            .map(CommitId::new)
            .collect())
    }
}
