//! Push events as delivered to a receive hook.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::git::error::{GitError, Result};
use crate::git::types::{CommitId, RefName};

/// What a push did to its ref.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PushKind {
    /// The ref did not exist before the push.
    Create,
    /// The ref moved from one commit to another.
    Update,
    /// The ref was removed.
    Delete,
}

/// One ref update: `old` is `None` on creation, `new` is `None` on deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushEvent {
    /// Commit the ref pointed at before the push.
    pub old: Option<CommitId>,
    /// Commit the ref points at after the push.
    pub new: Option<CommitId>,
    /// The updated ref.
    pub ref_name: RefName,
}

impl PushEvent {
    /// Builds an event from raw hook arguments; zero ids become `None`.
    pub fn new(old: &str, new: &str, ref_name: &str) -> Self {
        Self {
            old: CommitId::from_hook_arg(old),
            new: CommitId::from_hook_arg(new),
            ref_name: RefName::new(ref_name),
        }
    }

    /// Parses one `old new ref` line as read by a post-receive hook.
    pub fn parse_line(line: &str) -> Result<Self> {
        let mut fields = line.split_whitespace();
        match (fields.next(), fields.next(), fields.next(), fields.next()) {
            (Some(old), Some(new), Some(ref_name), None) => Ok(Self::new(old, new, ref_name)),
            _ => Err(GitError::MalformedRecord {
                kind: "push event",
                line: line.to_string(),
            }),
        }
    }

    /// Parses every non-blank line, skipping malformed ones.
    pub fn parse_all(input: &str) -> Vec<Self> {
        input
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match Self::parse_line(line) {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!("Skipping push event: {e}");
                    None
                }
            })
            .collect()
    }

    /// Classifies the event by which side carries the zero id.
    pub fn kind(&self) -> PushKind {
        match (&self.old, &self.new) {
            (None, Some(_)) => PushKind::Create,
            (Some(_), Some(_)) => PushKind::Update,
            (_, None) => PushKind::Delete,
        }
    }
}
