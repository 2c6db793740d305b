//! Change classification for a range of commits.
//!
//! Runs `git log --name-status` over the range and folds the per-commit
//! status rows into one [`ChangeSet`], where every touched path lands in
//! exactly one of the four change kinds.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::git::command::{CommandRunner, GitCommand};
use crate::git::error::{GitError, Result};
use crate::git::types::{is_zero_id, CommitId};

/// Default rename similarity: half the content must match.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.5;

/// Commits per `git log --no-walk` invocation when classifying a commit list.
const COMMIT_BATCH: usize = 256;

#[allow(clippy::unwrap_used)] // Compile-time constant regex pattern
static STATUS_ROW_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<code>[A-Z])(?P<score>\d{1,3})?\s+(?P<paths>\S.*)$").unwrap()
});

/// Which whitespace differences the diff should ignore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WhitespacePolicy {
    /// Ignore all whitespace.
    All,
    /// Ignore changes in the amount of whitespace only.
    Change,
}

impl WhitespacePolicy {
    fn diff_flag(self) -> &'static str {
        match self {
            WhitespacePolicy::All => "--ignore-all-space",
            WhitespacePolicy::Change => "--ignore-space-change",
        }
    }
}

impl FromStr for WhitespacePolicy {
    type Err = GitError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(WhitespacePolicy::All),
            "change" => Ok(WhitespacePolicy::Change),
            other => Err(GitError::InvalidArgument(format!(
                "unknown whitespace policy '{other}' (expected 'all' or 'change')"
            ))),
        }
    }
}

impl fmt::Display for WhitespacePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WhitespacePolicy::All => f.write_str("all"),
            WhitespacePolicy::Change => f.write_str("change"),
        }
    }
}

/// Diff options for classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifyOptions {
    /// Fraction of content (0.0 to 1.0) that must match for a delete and an
    /// add to count as a rename.
    pub similarity_threshold: f64,
    /// Whitespace differences to ignore; `None` compares exactly.
    pub whitespace: Option<WhitespacePolicy>,
}

impl Default for ClassifyOptions {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            whitespace: None,
        }
    }
}

impl ClassifyOptions {
    /// Returns the `-M<NN>%` rename detection flag.
    pub fn rename_flag(&self) -> Result<String> {
        let threshold = self.similarity_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(GitError::InvalidArgument(format!(
                "similarity threshold {threshold} must be between 0.0 and 1.0"
            )));
        }
        Ok(format!("-M{}%", (threshold * 100.0).round() as u32))
    }
}

/// How a path changed over a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Content changed in place.
    Modified,
    /// The path was created.
    Added,
    /// The path was removed.
    Deleted,
    /// The path is the destination of a rename.
    Renamed,
}

impl ChangeKind {
    fn from_code(code: char) -> Option<Self> {
        match code {
            'M' => Some(ChangeKind::Modified),
            'A' => Some(ChangeKind::Added),
            'D' => Some(ChangeKind::Deleted),
            'R' => Some(ChangeKind::Renamed),
            _ => None,
        }
    }

    /// Folds a later change to the same path into an earlier one.
    fn then(self, later: ChangeKind) -> ChangeKind {
        match (self, later) {
            (_, ChangeKind::Deleted) => ChangeKind::Deleted,
            (ChangeKind::Added, ChangeKind::Modified) => ChangeKind::Added,
            (ChangeKind::Renamed, ChangeKind::Modified) => ChangeKind::Renamed,
            (ChangeKind::Deleted, ChangeKind::Added) => ChangeKind::Modified,
            (_, later) => later,
        }
    }
}

/// Per-path fold state while reading rows oldest first.
#[derive(Debug, Clone, Copy)]
struct PathState {
    kind: ChangeKind,
    /// The path did not exist before its first row in the range.
    introduced: bool,
}

impl PathState {
    fn first(kind: ChangeKind) -> Self {
        Self {
            kind,
            introduced: kind == ChangeKind::Added,
        }
    }

    fn then(self, later: ChangeKind) -> Self {
        let kind = match (self.kind, later) {
            (ChangeKind::Deleted, ChangeKind::Added) if self.introduced => ChangeKind::Added,
            (ChangeKind::Added, ChangeKind::Renamed) => ChangeKind::Added,
            (kind, later) => kind.then(later),
        };
        Self {
            kind,
            introduced: self.introduced,
        }
    }
}

/// Decodes a path that git wrapped in double quotes with C-style escapes.
///
/// Octal escapes are raw bytes, so a multi-byte UTF-8 name spans several of
/// them. Unquoted input is returned as is.
fn unquote_path(raw: &str) -> String {
    let Some(inner) = raw
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    else {
        return raw.to_string();
    };

    let src = inner.as_bytes();
    let mut bytes = Vec::with_capacity(src.len());
    let mut i = 0;
    while i < src.len() {
        let byte = src[i];
        i += 1;
        if byte != b'\\' || i == src.len() {
            bytes.push(byte);
            continue;
        }
        let escape = src[i];
        i += 1;
        let decoded = match escape {
            b'a' => 0x07,
            b'b' => 0x08,
            b'f' => 0x0c,
            b'n' => b'\n',
            b'r' => b'\r',
            b't' => b'\t',
            b'v' => 0x0b,
            b'0'..=b'7' => match src.get(i..i + 2) {
                Some(&[d1 @ b'0'..=b'7', d2 @ b'0'..=b'7']) => {
                    i += 2;
                    let value = u16::from(escape - b'0') * 64
                        + u16::from(d1 - b'0') * 8
                        + u16::from(d2 - b'0');
                    u8::try_from(value).unwrap_or(b'?')
                }
                _ => escape,
            },
            other => other,
        };
        bytes.push(decoded);
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

/// One parsed `--name-status` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRow {
    /// Leading status letter.
    pub code: char,
    /// Similarity percentage for renames and copies.
    pub similarity: Option<u8>,
    /// Source path of a rename or copy.
    pub old_path: Option<String>,
    /// Path the change applies to (the destination for renames).
    pub path: String,
}

impl StatusRow {
    /// Parses a status row, or returns `None` for any other line (such as a
    /// commit summary).
    ///
    /// Rename rows are accepted in git's tab-separated form and in the
    /// `old -> new` form. Quoted paths are unescaped.
    pub fn parse(line: &str) -> Option<Self> {
        let caps = STATUS_ROW_PATTERN.captures(line.trim_end_matches(['\r', '\n']))?;
        let code = caps["code"].chars().next()?;
        let similarity = caps
            .name("score")
            .and_then(|m| m.as_str().parse::<u8>().ok());
        let paths = &caps["paths"];

        let (old_path, path) = if matches!(code, 'R' | 'C') {
            if let Some((old, new)) = paths.rsplit_once('\t') {
                (Some(unquote_path(old)), unquote_path(new))
            } else if let Some((old, new)) = paths.rsplit_once(" -> ") {
                (Some(unquote_path(old)), unquote_path(new))
            } else {
                (None, unquote_path(paths))
            }
        } else {
            (None, unquote_path(paths))
        };

        Some(Self {
            code,
            similarity,
            old_path,
            path,
        })
    }

    /// Returns the change kind, or `None` for codes that are not classified
    /// (copies, type changes, unmerged entries).
    pub fn kind(&self) -> Option<ChangeKind> {
        ChangeKind::from_code(self.code)
    }
}

/// Touched paths partitioned by change kind. The four sets are disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Paths whose content changed.
    pub modified: BTreeSet<String>,
    /// Paths that were created.
    pub added: BTreeSet<String>,
    /// Paths that were removed.
    pub deleted: BTreeSet<String>,
    /// Destination paths of renames.
    pub renamed: BTreeSet<String>,
}

impl ChangeSet {
    /// Builds a change set from `--name-status` output lines, oldest commit
    /// first. Lines that are not status rows are ignored, as are unknown
    /// status codes.
    ///
    /// Every row is folded into its path's history, so the final kind
    /// reflects the last change: a path deleted again after being re-added
    /// ends up deleted, and one re-added after its deletion does not.
    pub fn from_rows<I, S>(rows: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut states: BTreeMap<String, PathState> = BTreeMap::new();

        for line in rows {
            let Some(row) = StatusRow::parse(line.as_ref()) else {
                continue;
            };
            let Some(kind) = row.kind() else {
                debug!(code = %row.code, path = %row.path, "Ignoring unclassified status");
                continue;
            };

            let previous = match (&row.old_path, kind) {
                (Some(old), ChangeKind::Renamed) => match states.remove(old) {
                    // a path created in this range and then moved is still new
                    Some(source) if source.introduced => Some(PathState::first(ChangeKind::Added)),
                    _ => states.get(&row.path).copied(),
                },
                _ => states.get(&row.path).copied(),
            };
            let next = match previous {
                Some(prev) => prev.then(kind),
                None => PathState::first(kind),
            };
            states.insert(row.path, next);
        }

        let mut set = ChangeSet::default();
        for (path, state) in states {
            match state.kind {
                ChangeKind::Modified => set.modified.insert(path),
                ChangeKind::Added => set.added.insert(path),
                ChangeKind::Deleted => set.deleted.insert(path),
                ChangeKind::Renamed => set.renamed.insert(path),
            };
        }
        set
    }

    /// Returns how `path` changed, if it did.
    pub fn kind_of(&self, path: &str) -> Option<ChangeKind> {
        if self.modified.contains(path) {
            Some(ChangeKind::Modified)
        } else if self.added.contains(path) {
            Some(ChangeKind::Added)
        } else if self.deleted.contains(path) {
            Some(ChangeKind::Deleted)
        } else if self.renamed.contains(path) {
            Some(ChangeKind::Renamed)
        } else {
            None
        }
    }

    /// Iterates over every touched path.
    pub fn paths(&self) -> impl Iterator<Item = &String> {
        self.modified
            .iter()
            .chain(&self.added)
            .chain(&self.deleted)
            .chain(&self.renamed)
    }

    /// Number of touched paths.
    pub fn len(&self) -> usize {
        self.modified.len() + self.added.len() + self.deleted.len() + self.renamed.len()
    }

    /// Whether no path changed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Classifies the files touched between two revisions.
pub struct ChangeClassifier<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
}

impl<'a, R: CommandRunner + ?Sized> ChangeClassifier<'a, R> {
    /// Creates a classifier that queries through `runner`.
    pub fn new(runner: &'a R) -> Self {
        Self { runner }
    }

    /// Classifies every path touched by commits after `rev1` up to `rev2`.
    ///
    /// A missing or zero `rev1` covers the whole history of `rev2`.
    pub fn classify(
        &self,
        rev1: Option<&str>,
        rev2: &str,
        options: &ClassifyOptions,
    ) -> Result<ChangeSet> {
        let mut cmd = GitCommand::new("log")
            .arg("--oneline")
            .arg("--name-status")
            .arg("--reverse")
            .arg(options.rename_flag()?);
        if let Some(policy) = options.whitespace {
            cmd = cmd.arg(policy.diff_flag());
        }
        let cmd = match rev1.filter(|rev| !is_zero_id(rev)) {
            Some(rev1) => cmd.revision_range(rev1, rev2)?,
            None => cmd.revision(rev2)?,
        };

        let changes = ChangeSet::from_rows(self.runner.run_lines(&cmd)?);
        debug!(rev2, paths = changes.len(), "Classified changes");
        Ok(changes)
    }

    /// Classifies the paths touched by exactly `commits`, oldest first.
    ///
    /// Each commit contributes its own diff against its first parent, so
    /// commits between them that are not listed never leak into the result.
    pub fn classify_commits(
        &self,
        commits: &[CommitId],
        options: &ClassifyOptions,
    ) -> Result<ChangeSet> {
        let rename_flag = options.rename_flag()?;
        let mut rows = Vec::new();
        for batch in commits.chunks(COMMIT_BATCH) {
            let mut cmd = GitCommand::new("log")
                .arg("--oneline")
                .arg("--name-status")
                .arg("--no-walk=unsorted")
                .arg(rename_flag.as_str());
            if let Some(policy) = options.whitespace {
                cmd = cmd.arg(policy.diff_flag());
            }
            for id in batch {
                cmd = cmd.revision(id.as_str())?;
            }
            rows.extend(self.runner.run_lines(&cmd)?);
        }

        let changes = ChangeSet::from_rows(rows);
        debug!(commits = commits.len(), paths = changes.len(), "Classified commit list");
        Ok(changes)
    }

    /// Returns the blob id of `path` as of `rev`.
    ///
    /// Perfect renames carry no content change, so callers that need the
    /// object hash of a renamed file read it from the tree here instead of
    /// from the diff.
    pub fn blob_id(&self, rev: &str, path: &str) -> Result<CommitId> {
        let cmd = GitCommand::new("rev-parse")
            .arg("--verify")
            .arg("--quiet")
            .object_at_path(rev, path)?;
        match self.runner.run(&cmd) {
            Ok(out) if !out.trim().is_empty() => Ok(CommitId::new(out.trim())),
            Ok(_) | Err(GitError::CommandFailure { .. }) => {
                Err(GitError::Resolution(format!("{rev}:{path}")))
            }
            Err(e) => Err(e),
        }
    }
}
