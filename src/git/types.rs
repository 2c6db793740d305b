//! Identifier types shared by the engine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The all-zero id git hooks use to signal ref creation or deletion.
pub const ZERO_ID: &str = "0000000000000000000000000000000000000000";

/// Opaque handle to a repository object, full or abbreviated.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitId(String);

impl CommitId {
    /// Wraps an id string as returned by git.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Parses an id from a hook argument, mapping the zero id to `None`.
    pub fn from_hook_arg(id: &str) -> Option<Self> {
        let id = id.trim();
        if is_zero_id(id) {
            None
        } else {
            Some(Self(id.to_string()))
        }
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the first `len` characters, or the whole id if shorter.
    pub fn abbreviated(&self, len: usize) -> &str {
        self.0.get(..len).unwrap_or(&self.0)
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CommitId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Returns true for a non-empty id made only of `0` characters.
pub fn is_zero_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b == b'0')
}

/// Symbolic name of a branch or tag, as supplied by a push event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefName(String);

const HEADS_PREFIX: &str = "refs/heads/";
const TAGS_PREFIX: &str = "refs/tags/";

impl RefName {
    /// Wraps a ref name; short names such as `main` are accepted.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name exactly as supplied.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the fully qualified name, treating unqualified names as
    /// branches.
    pub fn full_name(&self) -> String {
        if self.0.starts_with("refs/") {
            self.0.clone()
        } else {
            format!("{HEADS_PREFIX}{}", self.0)
        }
    }

    /// Returns the branch name for `refs/heads/*` or unqualified names.
    pub fn branch_name(&self) -> Option<&str> {
        if let Some(name) = self.0.strip_prefix(HEADS_PREFIX) {
            Some(name)
        } else if self.0.starts_with("refs/") {
            None
        } else {
            Some(&self.0)
        }
    }

    /// Returns the tag name for `refs/tags/*`.
    pub fn tag_name(&self) -> Option<&str> {
        self.0.strip_prefix(TAGS_PREFIX)
    }

    /// Returns the name with any `refs/heads/` or `refs/tags/` prefix removed.
    pub fn short_name(&self) -> &str {
        self.tag_name()
            .or_else(|| self.branch_name())
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for RefName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of object stored in a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    /// A commit.
    Commit,
    /// An annotated tag object.
    Tag,
    /// A directory tree.
    Tree,
    /// File content.
    Blob,
}

impl ObjectType {
    /// Parses the type name printed by `git cat-file -t`.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim() {
            "commit" => Some(Self::Commit),
            "tag" => Some(Self::Tag),
            "tree" => Some(Self::Tree),
            "blob" => Some(Self::Blob),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Commit => "commit",
            Self::Tag => "tag",
            Self::Tree => "tree",
            Self::Blob => "blob",
        };
        f.write_str(name)
    }
}
