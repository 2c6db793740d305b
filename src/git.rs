//! Git queries: ranges, change classification and tags.

pub mod branches;
pub mod changes;
pub mod command;
pub mod error;
pub mod push;
pub mod range;
pub mod resolve;
pub mod tags;
pub mod types;

#[cfg(test)]
pub(crate) mod test_utils;

pub use branches::BranchMembership;
pub use changes::{
    ChangeClassifier, ChangeKind, ChangeSet, ClassifyOptions, StatusRow, WhitespacePolicy,
};
pub use command::{CommandRunner, Git, GitCommand};
pub use error::GitError;
pub use push::{PushEvent, PushKind};
pub use range::{CommitRange, CommitSubject, RangeResolver};
pub use resolve::Resolver;
pub use tags::{TagInfo, TagRangeEntry, TagRangeExtractor};
pub use types::{CommitId, ObjectType, RefName, ZERO_ID};
