//! # push-scope
//!
//! Works out what a push to a git repository changed, for notification
//! hooks that announce pushes.
//!
//! ## Features
//!
//! - Commit ranges for ref updates, optionally limited to commits unique to
//!   the pushed branch
//! - Changed files partitioned into modified, added, deleted and renamed
//! - Commits between consecutive annotated tags, plus tag metadata
//!
//! ## Quick Start
//!
//! ```no_run
//! use push_scope::git::{Git, PushEvent, RangeResolver};
//!
//! let git = Git::discover(".")?;
//! let event = PushEvent::new(
//!     "0000000000000000000000000000000000000000",
//!     "HEAD",
//!     "refs/heads/main",
//! );
//! let commits = RangeResolver::new(&git).resolve(&event, false)?;
//! println!("{} new commits", commits.len());
//! # Ok::<(), push_scope::git::GitError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod cli;
pub mod data;
pub mod git;
pub mod utils;

pub use crate::cli::Cli;

/// The current version of push-scope.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
