//! Report model for push events.
//!
//! A [`PushReport`] gathers everything a notification about one ref update
//! needs: the new commits, commits a forced update discarded, the files that
//! changed, and for tags, the commits since the previous release.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::git::error::{GitError, Result};
use crate::git::{
    ChangeClassifier, ChangeSet, ClassifyOptions, CommandRunner, CommitId, CommitSubject,
    PushEvent, PushKind, RangeResolver, Resolver, TagInfo, TagRangeEntry, TagRangeExtractor,
};
use crate::utils::truncate;

pub mod yaml;

pub use yaml::*;

/// Default maximum subject length in reports.
pub const DEFAULT_MAX_SUBJECT_LENGTH: usize = 100;

/// Options for building a report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportOptions {
    /// Leave out commits reachable from other branches, both from the
    /// commit list and from the classified changes.
    pub restrict_to_branch: bool,
    /// Diff options for change classification.
    pub classify: ClassifyOptions,
    /// Subjects longer than this are truncated.
    pub max_subject_length: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            restrict_to_branch: false,
            classify: ClassifyOptions::default(),
            max_subject_length: DEFAULT_MAX_SUBJECT_LENGTH,
        }
    }
}

/// Everything known about one ref update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushReport {
    /// The updated ref.
    pub ref_name: String,
    /// Whether the ref was created, updated or deleted.
    pub kind: PushKind,
    /// Previous tip, absent on creation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old: Option<CommitId>,
    /// New tip, absent on deletion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new: Option<CommitId>,
    /// Human-readable label for the new tip.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// False when the update discarded commits.
    pub fast_forward: bool,
    /// Commits introduced by the push, oldest first.
    pub commits: Vec<CommitSubject>,
    /// Commits no longer reachable from the ref, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub discarded: Vec<CommitSubject>,
    /// Files touched by the introduced commits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changes: Option<ChangeSet>,
    /// Tag details for tag pushes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<TagReport>,
}

/// Commits introduced and discarded by a ref update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeReport {
    /// False when the update discarded commits.
    pub fast_forward: bool,
    /// Commits introduced by the push, oldest first.
    pub commits: Vec<CommitSubject>,
    /// Commits no longer reachable from the ref, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub discarded: Vec<CommitSubject>,
}

/// Classified changes between two revisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeReport {
    /// Paths by change kind.
    pub changes: ChangeSet,
    /// Blob ids of renamed paths at the newer revision.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub renamed_blobs: BTreeMap<String, CommitId>,
}

/// Tag section of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagReport {
    /// Short tag name.
    pub name: String,
    /// Metadata, absent for lightweight tags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<TagInfo>,
    /// Commits since the previous annotated tag, oldest first.
    pub commits: Vec<TagRangeEntry>,
}

impl PushReport {
    /// Builds the report for `event`. Any failing query fails the report;
    /// a partial commit list is never returned.
    pub fn build<R: CommandRunner + ?Sized>(
        runner: &R,
        event: &PushEvent,
        options: &ReportOptions,
    ) -> Result<Self> {
        let mut report = PushReport {
            ref_name: event.ref_name.to_string(),
            kind: event.kind(),
            old: event.old.clone(),
            new: event.new.clone(),
            description: None,
            fast_forward: false,
            commits: Vec::new(),
            discarded: Vec::new(),
            changes: None,
            tag: None,
        };

        let Some(new) = &event.new else {
            return Ok(report);
        };

        let resolver = Resolver::new(runner);
        report.description = Some(resolver.describe(new.as_str())?);

        if let Some(tag_name) = event.ref_name.tag_name() {
            report.fast_forward = true;
            report.tag = Some(TagReport::build(
                runner,
                tag_name,
                new.as_str(),
                options.max_subject_length,
            )?);
            return Ok(report);
        }

        let range = RangeResolver::new(runner).resolve(event, options.restrict_to_branch)?;
        if let Some(oldest) = range.first() {
            let classifier = ChangeClassifier::new(runner);
            let changes = if options.restrict_to_branch {
                // commits already on other branches were left out of the range
                classifier.classify_commits(&range, &options.classify)?
            } else {
                let base = match &event.old {
                    Some(old) => Some(old.clone()),
                    None => parent_of(&resolver, oldest)?,
                };
                classifier.classify(
                    base.as_ref().map(CommitId::as_str),
                    new.as_str(),
                    &options.classify,
                )?
            };
            report.changes = Some(changes);
        }

        let range = RangeReport::from_range(runner, event, &range, options.max_subject_length)?;
        report.fast_forward = range.fast_forward;
        report.commits = range.commits;
        report.discarded = range.discarded;
        Ok(report)
    }
}

impl RangeReport {
    /// Resolves the commits `event` introduced and discarded.
    pub fn build<R: CommandRunner + ?Sized>(
        runner: &R,
        event: &PushEvent,
        restrict_to_branch: bool,
        max_subject_length: usize,
    ) -> Result<Self> {
        let range = RangeResolver::new(runner).resolve(event, restrict_to_branch)?;
        Self::from_range(runner, event, &range, max_subject_length)
    }

    fn from_range<R: CommandRunner + ?Sized>(
        runner: &R,
        event: &PushEvent,
        range: &[CommitId],
        max_subject_length: usize,
    ) -> Result<Self> {
        let ranges = RangeResolver::new(runner);
        let discarded = ranges.discarded(event)?;
        Ok(RangeReport {
            fast_forward: ranges.is_fast_forward(event)?,
            commits: shorten(ranges.subjects(range)?, max_subject_length),
            discarded: shorten(ranges.subjects(&discarded)?, max_subject_length),
        })
    }
}

impl ChangeReport {
    /// Classifies the changes after `rev1` up to `rev2`. With
    /// `with_renamed_blobs`, also looks up the blob id of every renamed path.
    pub fn build<R: CommandRunner + ?Sized>(
        runner: &R,
        rev1: Option<&str>,
        rev2: &str,
        options: &ClassifyOptions,
        with_renamed_blobs: bool,
    ) -> Result<Self> {
        let classifier = ChangeClassifier::new(runner);
        let changes = classifier.classify(rev1, rev2, options)?;

        let mut renamed_blobs = BTreeMap::new();
        if with_renamed_blobs {
            for path in &changes.renamed {
                renamed_blobs.insert(path.clone(), classifier.blob_id(rev2, path)?);
            }
        }

        Ok(ChangeReport {
            changes,
            renamed_blobs,
        })
    }
}

impl TagReport {
    /// Builds the tag section for `tag_name`, whose tag object or commit is
    /// `rev`.
    pub fn build<R: CommandRunner + ?Sized>(
        runner: &R,
        tag_name: &str,
        rev: &str,
        max_subject_length: usize,
    ) -> Result<Self> {
        let tagged_commit = Resolver::new(runner).resolve_commit(rev)?;
        let tags = TagRangeExtractor::new(runner);

        let info = tags.tag_info(tag_name)?.map(|mut info| {
            info.subject = truncate(&info.subject, max_subject_length);
            info
        });
        let commits = tags
            .commits_between_tags(tag_name, tagged_commit.as_str())?
            .into_iter()
            .map(|entry| TagRangeEntry {
                subject: truncate(&entry.subject, max_subject_length),
                ..entry
            })
            .collect();

        Ok(TagReport {
            name: tag_name.to_string(),
            info,
            commits,
        })
    }
}

/// Returns the first parent of `commit`, or `None` for a root commit.
fn parent_of<R: CommandRunner + ?Sized>(
    resolver: &Resolver<'_, R>,
    commit: &CommitId,
) -> Result<Option<CommitId>> {
    match resolver.resolve(&format!("{commit}^")) {
        Ok(parent) => Ok(Some(parent)),
        Err(GitError::Resolution(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

fn shorten(subjects: Vec<CommitSubject>, max_subject_length: usize) -> Vec<CommitSubject> {
    subjects
        .into_iter()
        .map(|s| CommitSubject {
            subject: truncate(&s.subject, max_subject_length),
            ..s
        })
        .collect()
}
