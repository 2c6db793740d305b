//! Tag metadata and the commits between consecutive annotated tags.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::git::command::{CommandRunner, GitCommand};
use crate::git::error::{GitError, Result};
use crate::git::types::{CommitId, ObjectType};

const FIELD_DELIMITER: char = '\u{1f}';
const RECORD_DELIMITER: char = '\u{1e}';

/// Keys of the tag record and the `for-each-ref` atoms that fill them.
const TAG_FIELDS: [(&str, &str); 9] = [
    ("refname", "%(refname)"),
    ("objecttype", "%(objecttype)"),
    ("object", "%(object)"),
    ("type", "%(type)"),
    ("taggername", "%(taggername)"),
    ("taggeremail", "%(taggeremail)"),
    ("taggerdate", "%(taggerdate:iso-strict)"),
    ("subject", "%(subject)"),
    ("body", "%(body)"),
];

/// Metadata of an annotated tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagInfo {
    /// Object the tag points at.
    pub tagged_object: CommitId,
    /// Type of the tagged object.
    pub tagged_type: ObjectType,
    /// Name of the tagger.
    pub tagger_name: String,
    /// Email of the tagger, without angle brackets.
    pub tagger_email: String,
    /// When the tag was created, if git recorded a date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tagger_date: Option<DateTime<FixedOffset>>,
    /// First line of the tag message.
    pub subject: String,
    /// Remainder of the tag message.
    pub body: String,
}

/// A commit between two tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRangeEntry {
    /// The commit.
    pub commit: CommitId,
    /// Its subject line.
    pub subject: String,
}

/// Reads tag metadata and tag-to-tag commit lists.
pub struct TagRangeExtractor<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
}

impl<'a, R: CommandRunner + ?Sized> TagRangeExtractor<'a, R> {
    /// Creates an extractor that queries through `runner`.
    pub fn new(runner: &'a R) -> Self {
        Self { runner }
    }

    /// Returns the nearest annotated tag reachable from the first parent of
    /// `tagged_commit`, or `None` when there is none.
    ///
    /// Lightweight tags are not considered.
    pub fn previous_tag(&self, tagged_commit: &str) -> Result<Option<String>> {
        let cmd = GitCommand::new("describe")
            .arg("--abbrev=0")
            .revision(format!("{tagged_commit}^"))?;
        match self.runner.run(&cmd) {
            Ok(out) => {
                let tag = out.trim();
                Ok((!tag.is_empty()).then(|| tag.to_string()))
            }
            Err(GitError::CommandFailure { exit_code, .. }) => {
                debug!(tagged_commit, exit_code, "No previous annotated tag");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Lists the commits after the previous annotated tag up to `tag_name`,
    /// oldest first. Empty when no previous tag exists.
    pub fn commits_between_tags(
        &self,
        tag_name: &str,
        tagged_commit: &str,
    ) -> Result<Vec<TagRangeEntry>> {
        let Some(previous) = self.previous_tag(tagged_commit)? else {
            return Ok(Vec::new());
        };

        let cmd = GitCommand::new("log")
            .arg("--reverse")
            .arg("--format=%H%x1f%s")
            .revision_range(&previous, tag_name)?;

        let entries: Vec<TagRangeEntry> = self
            .runner
            .run_lines(&cmd)?
            .iter()
            .filter(|line| !line.is_empty())
            .filter_map(|line| match parse_range_entry(line) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping commit: {e}");
                    None
                }
            })
            .collect();
        debug!(
            tag_name,
            previous = %previous,
            commits = entries.len(),
            "Listed commits between tags"
        );
        Ok(entries)
    }

    /// Reads the metadata of tag `tag_name`.
    ///
    /// Returns `None` when the tag does not exist or is lightweight.
    pub fn tag_info(&self, tag_name: &str) -> Result<Option<TagInfo>> {
        let full_name = if tag_name.starts_with("refs/tags/") {
            tag_name.to_string()
        } else {
            format!("refs/tags/{tag_name}")
        };
        let cmd = GitCommand::new("for-each-ref")
            .arg(format!("--format={}", tag_format()))
            .revision(full_name.as_str())?;

        let output = self.runner.run(&cmd)?;
        for record in output.split(RECORD_DELIMITER) {
            let record = record.trim_start_matches('\n');
            if record.is_empty() {
                continue;
            }
            let fields = parse_tag_record(record)?;
            if fields["refname"] != full_name {
                continue;
            }
            return tag_info_from_fields(&fields, record);
        }
        Ok(None)
    }
}

fn parse_range_entry(line: &str) -> Result<TagRangeEntry> {
    match line.split_once(FIELD_DELIMITER) {
        Some((commit, subject)) if !commit.is_empty() => Ok(TagRangeEntry {
            commit: CommitId::new(commit),
            subject: subject.to_string(),
        }),
        _ => Err(GitError::MalformedRecord {
            kind: "tag range",
            line: line.to_string(),
        }),
    }
}

pub(crate) fn tag_format() -> String {
    let mut format = TAG_FIELDS
        .iter()
        .map(|(key, atom)| format!("{key} {atom}"))
        .collect::<Vec<_>>()
        .join("%00");
    format.push_str("%1e");
    format
}

/// Splits a NUL-separated `key value` record, requiring every known key.
fn parse_tag_record(record: &str) -> Result<HashMap<&'static str, &str>> {
    let malformed = || GitError::MalformedRecord {
        kind: "tag",
        line: record.to_string(),
    };

    let mut fields = HashMap::new();
    for field in record.split('\0') {
        let (key, value) = field.split_once(' ').ok_or_else(malformed)?;
        let key = TAG_FIELDS
            .iter()
            .map(|(known, _)| *known)
            .find(|known| *known == key)
            .ok_or_else(malformed)?;
        fields.insert(key, value);
    }
    if fields.len() != TAG_FIELDS.len() {
        return Err(malformed());
    }
    Ok(fields)
}

fn tag_info_from_fields(
    fields: &HashMap<&'static str, &str>,
    record: &str,
) -> Result<Option<TagInfo>> {
    if fields["objecttype"] != "tag" {
        debug!(tag = fields["refname"], "Lightweight tag has no metadata");
        return Ok(None);
    }
    let tagged_type =
        ObjectType::parse(fields["type"]).ok_or_else(|| GitError::MalformedRecord {
            kind: "tag",
            line: record.to_string(),
        })?;

    Ok(Some(TagInfo {
        tagged_object: CommitId::new(fields["object"]),
        tagged_type,
        tagger_name: fields["taggername"].to_string(),
        tagger_email: fields["taggeremail"]
            .trim_start_matches('<')
            .trim_end_matches('>')
            .to_string(),
        tagger_date: DateTime::parse_from_rfc3339(fields["taggerdate"]).ok(),
        subject: fields["subject"].to_string(),
        body: fields["body"].trim_end_matches('\n').to_string(),
    }))
}
