use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use git2::{ObjectType as Git2ObjectType, Oid, Repository, Signature, Time};
use push_scope::data::{PushReport, ReportOptions};
use push_scope::git::{
    BranchMembership, ChangeClassifier, ChangeKind, ClassifyOptions, CommitId, Git, ObjectType,
    PushEvent, RangeResolver, Resolver, TagRangeExtractor, ZERO_ID,
};
use tempfile::TempDir;

/// Test setup that builds a repository with git2 in a temporary directory.
///
/// Commits are created without moving any ref; branches and tags are set
/// explicitly so histories can diverge.
struct TestRepo {
    _temp_dir: TempDir,
    repo_path: PathBuf,
    repo: Repository,
    clock: i64,
}

impl TestRepo {
    fn new() -> Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        let repo_path = temp_dir.path().to_path_buf();
        let repo = Repository::init(&repo_path)?;

        let mut config = repo.config()?;
        config.set_str("user.name", "Test User")?;
        config.set_str("user.email", "test@example.com")?;

        Ok(TestRepo {
            _temp_dir: temp_dir,
            repo_path,
            repo,
            clock: 1_700_000_000,
        })
    }

    fn git(&self) -> Result<Git> {
        Ok(Git::discover(&self.repo_path)?)
    }

    fn signature(&mut self) -> Result<Signature<'static>> {
        self.clock += 60;
        Ok(Signature::new(
            "Test User",
            "test@example.com",
            &Time::new(self.clock, 0),
        )?)
    }

    /// Writes `files` (`None` removes the file) and commits the resulting
    /// index on top of `parents`.
    fn commit(
        &mut self,
        parents: &[Oid],
        files: &[(&str, Option<&str>)],
        message: &str,
    ) -> Result<Oid> {
        let mut index = self.repo.index()?;
        for (path, content) in files {
            let full_path = self.repo_path.join(path);
            match content {
                Some(content) => {
                    fs::write(&full_path, content)?;
                    index.add_path(Path::new(path))?;
                }
                None => {
                    fs::remove_file(&full_path)?;
                    index.remove_path(Path::new(path))?;
                }
            }
        }
        index.write()?;

        let signature = self.signature()?;
        let tree = self.repo.find_tree(index.write_tree()?)?;
        let parents = parents
            .iter()
            .map(|id| self.repo.find_commit(*id))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();

        Ok(self.repo.commit(
            None,
            &signature,
            &signature,
            message,
            &tree,
            &parent_refs,
        )?)
    }

    /// Commits a single file change on top of `parent`.
    fn commit_file(&mut self, parent: Option<Oid>, path: &str, content: &str) -> Result<Oid> {
        let parents: Vec<Oid> = parent.into_iter().collect();
        self.commit(&parents, &[(path, Some(content))], &format!("Update {path}"))
    }

    fn set_branch(&self, name: &str, target: Oid) -> Result<()> {
        self.repo
            .reference(&format!("refs/heads/{name}"), target, true, "test")?;
        Ok(())
    }

    fn annotated_tag(&mut self, name: &str, target: Oid, message: &str) -> Result<Oid> {
        let signature = self.signature()?;
        let object = self.repo.find_object(target, Some(Git2ObjectType::Commit))?;
        Ok(self.repo.tag(name, &object, &signature, message, false)?)
    }

    fn lightweight_tag(&self, name: &str, target: Oid) -> Result<()> {
        let object = self.repo.find_object(target, Some(Git2ObjectType::Commit))?;
        self.repo.tag_lightweight(name, &object, false)?;
        Ok(())
    }

    /// Builds a linear history of `count` commits on `main`.
    fn linear(&mut self, count: usize) -> Result<Vec<Oid>> {
        let mut commits = Vec::new();
        for i in 0..count {
            let parent = commits.last().copied();
            commits.push(self.commit_file(parent, "history.txt", &format!("line {i}\n"))?);
        }
        if let Some(tip) = commits.last() {
            self.set_branch("main", *tip)?;
        }
        Ok(commits)
    }
}

fn ids(oids: &[Oid]) -> Vec<CommitId> {
    oids.iter().map(|oid| CommitId::new(oid.to_string())).collect()
}

#[test]
fn zero_old_range_lists_every_reachable_commit() -> Result<()> {
    let mut test_repo = TestRepo::new()?;
    let commits = test_repo.linear(3)?;
    let git = test_repo.git()?;

    let event = PushEvent::new(ZERO_ID, &commits[2].to_string(), "refs/heads/main");
    let range = RangeResolver::new(&git).resolve(&event, false)?;

    assert_eq!(range, ids(&commits));
    Ok(())
}

#[test]
fn unchanged_ref_has_empty_range() -> Result<()> {
    let mut test_repo = TestRepo::new()?;
    let commits = test_repo.linear(2)?;
    let git = test_repo.git()?;

    let tip = commits[1].to_string();
    let event = PushEvent::new(&tip, &tip, "refs/heads/main");

    assert!(RangeResolver::new(&git).resolve(&event, false)?.is_empty());
    assert!(RangeResolver::new(&git).resolve(&event, true)?.is_empty());
    Ok(())
}

#[test]
fn restricted_push_skips_commits_on_other_branches() -> Result<()> {
    let mut test_repo = TestRepo::new()?;
    let base = test_repo.linear(2)?;

    // topic forks from main and is pushed first
    let t1 = test_repo.commit_file(Some(base[1]), "topic.txt", "one\n")?;
    let t2 = test_repo.commit_file(Some(t1), "topic.txt", "one\ntwo\n")?;
    test_repo.set_branch("topic", t2)?;

    // main then moves onto topic plus one commit of its own
    let m3 = test_repo.commit_file(Some(t2), "main.txt", "release\n")?;
    test_repo.set_branch("main", m3)?;

    let git = test_repo.git()?;
    let event = PushEvent::new(&base[1].to_string(), &m3.to_string(), "refs/heads/main");
    let resolver = RangeResolver::new(&git);

    assert_eq!(resolver.resolve(&event, false)?, ids(&[t1, t2, m3]));
    assert_eq!(resolver.resolve(&event, true)?, ids(&[m3]));
    assert!(resolver.is_fast_forward(&event)?);
    Ok(())
}

#[test]
fn single_branch_owns_every_reachable_commit() -> Result<()> {
    let mut test_repo = TestRepo::new()?;
    let commits = test_repo.linear(3)?;
    let git = test_repo.git()?;

    let unique = BranchMembership::new(&git).unique_to_branch("refs/heads/main")?;

    let expected: BTreeSet<CommitId> = ids(&commits).into_iter().collect();
    assert_eq!(unique, expected);
    Ok(())
}

#[test]
fn forced_update_reports_discarded_commits() -> Result<()> {
    let mut test_repo = TestRepo::new()?;
    let commits = test_repo.linear(3)?;
    let rewritten = test_repo.commit_file(Some(commits[1]), "history.txt", "rewritten\n")?;
    test_repo.set_branch("main", rewritten)?;

    let git = test_repo.git()?;
    let event = PushEvent::new(
        &commits[2].to_string(),
        &rewritten.to_string(),
        "refs/heads/main",
    );
    let resolver = RangeResolver::new(&git);

    assert!(!resolver.is_fast_forward(&event)?);
    assert_eq!(resolver.discarded(&event)?, ids(&[commits[2]]));
    assert_eq!(resolver.resolve(&event, false)?, ids(&[rewritten]));
    Ok(())
}

#[test]
fn classifies_modify_add_delete_and_rename() -> Result<()> {
    let mut test_repo = TestRepo::new()?;
    let moved = "a file whose content is long enough\nto be recognised as a rename\n";
    let c1 = test_repo.commit(
        &[],
        &[
            ("a.txt", Some("alpha\n")),
            ("b.txt", Some("bravo\n")),
            ("c.txt", Some(moved)),
        ],
        "Initial",
    )?;
    let c2 = test_repo.commit(
        &[c1],
        &[
            ("a.txt", Some("alpha\nmore\n")),
            ("b.txt", None),
            ("c.txt", None),
            ("d.txt", Some(moved)),
            ("e.txt", Some("echo\n")),
        ],
        "Reshuffle",
    )?;
    test_repo.set_branch("main", c2)?;

    let git = test_repo.git()?;
    let classifier = ChangeClassifier::new(&git);
    let changes = classifier.classify(
        Some(c1.to_string().as_str()),
        &c2.to_string(),
        &ClassifyOptions::default(),
    )?;

    let set = |paths: &[&str]| paths.iter().map(|p| p.to_string()).collect::<BTreeSet<_>>();
    assert_eq!(changes.modified, set(&["a.txt"]));
    assert_eq!(changes.added, set(&["e.txt"]));
    assert_eq!(changes.deleted, set(&["b.txt"]));
    assert_eq!(changes.renamed, set(&["d.txt"]));

    let expected_blob = test_repo.repo.blob(moved.as_bytes())?;
    assert_eq!(
        classifier.blob_id(&c2.to_string(), "d.txt")?,
        CommitId::new(expected_blob.to_string())
    );
    Ok(())
}

#[test]
fn file_deleted_again_after_restore_is_deleted() -> Result<()> {
    let mut test_repo = TestRepo::new()?;
    let c1 = test_repo.commit(
        &[],
        &[("keep.txt", Some("keep\n")), ("flaky.txt", Some("v1\n"))],
        "Initial",
    )?;
    let c2 = test_repo.commit(&[c1], &[("flaky.txt", None)], "Drop flaky")?;
    let c3 = test_repo.commit(&[c2], &[("flaky.txt", Some("v2\n"))], "Restore flaky")?;
    let c4 = test_repo.commit(&[c3], &[("flaky.txt", None)], "Drop flaky again")?;
    test_repo.set_branch("main", c4)?;

    let git = test_repo.git()?;
    let classifier = ChangeClassifier::new(&git);
    let options = ClassifyOptions::default();

    let changes = classifier.classify(Some(c1.to_string().as_str()), &c4.to_string(), &options)?;
    assert_eq!(changes.kind_of("flaky.txt"), Some(ChangeKind::Deleted));
    assert_eq!(changes.len(), 1);

    let restored = classifier.classify(Some(c1.to_string().as_str()), &c3.to_string(), &options)?;
    assert_eq!(restored.kind_of("flaky.txt"), Some(ChangeKind::Modified));
    Ok(())
}

#[test]
fn classifies_non_ascii_paths() -> Result<()> {
    let mut test_repo = TestRepo::new()?;
    let c1 = test_repo.commit_file(None, "README.md", "readme\n")?;
    let c2 = test_repo.commit(
        &[c1],
        &[("café.txt", Some("au lait\n")), ("README.md", Some("lisez-moi\n"))],
        "Add café",
    )?;
    test_repo.set_branch("main", c2)?;

    let git = test_repo.git()?;
    let classifier = ChangeClassifier::new(&git);
    let changes = classifier.classify(
        Some(c1.to_string().as_str()),
        &c2.to_string(),
        &ClassifyOptions::default(),
    )?;

    assert!(changes.added.contains("café.txt"), "{changes:?}");
    assert!(changes.modified.contains("README.md"));
    let expected_blob = test_repo.repo.blob(b"au lait\n")?;
    assert_eq!(
        classifier.blob_id(&c2.to_string(), "café.txt")?,
        CommitId::new(expected_blob.to_string())
    );
    Ok(())
}

#[test]
fn restricted_report_leaves_out_changes_from_other_branches() -> Result<()> {
    let mut test_repo = TestRepo::new()?;
    let base = test_repo.linear(2)?;

    let t1 = test_repo.commit_file(Some(base[1]), "topic.txt", "one\n")?;
    test_repo.set_branch("topic", t1)?;
    let m3 = test_repo.commit_file(Some(t1), "main.txt", "release\n")?;
    test_repo.set_branch("main", m3)?;

    let git = test_repo.git()?;
    let event = PushEvent::new(&base[1].to_string(), &m3.to_string(), "refs/heads/main");

    let restricted = ReportOptions {
        restrict_to_branch: true,
        ..ReportOptions::default()
    };
    let report = PushReport::build(&git, &event, &restricted)?;
    assert_eq!(report.commits.len(), 1);
    let changes = report.changes.expect("changes");
    assert!(changes.added.contains("main.txt"));
    assert_eq!(changes.kind_of("topic.txt"), None);

    let report = PushReport::build(&git, &event, &ReportOptions::default())?;
    assert_eq!(report.commits.len(), 2);
    let changes = report.changes.expect("changes");
    assert!(changes.added.contains("topic.txt"));
    assert!(changes.added.contains("main.txt"));
    Ok(())
}

#[test]
fn first_tag_has_no_previous_release() -> Result<()> {
    let mut test_repo = TestRepo::new()?;
    let commits = test_repo.linear(2)?;
    test_repo.annotated_tag("v1.0", commits[1], "Release 1.0")?;

    let git = test_repo.git()?;
    let entries =
        TagRangeExtractor::new(&git).commits_between_tags("v1.0", &commits[1].to_string())?;

    assert!(entries.is_empty());
    Ok(())
}

#[test]
fn lists_commits_between_annotated_tags() -> Result<()> {
    let mut test_repo = TestRepo::new()?;
    let commits = test_repo.linear(4)?;
    test_repo.annotated_tag("v1.0", commits[0], "Release 1.0")?;
    test_repo.lightweight_tag("nightly", commits[2])?;
    test_repo.annotated_tag("v2.0", commits[3], "Release 2.0")?;

    let git = test_repo.git()?;
    let entries =
        TagRangeExtractor::new(&git).commits_between_tags("v2.0", &commits[3].to_string())?;

    let listed: Vec<CommitId> = entries.iter().map(|e| e.commit.clone()).collect();
    assert_eq!(listed, ids(&commits[1..]));
    assert_eq!(entries[0].subject, "Update history.txt");
    Ok(())
}

#[test]
fn reads_annotated_tag_metadata() -> Result<()> {
    let mut test_repo = TestRepo::new()?;
    let commits = test_repo.linear(1)?;
    let tag_id = test_repo.annotated_tag(
        "v1.0",
        commits[0],
        "Release 1.0\n\nFirst stable release.\n",
    )?;
    test_repo.lightweight_tag("nightly", commits[0])?;

    let git = test_repo.git()?;
    let extractor = TagRangeExtractor::new(&git);

    let info = extractor.tag_info("v1.0")?.expect("annotated tag");
    assert_eq!(info.tagged_object, CommitId::new(commits[0].to_string()));
    assert_eq!(info.tagged_type, ObjectType::Commit);
    assert_eq!(info.tagger_name, "Test User");
    assert_eq!(info.tagger_email, "test@example.com");
    assert_eq!(info.subject, "Release 1.0");
    assert_eq!(info.body, "First stable release.");
    assert!(info.tagger_date.is_some());

    assert!(extractor.tag_info("nightly")?.is_none());
    assert!(extractor.tag_info("missing")?.is_none());

    let resolver = Resolver::new(&git);
    assert_eq!(
        resolver.object_type(&tag_id.to_string())?,
        Some(ObjectType::Tag)
    );
    assert_eq!(
        resolver.resolve_commit("refs/tags/v1.0")?,
        CommitId::new(commits[0].to_string())
    );
    Ok(())
}

#[test]
fn resolver_reports_missing_objects() -> Result<()> {
    let mut test_repo = TestRepo::new()?;
    let commits = test_repo.linear(1)?;
    let git = test_repo.git()?;
    let resolver = Resolver::new(&git);

    assert_eq!(
        resolver.resolve("refs/heads/main")?,
        CommitId::new(commits[0].to_string())
    );
    assert!(resolver.resolve("refs/heads/nope").is_err());
    assert_eq!(
        resolver.object_type(&commits[0].to_string())?,
        Some(ObjectType::Commit)
    );
    assert_eq!(
        resolver.object_type("1111111111111111111111111111111111111111")?,
        None
    );
    assert_eq!(resolver.object_type(ZERO_ID)?, None);
    Ok(())
}

#[test]
fn builds_report_for_new_branch() -> Result<()> {
    let mut test_repo = TestRepo::new()?;
    let commits = test_repo.linear(2)?;
    let git = test_repo.git()?;

    let event = PushEvent::new(ZERO_ID, &commits[1].to_string(), "refs/heads/main");
    let report = PushReport::build(&git, &event, &ReportOptions::default())?;

    assert!(report.fast_forward);
    assert_eq!(report.commits.len(), 2);
    let changes = report.changes.expect("changes");
    assert!(changes.added.contains("history.txt"));
    assert!(changes.deleted.is_empty());
    Ok(())
}

#[test]
fn builds_report_for_tag_push() -> Result<()> {
    let mut test_repo = TestRepo::new()?;
    let commits = test_repo.linear(3)?;
    test_repo.annotated_tag("v1.0", commits[0], "Release 1.0")?;
    let tag_id = test_repo.annotated_tag("v1.1", commits[2], "Release 1.1")?;

    let git = test_repo.git()?;
    let event = PushEvent::new(ZERO_ID, &tag_id.to_string(), "refs/tags/v1.1");
    let report = PushReport::build(&git, &event, &ReportOptions::default())?;

    assert_eq!(report.description.as_deref(), Some("v1.1"));
    let tag = report.tag.expect("tag section");
    assert_eq!(tag.name, "v1.1");
    assert_eq!(tag.info.map(|info| info.subject).as_deref(), Some("Release 1.1"));
    assert_eq!(tag.commits.len(), 2);
    assert!(report.commits.is_empty());
    Ok(())
}
