//! Immutable revision model: one reviewed diff plus its attached artifacts
//!
//! A [`Revision`] is built once from upstream diff metadata and only read
//! afterwards. Membership queries (`has_file` / `contains`) are the single
//! source of truth for "is this finding in the patch".

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::api::UnitEntry;
use crate::finding::Finding;

/// Immutable description of one reviewed diff.
#[derive(Debug, Clone)]
pub struct Revision {
    id: u64,
    diff_id: u64,
    build_target: String,
    mercurial_revision: Option<String>,
    files: BTreeSet<String>,
    lines: BTreeMap<String, BTreeSet<u32>>,
    improvement_patches: Vec<ImprovementPatch>,
}

impl Revision {
    pub fn new(id: u64, diff_id: u64, build_target: impl Into<String>) -> Self {
        Self {
            id,
            diff_id,
            build_target: build_target.into(),
            mercurial_revision: None,
            files: BTreeSet::new(),
            lines: BTreeMap::new(),
            improvement_patches: Vec::new(),
        }
    }

    pub fn with_mercurial_revision(mut self, rev: impl Into<String>) -> Self {
        self.mercurial_revision = Some(rev.into());
        self
    }

    pub fn with_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.files.extend(files.into_iter().map(Into::into));
        self
    }

    /// Record the changed lines of one file.
    pub fn with_lines<I>(mut self, path: impl Into<String>, lines: I) -> Self
    where
        I: IntoIterator<Item = u32>,
    {
        self.lines.insert(path.into(), lines.into_iter().collect());
        self
    }

    pub fn with_patches(mut self, patches: Vec<ImprovementPatch>) -> Self {
        self.improvement_patches = patches;
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn diff_id(&self) -> u64 {
        self.diff_id
    }

    pub fn build_target(&self) -> &str {
        &self.build_target
    }

    pub fn mercurial_revision(&self) -> Option<&str> {
        self.mercurial_revision.as_deref()
    }

    pub fn improvement_patches(&self) -> &[ImprovementPatch] {
        &self.improvement_patches
    }

    /// True iff the path is known to this revision, either as a touched file
    /// or as a key of the changed-line map.
    pub fn has_file(&self, path: &str) -> bool {
        self.files.contains(path) || self.lines.contains_key(path)
    }

    /// True iff the finding's file is in the diff and its line (when it has
    /// one) is among that file's changed lines. A finding on an undiffed
    /// file is never in-patch, whatever its line.
    pub fn contains(&self, finding: &Finding) -> bool {
        if !self.has_file(finding.path()) {
            return false;
        }
        match finding.line() {
            None => true,
            Some(line) => self
                .lines
                .get(finding.path())
                .is_some_and(|lines| lines.contains(&line)),
        }
    }
}

/// An auto-generated fix-up diff attached to the review for download.
///
/// Written to the results directory exactly once before the summary comment
/// references it; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImprovementPatch {
    pub analyzer: String,
    pub revision_name: String,
    pub content: String,
}

impl ImprovementPatch {
    pub fn new(
        analyzer: impl Into<String>,
        revision_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            analyzer: analyzer.into(),
            revision_name: revision_name.into(),
            content: content.into(),
        }
    }

    pub fn name(&self) -> String {
        format!("{}-{}", self.analyzer, self.revision_name)
    }

    pub fn file_name(&self) -> String {
        format!("{}.diff", self.name())
    }

    /// Idempotent write: an already-persisted patch is left untouched.
    pub fn persist(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(self.file_name());
        if !path.exists() {
            std::fs::write(&path, &self.content)
                .with_context(|| format!("Failed to write patch {}", path.display()))?;
        }
        Ok(path)
    }

    /// Download link used by the summary comment.
    pub fn url(&self, results_url: &str) -> String {
        format!("{}/{}", results_url.trim_end_matches('/'), self.file_name())
    }
}

/// An analyzer task that errored before producing findings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFailure {
    pub task_id: String,
    pub name: String,
    pub run_id: u64,
}

impl TaskFailure {
    pub fn new(task_id: impl Into<String>, name: impl Into<String>, run_id: u64) -> Self {
        Self {
            task_id: task_id.into(),
            name: name.into(),
            run_id,
        }
    }

    /// Link to the CI job for this failed run.
    pub fn job_url(&self, jobs_url: &str, revision: &Revision) -> String {
        format!(
            "{}?revision={}&selectedJob={}",
            jobs_url,
            revision.mercurial_revision().unwrap_or_default(),
            self.run_id,
        )
    }

    /// Unit-result entry used when failures publish on the unit channel.
    pub fn render_unit_entry(&self, jobs_url: &str, revision: &Revision) -> UnitEntry {
        UnitEntry {
            name: self.name.clone(),
            namespace: "code-review".to_string(),
            result: "broken".to_string(),
            format: "remarkup".to_string(),
            details: format!(
                "The analysis task [{}]({}) failed, but we could not detect any issue.\nPlease check this task manually.",
                self.name,
                self.job_url(jobs_url, revision),
            ),
        }
    }
}
