//! Git diff reading for revision membership
//!
//! Builds the changed-file set and per-file changed-line sets a [`Revision`]
//! needs, from a local git repository. Only new-side line membership is
//! tracked — the engine attributes findings to lines of the patched tree,
//! never to removed lines.
//!
//! [`Revision`]: crate::revision::Revision

use anyhow::{Context, Result};
use git2::{Diff, DiffOptions, Repository};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Reads changed files and changed lines from a git repository
pub struct DiffReader {
    repo: Repository,
}

impl DiffReader {
    /// Open a reader on the repository at `repo_path`
    pub fn open(repo_path: &Path) -> Result<Self> {
        let repo = Repository::open(repo_path).context("Failed to open git repository")?;

        Ok(Self { repo })
    }

    /// Changed files and new-side changed lines between two refs.
    ///
    /// `head` defaults to `HEAD`.
    pub fn membership(
        &self,
        base: &str,
        head: Option<&str>,
    ) -> Result<(BTreeSet<String>, BTreeMap<String, BTreeSet<u32>>)> {
        let diff = self.diff(base, head)?;

        let mut files: BTreeSet<String> = BTreeSet::new();
        let mut lines: BTreeMap<String, BTreeSet<u32>> = BTreeMap::new();

        diff.foreach(
            &mut |delta, _progress| {
                if let Some(path) = delta.new_file().path() {
                    files.insert(path.display().to_string());
                }
                true
            },
            None,
            None,
            Some(&mut |delta, _hunk, line| {
                if line.origin() == '+' {
                    if let (Some(path), Some(lineno)) =
                        (delta.new_file().path(), line.new_lineno())
                    {
                        lines
                            .entry(path.display().to_string())
                            .or_default()
                            .insert(lineno);
                    }
                }
                true
            }),
        )?;

        Ok((files, lines))
    }

    fn diff(&self, base: &str, head: Option<&str>) -> Result<Diff<'_>> {
        let base_tree = self.resolve_tree(base)?;
        let head_tree = self.resolve_tree(head.unwrap_or("HEAD"))?;

        let mut opts = DiffOptions::new();
        opts.ignore_whitespace(false);

        let diff = self.repo.diff_tree_to_tree(
            Some(&base_tree),
            Some(&head_tree),
            Some(&mut opts),
        )?;

        Ok(diff)
    }

    fn resolve_tree(&self, spec: &str) -> Result<git2::Tree<'_>> {
        let obj = self.repo.revparse_single(spec)?;
        let commit = obj.peel_to_commit()?;
        Ok(commit.tree()?)
    }
}
