//! Publish command — drives one publication run end to end
//!
//! Loads the normalized analyzer output, builds the immutable revision
//! (explicit membership from the findings file, or the local git diff),
//! persists improvement patches, then hands everything to the reporter.

use anyhow::{Context, Result};
use colored::Colorize;
use crier_core::{
    ApiError, CrierConfig, DiffReader, Finding, ImprovementPatch, InlineComment, LintEntry,
    Reporter, ReviewApi, Revision, TaskFailure, UnitEntry,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::conduit::ConduitClient;
use crate::progress::Step;

pub struct PublishArgs {
    pub findings: PathBuf,
    pub failures: Option<PathBuf>,
    pub repo: Option<PathBuf>,
    pub base: String,
    pub revision: u64,
    pub diff: u64,
    pub build_target: String,
    pub head_rev: Option<String>,
    pub patch_dir: Option<PathBuf>,
    pub dry_run: bool,
}

/// Normalized analyzer-task output accepted by `crier publish`.
#[derive(Debug, Default, Deserialize)]
pub struct FindingsFile {
    #[serde(default)]
    pub findings: Vec<Finding>,

    /// Explicit diff membership; derived from the git diff when absent
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub lines: BTreeMap<String, Vec<u32>>,

    #[serde(default)]
    pub patches: Vec<ImprovementPatch>,
}

impl FindingsFile {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read findings file {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Malformed findings file {}", path.display()))
    }

    pub fn has_membership(&self) -> bool {
        !self.files.is_empty() || !self.lines.is_empty()
    }
}

/// Load the failed-task list written by the task orchestrator.
pub fn load_failures(path: &Path) -> Result<Vec<TaskFailure>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read failures file {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Malformed failures file {}", path.display()))
}

pub fn run(args: PublishArgs) -> Result<()> {
    let repo_path = args.repo.clone().unwrap_or_else(|| PathBuf::from("."));
    let repo_path = std::fs::canonicalize(&repo_path).unwrap_or(repo_path);

    eprintln!(
        "{}",
        format!(
            "  crier v{} — publishing diff {} of revision D{}",
            crier_core::VERSION,
            args.diff,
            args.revision
        )
        .bold()
    );
    eprintln!();

    // ── 1. Config ────────────────────────────────────────────────
    let config = CrierConfig::find_and_load(&repo_path)?;

    // ── 2. Analyzer output ───────────────────────────────────────
    let input = FindingsFile::load(&args.findings)?;
    let failures = match &args.failures {
        Some(path) => load_failures(path)?,
        None => Vec::new(),
    };
    eprintln!(
        "  Loaded {} finding(s), {} failed task(s)",
        input.findings.len(),
        failures.len()
    );

    // ── 3. Revision membership ───────────────────────────────────
    let mut revision = Revision::new(args.revision, args.diff, args.build_target.as_str());

    if input.has_membership() {
        revision = revision.with_files(input.files.iter().cloned());
        for (path, lines) in &input.lines {
            revision = revision.with_lines(path.clone(), lines.iter().copied());
        }
        eprintln!("  Using diff membership from the findings file");
    } else {
        let step = Step::new(format!("Reading git diff vs {}", args.base));
        let reader = DiffReader::open(&repo_path)?;
        let (files, lines) = reader.membership(&args.base, None)?;
        step.finish(&format!("{} changed file(s)", files.len()));

        revision = revision.with_files(files);
        for (path, set) in lines {
            revision = revision.with_lines(path, set);
        }
    }

    if let Some(rev) = &args.head_rev {
        revision = revision.with_mercurial_revision(rev.clone());
    }
    revision = revision.with_patches(input.patches.clone());

    // ── 4. Persist improvement patches ───────────────────────────
    // Must land in the results directory before the summary comment links
    // to them; persisting twice is a no-op.
    if let Some(dir) = &args.patch_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create patch dir {}", dir.display()))?;
        for patch in revision.improvement_patches() {
            patch.persist(dir)?;
        }
        if !revision.improvement_patches().is_empty() {
            eprintln!(
                "  Persisted {} improvement patch(es) to {}",
                revision.improvement_patches().len(),
                dir.display()
            );
        }
    }

    // ── 5. Publish ───────────────────────────────────────────────
    let publication = if args.dry_run {
        let api = DryRunApi;
        let reporter = Reporter::new(config.reporter.clone(), config.urls.clone(), &api)?;
        reporter.publish(&input.findings, &revision, &failures)?
    } else {
        let token = config.api.resolve_token().context(
            "No API token: set [api] token in .crier.toml or the CRIER_API_TOKEN env var",
        )?;
        let api = ConduitClient::new(config.api.url.as_str(), token)?;

        let step = Step::new("Publishing to the review system");
        let reporter = Reporter::new(config.reporter.clone(), config.urls.clone(), &api)?;
        match reporter.publish(&input.findings, &revision, &failures) {
            Ok(publication) => {
                step.finish(&format!(
                    "{} finding(s), {} patch(es)",
                    publication.findings.len(),
                    publication.patches.len()
                ));
                publication
            }
            Err(e) => {
                step.warn(&e);
                return Err(e.into());
            }
        }
    };

    println!();
    println!(
        "{}",
        format!(
            "  Published {} finding(s) and {} patch(es) for revision D{}",
            publication.findings.len(),
            publication.patches.len(),
            args.revision
        )
        .bold()
    );

    Ok(())
}

/// Prints would-be wire calls instead of sending them.
struct DryRunApi;

impl ReviewApi for DryRunApi {
    fn create_inline(&self, _diff_id: u64, inline: &InlineComment) -> Result<String, ApiError> {
        println!(
            "  {} differential.createinline {}:{} — {}",
            "dry-run".yellow(),
            inline.file_path,
            inline.line_number,
            inline.content
        );
        Ok(String::new())
    }

    fn create_comment(
        &self,
        revision_id: u64,
        message: &str,
        _attach_inlines: bool,
    ) -> Result<(), ApiError> {
        println!(
            "  {} differential.createcomment D{}",
            "dry-run".yellow(),
            revision_id
        );
        println!("{}", message.dimmed());
        Ok(())
    }

    fn send_build_result(
        &self,
        build_target: &str,
        lint: &[LintEntry],
        unit: &[UnitEntry],
    ) -> Result<(), ApiError> {
        println!(
            "  {} harbormaster.sendmessage {} ({} lint, {} unit)",
            "dry-run".yellow(),
            build_target,
            lint.len(),
            unit.len()
        );
        Ok(())
    }
}
