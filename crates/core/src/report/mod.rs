//! The Reporter — policy filtering, channel routing, and the ordered
//! wire-call sequence publishing one revision's findings
//!
//! The decision procedure is pure: identical inputs produce identical ordered
//! outputs and an identical call sequence. Wire calls happen strictly in
//! order — inline comments by (path, line), then at most one summary
//! comment, then at most one lint/unit batch — and a failed call aborts the
//! run with every already-sent call left standing.

mod summary;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::api::{ApiError, LintEntry, ReviewApi, UnitEntry};
use crate::config::UrlsConfig;
use crate::finding::{Finding, Level};
use crate::revision::{ImprovementPatch, Revision, TaskFailure};

/// Reporter policy: which analyzers publish, and over which channels errors
/// travel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Policy {
    /// Allow-list of analyzer ids; empty means all analyzers
    #[serde(default)]
    pub analyzers: Vec<String>,

    /// Deny-list; always wins over the allow-list on conflict
    #[serde(default)]
    pub analyzers_skipped: Vec<String>,

    /// Route errors to the lint batch instead of inline comments
    #[serde(default)]
    pub publish_errors: bool,

    /// Publish build errors and task failures on the unit-result channel
    #[serde(default)]
    pub publish_build_errors: bool,
}

impl Policy {
    /// Allow/deny filter for one analyzer id. Deny wins.
    pub fn allows(&self, analyzer: &str) -> bool {
        if self.analyzers_skipped.iter().any(|a| a == analyzer) {
            return false;
        }
        self.analyzers.is_empty() || self.analyzers.iter().any(|a| a == analyzer)
    }

    fn validate(&self) -> Result<(), ReportError> {
        for id in self.analyzers.iter().chain(&self.analyzers_skipped) {
            if id.trim().is_empty() {
                return Err(ReportError::Configuration(
                    "analyzer ids must be non-empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Failure modes of one publication run.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Malformed policy; raised before any wire call
    #[error("invalid reporter configuration: {0}")]
    Configuration(String),

    /// A wire call failed; already-sent calls stand, nothing is retried
    #[error(transparent)]
    Transport(#[from] ApiError),
}

/// What one publication run actually surfaced, in analyzer-encounter order.
#[derive(Debug, Clone)]
pub struct Publication {
    pub findings: Vec<Finding>,
    pub patches: Vec<ImprovementPatch>,
}

/// Drives filtering, partitioning, rendering, and the wire-call sequence for
/// one revision.
pub struct Reporter<'a> {
    policy: Policy,
    urls: UrlsConfig,
    api: &'a dyn ReviewApi,
}

impl<'a> Reporter<'a> {
    /// Validates the policy before any wire call can happen.
    pub fn new(
        policy: Policy,
        urls: UrlsConfig,
        api: &'a dyn ReviewApi,
    ) -> Result<Self, ReportError> {
        policy.validate()?;
        Ok(Self { policy, urls, api })
    }

    /// Publish the findings and task failures of one analysis run.
    ///
    /// Returns the surfaced findings and patches, grouped by analyzer in
    /// first-encounter order.
    pub fn publish(
        &self,
        findings: &[Finding],
        revision: &Revision,
        failures: &[TaskFailure],
    ) -> Result<Publication, ReportError> {
        // ── 1. Policy filter, local validity, de-duplication ─────────
        let mut seen: HashSet<String> = HashSet::new();
        let filtered: Vec<&Finding> = findings
            .iter()
            .filter(|f| f.is_publishable() && self.policy.allows(f.analyzer()))
            .filter(|f| seen.insert(f.unique_key()))
            .collect();

        // ── 2. Channel routing ───────────────────────────────────────
        // Build errors never inline, whatever their patch membership.
        // Out-of-patch warnings are dropped by design; out-of-patch errors
        // surface only on the lint batch.
        let mut inlined: Vec<&Finding> = Vec::new();
        let mut batched: Vec<&Finding> = Vec::new();
        let mut unit_findings: Vec<&Finding> = Vec::new();
        let mut commented: Vec<&Finding> = Vec::new();

        for &finding in &filtered {
            if finding.is_build_error() {
                if self.policy.publish_build_errors {
                    unit_findings.push(finding);
                }
                continue;
            }

            if finding.level() == Level::Error && self.policy.publish_errors {
                batched.push(finding);
                commented.push(finding);
            } else if finding.in_patch(revision) {
                inlined.push(finding);
                commented.push(finding);
            }
        }

        let patches: Vec<ImprovementPatch> = revision
            .improvement_patches()
            .iter()
            .filter(|p| self.policy.allows(&p.analyzer))
            .cloned()
            .collect();

        // ── 3. Inline comments, ordered by (path, line) ──────────────
        let mut ordered_inlines = inlined.clone();
        ordered_inlines.sort_by(|a, b| (a.path(), a.line()).cmp(&(b.path(), b.line())));

        for finding in &ordered_inlines {
            self.api
                .create_inline(revision.diff_id(), &finding.render_inline())?;
        }

        // ── 4. Summary comment, at most one per run ──────────────────
        // Task failures move to the unit channel when publish_build_errors
        // is set; otherwise they get summary lines.
        let failures_in_comment: &[TaskFailure] = if self.policy.publish_build_errors {
            &[]
        } else {
            failures
        };

        if !commented.is_empty() || !failures_in_comment.is_empty() {
            let message = summary::build_comment(
                &commented,
                &patches,
                failures_in_comment,
                revision,
                &self.urls,
            );
            self.api.create_comment(revision.id(), &message, true)?;
        }

        // ── 5. Lint/unit batch, at most one per run ──────────────────
        let lint_entries: Vec<LintEntry> =
            batched.iter().map(|f| f.render_lint_entry()).collect();
        let mut unit_entries: Vec<UnitEntry> =
            unit_findings.iter().map(|f| f.render_unit_entry()).collect();
        if self.policy.publish_build_errors {
            unit_entries.extend(
                failures
                    .iter()
                    .map(|t| t.render_unit_entry(&self.urls.jobs, revision)),
            );
        }

        if !lint_entries.is_empty() || !unit_entries.is_empty() {
            self.api
                .send_build_result(revision.build_target(), &lint_entries, &unit_entries)?;
        }

        // ── 6. Published set, grouped by analyzer encounter ──────────
        let mut surfaced = commented;
        surfaced.extend(unit_findings);
        let findings = group_by_analyzer(surfaced)
            .into_iter()
            .cloned()
            .collect();

        Ok(Publication { findings, patches })
    }
}

/// Stable grouping: analyzers keep their first-encounter order, findings
/// keep their relative order within one analyzer.
fn group_by_analyzer(findings: Vec<&Finding>) -> Vec<&Finding> {
    let mut order: Vec<&str> = Vec::new();
    for finding in &findings {
        if !order.contains(&finding.analyzer()) {
            order.push(finding.analyzer());
        }
    }

    let mut grouped = Vec::with_capacity(findings.len());
    for analyzer in order {
        grouped.extend(
            findings
                .iter()
                .copied()
                .filter(|f| f.analyzer() == analyzer),
        );
    }
    grouped
}
