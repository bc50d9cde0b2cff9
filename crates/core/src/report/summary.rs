//! Summary-comment templates
//!
//! One comment per publication run: defect counts per analyzer, run-locally
//! hints deduplicated by analyzer family, download links for improvement
//! patches, task-failure lines, and the report-a-problem footer.

use crate::config::UrlsConfig;
use crate::finding::{Family, Finding};
use crate::revision::{ImprovementPatch, Revision, TaskFailure};

pub(crate) fn build_comment(
    findings: &[&Finding],
    patches: &[ImprovementPatch],
    failures: &[TaskFailure],
    revision: &Revision,
    urls: &UrlsConfig,
) -> String {
    let mut message = String::new();

    if !findings.is_empty() {
        message.push_str(&format!(
            "\nCode analysis found {} defect{} in the diff {}:\n",
            findings.len(),
            plural(findings.len()),
            revision.diff_id(),
        ));
        for (analyzer, count) in defect_counts(findings) {
            message.push_str(&format!(
                " - {} defect{} found by {}\n",
                count,
                plural(count),
                analyzer,
            ));
        }

        let hints = local_hints(findings);
        if !hints.is_empty() {
            message.push_str("\nYou can run this analysis locally with:\n");
            for hint in hints {
                message.push_str(&format!(" - {}\n", hint));
            }
        }

        for patch in patches {
            message.push_str(&format!(
                "\nFor your convenience, [here is a patch]({}) that fixes all the {} defects (use it in your repository with `hg import` or `git apply -p0`).\n",
                patch.url(&urls.results),
                patch.analyzer,
            ));
        }
    }

    for failure in failures {
        message.push_str(&format!(
            "\nThe analysis task [{}]({}) failed, but we could not detect any issue.\nPlease check this task manually.\n",
            failure.name,
            failure.job_url(&urls.jobs, revision),
        ));
    }

    message.push_str(&format!(
        "\nIf you see a problem in this automated review, [please report it here]({}).\n",
        urls.report,
    ));

    message
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

/// Per-analyzer defect counts in first-encounter order.
fn defect_counts<'f>(findings: &[&'f Finding]) -> Vec<(&'f str, usize)> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for finding in findings {
        match counts.iter_mut().find(|(a, _)| *a == finding.analyzer()) {
            Some((_, count)) => *count += 1,
            None => counts.push((finding.analyzer(), 1)),
        }
    }
    counts
}

/// One run-locally hint per analyzer family, in first-encounter order.
fn local_hints(findings: &[&Finding]) -> Vec<String> {
    let mut families: Vec<Family> = Vec::new();
    for finding in findings {
        if !families.contains(&finding.family()) {
            families.push(finding.family());
        }
    }

    families
        .into_iter()
        .filter_map(|family| family_hint(family, findings))
        .collect()
}

fn family_hint(family: Family, findings: &[&Finding]) -> Option<String> {
    match family {
        Family::StaticAnalysis => Some(format!(
            "`static-analysis check {}` (C/C++)",
            family_paths(family, findings),
        )),
        Family::Style => Some(format!(
            "`format-source -p {}` (C/C++)",
            family_paths(family, findings),
        )),
        Family::Lint => Some("`run-lint --warnings path/to/file` (JS/Python/etc)".to_string()),
        Family::Coverage | Family::External => None,
    }
}

/// Distinct paths of one family's findings, in first-encounter order.
fn family_paths(family: Family, findings: &[&Finding]) -> String {
    let mut paths: Vec<&str> = Vec::new();
    for finding in findings {
        if finding.family() == family && !paths.contains(&finding.path()) {
            paths.push(finding.path());
        }
    }
    paths.join(" ")
}
