//! Finding types that bridge analyzer task output to the review wire protocol
//!
//! Each analyzer family is one enum case. A finding knows how to render
//! itself for every publication channel (inline comment, lint batch entry,
//! unit-result entry) but never decides *where* it goes — that is the
//! [`Reporter`](crate::report::Reporter)'s job.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::api::{InlineComment, LintEntry, UnitEntry};
use crate::revision::Revision;

/// Check id attached to style findings (formatters report no per-defect code).
const STYLE_CHECK: &str = "invalid-styling";

/// Check id attached to coverage findings.
const COVERAGE_CHECK: &str = "no-coverage";

/// Severity level of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Error,
    Warning,
    Note,
}

impl Level {
    /// Capitalized form used in rendered comment bodies.
    pub fn title(&self) -> &'static str {
        match self {
            Level::Error => "Error",
            Level::Warning => "Warning",
            Level::Note => "Note",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Error => write!(f, "error"),
            Level::Warning => write!(f, "warning"),
            Level::Note => write!(f, "note"),
        }
    }
}

/// Analyzer family — the human-facing grouping of related analyzer ids.
///
/// Several analyzer ids (e.g. `lint-py-ruff`, `lint-js-eslint`) collapse into
/// one family; run-locally hints deduplicate on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    StaticAnalysis,
    Style,
    Lint,
    Coverage,
    External,
}

/// Accept raw line values from analyzer output where `-1` (and any other
/// value below 1) means "whole file".
pub fn normalize_line(raw: i64) -> Option<u32> {
    u32::try_from(raw).ok().filter(|&n| n >= 1)
}

fn de_line<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<i64>::deserialize(deserializer)?;
    Ok(raw.and_then(normalize_line))
}

/// Output of a check-id based static analyzer. The only family that can
/// carry the build-error flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticAnalysisFinding {
    pub analyzer: String,
    pub path: String,
    #[serde(default, deserialize_with = "de_line")]
    pub line: Option<u32>,
    #[serde(default)]
    pub column: u32,
    pub level: Level,
    pub check: String,
    pub message: String,

    /// Analyzer-reported confidence (e.g. "high", "medium")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reliability: Option<String>,

    /// Defect category reported by the analyzer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// True when the defect breaks the build; routes to the unit channel
    #[serde(default)]
    pub build_error: bool,
}

/// A formatting defect. Style analyzers attach improvement patches rather
/// than per-defect remediation, so the finding itself is always a warning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleFinding {
    pub analyzer: String,
    pub path: String,
    #[serde(default, deserialize_with = "de_line")]
    pub line: Option<u32>,
    #[serde(default)]
    pub column: u32,
    pub message: String,
}

/// One defect from a per-language linter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LintFinding {
    pub analyzer: String,
    pub path: String,
    #[serde(default, deserialize_with = "de_line")]
    pub line: Option<u32>,
    #[serde(default)]
    pub column: u32,
    pub level: Level,
    /// Underlying linter name (e.g. "ruff"), distinct from the analyzer id
    pub linter: String,
    pub check: String,
    pub message: String,
}

impl LintFinding {
    /// Build a lint finding from raw adapter values, normalizing the line.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        analyzer: impl Into<String>,
        path: impl Into<String>,
        raw_line: i64,
        column: u32,
        level: Level,
        linter: impl Into<String>,
        check: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            analyzer: analyzer.into(),
            path: path.into(),
            line: normalize_line(raw_line),
            column,
            level,
            linter: linter.into(),
            check: check.into(),
            message: message.into(),
        }
    }
}

/// A whole-file coverage finding. Never carries a line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageFinding {
    pub analyzer: String,
    pub path: String,
    pub message: String,
}

/// Catch-all for analyzers without a dedicated family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalFinding {
    pub analyzer: String,
    pub path: String,
    #[serde(default, deserialize_with = "de_line")]
    pub line: Option<u32>,
    #[serde(default)]
    pub column: u32,
    pub level: Level,
    pub check: String,
    pub message: String,
    #[serde(default)]
    pub build_error: bool,
}

impl ExternalFinding {
    /// Build an external finding from raw adapter values, normalizing the line.
    pub fn new(
        analyzer: impl Into<String>,
        path: impl Into<String>,
        raw_line: i64,
        level: Level,
        check: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            analyzer: analyzer.into(),
            path: path.into(),
            line: normalize_line(raw_line),
            column: 0,
            level,
            check: check.into(),
            message: message.into(),
            build_error: false,
        }
    }
}

/// A single defect detected by an analyzer task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "kebab-case")]
pub enum Finding {
    StaticAnalysis(StaticAnalysisFinding),
    Style(StyleFinding),
    Lint(LintFinding),
    Coverage(CoverageFinding),
    External(ExternalFinding),
}

impl Finding {
    pub fn family(&self) -> Family {
        match self {
            Finding::StaticAnalysis(_) => Family::StaticAnalysis,
            Finding::Style(_) => Family::Style,
            Finding::Lint(_) => Family::Lint,
            Finding::Coverage(_) => Family::Coverage,
            Finding::External(_) => Family::External,
        }
    }

    pub fn analyzer(&self) -> &str {
        match self {
            Finding::StaticAnalysis(f) => &f.analyzer,
            Finding::Style(f) => &f.analyzer,
            Finding::Lint(f) => &f.analyzer,
            Finding::Coverage(f) => &f.analyzer,
            Finding::External(f) => &f.analyzer,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Finding::StaticAnalysis(f) => &f.path,
            Finding::Style(f) => &f.path,
            Finding::Lint(f) => &f.path,
            Finding::Coverage(f) => &f.path,
            Finding::External(f) => &f.path,
        }
    }

    /// Line the defect is on; `None` means the whole file.
    pub fn line(&self) -> Option<u32> {
        match self {
            Finding::StaticAnalysis(f) => f.line,
            Finding::Style(f) => f.line,
            Finding::Lint(f) => f.line,
            Finding::Coverage(_) => None,
            Finding::External(f) => f.line,
        }
    }

    pub fn column(&self) -> u32 {
        match self {
            Finding::StaticAnalysis(f) => f.column,
            Finding::Style(f) => f.column,
            Finding::Lint(f) => f.column,
            Finding::Coverage(_) => 0,
            Finding::External(f) => f.column,
        }
    }

    pub fn level(&self) -> Level {
        match self {
            Finding::StaticAnalysis(f) => f.level,
            Finding::Style(_) => Level::Warning,
            Finding::Lint(f) => f.level,
            Finding::Coverage(_) => Level::Warning,
            Finding::External(f) => f.level,
        }
    }

    pub fn check(&self) -> &str {
        match self {
            Finding::StaticAnalysis(f) => &f.check,
            Finding::Style(_) => STYLE_CHECK,
            Finding::Lint(f) => &f.check,
            Finding::Coverage(_) => COVERAGE_CHECK,
            Finding::External(f) => &f.check,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Finding::StaticAnalysis(f) => &f.message,
            Finding::Style(f) => &f.message,
            Finding::Lint(f) => &f.message,
            Finding::Coverage(f) => &f.message,
            Finding::External(f) => &f.message,
        }
    }

    /// Build errors never publish inline; they route to the unit channel.
    pub fn is_build_error(&self) -> bool {
        match self {
            Finding::StaticAnalysis(f) => f.build_error,
            Finding::External(f) => f.build_error,
            _ => false,
        }
    }

    /// Local shape check: a finding missing its required fields is dropped
    /// silently by the reporter, without aborting the run.
    pub fn is_publishable(&self) -> bool {
        let shape = !self.path().trim().is_empty()
            && !self.analyzer().trim().is_empty()
            && !self.message().trim().is_empty();
        match self {
            Finding::Lint(f) => shape && !f.linter.trim().is_empty() && !f.check.trim().is_empty(),
            Finding::StaticAnalysis(f) => shape && !f.check.trim().is_empty(),
            Finding::External(f) => shape && !f.check.trim().is_empty(),
            _ => shape,
        }
    }

    /// True iff the finding's file and line intersect the reviewed diff.
    pub fn in_patch(&self, revision: &Revision) -> bool {
        revision.contains(self)
    }

    /// Identity for de-duplication across repeated renders.
    pub fn unique_key(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}",
            self.analyzer(),
            self.path(),
            self.line().map_or_else(|| "-".to_string(), |l| l.to_string()),
            self.column(),
            self.check(),
        )
    }

    fn inline_content(&self) -> String {
        match self {
            Finding::Lint(f) => format!(
                "{}: {} [{}: {}]",
                f.level.title(),
                f.message,
                f.linter,
                f.check
            ),
            _ => format!(
                "{}: {} [{}]",
                self.level().title(),
                self.message(),
                self.check()
            ),
        }
    }

    /// Point or whole-file inline comment. The review API cannot represent a
    /// null line: whole-file findings serialize as line 1 with length -1.
    pub fn render_inline(&self) -> InlineComment {
        let (line_number, line_length) = match self.line() {
            Some(line) => (line, 0),
            None => (1, -1),
        };
        InlineComment {
            file_path: self.path().to_string(),
            line_number,
            line_length,
            content: self.inline_content(),
            is_new_file: true,
        }
    }

    /// Entry for the batched lint submission.
    pub fn render_lint_entry(&self) -> LintEntry {
        LintEntry {
            name: self.analyzer().to_string(),
            path: self.path().to_string(),
            line: self.line().unwrap_or(1),
            char_offset: self.column(),
            code: self.check().to_string(),
            description: self.message().to_string(),
            severity: self.level().to_string(),
        }
    }

    /// Entry for the unit-result channel; only meaningful for build errors.
    pub fn render_unit_entry(&self) -> UnitEntry {
        UnitEntry {
            name: "general".to_string(),
            namespace: "code-review".to_string(),
            result: "fail".to_string(),
            format: "remarkup".to_string(),
            details: format!("Code analysis found a **build error**: \n{}", self.message()),
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} issue {}@{} {} ",
            self.analyzer(),
            self.check(),
            self.level(),
            self.path(),
        )?;
        match self.line() {
            Some(line) => write!(f, "line {}", line),
            None => write!(f, "full file"),
        }
    }
}
