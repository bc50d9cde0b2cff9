//! Crier Core - Findings Reconciliation & Publication Engine
//!
//! This crate provides the decision engine that bridges static-analysis task
//! output and a code-review system's comment API:
//! - Revision / diff-membership model
//! - Typed findings with per-family rendering rules
//! - The Reporter: policy filtering, partitioning, and the ordered wire-call
//!   sequence that publishes one revision's findings
//! - The review-API contract implemented by transport clients

pub mod api;
pub mod config;
pub mod diff;
pub mod finding;
pub mod report;
pub mod revision;

pub use api::{ApiError, InlineComment, LintEntry, ReviewApi, UnitEntry};
pub use config::{ApiConfig, CrierConfig, UrlsConfig};
pub use diff::DiffReader;
pub use finding::{
    CoverageFinding, ExternalFinding, Family, Finding, Level, LintFinding, StaticAnalysisFinding,
    StyleFinding,
};
pub use report::{Policy, Publication, ReportError, Reporter};
pub use revision::{ImprovementPatch, Revision, TaskFailure};

/// Crier version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
