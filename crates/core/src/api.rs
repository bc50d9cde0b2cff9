//! Review-system API contract
//!
//! The reporter only talks to the review system through [`ReviewApi`];
//! transports (HTTP in the CLI crate, recorders in tests) implement it.
//! Every call is one synchronous round-trip — the reporter never issues call
//! N+1 before call N returned.

use serde::Serialize;
use thiserror::Error;

/// One inline comment, point or whole-file.
///
/// `line_length = 0` marks a point comment; `line_length = -1` is the
/// whole-file sentinel (paired with `line_number = 1`, since the wire format
/// has no null line).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineComment {
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "lineNumber")]
    pub line_number: u32,
    #[serde(rename = "lineLength")]
    pub line_length: i32,
    pub content: String,
    #[serde(rename = "isNewFile")]
    pub is_new_file: bool,
}

/// One entry of the batched lint submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LintEntry {
    pub name: String,
    pub path: String,
    pub line: u32,
    #[serde(rename = "char")]
    pub char_offset: u32,
    pub code: String,
    pub description: String,
    pub severity: String,
}

/// One entry of the batched unit-result submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitEntry {
    pub name: String,
    pub namespace: String,
    pub result: String,
    pub format: String,
    pub details: String,
}

/// Transport-level failure talking to the review system.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),

    #[error("review API returned HTTP {0}")]
    Http(u16),

    #[error("review API error {code}: {info}")]
    Remote { code: String, info: String },

    #[error("malformed review API response: {0}")]
    Malformed(String),
}

/// The three review-system endpoints the reporter drives.
///
/// Implementations must be strictly synchronous and must not retry: a failed
/// call surfaces as-is and already-sent calls stand as permanent side
/// effects.
pub trait ReviewApi {
    /// Create one inline comment on the diff. Returns the new comment id.
    fn create_inline(&self, diff_id: u64, inline: &InlineComment) -> Result<String, ApiError>;

    /// Create the revision-level summary comment, attaching drafted inlines.
    fn create_comment(
        &self,
        revision_id: u64,
        message: &str,
        attach_inlines: bool,
    ) -> Result<(), ApiError>;

    /// Send the merged lint/unit batch for the revision's build target.
    fn send_build_result(
        &self,
        build_target: &str,
        lint: &[LintEntry],
        unit: &[UnitEntry],
    ) -> Result<(), ApiError>;
}
