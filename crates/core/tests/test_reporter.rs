use crier_core::{
    ApiError, ExternalFinding, Finding, ImprovementPatch, InlineComment, Level, LintEntry,
    LintFinding, Policy, ReportError, Reporter, ReviewApi, Revision, StaticAnalysisFinding,
    StyleFinding, TaskFailure, UnitEntry, UrlsConfig,
};
use std::cell::RefCell;

#[derive(Debug, Clone, PartialEq)]
enum WireCall {
    Inline {
        diff_id: u64,
        inline: InlineComment,
    },
    Comment {
        revision_id: u64,
        message: String,
        attach_inlines: bool,
    },
    BuildResult {
        build_target: String,
        lint: Vec<LintEntry>,
        unit: Vec<UnitEntry>,
    },
}

impl WireCall {
    fn endpoint(&self) -> &'static str {
        match self {
            WireCall::Inline { .. } => "createinline",
            WireCall::Comment { .. } => "createcomment",
            WireCall::BuildResult { .. } => "sendmessage",
        }
    }
}

#[derive(Default)]
struct RecordingApi {
    calls: RefCell<Vec<WireCall>>,
}

impl RecordingApi {
    fn calls(&self) -> Vec<WireCall> {
        self.calls.borrow().clone()
    }

    fn endpoints(&self) -> Vec<&'static str> {
        self.calls.borrow().iter().map(WireCall::endpoint).collect()
    }
}

impl ReviewApi for RecordingApi {
    fn create_inline(&self, diff_id: u64, inline: &InlineComment) -> Result<String, ApiError> {
        self.calls.borrow_mut().push(WireCall::Inline {
            diff_id,
            inline: inline.clone(),
        });
        Ok("PHID-XXXX-YYYYY".to_string())
    }

    fn create_comment(
        &self,
        revision_id: u64,
        message: &str,
        attach_inlines: bool,
    ) -> Result<(), ApiError> {
        self.calls.borrow_mut().push(WireCall::Comment {
            revision_id,
            message: message.to_string(),
            attach_inlines,
        });
        Ok(())
    }

    fn send_build_result(
        &self,
        build_target: &str,
        lint: &[LintEntry],
        unit: &[UnitEntry],
    ) -> Result<(), ApiError> {
        self.calls.borrow_mut().push(WireCall::BuildResult {
            build_target: build_target.to_string(),
            lint: lint.to_vec(),
            unit: unit.to_vec(),
        });
        Ok(())
    }
}

fn urls() -> UrlsConfig {
    UrlsConfig {
        results: "https://results.example.com".to_string(),
        jobs: "https://jobs.example.com".to_string(),
        report: "https://report.example.com/new".to_string(),
    }
}

fn revision() -> Revision {
    Revision::new(51, 42, "PHID-HMBT-test")
        .with_files(["python/test.py", "dom/test.cpp"])
        .with_lines("python/test.py", [41, 42, 43])
        .with_lines("dom/test.cpp", [42])
}

fn lint_error() -> Finding {
    Finding::Lint(LintFinding::new(
        "lint-py-flake8",
        "python/test.py",
        42,
        1,
        Level::Error,
        "flake8",
        "EXXX",
        "A bad bad error",
    ))
}

#[test]
fn in_patch_error_inlines_then_comments_by_default() {
    let api = RecordingApi::default();
    let reporter = Reporter::new(Policy::default(), urls(), &api).unwrap();

    let publication = reporter
        .publish(&[lint_error()], &revision(), &[])
        .unwrap();

    assert_eq!(publication.findings.len(), 1);
    assert_eq!(publication.patches.len(), 0);

    let calls = api.calls();
    assert_eq!(api.endpoints(), ["createinline", "createcomment"]);
    assert_eq!(
        calls[0],
        WireCall::Inline {
            diff_id: 42,
            inline: InlineComment {
                file_path: "python/test.py".to_string(),
                line_number: 42,
                line_length: 0,
                content: "Error: A bad bad error [flake8: EXXX]".to_string(),
                is_new_file: true,
            },
        }
    );
    match &calls[1] {
        WireCall::Comment {
            revision_id,
            attach_inlines,
            ..
        } => {
            assert_eq!(*revision_id, 51);
            assert!(attach_inlines);
        }
        other => panic!("expected comment, got {:?}", other),
    }
}

#[test]
fn publish_errors_routes_the_same_finding_to_the_lint_batch() {
    let api = RecordingApi::default();
    let policy = Policy {
        publish_errors: true,
        ..Policy::default()
    };
    let reporter = Reporter::new(policy, urls(), &api).unwrap();

    let publication = reporter
        .publish(&[lint_error()], &revision(), &[])
        .unwrap();

    assert_eq!(publication.findings.len(), 1);
    assert_eq!(api.endpoints(), ["createcomment", "sendmessage"]);

    match &api.calls()[1] {
        WireCall::BuildResult {
            build_target,
            lint,
            unit,
        } => {
            assert_eq!(build_target, "PHID-HMBT-test");
            assert!(unit.is_empty());
            assert_eq!(
                *lint,
                vec![LintEntry {
                    name: "lint-py-flake8".to_string(),
                    path: "python/test.py".to_string(),
                    line: 42,
                    char_offset: 1,
                    code: "EXXX".to_string(),
                    description: "A bad bad error".to_string(),
                    severity: "error".to_string(),
                }]
            );
        }
        other => panic!("expected batch result, got {:?}", other),
    }
}

#[test]
fn out_of_patch_findings_follow_the_error_policy() {
    let revision = Revision::new(51, 42, "PHID-HMBT-test")
        .with_files(["path/to/file.py"])
        .with_lines("path/to/file.py", [1, 2, 3]);

    let findings = [
        // Warning in patch
        Finding::Lint(LintFinding::new(
            "lint-dummy",
            "path/to/file.py",
            2,
            25,
            Level::Warning,
            "flake8",
            "EYYY",
            "Some not so bad python mistake",
        )),
        // Error outside of patch
        Finding::Lint(LintFinding::new(
            "lint-dummy",
            "path/to/file.py",
            10,
            12,
            Level::Error,
            "flake8",
            "EXXX",
            "Some bad python typo",
        )),
        // Warning outside of patch, always dropped
        Finding::Lint(LintFinding::new(
            "lint-dummy",
            "path/to/file.py",
            25,
            1,
            Level::Warning,
            "flake8",
            "EZZZ",
            "Random mistake that will be ignored",
        )),
    ];

    // Default policy: the out-of-patch error is dropped too.
    let api = RecordingApi::default();
    let reporter = Reporter::new(Policy::default(), urls(), &api).unwrap();
    let publication = reporter.publish(&findings, &revision, &[]).unwrap();
    assert_eq!(publication.findings.len(), 1);
    assert_eq!(api.endpoints(), ["createinline", "createcomment"]);

    // publish_errors: the out-of-patch error joins the lint batch.
    let api = RecordingApi::default();
    let policy = Policy {
        publish_errors: true,
        ..Policy::default()
    };
    let reporter = Reporter::new(policy, urls(), &api).unwrap();
    let publication = reporter.publish(&findings, &revision, &[]).unwrap();
    assert_eq!(publication.findings.len(), 2);
    assert_eq!(
        api.endpoints(),
        ["createinline", "createcomment", "sendmessage"]
    );
    match &api.calls()[2] {
        WireCall::BuildResult { lint, .. } => {
            assert_eq!(lint.len(), 1);
            assert_eq!(lint[0].code, "EXXX");
            assert_eq!(lint[0].line, 10);
        }
        other => panic!("expected batch result, got {:?}", other),
    }
}

#[test]
fn whole_file_finding_inlines_as_line_one() {
    let revision = Revision::new(51, 42, "PHID-HMBT-test").with_lines("xx.cpp", [123, 124, 125]);

    let finding = Finding::External(ExternalFinding::new(
        "full-file-analyzer",
        "xx.cpp",
        -1,
        Level::Warning,
        "a-huge-issue",
        "Something bad happened on the whole file !",
    ));
    assert_eq!(finding.line(), None);
    assert!(revision.has_file(finding.path()));
    assert!(revision.contains(&finding));

    let api = RecordingApi::default();
    let reporter = Reporter::new(Policy::default(), urls(), &api).unwrap();
    let publication = reporter.publish(&[finding], &revision, &[]).unwrap();

    assert_eq!(publication.findings.len(), 1);
    assert_eq!(api.endpoints(), ["createinline", "createcomment"]);
    assert_eq!(
        api.calls()[0],
        WireCall::Inline {
            diff_id: 42,
            inline: InlineComment {
                file_path: "xx.cpp".to_string(),
                // The wire format cannot represent a null line
                line_number: 1,
                line_length: -1,
                content: "Warning: Something bad happened on the whole file ! [a-huge-issue]"
                    .to_string(),
                is_new_file: true,
            },
        }
    );
}

#[test]
fn build_errors_route_to_the_unit_channel_only() {
    let revision =
        Revision::new(51, 42, "PHID-HMBD-deadbeef12456").with_lines("test.cpp", [41, 42, 43]);

    let finding = Finding::StaticAnalysis(StaticAnalysisFinding {
        analyzer: "sa-buildscan".to_string(),
        path: "test.cpp".to_string(),
        line: Some(41),
        column: 0,
        level: Level::Error,
        check: "NULL_RETURNS".to_string(),
        message: "Dereferencing a pointer that might be null".to_string(),
        reliability: Some("medium".to_string()),
        category: Some("Null pointer dereferences".to_string()),
        build_error: true,
    });

    let api = RecordingApi::default();
    let policy = Policy {
        publish_build_errors: true,
        ..Policy::default()
    };
    let reporter = Reporter::new(policy, urls(), &api).unwrap();
    let publication = reporter.publish(&[finding], &revision, &[]).unwrap();

    assert_eq!(publication.findings.len(), 1);
    assert_eq!(api.endpoints(), ["sendmessage"]);
    match &api.calls()[0] {
        WireCall::BuildResult {
            build_target,
            lint,
            unit,
        } => {
            assert_eq!(build_target, "PHID-HMBD-deadbeef12456");
            assert!(lint.is_empty());
            assert_eq!(
                *unit,
                vec![UnitEntry {
                    name: "general".to_string(),
                    namespace: "code-review".to_string(),
                    result: "fail".to_string(),
                    format: "remarkup".to_string(),
                    details:
                        "Code analysis found a **build error**: \nDereferencing a pointer that might be null"
                            .to_string(),
                }]
            );
        }
        other => panic!("expected batch result, got {:?}", other),
    }
}

#[test]
fn build_errors_are_dropped_without_the_flag() {
    let revision = Revision::new(51, 42, "PHID-HMBT-test").with_lines("test.cpp", [41]);

    let finding = StaticAnalysisFinding {
        analyzer: "sa-buildscan".to_string(),
        path: "test.cpp".to_string(),
        line: Some(41),
        column: 0,
        level: Level::Error,
        check: "NULL_RETURNS".to_string(),
        message: "Dereferencing a pointer that might be null".to_string(),
        reliability: None,
        category: None,
        build_error: true,
    };

    let api = RecordingApi::default();
    let reporter = Reporter::new(Policy::default(), urls(), &api).unwrap();
    let publication = reporter
        .publish(&[Finding::StaticAnalysis(finding)], &revision, &[])
        .unwrap();

    assert!(publication.findings.is_empty());
    assert!(api.calls().is_empty());
}

#[test]
fn task_failure_without_findings_publishes_one_comment() {
    let revision = Revision::new(51, 42, "PHID-HMBT-test").with_mercurial_revision("aabbccddee");
    let failure = TaskFailure::new("ab3NrysvSZyEwsOHL2MZfw", "mock-infer", 1234);

    let api = RecordingApi::default();
    let reporter = Reporter::new(Policy::default(), urls(), &api).unwrap();
    let publication = reporter.publish(&[], &revision, &[failure]).unwrap();

    assert!(publication.findings.is_empty());
    assert!(publication.patches.is_empty());
    assert_eq!(api.endpoints(), ["createcomment"]);
    match &api.calls()[0] {
        WireCall::Comment { message, .. } => assert_eq!(
            message,
            "\nThe analysis task [mock-infer](https://jobs.example.com?revision=aabbccddee&selectedJob=1234) failed, but we could not detect any issue.\nPlease check this task manually.\n\nIf you see a problem in this automated review, [please report it here](https://report.example.com/new).\n",
        ),
        other => panic!("expected comment, got {:?}", other),
    }
}

#[test]
fn task_failures_move_to_the_unit_channel_when_enabled() {
    let revision = Revision::new(51, 42, "PHID-HMBT-test").with_mercurial_revision("aabbccddee");
    let failure = TaskFailure::new("ab3NrysvSZyEwsOHL2MZfw", "mock-infer", 0);

    let api = RecordingApi::default();
    let policy = Policy {
        publish_build_errors: true,
        ..Policy::default()
    };
    let reporter = Reporter::new(policy, urls(), &api).unwrap();
    reporter.publish(&[], &revision, &[failure]).unwrap();

    assert_eq!(api.endpoints(), ["sendmessage"]);
    match &api.calls()[0] {
        WireCall::BuildResult { unit, .. } => {
            assert_eq!(unit.len(), 1);
            assert_eq!(unit[0].name, "mock-infer");
            assert_eq!(unit[0].result, "broken");
        }
        other => panic!("expected batch result, got {:?}", other),
    }
}

#[test]
fn nothing_to_report_makes_no_wire_calls() {
    let api = RecordingApi::default();
    let reporter = Reporter::new(Policy::default(), urls(), &api).unwrap();
    let publication = reporter.publish(&[], &revision(), &[]).unwrap();

    assert!(publication.findings.is_empty());
    assert!(api.calls().is_empty());
}

#[test]
fn deny_list_wins_over_allow_list() {
    let api = RecordingApi::default();
    let policy = Policy {
        analyzers: vec!["lint-py-flake8".to_string()],
        analyzers_skipped: vec!["lint-py-flake8".to_string()],
        ..Policy::default()
    };
    let reporter = Reporter::new(policy, urls(), &api).unwrap();
    let publication = reporter
        .publish(&[lint_error()], &revision(), &[])
        .unwrap();

    assert!(publication.findings.is_empty());
    assert!(api.calls().is_empty());
}

fn five_analyzer_setup() -> (Revision, Vec<Finding>) {
    let revision = Revision::new(51, 42, "PHID-HMBT-test")
        .with_files(["test.cpp", "dom/test.cpp"])
        .with_lines("test.cpp", [41, 42, 43])
        .with_lines("dom/test.cpp", [42])
        .with_patches(vec![
            ImprovementPatch::new("dummy", "D51-42", "Whatever"),
            ImprovementPatch::new("sa-tidy", "D51-42", "Some C fixes"),
            ImprovementPatch::new("style-fmt", "D51-42", "Some lint fixes"),
            ImprovementPatch::new("ext-infer", "D51-42", "Some java fixes"),
            ImprovementPatch::new("lint-py-flake8", "D51-42", "Some js fixes"),
        ]);

    let findings = vec![
        Finding::Style(StyleFinding {
            analyzer: "style-fmt".to_string(),
            path: "dom/test.cpp".to_string(),
            line: Some(42),
            column: 1,
            message: "The code does not follow the expected formatting".to_string(),
        }),
        Finding::StaticAnalysis(StaticAnalysisFinding {
            analyzer: "sa-tidy".to_string(),
            path: "test.cpp".to_string(),
            line: Some(42),
            column: 51,
            level: Level::Warning,
            check: "modernize-use-nullptr".to_string(),
            message: "dummy message".to_string(),
            reliability: None,
            category: None,
            build_error: false,
        }),
        Finding::External(ExternalFinding::new(
            "ext-infer",
            "test.cpp",
            42,
            Level::Warning,
            "dummy",
            "dummy message.",
        )),
        Finding::Lint(LintFinding::new(
            "lint-py-flake8",
            "test.cpp",
            42,
            1,
            Level::Warning,
            "flake8",
            "EXXX",
            "Python error",
        )),
        Finding::Coverage(crier_core::CoverageFinding {
            analyzer: "coverage".to_string(),
            path: "test.cpp".to_string(),
            message: "This file is uncovered".to_string(),
        }),
    ];

    (revision, findings)
}

fn published_analyzers(findings: &[Finding]) -> Vec<&str> {
    findings.iter().map(|f| f.analyzer()).collect()
}

fn patch_analyzers(patches: &[ImprovementPatch]) -> Vec<&str> {
    patches.iter().map(|p| p.analyzer.as_str()).collect()
}

#[test]
fn skipped_analyzers_filter_findings_and_patches_in_order() {
    let (revision, findings) = five_analyzer_setup();

    // No skip: everything publishes, patches keep revision order
    let api = RecordingApi::default();
    let reporter = Reporter::new(Policy::default(), urls(), &api).unwrap();
    let publication = reporter.publish(&findings, &revision, &[]).unwrap();
    assert_eq!(
        published_analyzers(&publication.findings),
        ["style-fmt", "sa-tidy", "ext-infer", "lint-py-flake8", "coverage"]
    );
    assert_eq!(
        patch_analyzers(&publication.patches),
        ["dummy", "sa-tidy", "style-fmt", "ext-infer", "lint-py-flake8"]
    );

    // Skip one analyzer
    let api = RecordingApi::default();
    let policy = Policy {
        analyzers_skipped: vec!["sa-tidy".to_string()],
        ..Policy::default()
    };
    let reporter = Reporter::new(policy, urls(), &api).unwrap();
    let publication = reporter.publish(&findings, &revision, &[]).unwrap();
    assert_eq!(
        published_analyzers(&publication.findings),
        ["style-fmt", "ext-infer", "lint-py-flake8", "coverage"]
    );
    assert_eq!(
        patch_analyzers(&publication.patches),
        ["dummy", "style-fmt", "ext-infer", "lint-py-flake8"]
    );

    // Skip two analyzers
    let api = RecordingApi::default();
    let policy = Policy {
        analyzers_skipped: vec!["style-fmt".to_string(), "sa-tidy".to_string()],
        ..Policy::default()
    };
    let reporter = Reporter::new(policy, urls(), &api).unwrap();
    let publication = reporter.publish(&findings, &revision, &[]).unwrap();
    assert_eq!(
        published_analyzers(&publication.findings),
        ["ext-infer", "lint-py-flake8", "coverage"]
    );
    assert_eq!(
        patch_analyzers(&publication.patches),
        ["dummy", "ext-infer", "lint-py-flake8"]
    );
}

#[test]
fn skipping_every_analyzer_publishes_nothing() {
    let (revision, findings) = five_analyzer_setup();

    let api = RecordingApi::default();
    let policy = Policy {
        analyzers_skipped: findings.iter().map(|f| f.analyzer().to_string()).collect(),
        ..Policy::default()
    };
    let reporter = Reporter::new(policy, urls(), &api).unwrap();
    let publication = reporter.publish(&findings, &revision, &[]).unwrap();

    assert!(publication.findings.is_empty());
    assert!(api.calls().is_empty());
}

#[test]
fn duplicate_findings_collapse_to_one_inline() {
    let api = RecordingApi::default();
    let reporter = Reporter::new(Policy::default(), urls(), &api).unwrap();
    let publication = reporter
        .publish(&[lint_error(), lint_error()], &revision(), &[])
        .unwrap();

    assert_eq!(publication.findings.len(), 1);
    assert_eq!(api.endpoints(), ["createinline", "createcomment"]);
}

#[test]
fn inline_calls_are_ordered_by_path_then_line() {
    let revision = Revision::new(51, 42, "PHID-HMBT-test")
        .with_lines("a.py", [3])
        .with_lines("b.py", [2, 7]);

    let findings = [
        Finding::Lint(LintFinding::new(
            "lint-dummy", "b.py", 7, 1, Level::Warning, "flake8", "E1", "late",
        )),
        Finding::Lint(LintFinding::new(
            "lint-dummy", "a.py", 3, 1, Level::Warning, "flake8", "E2", "early",
        )),
        Finding::Lint(LintFinding::new(
            "lint-dummy", "b.py", 2, 1, Level::Warning, "flake8", "E3", "middle",
        )),
    ];

    let api = RecordingApi::default();
    let reporter = Reporter::new(Policy::default(), urls(), &api).unwrap();
    reporter.publish(&findings, &revision, &[]).unwrap();

    let positions: Vec<(String, u32)> = api
        .calls()
        .iter()
        .filter_map(|c| match c {
            WireCall::Inline { inline, .. } => {
                Some((inline.file_path.clone(), inline.line_number))
            }
            _ => None,
        })
        .collect();
    assert_eq!(
        positions,
        [
            ("a.py".to_string(), 3),
            ("b.py".to_string(), 2),
            ("b.py".to_string(), 7),
        ]
    );
}

#[test]
fn repeated_publish_produces_identical_call_sequences() {
    let (revision, findings) = five_analyzer_setup();

    let first = RecordingApi::default();
    Reporter::new(Policy::default(), urls(), &first)
        .unwrap()
        .publish(&findings, &revision, &[])
        .unwrap();

    let second = RecordingApi::default();
    Reporter::new(Policy::default(), urls(), &second)
        .unwrap()
        .publish(&findings, &revision, &[])
        .unwrap();

    assert_eq!(first.calls(), second.calls());
}

#[test]
fn blank_analyzer_id_is_a_configuration_error() {
    let api = RecordingApi::default();
    let policy = Policy {
        analyzers: vec!["  ".to_string()],
        ..Policy::default()
    };

    match Reporter::new(policy, urls(), &api) {
        Err(ReportError::Configuration(_)) => {}
        other => panic!("expected configuration error, got {:?}", other.err()),
    }
    assert!(api.calls().is_empty());
}

/// Fails the summary-comment call; everything before it must stand.
struct FailingApi {
    inner: RecordingApi,
}

impl ReviewApi for FailingApi {
    fn create_inline(&self, diff_id: u64, inline: &InlineComment) -> Result<String, ApiError> {
        self.inner.create_inline(diff_id, inline)
    }

    fn create_comment(&self, _: u64, _: &str, _: bool) -> Result<(), ApiError> {
        Err(ApiError::Http(500))
    }

    fn send_build_result(
        &self,
        build_target: &str,
        lint: &[LintEntry],
        unit: &[UnitEntry],
    ) -> Result<(), ApiError> {
        self.inner.send_build_result(build_target, lint, unit)
    }
}

#[test]
fn transport_error_aborts_the_run_without_compensation() {
    let api = FailingApi {
        inner: RecordingApi::default(),
    };
    let reporter = Reporter::new(Policy::default(), urls(), &api).unwrap();

    let result = reporter.publish(&[lint_error()], &revision(), &[]);

    match result {
        Err(ReportError::Transport(ApiError::Http(500))) => {}
        other => panic!("expected transport error, got {:?}", other.err()),
    }
    // The inline call went out before the failure and is not rolled back,
    // and the batch call was never attempted.
    assert_eq!(api.inner.endpoints(), ["createinline"]);
}
