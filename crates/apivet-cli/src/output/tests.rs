// Tests for report formatting
//
// Reports are rendered into an in-memory buffer and checked for the pieces a
// reader or a CI job relies on.

use super::*;
use apivet_core::DiagnosticAggregator;
use apivet_schemas::{CircularReferenceReport, NodePath, Origin, RefTarget, ReferencePointer};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Clone, Default)]
struct Buffer(Rc<RefCell<Vec<u8>>>);

impl Write for Buffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Buffer {
    fn contents(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).unwrap()
    }
}

fn writer(format: OutputFormat) -> (OutputWriter, Buffer) {
    let buffer = Buffer::default();
    let writer = OutputWriter::with_writer(format, false, false, 0, Box::new(buffer.clone()));
    (writer, buffer)
}

fn origin(pointer: &str) -> Origin {
    Origin::local(NodePath::from_pointer(pointer.trim_start_matches('#')).unwrap())
}

fn completed() -> RunOutcome {
    let diagnostics = DiagnosticAggregator::default().aggregate(
        vec![Diagnostic::structural(
            "schema.required",
            "'info' is a required property",
            &origin("#"),
        )],
        vec![Diagnostic::style(
            "path-keys-no-trailing-slash",
            Severity::Warning,
            "Path must not end with slash.",
            &origin("#/paths/~1pets~1"),
        )],
    );
    let verdict = diagnostics.verdict();
    RunOutcome::Completed { diagnostics, verdict }
}

fn circular() -> RunOutcome {
    let pointer = |source: &str, raw: &str| {
        ReferencePointer::new(raw, origin(source), RefTarget::parse(raw, None).unwrap())
    };
    let a_to_b = pointer("#/components/schemas/A", "#/components/schemas/B");
    let b_to_a = pointer("#/components/schemas/B", "#/components/schemas/A");
    RunOutcome::Circular(CircularReferenceReport {
        chains: vec![CircularChain {
            pointers: vec![a_to_b.clone(), b_to_a, a_to_b],
        }],
    })
}

#[test]
fn test_human_report_groups_by_severity() {
    let report = FileReport::from_outcome("openapi.yaml", completed(), false);
    let (mut out, buffer) = writer(OutputFormat::Human);
    out.reports(&[report]).unwrap();

    let text = buffer.contents();
    let errors = text.find("errors").unwrap();
    let warnings = text.find("warnings").unwrap();
    assert!(errors < warnings);
    assert!(text.contains("'info' is a required property"));
    assert!(text.contains("Rule    :   path-keys-no-trailing-slash"));
    assert!(text.contains("Path    :   #/paths/~1pets~1"));
    assert!(text.contains("Summary: 1 error(s), 1 warning(s), 0 info, 0 hint(s)"));
    assert!(text.contains("Verdict: Failed"));
    assert!(!text.contains("Validation Results for"));
}

#[test]
fn test_errors_only_keeps_summary() {
    let report = FileReport::from_outcome("openapi.yaml", completed(), true);
    assert_eq!(report.diagnostics.len(), 1);
    assert!(report.diagnostics[0].is_error());
    assert_eq!(report.summary.warning, 1);
}

#[test]
fn test_human_circular_report() {
    let report = FileReport::from_outcome("cycle.yaml", circular(), false);
    assert!(!report.passed());
    assert!(report.verdict.is_none());

    let (mut out, buffer) = writer(OutputFormat::Human);
    out.reports(&[report]).unwrap();
    let text = buffer.contents();
    assert!(text.contains("Circular references detected"));
    assert!(text.contains("Chain 1:"));
    assert!(text.contains("#/components/schemas/B  $ref: #/components/schemas/A"));
    assert!(!text.contains("Verdict"));
}

#[test]
fn test_human_headers_for_many_files() {
    let reports = vec![
        FileReport::from_outcome("a.yaml", completed(), false),
        FileReport::from_error("b.json", &"Failed to parse document"),
    ];
    let (mut out, buffer) = writer(OutputFormat::Human);
    out.reports(&reports).unwrap();
    let text = buffer.contents();
    assert!(text.contains("Validation Results for a.yaml:"));
    assert!(text.contains("Validation Results for b.json:"));
    assert!(text.contains("Invalid input file: b.json"));
}

#[test]
fn test_json_single_report_is_an_object() {
    let report = FileReport::from_outcome("openapi.yaml", completed(), false);
    let (mut out, buffer) = writer(OutputFormat::Json);
    out.reports(&[report]).unwrap();

    let value: serde_json::Value = serde_json::from_str(&buffer.contents()).unwrap();
    assert_eq!(value["file"], "openapi.yaml");
    assert_eq!(value["verdict"], "fail");
    assert_eq!(value["summary"]["error"], 1);
    assert_eq!(value["diagnostics"].as_array().unwrap().len(), 2);
    assert_eq!(value["diagnostics"][0]["code"], "schema.required");
    assert!(value["circular_references"].as_array().unwrap().is_empty());
    assert!(value.get("error").is_none());
    assert!(value["generated_at"].as_str().unwrap().ends_with('Z'));
}

#[test]
fn test_json_many_reports_is_an_array() {
    let reports = vec![
        FileReport::from_outcome("a.yaml", circular(), false),
        FileReport::from_error("b.json", &"boom"),
    ];
    let (mut out, buffer) = writer(OutputFormat::JsonPretty);
    out.reports(&reports).unwrap();

    let value: serde_json::Value = serde_json::from_str(&buffer.contents()).unwrap();
    let array = value.as_array().unwrap();
    assert_eq!(array.len(), 2);
    assert!(array[0]["verdict"].is_null());
    assert_eq!(array[0]["circular_references"].as_array().unwrap().len(), 1);
    assert_eq!(array[1]["error"], "boom");
}

#[test]
fn test_yaml_report() {
    let report = FileReport::from_outcome("openapi.yaml", completed(), false);
    let (mut out, buffer) = writer(OutputFormat::Yaml);
    out.reports(&[report]).unwrap();
    let value: serde_yaml::Value = serde_yaml::from_str(&buffer.contents()).unwrap();
    assert_eq!(value["verdict"], serde_yaml::Value::from("fail"));
}

#[test]
fn test_table_and_messages() {
    let (mut out, buffer) = writer(OutputFormat::Human);
    out.section("Rules").unwrap();
    out.table(
        &["Code", "Severity"],
        vec![vec!["info-contact".to_string(), "warning".to_string()]],
    )
    .unwrap();
    out.warning("unknown rule 'x'").unwrap();

    let text = buffer.contents();
    assert!(text.contains("=== Rules ==="));
    assert!(text.contains("Code         │ Severity"));
    assert!(text.contains("info-contact │ warning"));
    assert!(text.contains("WARNING: unknown rule 'x'"));
}

#[test]
fn test_machine_formats_skip_decoration() {
    let (mut out, buffer) = writer(OutputFormat::Json);
    out.section("Rules").unwrap();
    out.info("hello").unwrap();
    out.table(&["a"], vec![vec!["b".to_string()]]).unwrap();
    assert!(buffer.contents().is_empty());
}

#[test]
fn test_quiet_suppresses_info() {
    let buffer = Buffer::default();
    let mut out = OutputWriter::with_writer(OutputFormat::Human, false, true, 0, Box::new(buffer.clone()));
    out.info("hidden").unwrap();
    out.success("hidden").unwrap();
    out.error("shown").unwrap();
    assert_eq!(buffer.contents(), "ERROR: shown\n");
}

fn repeated() -> RunOutcome {
    let style = |code: &str, severity: Severity, pointer: &str| {
        Diagnostic::style(code, severity, "message", &origin(pointer))
    };
    let diagnostics = DiagnosticAggregator::default().aggregate(
        vec![],
        vec![
            style("info-contact", Severity::Warning, "#/info"),
            style("operation-operationId", Severity::Warning, "#/paths/~1a/get"),
            style("operation-operationId", Severity::Warning, "#/paths/~1b/get"),
            style("operation-operationId", Severity::Warning, "#/paths/~1c/get"),
            style("no-eval-in-markdown", Severity::Error, "#/info/description"),
        ],
    );
    let verdict = diagnostics.verdict();
    RunOutcome::Completed { diagnostics, verdict }
}

#[test]
fn test_source_lines_are_reported() {
    let mut outcome = completed();
    if let RunOutcome::Completed { diagnostics, .. } = &mut outcome {
        diagnostics.locate_lines(|d| (d.code == "path-keys-no-trailing-slash").then_some(7));
    }
    let report = FileReport::from_outcome("openapi.yaml", outcome, false);

    let (mut out, buffer) = writer(OutputFormat::Human);
    out.reports(&[report.clone()]).unwrap();
    let text = buffer.contents();
    assert!(text.contains("Path    :   #/paths/~1pets~1\n  Line    :   7\n"));
    assert_eq!(text.matches("Line    :").count(), 1);

    let (mut out, buffer) = writer(OutputFormat::Json);
    out.reports(&[report]).unwrap();
    let value: serde_json::Value = serde_json::from_str(&buffer.contents()).unwrap();
    assert!(value["diagnostics"][0].get("line").is_none());
    assert_eq!(value["diagnostics"][1]["line"], 7);
}

#[test]
fn test_rule_statistics_order_and_share() {
    let report = FileReport::from_outcome("openapi.yaml", repeated(), false);
    let statistics = rule_statistics(&report.diagnostics);
    let rows: Vec<_> = statistics
        .iter()
        .map(|s| (s.severity, s.code.as_str(), s.count, s.percentage))
        .collect();
    assert_eq!(
        rows,
        vec![
            (Severity::Error, "no-eval-in-markdown", 1, 100),
            (Severity::Warning, "operation-operationId", 3, 75),
            (Severity::Warning, "info-contact", 1, 25),
        ]
    );
    assert!(rule_statistics(&[]).is_empty());
}

#[test]
fn test_statistics_are_rendered_on_request() {
    let report = FileReport::from_outcome("openapi.yaml", repeated(), false);
    assert!(report.statistics.is_none());

    let (mut out, buffer) = writer(OutputFormat::Human);
    out.reports(&[report.clone()]).unwrap();
    assert!(!buffer.contents().contains("Statistics:"));

    let report = report.with_statistics();
    let (mut out, buffer) = writer(OutputFormat::Human);
    out.reports(&[report.clone()]).unwrap();
    let text = buffer.contents();
    let statistics = text.find("Statistics:").unwrap();
    assert!(statistics < text.find("Summary:").unwrap());
    assert!(text.contains("        3 ( 75%) : operation-operationId"));

    let (mut out, buffer) = writer(OutputFormat::Json);
    out.reports(&[report]).unwrap();
    let value: serde_json::Value = serde_json::from_str(&buffer.contents()).unwrap();
    assert_eq!(value["statistics"][1]["code"], "operation-operationId");
    assert_eq!(value["statistics"][1]["severity"], "warning");
    assert_eq!(value["statistics"][1]["count"], 3);
    assert_eq!(value["statistics"][1]["percentage"], 75);
}
