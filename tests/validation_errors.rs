use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_reportcardd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn reportcardd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn error_code(value: &serde_json::Value) -> Option<&str> {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
}

fn error_subject(value: &serde_json::Value) -> Option<&str> {
    value
        .get("error")
        .and_then(|e| e.get("details"))
        .and_then(|d| d.get("subject"))
        .and_then(|v| v.as_str())
}

fn entries_of(result: &serde_json::Value) -> Vec<(String, i64)> {
    result
        .get("entries")
        .and_then(|v| v.as_array())
        .expect("entries")
        .iter()
        .map(|e| {
            (
                e.get("subject")
                    .and_then(|v| v.as_str())
                    .expect("subject")
                    .to_string(),
                e.get("score").and_then(|v| v.as_i64()).expect("score"),
            )
        })
        .collect()
}

#[test]
fn validate_parses_and_preserves_entry_order() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    // Validation is pure; no workspace needed.
    let result = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "reports.validate",
        json!({ "rawText": "Math: 85\nScience: 92\nEnglish: 88" }),
    );
    assert_eq!(
        entries_of(&result),
        vec![
            ("Math".to_string(), 85),
            ("Science".to_string(), 92),
            ("English".to_string(), 88)
        ]
    );
}

#[test]
fn validate_surfaces_the_offending_subject() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let resp = request(
        &mut stdin,
        &mut reader,
        "1",
        "reports.validate",
        json!({ "rawText": "Math: 150" }),
    );
    assert_eq!(error_code(&resp), Some("score_out_of_range"));
    assert_eq!(error_subject(&resp), Some("Math"));

    let resp = request(
        &mut stdin,
        &mut reader,
        "2",
        "reports.validate",
        json!({ "rawText": "Math: abc" }),
    );
    assert_eq!(error_code(&resp), Some("invalid_score_format"));
    assert_eq!(error_subject(&resp), Some("Math"));

    // Batches abort on the first bad line; the good lines do not survive.
    let resp = request(
        &mut stdin,
        &mut reader,
        "3",
        "reports.validate",
        json!({ "rawText": "Math: 85\nScience: -3\nEnglish: 88" }),
    );
    assert_eq!(error_code(&resp), Some("invalid_score_format"));
    assert_eq!(error_subject(&resp), Some("Science"));
}

#[test]
fn validate_requires_at_least_one_entry() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    for (id, raw) in [("1", ""), ("2", "no separators here\nstill nothing")] {
        let resp = request(
            &mut stdin,
            &mut reader,
            id,
            "reports.validate",
            json!({ "rawText": raw }),
        );
        assert_eq!(error_code(&resp), Some("no_valid_entries"));
    }
}

#[test]
fn validate_takes_the_last_duplicate() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let result = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "reports.validate",
        json!({ "rawText": "Math: 85\nMath: 90" }),
    );
    assert_eq!(entries_of(&result), vec![("Math".to_string(), 90)]);
}

#[test]
fn create_enforces_the_same_rules_and_leaves_no_partial_state() {
    let workspace = temp_dir("reportcardd-validation");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let resp = request(
        &mut stdin,
        &mut reader,
        "2",
        "reports.create",
        json!({
            "studentName": "  ",
            "entries": [{ "subject": "Math", "score": 90 }]
        }),
    );
    assert_eq!(error_code(&resp), Some("bad_params"));

    let resp = request(
        &mut stdin,
        &mut reader,
        "3",
        "reports.create",
        json!({
            "studentName": "Alice",
            "entries": [
                { "subject": "Math", "score": 90 },
                { "subject": "Science", "score": 150 }
            ]
        }),
    );
    assert_eq!(error_code(&resp), Some("score_out_of_range"));
    assert_eq!(error_subject(&resp), Some("Science"));

    let resp = request(
        &mut stdin,
        &mut reader,
        "4",
        "reports.create",
        json!({ "studentName": "Alice", "entries": [] }),
    );
    assert_eq!(error_code(&resp), Some("no_valid_entries"));

    // None of the rejected requests left anything behind.
    let listed = request_ok(&mut stdin, &mut reader, "5", "reports.list", json!({}));
    assert_eq!(
        listed
            .get("reports")
            .and_then(|v| v.as_array())
            .map(|v| v.len()),
        Some(0)
    );
}

#[test]
fn import_csv_reads_subject_and_score_columns() {
    let workspace = temp_dir("reportcardd-csv");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let csv_path = workspace.join("scores.csv");
    std::fs::write(&csv_path, "Subject,Score\nMath, 85\nScience, 92\n").expect("write csv");

    let result = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "reports.importCsv",
        json!({ "path": csv_path.to_string_lossy() }),
    );
    assert_eq!(
        entries_of(&result),
        vec![("Math".to_string(), 85), ("Science".to_string(), 92)]
    );
}

#[test]
fn import_csv_without_required_columns_fails() {
    let workspace = temp_dir("reportcardd-csv-missing");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let csv_path = workspace.join("scores.csv");
    std::fs::write(&csv_path, "Name,Mark\nMath,85\n").expect("write csv");

    let resp = request(
        &mut stdin,
        &mut reader,
        "1",
        "reports.importCsv",
        json!({ "path": csv_path.to_string_lossy() }),
    );
    assert_eq!(error_code(&resp), Some("missing_columns"));
    assert_eq!(
        resp.get("error")
            .and_then(|e| e.get("details"))
            .and_then(|d| d.get("missing")),
        Some(&json!(["Subject", "Score"]))
    );

    let resp = request(
        &mut stdin,
        &mut reader,
        "2",
        "reports.importCsv",
        json!({ "path": workspace.join("absent.csv").to_string_lossy() }),
    );
    assert_eq!(error_code(&resp), Some("file_read_failed"));
}

#[test]
fn import_csv_rows_flow_through_line_validation() {
    let workspace = temp_dir("reportcardd-csv-range");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let csv_path = workspace.join("scores.csv");
    std::fs::write(&csv_path, "Subject,Score\nMath,85\nScience,130\n").expect("write csv");

    let resp = request(
        &mut stdin,
        &mut reader,
        "1",
        "reports.importCsv",
        json!({ "path": csv_path.to_string_lossy() }),
    );
    assert_eq!(error_code(&resp), Some("score_out_of_range"));
    assert_eq!(error_subject(&resp), Some("Science"));
}
