use crate::grading;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::store::Report;
use serde_json::json;

const DOCUMENT_LINES_PER_PAGE: usize = 26;

fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

fn find_report<'a>(state: &'a AppState, req: &Request) -> Result<&'a Report, serde_json::Value> {
    if state.db.is_none() {
        return Err(err(&req.id, "no_workspace", "select a workspace first", None));
    }
    let report_id = required_str(req, "reportId")?;
    state
        .recent
        .find(&report_id)
        .ok_or_else(|| err(&req.id, "not_found", "report not found", None))
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Tabular projection: one row per subject with that score's own band
/// letter. Pure read, no mutation.
fn handle_export_csv(state: &mut AppState, req: &Request) -> serde_json::Value {
    let report = match find_report(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let mut content = String::from("Subject,Score,Grade\n");
    for entry in &report.subjects {
        let band = grading::band_for_score(entry.score);
        content.push_str(&format!(
            "{},{},{}\n",
            csv_field(&entry.subject),
            entry.score,
            band.letter
        ));
    }

    ok(
        &req.id,
        json!({
            "filename": format!("{}_report.csv", report.student_name),
            "content": content,
        }),
    )
}

/// Paginated document projection: header, summary block, per-subject lines,
/// chunked into fixed-height pages. The frontend owns byte rendering.
fn handle_export_document(state: &mut AppState, req: &Request) -> serde_json::Value {
    let report = match find_report(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let mut lines: Vec<String> = Vec::new();
    lines.push(format!("Date: {}", report.date));
    lines.push(format!(
        "Class: {}",
        report.class_section.as_deref().unwrap_or("N/A")
    ));
    lines.push(String::new());
    lines.push("Summary".to_string());
    lines.push(format!("Average Score: {:.2}%", report.average));
    lines.push(format!(
        "Total Marks: {}/{}",
        report.total_marks,
        report.subjects.len() as i64 * 100
    ));
    lines.push(format!("Overall Grade: {}", report.grade));
    lines.push(format!("Remarks: {}", report.remarks));
    lines.push(String::new());
    lines.push("Subject-wise Scores".to_string());
    for entry in &report.subjects {
        lines.push(format!("{}: {}/100", entry.subject, entry.score));
    }

    let pages: Vec<serde_json::Value> = lines
        .chunks(DOCUMENT_LINES_PER_PAGE)
        .enumerate()
        .map(|(i, chunk)| json!({ "number": i + 1, "lines": chunk }))
        .collect();

    ok(
        &req.id,
        json!({
            "title": format!("Report Card for {}", report.student_name),
            "filename": format!("{}_report.pdf", report.student_name),
            "pages": pages,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "export.csv" => Some(handle_export_csv(state, req)),
        "export.document" => Some(handle_export_document(state, req)),
        _ => None,
    }
}
