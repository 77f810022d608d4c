use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::lifecycle;
use crate::store::{self, Report, StoreError, SubjectEntry};
use crate::validate::{self, ValidateError};
use serde_json::json;

fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

fn optional_str(req: &Request, key: &str) -> Option<String> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_err(req: &Request, e: ValidateError) -> serde_json::Value {
    err(&req.id, &e.code, e.message, e.details)
}

fn store_err(req: &Request, e: StoreError) -> serde_json::Value {
    err(&req.id, &e.code, e.message, e.details)
}

fn required_student_name(req: &Request) -> Result<String, serde_json::Value> {
    let name = required_str(req, "studentName")?.trim().to_string();
    if name.is_empty() {
        return Err(err(
            &req.id,
            "bad_params",
            "studentName must not be empty",
            None,
        ));
    }
    Ok(name)
}

/// Pulls the edited draft out of params and runs it through the shared
/// validation rules. Validation always precedes any write.
fn validated_entries(req: &Request) -> Result<Vec<SubjectEntry>, serde_json::Value> {
    let Some(raw) = req.params.get("entries") else {
        return Err(err(&req.id, "bad_params", "missing entries", None));
    };
    let entries: Vec<SubjectEntry> = serde_json::from_value(raw.clone()).map_err(|e| {
        err(
            &req.id,
            "bad_params",
            format!("entries must be a list of {{subject, score}} pairs: {}", e),
            None,
        )
    })?;
    validate::normalize_entries(entries).map_err(|e| validate_err(req, e))
}

fn handle_reports_validate(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let raw_text = match required_str(req, "rawText") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match validate::parse_score_lines(&raw_text) {
        Ok(entries) => ok(&req.id, json!({ "entries": entries })),
        Err(e) => validate_err(req, e),
    }
}

fn handle_reports_import_csv(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let path = match required_str(req, "path") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let text = match std::fs::read(&path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).to_string(),
        Err(e) => {
            return err(
                &req.id,
                "file_read_failed",
                e.to_string(),
                Some(json!({ "path": path })),
            )
        }
    };

    let lines = match validate::csv_to_score_lines(&text) {
        Ok(v) => v,
        Err(e) => return validate_err(req, e),
    };
    match validate::parse_score_lines(&lines) {
        Ok(entries) => ok(&req.id, json!({ "entries": entries })),
        Err(e) => validate_err(req, e),
    }
}

fn handle_reports_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_name = match required_student_name(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let class_section = optional_str(req, "classSection");
    let entries = match validated_entries(req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let report = lifecycle::compose_report(&student_name, class_section.as_deref(), entries);
    if let Err(e) = store::save(conn, &report) {
        return store_err(req, e);
    }
    if let Err(e) = state.recent.refresh(conn) {
        return store_err(req, e);
    }
    state.current_report_id = Some(report.id.clone());

    ok(&req.id, json!({ "report": report }))
}

fn handle_reports_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let report_id = match required_str(req, "reportId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_name = match required_student_name(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let class_section = optional_str(req, "classSection");
    let entries = match validated_entries(req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let existing = match store::get(conn, &report_id) {
        Ok(Some(v)) => v,
        Ok(None) => return err(&req.id, "not_found", "report not found", None),
        Err(e) => return store_err(req, e),
    };

    let updated =
        lifecycle::recompose_report(&existing, &student_name, class_section.as_deref(), entries);
    if let Err(e) = store::update(conn, &updated) {
        return store_err(req, e);
    }
    if let Err(e) = state.recent.refresh(conn) {
        return store_err(req, e);
    }

    ok(&req.id, json!({ "report": updated }))
}

fn handle_reports_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let report_id = match required_str(req, "reportId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    if let Err(e) = store::delete(conn, &report_id) {
        return store_err(req, e);
    }
    if let Err(e) = state.recent.refresh(conn) {
        return store_err(req, e);
    }
    if state.current_report_id.as_deref() == Some(report_id.as_str()) {
        state.current_report_id = None;
    }

    ok(&req.id, json!({ "ok": true }))
}

fn handle_reports_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    if state.db.is_none() {
        return ok(&req.id, json!({ "reports": [] }));
    }

    // Reads come from the cache; it mirrors storage after every mutation.
    let reports: Vec<&Report> = match optional_str(req, "search") {
        Some(term) => state.recent.search(&term),
        None => state.recent.all().iter().collect(),
    };
    ok(&req.id, json!({ "reports": reports }))
}

fn handle_reports_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let report_id = match required_str(req, "reportId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    if state.db.is_none() {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    }

    let report = match state.recent.find(&report_id) {
        Some(r) => r.clone(),
        None => return err(&req.id, "not_found", "report not found", None),
    };
    state.current_report_id = Some(report.id.clone());
    ok(&req.id, json!({ "report": report }))
}

fn handle_reports_current(state: &mut AppState, req: &Request) -> serde_json::Value {
    let report = state
        .current_report_id
        .as_deref()
        .and_then(|id| state.recent.find(id));
    ok(&req.id, json!({ "report": report }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.validate" => Some(handle_reports_validate(state, req)),
        "reports.importCsv" => Some(handle_reports_import_csv(state, req)),
        "reports.create" => Some(handle_reports_create(state, req)),
        "reports.update" => Some(handle_reports_update(state, req)),
        "reports.delete" => Some(handle_reports_delete(state, req)),
        "reports.list" => Some(handle_reports_list(state, req)),
        "reports.open" => Some(handle_reports_open(state, req)),
        "reports.current" => Some(handle_reports_current(state, req)),
        _ => None,
    }
}
