use crate::grading;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::store::Report;
use serde_json::json;

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

/// One bar per subject, value label on top, color keyed by that subject's
/// own grade band.
fn handle_charts_bar(state: &mut AppState, req: &Request) -> serde_json::Value {
    let report = match find_report(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let bars: Vec<serde_json::Value> = report
        .subjects
        .iter()
        .map(|entry| {
            let band = grading::band_for_score(entry.score);
            json!({
                "subject": entry.subject,
                "score": entry.score,
                "label": entry.score.to_string(),
                "color": band.color,
            })
        })
        .collect();

    ok(
        &req.id,
        json!({
            "title": "Subject-wise Performance",
            "yLabel": "Scores (out of 100)",
            "yMax": 110,
            "bars": bars,
        }),
    )
}

/// Subject count per grade band, empty bands omitted. The modal band is
/// flagged so the frontend can pull its slice out.
fn handle_charts_distribution(state: &mut AppState, req: &Request) -> serde_json::Value {
    let report = match find_report(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let mut counts = vec![0usize; grading::GRADE_BANDS.len()];
    for entry in &report.subjects {
        let band = grading::band_for_score(entry.score);
        if let Some(i) = grading::GRADE_BANDS
            .iter()
            .position(|b| b.letter == band.letter)
        {
            counts[i] += 1;
        }
    }
    let max = counts.iter().copied().max().unwrap_or(0);

    let slices: Vec<serde_json::Value> = grading::GRADE_BANDS
        .iter()
        .zip(counts)
        .filter(|(_, count)| *count > 0)
        .map(|(band, count)| {
            json!({
                "grade": band.letter,
                "count": count,
                "label": format!("{} ({})", band.letter, count),
                "color": band.color,
                "emphasis": count == max,
            })
        })
        .collect();

    ok(
        &req.id,
        json!({
            "title": "Grade Distribution",
            "slices": slices,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "charts.bar" => Some(handle_charts_bar(state, req)),
        "charts.distribution" => Some(handle_charts_distribution(state, req)),
        _ => None,
    }
}
