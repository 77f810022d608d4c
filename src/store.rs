use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

/// One (subject, score) pair of a report, in display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectEntry {
    pub subject: String,
    pub score: i64,
}

/// The persisted record of one student's graded results. Derived fields
/// (`total_marks`, `average`, `grade`, `remarks`, `grade_color`) are
/// computed at composition time and stored as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    pub student_name: String,
    pub class_section: Option<String>,
    pub date: String,
    pub subjects: Vec<SubjectEntry>,
    pub total_marks: i64,
    pub average: f64,
    pub grade: String,
    pub remarks: String,
    pub grade_color: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl StoreError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn query(e: rusqlite::Error) -> Self {
        Self::new("db_query_failed", e.to_string())
    }

    fn not_found() -> Self {
        Self::new("not_found", "report not found")
    }
}

const REPORT_COLUMNS: &str =
    "id, student_name, class_section, date, total_marks, average, grade, remarks, grade_color";

fn report_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<Report> {
    Ok(Report {
        id: r.get(0)?,
        student_name: r.get(1)?,
        class_section: r.get(2)?,
        date: r.get(3)?,
        total_marks: r.get(4)?,
        average: r.get(5)?,
        grade: r.get(6)?,
        remarks: r.get(7)?,
        grade_color: r.get(8)?,
        subjects: Vec::new(),
    })
}

/// Inserts a new report row plus one subject row per entry, atomically.
pub fn save(conn: &Connection, report: &Report) -> Result<(), StoreError> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| StoreError::new("db_tx_failed", e.to_string()))?;

    if let Err(e) = tx.execute(
        "INSERT INTO reports(id, student_name, class_section, date, total_marks, average, grade, remarks, grade_color)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &report.id,
            &report.student_name,
            &report.class_section,
            &report.date,
            report.total_marks,
            report.average,
            &report.grade,
            &report.remarks,
            &report.grade_color,
        ),
    ) {
        let _ = tx.rollback();
        return Err(StoreError::new("db_insert_failed", e.to_string()));
    }

    if let Err(e) = insert_subjects(&tx, &report.id, &report.subjects) {
        let _ = tx.rollback();
        return Err(e);
    }

    tx.commit()
        .map_err(|e| StoreError::new("db_commit_failed", e.to_string()))
}

/// All reports, newest first, each with its full subject list in insertion
/// order. The rowid tiebreak keeps same-second creates deterministic.
pub fn load_all(conn: &Connection) -> Result<Vec<Report>, StoreError> {
    let sql = format!(
        "SELECT {} FROM reports ORDER BY date DESC, rowid DESC",
        REPORT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql).map_err(StoreError::query)?;
    let mut reports: Vec<Report> = stmt
        .query_map([], report_from_row)
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(StoreError::query)?;

    for report in &mut reports {
        report.subjects = load_subjects(conn, &report.id)?;
    }
    Ok(reports)
}

/// Single-report read; `Ok(None)` when the id is absent.
pub fn get(conn: &Connection, id: &str) -> Result<Option<Report>, StoreError> {
    let sql = format!("SELECT {} FROM reports WHERE id = ?", REPORT_COLUMNS);
    let row = conn
        .query_row(&sql, [id], report_from_row)
        .optional()
        .map_err(StoreError::query)?;
    let Some(mut report) = row else {
        return Ok(None);
    };
    report.subjects = load_subjects(conn, id)?;
    Ok(Some(report))
}

/// Full replace-on-update: scalar fields of the matching row plus the whole
/// subject set, in one transaction. `not_found` when the id is absent.
pub fn update(conn: &Connection, report: &Report) -> Result<(), StoreError> {
    if !exists(conn, &report.id)? {
        return Err(StoreError::not_found());
    }

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| StoreError::new("db_tx_failed", e.to_string()))?;

    if let Err(e) = tx.execute(
        "UPDATE reports
         SET student_name = ?, class_section = ?, date = ?, total_marks = ?,
             average = ?, grade = ?, remarks = ?, grade_color = ?
         WHERE id = ?",
        (
            &report.student_name,
            &report.class_section,
            &report.date,
            report.total_marks,
            report.average,
            &report.grade,
            &report.remarks,
            &report.grade_color,
            &report.id,
        ),
    ) {
        let _ = tx.rollback();
        return Err(StoreError::new("db_update_failed", e.to_string()));
    }

    if let Err(e) = tx.execute("DELETE FROM subjects WHERE report_id = ?", [&report.id]) {
        let _ = tx.rollback();
        return Err(StoreError::new("db_delete_failed", e.to_string()));
    }

    if let Err(e) = insert_subjects(&tx, &report.id, &report.subjects) {
        let _ = tx.rollback();
        return Err(e);
    }

    tx.commit()
        .map_err(|e| StoreError::new("db_commit_failed", e.to_string()))
}

/// Removes subject rows and the report row together; all-or-nothing, so no
/// orphaned subject rows can survive a failure.
pub fn delete(conn: &Connection, id: &str) -> Result<(), StoreError> {
    if !exists(conn, id)? {
        return Err(StoreError::not_found());
    }

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| StoreError::new("db_tx_failed", e.to_string()))?;

    if let Err(e) = tx.execute("DELETE FROM subjects WHERE report_id = ?", [id]) {
        let _ = tx.rollback();
        return Err(StoreError::new("db_delete_failed", e.to_string()));
    }
    if let Err(e) = tx.execute("DELETE FROM reports WHERE id = ?", [id]) {
        let _ = tx.rollback();
        return Err(StoreError::new("db_delete_failed", e.to_string()));
    }

    tx.commit()
        .map_err(|e| StoreError::new("db_commit_failed", e.to_string()))
}

fn exists(conn: &Connection, id: &str) -> Result<bool, StoreError> {
    let row: Option<i64> = conn
        .query_row("SELECT 1 FROM reports WHERE id = ?", [id], |r| r.get(0))
        .optional()
        .map_err(StoreError::query)?;
    Ok(row.is_some())
}

fn insert_subjects(
    conn: &Connection,
    report_id: &str,
    subjects: &[SubjectEntry],
) -> Result<(), StoreError> {
    for entry in subjects {
        conn.execute(
            "INSERT INTO subjects(report_id, subject_name, score) VALUES(?, ?, ?)",
            (report_id, &entry.subject, entry.score),
        )
        .map_err(|e| StoreError::new("db_insert_failed", e.to_string()))?;
    }
    Ok(())
}

fn load_subjects(conn: &Connection, report_id: &str) -> Result<Vec<SubjectEntry>, StoreError> {
    let mut stmt = conn
        .prepare("SELECT subject_name, score FROM subjects WHERE report_id = ? ORDER BY id")
        .map_err(StoreError::query)?;
    stmt.query_map([report_id], |r| {
        Ok(SubjectEntry {
            subject: r.get(0)?,
            score: r.get(1)?,
        })
    })
    .and_then(|it| it.collect::<Result<Vec<_>, _>>())
    .map_err(StoreError::query)
}
