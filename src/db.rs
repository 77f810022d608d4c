use rusqlite::Connection;
use std::path::Path;

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join("report_cards.sqlite3");
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS reports(
            id TEXT PRIMARY KEY,
            student_name TEXT NOT NULL,
            class_section TEXT,
            date TEXT NOT NULL,
            total_marks INTEGER NOT NULL,
            average REAL NOT NULL,
            grade TEXT NOT NULL,
            remarks TEXT NOT NULL,
            grade_color TEXT NOT NULL
        )",
        [],
    )?;

    // One row per (report, subject) pair. Replace semantics live in the
    // repository layer; storage itself enforces no uniqueness on names.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS subjects(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            report_id TEXT NOT NULL,
            subject_name TEXT NOT NULL,
            score INTEGER NOT NULL,
            FOREIGN KEY(report_id) REFERENCES reports(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_subjects_report ON subjects(report_id)",
        [],
    )?;

    Ok(())
}
