use chrono::Local;
use rusqlite::Connection;
use uuid::Uuid;

use crate::grading;
use crate::store::{self, Report, StoreError, SubjectEntry};

pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn now_stamp() -> String {
    Local::now().format(DATE_FORMAT).to_string()
}

/// Assembles a fresh report from a validated draft: new id, current
/// timestamp, derived fields computed here and nowhere else.
pub fn compose_report(
    student_name: &str,
    class_section: Option<&str>,
    entries: Vec<SubjectEntry>,
) -> Report {
    let scores: Vec<i64> = entries.iter().map(|e| e.score).collect();
    let total_marks: i64 = scores.iter().sum();
    let average = grading::calculate_average(&scores);
    let band = grading::assign_grade(average);

    Report {
        id: Uuid::new_v4().to_string(),
        student_name: student_name.to_string(),
        class_section: class_section.map(|s| s.to_string()),
        date: now_stamp(),
        subjects: entries,
        total_marks,
        average,
        grade: band.letter.to_string(),
        remarks: band.remark.to_string(),
        grade_color: band.color.to_string(),
    }
}

/// Full replace-on-update: same id, fresh timestamp, everything else
/// recomputed from the edited draft.
pub fn recompose_report(
    existing: &Report,
    student_name: &str,
    class_section: Option<&str>,
    entries: Vec<SubjectEntry>,
) -> Report {
    let mut next = compose_report(student_name, class_section, entries);
    next.id = existing.id.clone();
    next
}

/// Recent-reports list mirrored from storage, newest first. Always refreshed
/// from the repository after a mutation, never patched in place.
#[derive(Default)]
pub struct RecentReports {
    reports: Vec<Report>,
}

impl RecentReports {
    pub fn refresh(&mut self, conn: &Connection) -> Result<(), StoreError> {
        self.reports = store::load_all(conn)?;
        Ok(())
    }

    pub fn all(&self) -> &[Report] {
        &self.reports
    }

    pub fn find(&self, id: &str) -> Option<&Report> {
        self.reports.iter().find(|r| r.id == id)
    }

    /// Case-insensitive substring match over student name and class section.
    pub fn search(&self, term: &str) -> Vec<&Report> {
        let needle = term.to_lowercase();
        self.reports
            .iter()
            .filter(|r| {
                r.student_name.to_lowercase().contains(&needle)
                    || r.class_section
                        .as_deref()
                        .map(|s| s.to_lowercase().contains(&needle))
                        .unwrap_or(false)
            })
            .collect()
    }
}
