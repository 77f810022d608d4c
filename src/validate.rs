use serde_json::json;

use crate::store::SubjectEntry;

/// Recoverable input error surfaced to the presentation layer. The batch is
/// aborted on the first bad line; nothing is persisted.
#[derive(Debug, Clone)]
pub struct ValidateError {
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl ValidateError {
    fn new(code: &str, message: impl Into<String>, details: Option<serde_json::Value>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details,
        }
    }

    pub fn invalid_score_format(subject: &str) -> Self {
        Self::new(
            "invalid_score_format",
            format!("invalid score for {}: enter a whole number", subject),
            Some(json!({ "subject": subject })),
        )
    }

    pub fn score_out_of_range(subject: &str) -> Self {
        Self::new(
            "score_out_of_range",
            format!("marks for {} must be between 0 and 100", subject),
            Some(json!({ "subject": subject })),
        )
    }

    pub fn no_valid_entries() -> Self {
        Self::new(
            "no_valid_entries",
            "no valid subject: score pairs found",
            None,
        )
    }

    pub fn missing_columns(missing: &[&str]) -> Self {
        Self::new(
            "missing_columns",
            format!("file must contain columns: {}", missing.join(", ")),
            Some(json!({ "missing": missing })),
        )
    }
}

/// Parses raw `"Subject: Score"` text into an ordered draft.
///
/// Lines without a `:` separator are skipped. Scores must be bare decimal
/// digit runs (no sign, no fraction) in 0..=100. A later duplicate subject
/// overwrites the earlier value but keeps its original position.
pub fn parse_score_lines(raw: &str) -> Result<Vec<SubjectEntry>, ValidateError> {
    let mut entries: Vec<SubjectEntry> = Vec::new();

    for line in raw.lines() {
        let Some((subject, score_text)) = line.split_once(':') else {
            continue;
        };
        let subject = subject.trim();
        let score_text = score_text.trim();
        if subject.is_empty() {
            continue;
        }

        if score_text.is_empty() || !score_text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidateError::invalid_score_format(subject));
        }
        let Ok(score) = score_text.parse::<i64>() else {
            return Err(ValidateError::invalid_score_format(subject));
        };
        if !(0..=100).contains(&score) {
            return Err(ValidateError::score_out_of_range(subject));
        }

        upsert(&mut entries, subject, score);
    }

    if entries.is_empty() {
        return Err(ValidateError::no_valid_entries());
    }
    Ok(entries)
}

/// Applies the same trim/range/dedup rules to an already-structured draft
/// (the edit flow), so both ingestion paths share one rule set.
pub fn normalize_entries(raw: Vec<SubjectEntry>) -> Result<Vec<SubjectEntry>, ValidateError> {
    let mut entries: Vec<SubjectEntry> = Vec::new();

    for entry in raw {
        let subject = entry.subject.trim();
        if subject.is_empty() {
            continue;
        }
        if !(0..=100).contains(&entry.score) {
            return Err(ValidateError::score_out_of_range(subject));
        }
        upsert(&mut entries, subject, entry.score);
    }

    if entries.is_empty() {
        return Err(ValidateError::no_valid_entries());
    }
    Ok(entries)
}

fn upsert(entries: &mut Vec<SubjectEntry>, subject: &str, score: i64) {
    if let Some(existing) = entries.iter_mut().find(|e| e.subject == subject) {
        existing.score = score;
    } else {
        entries.push(SubjectEntry {
            subject: subject.to_string(),
            score,
        });
    }
}

/// Re-expresses a tabular file as `"Subject: Score"` lines for
/// [`parse_score_lines`]. The header row must carry `Subject` and `Score`
/// columns. Rows too short to reach both columns are skipped, like
/// separator-less lines in the text path.
pub fn csv_to_score_lines(text: &str) -> Result<String, ValidateError> {
    let mut rows = text.lines().filter(|l| !l.trim().is_empty());

    let Some(header) = rows.next() else {
        return Err(ValidateError::missing_columns(&["Subject", "Score"]));
    };
    let columns = split_csv_row(header);
    let subject_idx = columns.iter().position(|c| c == "Subject");
    let score_idx = columns.iter().position(|c| c == "Score");
    let (subject_idx, score_idx) = match (subject_idx, score_idx) {
        (Some(s), Some(c)) => (s, c),
        (s, c) => {
            let mut missing = Vec::new();
            if s.is_none() {
                missing.push("Subject");
            }
            if c.is_none() {
                missing.push("Score");
            }
            return Err(ValidateError::missing_columns(&missing));
        }
    };

    let mut lines = Vec::new();
    for row in rows {
        let fields = split_csv_row(row);
        let (Some(subject), Some(score)) = (fields.get(subject_idx), fields.get(score_idx)) else {
            continue;
        };
        lines.push(format!("{}: {}", subject, score));
    }
    Ok(lines.join("\n"))
}

// Comma-split with optional double-quote wrapping; "" inside a quoted field
// is an escaped quote. No embedded newlines.
fn split_csv_row(row: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = row.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(field.trim().to_string());
                field.clear();
            }
            _ => field.push(c),
        }
    }
    fields.push(field.trim().to_string());
    fields
}
