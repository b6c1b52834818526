//! Delimited-file import of punches and absences with merge-only deduplication.

use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::{debug, warn};

use super::timestamp::{normalize, normalize_date};
use crate::error::{AppError, Result};
use crate::models::{AbsenceType, AuthorizedAbsence, RawAttendanceRecord};

/// One data row of an import file, header excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    fields: Vec<String>,
}

impl RawRow {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Trimmed field, empty when the column is missing.
    pub fn field(&self, index: usize) -> &str {
        self.fields.get(index).map_or("", |f| f.trim())
    }

    /// Optional field: missing and blank are both `None`.
    fn optional(&self, index: usize) -> Option<String> {
        Some(self.field(index)).filter(|f| !f.is_empty()).map(str::to_string)
    }
}

/// Outcome of merging imported rows into an existing collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOutcome<T> {
    /// Genuinely new entries, in file order.
    pub accepted: Vec<T>,
    /// Rows dropped for format reasons.
    pub rejected: usize,
    /// Rows already present (in the store or earlier in the same file).
    pub duplicates: usize,
}

impl<T> Default for ImportOutcome<T> {
    fn default() -> Self {
        Self {
            accepted: Vec::new(),
            rejected: 0,
            duplicates: 0,
        }
    }
}

impl<T> ImportOutcome<T> {
    /// Rows not accepted, for whatever reason.
    pub fn skipped(&self) -> usize {
        self.rejected + self.duplicates
    }

    pub fn summary(&self) -> String {
        format!(
            "Accepted: {}, Skipped: {} ({} invalid, {} duplicates)",
            self.accepted.len(),
            self.skipped(),
            self.rejected,
            self.duplicates
        )
    }
}

/// `;` when the header uses it, `,` otherwise.
pub fn detect_delimiter(header: &str) -> u8 {
    if header.contains(';') { b';' } else { b',' }
}

/// Split an import file into data rows. The header row is discarded and
/// decides the delimiter. Each physical line is parsed on its own, so a
/// stray quote cannot swallow the lines after it. Unreadable lines become
/// empty rows so they are counted as rejected downstream.
pub fn read_rows(text: &str) -> Vec<RawRow> {
    let text = text.trim_start_matches('\u{FEFF}');
    let mut lines = text.lines();
    let header = lines.next().unwrap_or("");

    let mut builder = csv::ReaderBuilder::new();
    builder
        .delimiter(detect_delimiter(header))
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All);

    let mut rows = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        if line.matches('"').count() % 2 != 0 {
            warn!("Unbalanced quote in import row: {line}");
            rows.push(RawRow::default());
            continue;
        }

        match builder.from_reader(line.as_bytes()).records().next() {
            Some(Ok(record)) if record.iter().all(str::is_empty) => {}
            Some(Ok(record)) => rows.push(RawRow::new(record.iter())),
            Some(Err(e)) => {
                warn!("Unreadable import row: {e}");
                rows.push(RawRow::default());
            }
            None => {}
        }
    }
    rows
}

/// Merge punch rows (`Name, EmployeeId, Timestamp`) into `existing`.
///
/// Pure: the caller persists `existing + accepted`.
pub fn ingest(existing: &[RawAttendanceRecord], rows: &[RawRow]) -> ImportOutcome<RawAttendanceRecord> {
    let mut seen: HashSet<String> = existing.iter().map(RawAttendanceRecord::dedup_key).collect();
    let mut outcome = ImportOutcome::default();

    for row in rows {
        let employee_id = row.field(1);
        let timestamp = normalize(row.field(2));

        if employee_id.is_empty() || timestamp.is_empty() {
            debug!("Rejected punch row {row:?}");
            outcome.rejected += 1;
            continue;
        }

        let record = RawAttendanceRecord {
            employee_id: employee_id.to_string(),
            name: row.field(0).to_string(),
            timestamp,
        };

        if seen.insert(record.dedup_key()) {
            outcome.accepted.push(record);
        } else {
            outcome.duplicates += 1;
        }
    }

    outcome
}

/// Merge absence rows (`EmployeeId, Date, Type, Comment[, Start, End]`) into `existing`.
pub fn ingest_absences(existing: &[AuthorizedAbsence], rows: &[RawRow]) -> ImportOutcome<AuthorizedAbsence> {
    let mut seen: HashSet<String> = existing.iter().map(AuthorizedAbsence::dedup_key).collect();
    let mut outcome = ImportOutcome::default();

    for row in rows {
        let Some(absence_type) = AbsenceType::from_label(row.field(2)) else {
            debug!("Rejected absence row with unknown type {row:?}");
            outcome.rejected += 1;
            continue;
        };

        let candidate = AuthorizedAbsence {
            employee_id: row.field(0).to_string(),
            date: row.field(1).to_string(),
            absence_type,
            comment: row.field(3).to_string(),
            start_time: row.optional(4),
            end_time: row.optional(5),
        };

        let absence = match validate_absence(candidate) {
            Ok(absence) => absence,
            Err(e) => {
                debug!("Rejected absence row: {e}");
                outcome.rejected += 1;
                continue;
            }
        };

        if seen.insert(absence.dedup_key()) {
            outcome.accepted.push(absence);
        } else {
            outcome.duplicates += 1;
        }
    }

    outcome
}

/// Validate a manually entered absence and canonicalize its date.
pub fn validate_absence(mut absence: AuthorizedAbsence) -> Result<AuthorizedAbsence> {
    absence.employee_id = absence.employee_id.trim().to_string();
    if absence.employee_id.is_empty() {
        return Err(AppError::validation("Absence without employee id"));
    }

    absence.date = normalize_date(&absence.date);
    if NaiveDate::parse_from_str(&absence.date, "%Y-%m-%d").is_err() {
        return Err(AppError::validation(format!("Invalid absence date '{}'", absence.date)));
    }

    if absence.is_full_day() {
        absence.start_time = None;
        absence.end_time = None;
    } else if absence.window().is_none() {
        return Err(AppError::validation(format!(
            "Invalid absence window {:?}-{:?}",
            absence.start_time, absence.end_time
        )));
    }

    Ok(absence)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PUNCHES: &str = "Nom;Matricule;Date\n\
        Alice;E1;05/03/2024 08:45\n\
        Alice;E1;05/03/2024 17:20\n\
        Bob;;05/03/2024 09:00\n\
        Bob;E2;\n\
        Alice;E1;2024-03-05 08:45:00\n";

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("Name;Id;Timestamp"), b';');
        assert_eq!(detect_delimiter("Name,Id,Timestamp"), b',');
    }

    #[test]
    fn test_read_rows_skips_header_and_blank_lines() {
        let rows = read_rows("Name,Id,Timestamp\n\nAlice,E1,05/03/2024 08:45\n");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].field(1), "E1");
        assert_eq!(rows[0].field(7), "");
    }

    #[test]
    fn test_read_rows_handles_quotes_and_bom() {
        let rows = read_rows("\u{FEFF}Name,Id,Timestamp\n\"Doe, John\",E9,\"05/03/2024 08:45\"\n");
        assert_eq!(rows[0].field(0), "Doe, John");
        assert_eq!(rows[0].field(2), "05/03/2024 08:45");
    }

    #[test]
    fn test_unbalanced_quote_stays_in_its_line() {
        let text = "Name;Id;Timestamp\n\
            Alice;E1;\"05/03/2024 08:45\n\
            Bob;E2;05/03/2024 08:30\n\
            Carl;E3;05/03/2024 08:35\n";
        let outcome = ingest(&[], &read_rows(text));
        assert_eq!(outcome.rejected, 1);
        let ids: Vec<&str> = outcome.accepted.iter().map(|r| r.employee_id.as_str()).collect();
        assert_eq!(ids, vec!["E2", "E3"]);
        assert_eq!(outcome.accepted[0].timestamp, "2024-03-05 08:30:00");
    }

    #[test]
    fn test_ingest_normalizes_rejects_and_dedups() {
        let outcome = ingest(&[], &read_rows(PUNCHES));
        assert_eq!(outcome.accepted.len(), 2);
        assert_eq!(outcome.rejected, 2);
        assert_eq!(outcome.duplicates, 1);
        assert_eq!(outcome.accepted[0].timestamp, "2024-03-05 08:45:00");
        assert_eq!(outcome.accepted[1].name, "Alice");
    }

    #[test]
    fn test_second_pass_accepts_nothing() {
        let rows = read_rows(PUNCHES);
        let first = ingest(&[], &rows);
        let second = ingest(&first.accepted, &rows);
        assert!(second.accepted.is_empty());
        assert_eq!(second.duplicates, 3);
    }

    #[test]
    fn test_ingest_absences() {
        let text = "EmployeeId,Date,Type,Comment,Start,End\n\
            E4,07/03/2024,Maladie,Certificat\n\
            E4,2024-03-07,Congé payé,doublon\n\
            E5,2024-03-07,Autorisation,RDV,08:00,10:00\n\
            E5,2024-03-07,Autorisation,RDV,10:00,08:00\n\
            E6,2024-03-07,Vacances,\n\
            ,2024-03-07,Maladie,\n\
            E7,not-a-date,Maladie,\n";
        let outcome = ingest_absences(&[], &read_rows(text));
        assert_eq!(outcome.accepted.len(), 2);
        assert_eq!(outcome.duplicates, 1);
        assert_eq!(outcome.rejected, 4);
        assert_eq!(outcome.accepted[0].date, "2024-03-07");
        assert_eq!(outcome.accepted[0].comment, "Certificat");
        assert_eq!(outcome.accepted[1].window(), Some((480, 600)));
    }

    #[test]
    fn test_partial_absences_do_not_collide_with_full_day() {
        let existing = vec![AuthorizedAbsence::full_day("E1", "2024-03-05", AbsenceType::Sickness)];
        let rows = vec![RawRow::new(["E1", "2024-03-05", "Autorisation", "", "08:00", "09:00"])];
        let outcome = ingest_absences(&existing, &rows);
        assert_eq!(outcome.accepted.len(), 1);
    }

    #[test]
    fn test_summary() {
        let outcome: ImportOutcome<RawAttendanceRecord> = ImportOutcome {
            accepted: vec![],
            rejected: 2,
            duplicates: 3,
        };
        assert_eq!(outcome.summary(), "Accepted: 0, Skipped: 5 (2 invalid, 3 duplicates)");
    }
}
