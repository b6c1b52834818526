//! Per employee-day classification of punches against schedule and absences.
//!
//! Every `(employee, date)` pair drawn from the union of punch and absence
//! dates, crossed with every known employee, yields at most one
//! [`AttendanceAnalysis`]. Non-working days are never emitted.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{Datelike, NaiveDate};
use tracing::debug;

use super::exceptions::{match_evening, match_full_day, match_morning};
use super::schedule::resolve;
use crate::models::{AttendanceAnalysis, AttendanceStatus, AuthorizedAbsence, ClockTime, RawAttendanceRecord, Settings};

pub const MEETING_COMMENT: &str = "Réunion matinale validée (pointage unique)";
pub const SINGLE_PUNCH_COMMENT: &str = "Pointage unique : sortie non enregistrée";
pub const NO_PUNCH_COMMENT: &str = "Absence non justifiée : aucun pointage";

/// Inputs for one employee-day.
#[derive(Debug, Clone)]
pub struct DayInput<'a> {
    pub employee_id: &'a str,
    pub name: &'a str,
    pub date: NaiveDate,
    /// Punch times of the day, `HH:MM[:SS]`, any order.
    pub punches: &'a [&'a str],
    /// Absences recorded for this employee on this date, in stored order.
    pub absences: &'a [&'a AuthorizedAbsence],
}

type DayKey<'a> = (&'a str, NaiveDate);

/// Classify every employee-day. Output is ordered by date, then employee id.
pub fn classify(
    records: &[RawAttendanceRecord],
    absences: &[AuthorizedAbsence],
    settings: &Settings,
) -> Vec<AttendanceAnalysis> {
    let mut employees: BTreeMap<&str, &str> = BTreeMap::new();
    let mut dates: BTreeSet<NaiveDate> = BTreeSet::new();
    let mut punches: HashMap<DayKey<'_>, Vec<&str>> = HashMap::new();
    let mut daily_absences: HashMap<DayKey<'_>, Vec<&AuthorizedAbsence>> = HashMap::new();

    for record in records {
        let employee_id = record.employee_id.as_str();
        let name = employees.entry(employee_id).or_insert("");
        if name.is_empty() {
            *name = record.name.as_str();
        }

        let Some(date) = parse_date(record.date_part()) else {
            debug!("Dropping punch with malformed date: {}", record.timestamp);
            continue;
        };
        dates.insert(date);
        punches.entry((employee_id, date)).or_default().push(record.time_part());
    }

    for absence in absences {
        let employee_id = absence.employee_id.as_str();
        employees.entry(employee_id).or_insert("");

        let Some(date) = parse_date(&absence.date) else {
            debug!("Dropping absence with malformed date: {}", absence.date);
            continue;
        };
        dates.insert(date);
        daily_absences.entry((employee_id, date)).or_default().push(absence);
    }

    let mut analyses = Vec::new();
    for date in dates {
        for (&employee_id, &name) in &employees {
            let key = (employee_id, date);
            let day = DayInput {
                employee_id,
                name: if name.is_empty() { employee_id } else { name },
                date,
                punches: punches.get(&key).map(Vec::as_slice).unwrap_or_default(),
                absences: daily_absences.get(&key).map(Vec::as_slice).unwrap_or_default(),
            };
            if let Some(analysis) = classify_day(&day, settings) {
                analyses.push(analysis);
            }
        }
    }
    analyses
}

/// Classify one employee-day. `None` for non-working days and for days
/// whose punches cannot be read.
pub fn classify_day(day: &DayInput<'_>, settings: &Settings) -> Option<AttendanceAnalysis> {
    let day_of_week = day.date.weekday().num_days_from_sunday() as u8;
    if !settings.is_work_day(day_of_week) {
        return None;
    }

    // Full-day authorization overrides everything punch-derived.
    if let Some(absence) = match_full_day(day.absences) {
        let mut comments = vec![absence.absence_type.label().to_string()];
        if !absence.comment.trim().is_empty() {
            comments.push(absence.comment.trim().to_string());
        }
        return Some(day_record(day, AttendanceStatus::AbsentAuthorized, comments));
    }

    let mut times = Vec::with_capacity(day.punches.len());
    for raw in day.punches {
        let Some(time) = ClockTime::parse(raw) else {
            debug!("Dropping {} on {}: unreadable punch '{raw}'", day.employee_id, day.date);
            return None;
        };
        times.push(time);
    }
    times.sort_unstable();
    let first_log = times.first().copied();
    let last_log = if times.len() >= 2 { times.last().copied() } else { None };

    let schedule = resolve(day.employee_id, day.date, settings);
    let entry = schedule.rule.theoretical_entry.minutes();
    let exit = schedule.rule.theoretical_exit.minutes();
    let morning = match_morning(day.absences, entry);
    let evening = match_evening(day.absences, exit);

    let mut comments = Vec::new();
    let mut status = match times.len() {
        0 => {
            comments.push(NO_PUNCH_COMMENT.to_string());
            AttendanceStatus::AbsentUnauthorized
        }
        1 if settings.allow_single_pointage && schedule.tolerates_single_punch() => {
            comments.push(MEETING_COMMENT.to_string());
            AttendanceStatus::MeetingPresence
        }
        1 => {
            comments.push(SINGLE_PUNCH_COMMENT.to_string());
            AttendanceStatus::Incomplete
        }
        _ => AttendanceStatus::Present,
    };

    let mut result = day_record(day, status, Vec::new());
    result.first_log = first_log;
    result.last_log = last_log;

    let Some(first) = first_log else {
        result.comments = comments;
        return Some(result);
    };

    // Lateness: entry against the morning window end when one covers the
    // theoretical entry, exit against the evening window start likewise.
    let effective_entry = morning
        .and_then(AuthorizedAbsence::window)
        .map_or(entry, |(_, end)| end);
    let entry_late = (first.minutes() - effective_entry).max(0);

    let exit_late = match last_log {
        Some(last) if schedule.checks_early_leave() => {
            let effective_exit = evening
                .and_then(AuthorizedAbsence::window)
                .map_or(exit, |(start, _)| start);
            (effective_exit - last.minutes()).max(0)
        }
        _ => 0,
    };

    let total = (entry_late + exit_late) as u32;
    result.lateness_minutes = total;
    result.is_late = total > 0;
    if total > 0 && total >= settings.penalty_threshold {
        comments.push(lateness_note(entry_late, exit_late));
    }

    if let Some(last) = last_log {
        // Work is counted from the theoretical entry: arriving early adds
        // nothing, and tolerated lateness (below the penalty threshold) is
        // not taken off the day. Penalized lateness is.
        let start = if total < settings.penalty_threshold {
            entry
        } else {
            first.minutes().max(entry)
        };
        let worked = last.minutes() - start - schedule.rule.pause_minutes as i32;
        result.work_duration_minutes = worked.max(0) as u32;

        if morning.is_some() || evening.is_some() {
            status = AttendanceStatus::Present;
        }
    }

    result.status = status;
    result.comments = comments;
    Some(result)
}

fn day_record(day: &DayInput<'_>, status: AttendanceStatus, comments: Vec<String>) -> AttendanceAnalysis {
    AttendanceAnalysis {
        employee_id: day.employee_id.to_string(),
        name: day.name.to_string(),
        date: day.date,
        status,
        first_log: None,
        last_log: None,
        lateness_minutes: 0,
        is_late: false,
        work_duration_minutes: 0,
        comments,
    }
}

fn lateness_note(entry_late: i32, exit_late: i32) -> String {
    let mut sides = Vec::new();
    if entry_late > 0 {
        sides.push(format!("entrée +{entry_late} min"));
    }
    if exit_late > 0 {
        sides.push(format!("sortie anticipée +{exit_late} min"));
    }
    format!("Retard pénalisable : {} min ({})", entry_late + exit_late, sides.join(", "))
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}
