//! Daily analysis records and the payroll recap derived from them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::clock::ClockTime;

/// Attendance classification for one employee-day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    MeetingPresence,
    Incomplete,
    AbsentAuthorized,
    AbsentUnauthorized,
    Weekend,
}

impl AttendanceStatus {
    /// Stored value, as in the JSON documents.
    pub fn code(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::MeetingPresence => "meeting_presence",
            AttendanceStatus::Incomplete => "incomplete",
            AttendanceStatus::AbsentAuthorized => "absent_authorized",
            AttendanceStatus::AbsentUnauthorized => "absent_unauthorized",
            AttendanceStatus::Weekend => "weekend",
        }
    }

    /// Human-readable name for reports.
    pub fn label(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "Présent",
            AttendanceStatus::MeetingPresence => "Présence réunion",
            AttendanceStatus::Incomplete => "Incomplet",
            AttendanceStatus::AbsentAuthorized => "Absence autorisée",
            AttendanceStatus::AbsentUnauthorized => "Absence non autorisée",
            AttendanceStatus::Weekend => "Week-end",
        }
    }

    /// Counts as a worked day in the recap.
    pub fn is_worked(&self) -> bool {
        matches!(self, AttendanceStatus::Present | AttendanceStatus::MeetingPresence)
    }
}

/// Result of classifying one `(employee, date)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceAnalysis {
    pub employee_id: String,
    pub name: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub first_log: Option<ClockTime>,
    pub last_log: Option<ClockTime>,
    pub lateness_minutes: u32,
    pub is_late: bool,
    pub work_duration_minutes: u32,
    pub comments: Vec<String>,
}

impl AttendanceAnalysis {
    /// Shard month, `YYYY-MM`.
    pub fn month(&self) -> String {
        self.date.format("%Y-%m").to_string()
    }
}

/// Payroll-facing aggregate for one employee over a period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecapEntry {
    pub employee_id: String,
    pub name: String,
    pub worked: u32,
    pub late_cumul_minutes: u32,
    pub late_details: Vec<String>,
    pub abs_unauthorized: u32,
    pub abs_authorized: u32,
    pub incomplete: u32,
    pub meetings: u32,
    pub deduction: f64,
    pub is_compliant: bool,
}
