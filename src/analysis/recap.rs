//! Payroll recap: folds daily analyses into one entry per employee.

use std::collections::BTreeMap;

use crate::models::{AttendanceAnalysis, AttendanceStatus, RecapEntry};

/// Deduction per unauthorized absence day.
pub const ABSENCE_DEDUCTION: f64 = 150.0;
/// Deduction per incomplete day.
pub const INCOMPLETE_DEDUCTION: f64 = 100.0;
/// Cumulative lateness tolerated before any lateness deduction.
pub const LATENESS_ALLOWANCE_MINUTES: u32 = 130;
/// Deduction per hour of cumulative lateness past the allowance.
pub const LATENESS_HOURLY_DEDUCTION: f64 = 30.0;

/// Aggregate analyses per employee, worst cumulative lateness first.
pub fn aggregate(analyses: &[AttendanceAnalysis]) -> Vec<RecapEntry> {
    let mut per_employee: BTreeMap<&str, RecapEntry> = BTreeMap::new();

    for day in analyses {
        let entry = per_employee
            .entry(day.employee_id.as_str())
            .or_insert_with(|| empty_entry(day));

        match day.status {
            AttendanceStatus::Present => entry.worked += 1,
            AttendanceStatus::MeetingPresence => {
                entry.worked += 1;
                entry.meetings += 1;
            }
            AttendanceStatus::Incomplete => {
                entry.incomplete += 1;
                entry.deduction += INCOMPLETE_DEDUCTION;
            }
            AttendanceStatus::AbsentUnauthorized => {
                entry.abs_unauthorized += 1;
                entry.deduction += ABSENCE_DEDUCTION;
            }
            AttendanceStatus::AbsentAuthorized => entry.abs_authorized += 1,
            AttendanceStatus::Weekend => {}
        }

        if day.is_late {
            entry.late_cumul_minutes += day.lateness_minutes;
            entry
                .late_details
                .push(format!("{}: {} min", day.date, day.lateness_minutes));
        }
    }

    let mut recap: Vec<RecapEntry> = per_employee
        .into_values()
        .map(|mut entry| {
            entry.deduction = round2(entry.deduction + lateness_deduction(entry.late_cumul_minutes));
            entry.is_compliant = entry.abs_unauthorized == 0
                && entry.incomplete == 0
                && entry.late_cumul_minutes <= LATENESS_ALLOWANCE_MINUTES;
            entry
        })
        .collect();

    // Stable sort keeps employee-id order among ties.
    recap.sort_by(|a, b| b.late_cumul_minutes.cmp(&a.late_cumul_minutes));
    recap
}

/// Aggregate only the days of `month` (`YYYY-MM`).
pub fn aggregate_month(analyses: &[AttendanceAnalysis], month: &str) -> Vec<RecapEntry> {
    let in_month: Vec<AttendanceAnalysis> = analyses.iter().filter(|a| a.month() == month).cloned().collect();
    aggregate(&in_month)
}

/// Zero up to the allowance, then hours (rounded to 2 decimals) times the hourly rate.
pub fn lateness_deduction(late_cumul_minutes: u32) -> f64 {
    if late_cumul_minutes <= LATENESS_ALLOWANCE_MINUTES {
        return 0.0;
    }
    round2(f64::from(late_cumul_minutes) / 60.0) * LATENESS_HOURLY_DEDUCTION
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn empty_entry(day: &AttendanceAnalysis) -> RecapEntry {
    RecapEntry {
        employee_id: day.employee_id.clone(),
        name: day.name.clone(),
        worked: 0,
        late_cumul_minutes: 0,
        late_details: Vec::new(),
        abs_unauthorized: 0,
        abs_authorized: 0,
        incomplete: 0,
        meetings: 0,
        deduction: 0.0,
        is_compliant: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(employee_id: &str, d: u32, status: AttendanceStatus, late: u32) -> AttendanceAnalysis {
        AttendanceAnalysis {
            employee_id: employee_id.to_string(),
            name: format!("Name {employee_id}"),
            date: NaiveDate::from_ymd_opt(2024, 3, d).unwrap(),
            status,
            first_log: None,
            last_log: None,
            lateness_minutes: late,
            is_late: late > 0,
            work_duration_minutes: 0,
            comments: vec![],
        }
    }

    fn find<'a>(recap: &'a [RecapEntry], id: &str) -> &'a RecapEntry {
        recap.iter().find(|e| e.employee_id == id).unwrap()
    }

    #[test]
    fn test_counts_and_fixed_deductions() {
        let analyses = vec![
            day("E1", 4, AttendanceStatus::Present, 0),
            day("E1", 5, AttendanceStatus::MeetingPresence, 0),
            day("E1", 6, AttendanceStatus::AbsentUnauthorized, 0),
            day("E1", 7, AttendanceStatus::Incomplete, 0),
            day("E1", 8, AttendanceStatus::AbsentAuthorized, 0),
        ];
        let recap = aggregate(&analyses);
        assert_eq!(recap.len(), 1);
        let e1 = &recap[0];
        assert_eq!(e1.worked, 2);
        assert_eq!(e1.meetings, 1);
        assert_eq!(e1.abs_unauthorized, 1);
        assert_eq!(e1.abs_authorized, 1);
        assert_eq!(e1.incomplete, 1);
        assert_eq!(e1.deduction, 250.0);
        assert!(!e1.is_compliant);
    }

    #[test]
    fn test_lateness_allowance() {
        assert_eq!(lateness_deduction(0), 0.0);
        assert_eq!(lateness_deduction(130), 0.0);
        // 131 / 60 = 2.1833.. -> 2.18 h
        assert!((lateness_deduction(131) - 65.4).abs() < 1e-9);
        assert_eq!(lateness_deduction(180), 90.0);
    }

    #[test]
    fn test_lateness_accumulates_with_details() {
        let analyses = vec![
            day("E2", 4, AttendanceStatus::Present, 100),
            day("E2", 5, AttendanceStatus::Present, 80),
            day("E3", 5, AttendanceStatus::Present, 10),
        ];
        let recap = aggregate(&analyses);
        let e2 = find(&recap, "E2");
        assert_eq!(e2.late_cumul_minutes, 180);
        assert_eq!(e2.late_details, vec!["2024-03-04: 100 min", "2024-03-05: 80 min"]);
        assert_eq!(e2.deduction, 90.0);
        assert!(!e2.is_compliant);

        let e3 = find(&recap, "E3");
        assert!(e3.is_compliant);
        assert_eq!(e3.deduction, 0.0);

        assert_eq!(recap[0].employee_id, "E2");
    }

    #[test]
    fn test_aggregate_month_filters_period() {
        let mut april = day("E1", 5, AttendanceStatus::AbsentUnauthorized, 0);
        april.date = NaiveDate::from_ymd_opt(2024, 4, 5).unwrap();
        let analyses = vec![day("E1", 5, AttendanceStatus::Present, 0), april];
        let recap = aggregate_month(&analyses, "2024-03");
        assert_eq!(recap[0].abs_unauthorized, 0);
        assert_eq!(recap[0].worked, 1);
        assert!(aggregate_month(&analyses, "2023-01").is_empty());
    }
}
