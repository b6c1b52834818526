//! Theoretical schedule lookup per employee and day.

use chrono::{Datelike, NaiveDate, Weekday};

use crate::models::{ClockTime, Department, ScheduleRule, Settings};

const BACK_OFFICE_EXIT: ClockTime = ClockTime::hm(18, 0);
const BACK_OFFICE_PAUSE: u32 = 80;

const BACK_OFFICE_SATURDAY: ScheduleRule = ScheduleRule {
    theoretical_entry: ClockTime::hm(9, 0),
    theoretical_exit: ClockTime::hm(13, 0),
    pause_minutes: 10,
};

/// Which rule set produced a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleKind {
    /// Per-employee override table.
    Fixed,
    BackOffice,
    /// Sales and anything unassigned.
    Standard,
}

/// A schedule together with the rule set it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedSchedule {
    pub kind: ScheduleKind,
    pub rule: ScheduleRule,
}

impl ResolvedSchedule {
    /// Early departures are only measured on fixed and back-office schedules.
    pub fn checks_early_leave(&self) -> bool {
        matches!(self.kind, ScheduleKind::Fixed | ScheduleKind::BackOffice)
    }

    /// Whether a single punch may count as a morning meeting.
    pub fn tolerates_single_punch(&self) -> bool {
        self.kind == ScheduleKind::Standard
    }
}

/// Resolve the schedule for `employee_id` on `date`.
///
/// Priority: override table, then back-office department, then the global
/// defaults. Unknown departments resolve as sales.
pub fn resolve(employee_id: &str, date: NaiveDate, settings: &Settings) -> ResolvedSchedule {
    if let Some(rule) = settings.schedule_overrides.get(employee_id) {
        return ResolvedSchedule {
            kind: ScheduleKind::Fixed,
            rule: *rule,
        };
    }

    match settings.department_of(employee_id) {
        Department::BackOffice => {
            let rule = if date.weekday() == Weekday::Sat {
                BACK_OFFICE_SATURDAY
            } else {
                ScheduleRule {
                    theoretical_entry: settings.entry_time,
                    theoretical_exit: BACK_OFFICE_EXIT,
                    pause_minutes: BACK_OFFICE_PAUSE,
                }
            };
            ResolvedSchedule {
                kind: ScheduleKind::BackOffice,
                rule,
            }
        }
        Department::Sales => ResolvedSchedule {
            kind: ScheduleKind::Standard,
            rule: ScheduleRule {
                theoretical_entry: settings.entry_time,
                theoretical_exit: settings.exit_time,
                pause_minutes: 0,
            },
        },
    }
}
