//! Business settings stored in the `hr_settings` document.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::clock::ClockTime;
use crate::error::{AppError, Result};

/// Department a schedule is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Department {
    #[default]
    Sales,
    BackOffice,
}

impl Department {
    pub fn label(&self) -> &'static str {
        match self {
            Department::Sales => "Sales",
            Department::BackOffice => "Back office",
        }
    }

    /// Anything that is not recognizably back office is treated as sales.
    pub fn from_label(input: &str) -> Self {
        let folded: String = input.chars().filter(|c| c.is_alphanumeric()).collect();
        if folded.eq_ignore_ascii_case("backoffice") {
            Department::BackOffice
        } else {
            Department::Sales
        }
    }
}

/// Theoretical day for an employee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRule {
    pub theoretical_entry: ClockTime,
    pub theoretical_exit: ClockTime,
    pub pause_minutes: u32,
}

impl ScheduleRule {
    /// Fixed 08:00-15:00 day with a 30 minute pause.
    pub const FIXED: ScheduleRule = ScheduleRule {
        theoretical_entry: ClockTime::hm(8, 0),
        theoretical_exit: ClockTime::hm(15, 0),
        pause_minutes: 30,
    };
}

/// Global, admin-editable settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub entry_time: ClockTime,
    pub exit_time: ClockTime,
    /// Day numbers, 0 = Sunday .. 6 = Saturday.
    pub work_days: BTreeSet<u8>,
    pub allow_single_pointage: bool,
    pub penalty_threshold: u32,
    /// `employeeId -> department label`
    pub departments: BTreeMap<String, String>,
    /// `employeeId -> fixed rule`, checked before departments.
    pub schedule_overrides: BTreeMap<String, ScheduleRule>,
    /// Display-name marker for employees on the fixed schedule.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_schedule_marker: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            entry_time: ClockTime::hm(8, 30),
            exit_time: ClockTime::hm(17, 30),
            work_days: (1..=6).collect(),
            allow_single_pointage: false,
            penalty_threshold: 30,
            departments: BTreeMap::new(),
            schedule_overrides: BTreeMap::new(),
            fixed_schedule_marker: None,
        }
    }
}

impl Settings {
    /// Department for an employee; unknown ids fall back to sales.
    pub fn department_of(&self, employee_id: &str) -> Department {
        self.departments
            .get(employee_id)
            .map(|label| Department::from_label(label))
            .unwrap_or_default()
    }

    pub fn is_work_day(&self, day_of_week: u8) -> bool {
        self.work_days.contains(&day_of_week)
    }

    /// Move employees whose display name contains the marker into the
    /// override table. Existing overrides are kept. Returns the number added.
    pub fn migrate_fixed_marker<'a, I>(&mut self, employees: I) -> usize
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let Some(marker) = self
            .fixed_schedule_marker
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_lowercase)
        else {
            return 0;
        };

        let mut added = 0;
        for (employee_id, name) in employees {
            if name.to_lowercase().contains(&marker) && !self.schedule_overrides.contains_key(employee_id) {
                self.schedule_overrides
                    .insert(employee_id.to_string(), ScheduleRule::FIXED);
                added += 1;
            }
        }
        added
    }

    /// Validate values an admin could have mistyped.
    pub fn validate(&self) -> Result<()> {
        if self.entry_time >= self.exit_time {
            return Err(AppError::validation("Entry time must be before exit time"));
        }
        if self.work_days.iter().any(|d| *d > 6) {
            return Err(AppError::validation("Work days must be between 0 (Sunday) and 6 (Saturday)"));
        }
        for (employee_id, rule) in &self.schedule_overrides {
            if rule.theoretical_entry >= rule.theoretical_exit {
                return Err(AppError::validation(format!(
                    "Schedule override for {employee_id}: entry must be before exit"
                )));
            }
        }
        Ok(())
    }
}
