//! Authorized absence entries (`hr_absences`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::clock::ClockTime;
use crate::error::AppError;

/// Closed set of absence categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbsenceType {
    Authorization,
    PaidLeave,
    Sickness,
    Mission,
    Holiday,
    Exceptional,
}

impl AbsenceType {
    pub const ALL: [AbsenceType; 6] = [
        AbsenceType::Authorization,
        AbsenceType::PaidLeave,
        AbsenceType::Sickness,
        AbsenceType::Mission,
        AbsenceType::Holiday,
        AbsenceType::Exceptional,
    ];

    /// Label used in stored documents and day comments.
    pub fn label(&self) -> &'static str {
        match self {
            AbsenceType::Authorization => "Autorisation",
            AbsenceType::PaidLeave => "Congé Payé",
            AbsenceType::Sickness => "Maladie",
            AbsenceType::Mission => "Mission",
            AbsenceType::Holiday => "Jour Férié",
            AbsenceType::Exceptional => "Exceptionnel",
        }
    }

    /// Lenient lookup: case, accents and a few common aliases are tolerated.
    pub fn from_label(input: &str) -> Option<Self> {
        let key = fold(input);
        let found = match key.as_str() {
            "autorisation" | "authorization" | "autorisation d'absence" => AbsenceType::Authorization,
            "conge paye" | "conges payes" | "conge" | "cp" | "paid leave" | "paidleave" => AbsenceType::PaidLeave,
            "maladie" | "arret maladie" | "sickness" | "sick" => AbsenceType::Sickness,
            "mission" | "deplacement" => AbsenceType::Mission,
            "jour ferie" | "ferie" | "holiday" => AbsenceType::Holiday,
            "exceptionnel" | "absence exceptionnelle" | "exceptional" => AbsenceType::Exceptional,
            _ => return None,
        };
        Some(found)
    }
}

/// Lowercase, strip French diacritics, collapse inner whitespace.
fn fold(input: &str) -> String {
    let mapped: String = input
        .trim()
        .chars()
        .map(|c| match c {
            'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' => 'e',
            'à' | 'â' | 'À' | 'Â' => 'a',
            'î' | 'ï' => 'i',
            'ô' => 'o',
            'ù' | 'û' => 'u',
            'ç' | 'Ç' => 'c',
            '_' | '-' => ' ',
            other => other,
        })
        .flat_map(char::to_lowercase)
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl fmt::Display for AbsenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AbsenceType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s).ok_or_else(|| AppError::parse(format!("Unknown absence type '{s}'")))
    }
}

impl Serialize for AbsenceType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for AbsenceType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::from_label(&raw).ok_or_else(|| serde::de::Error::custom(format!("unknown absence type '{raw}'")))
    }
}

/// A pre-approved absence, either full-day or limited to a time window.
///
/// Times are kept as entered; a window with unparseable bounds is ignored by
/// the matcher rather than rejected here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizedAbsence {
    pub employee_id: String,
    /// `YYYY-MM-DD`
    pub date: String,
    #[serde(rename = "type")]
    pub absence_type: AbsenceType,
    #[serde(default)]
    pub comment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

impl AuthorizedAbsence {
    /// Full-day entry (no window bounds).
    pub fn full_day(employee_id: impl Into<String>, date: impl Into<String>, absence_type: AbsenceType) -> Self {
        Self {
            employee_id: employee_id.into(),
            date: date.into(),
            absence_type,
            comment: String::new(),
            start_time: None,
            end_time: None,
        }
    }

    /// Partial entry covering `[start, end)`.
    pub fn partial(
        employee_id: impl Into<String>,
        date: impl Into<String>,
        absence_type: AbsenceType,
        start: impl Into<String>,
        end: impl Into<String>,
    ) -> Self {
        Self {
            start_time: Some(start.into()),
            end_time: Some(end.into()),
            ..Self::full_day(employee_id, date, absence_type)
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// True when neither bound is set. Blank strings count as unset.
    pub fn is_full_day(&self) -> bool {
        is_blank(&self.start_time) && is_blank(&self.end_time)
    }

    /// Window in minutes since midnight, if both bounds parse and start < end.
    pub fn window(&self) -> Option<(i32, i32)> {
        let start = ClockTime::parse(self.start_time.as_deref()?)?.minutes();
        let end = ClockTime::parse(self.end_time.as_deref()?)?.minutes();
        (start < end).then_some((start, end))
    }

    /// Deduplication key: `(employee, date)` for full days, window bounds included otherwise.
    pub fn dedup_key(&self) -> String {
        if self.is_full_day() {
            format!("{}_{}", self.employee_id, self.date)
        } else {
            format!(
                "{}_{}_{}_{}",
                self.employee_id,
                self.date,
                self.start_time.as_deref().unwrap_or("").trim(),
                self.end_time.as_deref().unwrap_or("").trim()
            )
        }
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|s| s.trim().is_empty())
}
