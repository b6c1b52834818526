//! Raw punch records as persisted under `hr_raw_records`.

use serde::{Deserialize, Serialize};

/// A single clock-in/out event after timestamp normalization.
///
/// Immutable once stored. Uniqueness is `(employee_id, timestamp)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAttendanceRecord {
    pub employee_id: String,
    pub name: String,
    /// `YYYY-MM-DD HH:MM:SS`
    pub timestamp: String,
}

impl RawAttendanceRecord {
    /// Deduplication key, `employeeId_timestamp`.
    pub fn dedup_key(&self) -> String {
        dedup_key(&self.employee_id, &self.timestamp)
    }

    /// Date half of the timestamp.
    pub fn date_part(&self) -> &str {
        self.timestamp.split_whitespace().next().unwrap_or("")
    }

    /// Time half of the timestamp.
    pub fn time_part(&self) -> &str {
        self.timestamp.split_whitespace().nth(1).unwrap_or("")
    }
}

pub(crate) fn dedup_key(employee_id: &str, timestamp: &str) -> String {
    format!("{employee_id}_{timestamp}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parts_and_key() {
        let record = RawAttendanceRecord {
            employee_id: "E1".to_string(),
            name: "Alice".to_string(),
            timestamp: "2024-03-05 08:45:00".to_string(),
        };
        assert_eq!(record.date_part(), "2024-03-05");
        assert_eq!(record.time_part(), "08:45:00");
        assert_eq!(record.dedup_key(), "E1_2024-03-05 08:45:00");
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let json = r#"{"employeeId":"7","name":"Bob","timestamp":"2024-01-02 09:00:00"}"#;
        let record: RawAttendanceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.employee_id, "7");
        assert_eq!(serde_json::to_string(&record).unwrap(), json);
    }
}
