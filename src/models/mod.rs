//! Data models for punches, absences, settings and analysis results.

pub mod absence;
pub mod analysis;
pub mod clock;
pub mod record;
pub mod settings;

pub use absence::{AbsenceType, AuthorizedAbsence};
pub use analysis::{AttendanceAnalysis, AttendanceStatus, RecapEntry};
pub use clock::ClockTime;
pub use record::RawAttendanceRecord;
pub use settings::{Department, ScheduleRule, Settings};
