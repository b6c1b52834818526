//! Attendance reconciliation engine.
//!
//! Pipeline: raw rows -> [`ingest`] -> stored punches -> [`classifier`]
//! (consulting [`schedule`] and [`exceptions`]) -> daily analyses ->
//! [`recap`]. Everything here is pure and synchronous; persistence lives in
//! [`crate::store`].

pub mod classifier;
pub mod exceptions;
pub mod ingest;
pub mod recap;
pub mod schedule;
pub mod timestamp;


pub use classifier::{classify, classify_day};
pub use ingest::{ImportOutcome, RawRow, ingest, ingest_absences, read_rows};
pub use recap::{aggregate, aggregate_month};
pub use schedule::{ResolvedSchedule, ScheduleKind, resolve};
pub use timestamp::normalize;
