//! Import, analysis and recap runs over a document store.

use std::sync::Arc;

use chrono::{Datelike, Months, NaiveDate};
use tracing::info;

use crate::analysis::ingest::{ImportOutcome, ingest, ingest_absences, read_rows, validate_absence};
use crate::analysis::{aggregate, classify};
use crate::error::{AppError, Result};
use crate::models::{AttendanceAnalysis, AuthorizedAbsence, Department, RawAttendanceRecord, RecapEntry, Settings};
use crate::store::shards::{self, PublishReport};
use crate::store::{DocumentStore, get_typed, keys, put_typed};

/// Inclusive date range restricting an analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl Period {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self> {
        if from > to {
            return Err(AppError::validation(format!("Period start {from} is after end {to}")));
        }
        Ok(Self { from, to })
    }

    /// Widened to whole calendar months, since shards hold complete months.
    pub fn whole_months(&self) -> Self {
        let from = self.from.with_day(1).unwrap_or(self.from);
        let to = self
            .to
            .with_day(1)
            .and_then(|first| first.checked_add_months(Months::new(1)))
            .and_then(|next| next.pred_opt())
            .unwrap_or(self.to);
        Self { from, to }
    }

    fn contains_str(&self, date: &str) -> bool {
        NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok_and(|d| self.from <= d && d <= self.to)
    }
}

/// Result of an analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisRun {
    pub analyses: Vec<AttendanceAnalysis>,
    pub report: PublishReport,
}

/// Attendance operations bound to one store.
pub struct AttendanceService<S> {
    store: Arc<S>,
}

impl<S> AttendanceService<S>
where
    S: DocumentStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub async fn load_records(&self) -> Result<Vec<RawAttendanceRecord>> {
        Ok(get_typed(self.store.as_ref(), keys::RAW_RECORDS).await?.unwrap_or_default())
    }

    pub async fn load_absences(&self) -> Result<Vec<AuthorizedAbsence>> {
        Ok(get_typed(self.store.as_ref(), keys::ABSENCES).await?.unwrap_or_default())
    }

    /// Stored settings, or defaults when none were saved yet.
    pub async fn load_settings(&self) -> Result<Settings> {
        Ok(get_typed(self.store.as_ref(), keys::SETTINGS).await?.unwrap_or_default())
    }

    pub async fn save_settings(&self, settings: &Settings) -> Result<()> {
        settings.validate()?;
        put_typed(self.store.as_ref(), keys::SETTINGS, settings).await
    }

    /// Assign an employee to a department.
    pub async fn set_department(&self, employee_id: &str, department: Department) -> Result<Settings> {
        let employee_id = employee_id.trim();
        if employee_id.is_empty() {
            return Err(AppError::validation("Employee id cannot be empty"));
        }
        let mut settings = self.load_settings().await?;
        settings
            .departments
            .insert(employee_id.to_string(), department.label().to_string());
        self.save_settings(&settings).await?;
        Ok(settings)
    }

    /// Merge a punch export (`Name, EmployeeId, Timestamp`) into the stored records.
    pub async fn import_punches(&self, csv_text: &str) -> Result<ImportOutcome<RawAttendanceRecord>> {
        let mut records = self.load_records().await?;
        let outcome = ingest(&records, &read_rows(csv_text));

        if !outcome.accepted.is_empty() {
            records.extend(outcome.accepted.iter().cloned());
            put_typed(self.store.as_ref(), keys::RAW_RECORDS, &records).await?;
        }
        info!("Punch import: {}", outcome.summary());
        Ok(outcome)
    }

    /// Merge an absence export (`EmployeeId, Date, Type, Comment`) into the stored absences.
    pub async fn import_absences(&self, csv_text: &str) -> Result<ImportOutcome<AuthorizedAbsence>> {
        let mut absences = self.load_absences().await?;
        let outcome = ingest_absences(&absences, &read_rows(csv_text));

        if !outcome.accepted.is_empty() {
            absences.extend(outcome.accepted.iter().cloned());
            put_typed(self.store.as_ref(), keys::ABSENCES, &absences).await?;
        }
        info!("Absence import: {}", outcome.summary());
        Ok(outcome)
    }

    /// Record one manually entered absence. Returns `false` when it already exists.
    pub async fn add_absence(&self, absence: AuthorizedAbsence) -> Result<bool> {
        let absence = validate_absence(absence)?;
        let mut absences = self.load_absences().await?;

        let key = absence.dedup_key();
        if absences.iter().any(|a| a.dedup_key() == key) {
            return Ok(false);
        }
        absences.push(absence);
        put_typed(self.store.as_ref(), keys::ABSENCES, &absences).await?;
        Ok(true)
    }

    /// Classify stored punches and absences and publish the monthly shards.
    pub async fn run_analysis(&self, period: Option<Period>) -> Result<AnalysisRun> {
        self.run_analysis_with_progress(period, |_, _| {}).await
    }

    /// Analysis run with a progress callback (`0.0..=1.0`, message).
    pub async fn run_analysis_with_progress<F>(&self, period: Option<Period>, mut on_progress: F) -> Result<AnalysisRun>
    where
        F: FnMut(f32, &str),
    {
        on_progress(0.0, "Loading records...");
        let (mut records, mut absences, mut settings) =
            tokio::try_join!(self.load_records(), self.load_absences(), self.load_settings())?;

        let migrated = settings.migrate_fixed_marker(records.iter().map(|r| (r.employee_id.as_str(), r.name.as_str())));

        if let Some(period) = period.map(|p| p.whole_months()) {
            records.retain(|r| period.contains_str(r.date_part()));
            absences.retain(|a| period.contains_str(&a.date));
        }

        on_progress(0.3, &format!("Classifying {} punches...", records.len()));
        let analyses = classify(&records, &absences, &settings);

        on_progress(0.7, &format!("Saving {} entries...", analyses.len()));
        let report = shards::publish(&self.store, &analyses).await?;

        if migrated > 0 {
            info!("{migrated} employee(s) moved to the fixed schedule table");
            self.save_settings(&settings).await?;
        }

        on_progress(1.0, &format!("Done! {}", report.summary()));
        Ok(AnalysisRun { analyses, report })
    }

    /// Published analyses for one month (`YYYY-MM`) or for every month.
    pub async fn analyses(&self, month: Option<&str>) -> Result<Vec<AttendanceAnalysis>> {
        match month {
            Some(month) => shards::load_months(&self.store, &[month.to_string()]).await,
            None => shards::load_all(&self.store).await,
        }
    }

    /// Payroll recap over published analyses.
    pub async fn recap(&self, month: Option<&str>) -> Result<Vec<RecapEntry>> {
        Ok(aggregate(&self.analyses(month).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AbsenceType, AttendanceStatus, ScheduleRule};
    use crate::store::MemoryStore;

    const PUNCHES: &str = "Nom;Matricule;Pointage\n\
        Alice;E1;05/03/2024 08:45\n\
        Alice;E1;05/03/2024 17:20\n\
        Bob;E3;05/03/2024 08:25\n\
        Bob;E3;05/03/2024 17:40\n\
        Alice;E1;06/03/2024 08:30\n\
        Alice;E1;06/03/2024 17:30\n\
        Alice;E1;02/04/2024 08:30\n\
        Alice;E1;02/04/2024 17:30\n";

    fn service() -> AttendanceService<MemoryStore> {
        AttendanceService::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_import_is_merge_only() {
        let service = service();
        let first = service.import_punches(PUNCHES).await.unwrap();
        assert_eq!(first.accepted.len(), 8);

        let second = service.import_punches(PUNCHES).await.unwrap();
        assert!(second.accepted.is_empty());
        assert_eq!(second.duplicates, 8);
        assert_eq!(service.load_records().await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_add_absence_dedups_full_day() {
        let service = service();
        let sick = AuthorizedAbsence::full_day("E1", "07/03/2024", AbsenceType::Sickness);
        assert!(service.add_absence(sick.clone()).await.unwrap());
        assert!(!service.add_absence(sick).await.unwrap());

        let stored = service.load_absences().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].date, "2024-03-07");

        let bad = AuthorizedAbsence::partial("E1", "2024-03-07", AbsenceType::Authorization, "10:00", "09:00");
        assert!(service.add_absence(bad).await.is_err());
    }

    #[tokio::test]
    async fn test_analysis_run_publishes_shards_matching_full_output() {
        let service = service();
        service.import_punches(PUNCHES).await.unwrap();
        service
            .import_absences("EmployeeId,Date,Type,Comment\nE3,06/03/2024,Maladie,\n")
            .await
            .unwrap();

        let run = service.run_analysis(None).await.unwrap();
        assert_eq!(run.report.months, vec!["2024-03", "2024-04"]);
        assert_eq!(run.report.entries, run.analyses.len());

        let published = service.analyses(None).await.unwrap();
        assert_eq!(published, run.analyses);

        let e3 = run
            .analyses
            .iter()
            .find(|a| a.employee_id == "E3" && a.date.to_string() == "2024-03-06")
            .unwrap();
        assert_eq!(e3.status, AttendanceStatus::AbsentAuthorized);

        let april = service.recap(Some("2024-04")).await.unwrap();
        let bob = april.iter().find(|r| r.employee_id == "E3").unwrap();
        assert_eq!(bob.abs_unauthorized, 1);
        assert_eq!(bob.deduction, 150.0);
    }

    #[tokio::test]
    async fn test_period_restricts_run() {
        let service = service();
        service.import_punches(PUNCHES).await.unwrap();

        let march = Period::new(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        )
        .unwrap();
        let run = service.run_analysis(Some(march)).await.unwrap();
        assert_eq!(run.report.months, vec!["2024-03"]);
        assert!(run.analyses.iter().all(|a| a.month() == "2024-03"));
    }

    #[tokio::test]
    async fn test_progress_and_marker_migration() {
        let service = service();
        service.import_punches(PUNCHES).await.unwrap();
        let settings = Settings {
            fixed_schedule_marker: Some("bob".to_string()),
            ..Settings::default()
        };
        service.save_settings(&settings).await.unwrap();

        let mut steps = Vec::new();
        service
            .run_analysis_with_progress(None, |p, _| steps.push(p))
            .await
            .unwrap();
        assert_eq!(steps.first(), Some(&0.0));
        assert_eq!(steps.last(), Some(&1.0));

        let saved = service.load_settings().await.unwrap();
        assert_eq!(saved.schedule_overrides.get("E3"), Some(&ScheduleRule::FIXED));
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_period_run_keeps_rest_of_month_published() {
        let service = service();
        service
            .import_punches(
                "Name;Id;Timestamp\n\
                Alice;E1;04/03/2024 08:30\n\
                Alice;E1;04/03/2024 17:30\n\
                Alice;E1;20/03/2024 08:30\n\
                Alice;E1;20/03/2024 17:30\n",
            )
            .await
            .unwrap();

        let full = service.run_analysis(None).await.unwrap();
        assert_eq!(full.analyses.len(), 2);

        let second_half = Period::new(date(2024, 3, 15), date(2024, 3, 31)).unwrap();
        let run = service.run_analysis(Some(second_half)).await.unwrap();
        assert_eq!(run.analyses, full.analyses);

        let published = service.analyses(Some("2024-03")).await.unwrap();
        let dates: Vec<String> = published.iter().map(|a| a.date.to_string()).collect();
        assert_eq!(dates, vec!["2024-03-04", "2024-03-20"]);
    }

    #[tokio::test]
    async fn test_failed_publish_leaves_settings_untouched() {
        let store = MemoryStore::new().with_failing_key(keys::analysis_shard("2024-03"));
        let service = AttendanceService::new(Arc::new(store));
        service.import_punches(PUNCHES).await.unwrap();
        let settings = Settings {
            fixed_schedule_marker: Some("bob".to_string()),
            ..Settings::default()
        };
        service.save_settings(&settings).await.unwrap();

        assert!(service.run_analysis(None).await.is_err());
        assert!(service.load_settings().await.unwrap().schedule_overrides.is_empty());
    }

    #[tokio::test]
    async fn test_marker_migration_sees_records_outside_period() {
        let service = service();
        service.import_punches(PUNCHES).await.unwrap();
        let settings = Settings {
            fixed_schedule_marker: Some("bob".to_string()),
            ..Settings::default()
        };
        service.save_settings(&settings).await.unwrap();

        let april = Period::new(date(2024, 4, 1), date(2024, 4, 30)).unwrap();
        service.run_analysis(Some(april)).await.unwrap();

        let saved = service.load_settings().await.unwrap();
        assert_eq!(saved.schedule_overrides.get("E3"), Some(&ScheduleRule::FIXED));
    }

    #[tokio::test]
    async fn test_set_department() {
        let service = service();
        let settings = service.set_department("E9", Department::BackOffice).await.unwrap();
        assert_eq!(settings.department_of("E9"), Department::BackOffice);
        assert!(service.set_department("  ", Department::Sales).await.is_err());
    }

    #[test]
    fn test_period_validation() {
        let a = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let b = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert!(Period::new(a, b).is_err());
        assert!(Period::new(b, a).unwrap().contains_str("2024-03-02"));
        assert!(!Period::new(b, a).unwrap().contains_str("2024-3-x"));
    }

    #[test]
    fn test_period_whole_months() {
        let widened = Period::new(date(2024, 2, 10), date(2024, 2, 12)).unwrap().whole_months();
        assert_eq!(widened, Period::new(date(2024, 2, 1), date(2024, 2, 29)).unwrap());

        let widened = Period::new(date(2023, 12, 15), date(2024, 1, 3)).unwrap().whole_months();
        assert_eq!(widened.from, date(2023, 12, 1));
        assert_eq!(widened.to, date(2024, 1, 31));
    }
}
