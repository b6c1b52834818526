//! HR Attendance - punch reconciliation and payroll recap from the command line.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use hr_attendance as app;
use tracing_appender::non_blocking::WorkerGuard;

use app::config::{AppConfig, ConfigLoadResult, LoggingConfig, StoreBackend};
use app::export::{export_analysis_to_excel, export_recap_to_excel, generate_export_filename};
use app::models::{AbsenceType, AuthorizedAbsence, ClockTime, Department};
use app::service::{AttendanceService, Period};
use app::store::{DocumentStore, HttpStore, JsonDirStore, PgStore};

/// Attendance reconciliation: punches and authorized absences to daily status,
/// lateness and payroll recap.
#[derive(Parser)]
#[command(name = "hr-attendance", version)]
struct Cli {
    /// Use config.toml from current directory (dev mode)
    #[arg(long, global = true)]
    dev: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Merge a punch export (Name, EmployeeId, Timestamp) into the stored records
    ImportPunches { file: PathBuf },
    /// Merge an absence export (EmployeeId, Date, Type, Comment[, Start, End])
    ImportAbsences { file: PathBuf },
    /// Record one authorized absence
    AddAbsence {
        #[arg(long)]
        employee: String,
        /// DD/MM/YYYY or YYYY-MM-DD
        #[arg(long)]
        date: String,
        /// Autorisation, Congé Payé, Maladie, Mission, Jour Férié, Exceptionnel
        #[arg(long = "type")]
        absence_type: AbsenceType,
        #[arg(long, default_value = "")]
        comment: String,
        /// Window start (HH:MM) for a partial absence
        #[arg(long, requires = "end")]
        start: Option<String>,
        /// Window end (HH:MM) for a partial absence
        #[arg(long, requires = "start")]
        end: Option<String>,
    },
    /// Assign an employee to "Sales" or "Back office"
    SetDepartment { employee: String, department: String },
    /// Show settings, or update the given values
    Settings {
        #[arg(long)]
        entry: Option<ClockTime>,
        #[arg(long)]
        exit: Option<ClockTime>,
        /// Comma-separated days, 0 = Sunday
        #[arg(long, value_delimiter = ',')]
        work_days: Option<Vec<u8>>,
        #[arg(long)]
        allow_single_pointage: Option<bool>,
        #[arg(long)]
        penalty_threshold: Option<u32>,
        /// Display-name marker for the fixed 08:00-15:00 schedule
        #[arg(long)]
        fixed_marker: Option<String>,
    },
    /// Classify stored punches and publish the monthly results
    Analyze {
        #[arg(long, requires = "to")]
        from: Option<NaiveDate>,
        #[arg(long, requires = "from")]
        to: Option<NaiveDate>,
    },
    /// Payroll recap over published results
    Recap {
        /// YYYY-MM, all months when omitted
        #[arg(long)]
        month: Option<String>,
        /// Write an .xlsx file (default name when no path is given)
        #[arg(long, num_args = 0..=1)]
        export: Option<Option<PathBuf>>,
    },
    /// Daily results of one month
    Report {
        /// YYYY-MM
        #[arg(long)]
        month: String,
        #[arg(long, num_args = 0..=1)]
        export: Option<Option<PathBuf>>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Determine config path based on mode
    let config_path = if cli.dev {
        AppConfig::dev_path()
    } else {
        AppConfig::default_path()
    };

    let (config, missing) = match AppConfig::try_load(&config_path) {
        ConfigLoadResult::Loaded(config) => (config, false),
        ConfigLoadResult::Missing => (AppConfig::default(), true),
        ConfigLoadResult::Invalid(e) => bail!("Invalid config {}: {e}", config_path.display()),
    };

    let _guard = init_logging(&config.logging)?;

    tracing::info!("HR Attendance starting...");
    if cli.dev {
        tracing::info!("Dev mode: loading config from current directory");
    }
    if missing {
        tracing::warn!("Config missing at {:?}, using defaults", config_path);
    } else {
        tracing::info!("Config loaded from {:?}", config_path);
    }

    match config.store.backend {
        StoreBackend::JsonDir => {
            let store = JsonDirStore::open(config.store.resolved_data_dir()).await?;
            tracing::info!("Store: JSON documents in {:?}", store.root());
            run(cli.command, store).await
        }
        StoreBackend::Postgres => {
            let store = PgStore::connect(&config.database.connection_string()).await?;
            store.ensure_schema().await?;
            tracing::info!("Store: PostgreSQL {}@{}", config.database.name, config.database.host);
            run(cli.command, store).await
        }
        StoreBackend::Http => {
            let store = HttpStore::new(&config.http.base_url, config.http.token.clone(), config.http.timeout())?;
            tracing::info!("Store: {}", config.http.base_url);
            run(cli.command, store).await
        }
    }
}

/// Install the subscriber. The returned guard flushes the file writer on drop.
fn init_logging(logging: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    match &logging.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir).with_context(|| format!("Cannot create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "hr-attendance.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            Ok(None)
        }
    }
}

async fn run<S>(command: Command, store: S) -> anyhow::Result<()>
where
    S: DocumentStore + 'static,
{
    let service = AttendanceService::new(Arc::new(store));

    match command {
        Command::ImportPunches { file } => {
            let text = read_input(&file).await?;
            let outcome = service.import_punches(&text).await?;
            println!("{}", outcome.summary());
        }
        Command::ImportAbsences { file } => {
            let text = read_input(&file).await?;
            let outcome = service.import_absences(&text).await?;
            println!("{}", outcome.summary());
        }
        Command::AddAbsence {
            employee,
            date,
            absence_type,
            comment,
            start,
            end,
        } => {
            let absence = match (start, end) {
                (Some(start), Some(end)) => AuthorizedAbsence::partial(employee, date, absence_type, start, end),
                _ => AuthorizedAbsence::full_day(employee, date, absence_type),
            }
            .with_comment(comment);

            if service.add_absence(absence).await? {
                println!("Absence recorded");
            } else {
                println!("Absence already recorded, nothing changed");
            }
        }
        Command::SetDepartment { employee, department } => {
            let department = Department::from_label(&department);
            service.set_department(&employee, department).await?;
            println!("{employee}: {}", department.label());
        }
        Command::Settings {
            entry,
            exit,
            work_days,
            allow_single_pointage,
            penalty_threshold,
            fixed_marker,
        } => {
            let mut settings = service.load_settings().await?;
            let before = settings.clone();

            if let Some(entry) = entry {
                settings.entry_time = entry;
            }
            if let Some(exit) = exit {
                settings.exit_time = exit;
            }
            if let Some(days) = work_days {
                settings.work_days = days.into_iter().collect();
            }
            if let Some(allow) = allow_single_pointage {
                settings.allow_single_pointage = allow;
            }
            if let Some(threshold) = penalty_threshold {
                settings.penalty_threshold = threshold;
            }
            if let Some(marker) = fixed_marker {
                settings.fixed_schedule_marker = Some(marker).filter(|m| !m.trim().is_empty());
            }

            if settings != before {
                service.save_settings(&settings).await?;
                tracing::info!("Settings updated");
            }
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        Command::Analyze { from, to } => {
            let period = match (from, to) {
                (Some(from), Some(to)) => Some(Period::new(from, to)?),
                _ => None,
            };
            let run = service
                .run_analysis_with_progress(period, |progress, message| {
                    tracing::info!("[{:>3.0}%] {}", progress * 100.0, message);
                })
                .await?;
            println!("{}", run.report.summary());
        }
        Command::Recap { month, export } => {
            let recap = service.recap(month.as_deref()).await?;
            for entry in &recap {
                println!(
                    "{:<10} {:<28} worked {:>3}  late {:>4} min  unauth {:>2}  incomplete {:>2}  deduction {:>8.2}{}",
                    entry.employee_id,
                    entry.name,
                    entry.worked,
                    entry.late_cumul_minutes,
                    entry.abs_unauthorized,
                    entry.incomplete,
                    entry.deduction,
                    if entry.is_compliant { "" } else { "  !" }
                );
            }
            if let Some(path) = export {
                let path = path.unwrap_or_else(|| PathBuf::from(generate_export_filename("recap")));
                export_recap_to_excel(&recap, &path)?;
                println!("Exported {} rows to {}", recap.len(), path.display());
            }
        }
        Command::Report { month, export } => {
            let analyses = service.analyses(Some(&month)).await?;
            for a in &analyses {
                println!(
                    "{} {:<10} {:<28} {:<24} {:>5} {:>5} late {:>4} work {:>4}  {}",
                    a.date,
                    a.employee_id,
                    a.name,
                    a.status.label(),
                    a.first_log.map(|t| t.to_string()).unwrap_or_default(),
                    a.last_log.map(|t| t.to_string()).unwrap_or_default(),
                    a.lateness_minutes,
                    a.work_duration_minutes,
                    a.comments.join(" | ")
                );
            }
            if let Some(path) = export {
                let path = path.unwrap_or_else(|| PathBuf::from(generate_export_filename(&format!("attendance_{month}"))));
                export_analysis_to_excel(&analyses, &path)?;
                println!("Exported {} rows to {}", analyses.len(), path.display());
            }
        }
    }

    Ok(())
}

async fn read_input(path: &Path) -> anyhow::Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Cannot read {}", path.display()))
}
