use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use campus_admin_core::cache::MarksConfigCache;
use campus_admin_core::config::AppConfig;
use campus_admin_core::file_writer::{export_path, render_attendance, render_timetable, write_attendance, write_timetable};
use campus_admin_core::logging::{init_logging, OperationTimer};
use campus_admin_core::metrics::ConsoleMetrics;
use campus_admin_core::models::{AttendanceStatus, DateRange, Day, MarksConfig, OutputFormat, Period, TimetableView};
use campus_admin_core::repository::{AdminRepository, SnapshotRepository};
use campus_admin_core::service::{AttendanceService, MarksConfigService, TimetableService};
use campus_admin_core::session::SessionContext;
use campus_admin_core::timetable::SlotDraft;
use campus_admin_core::utils::parse_optional_date;
use campus_admin_core::validation::InputValidator;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Snapshot file backing the store (.json, .yaml or .yml)
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ViewArg {
    Teacher,
    Class,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the weekly timetable of a teacher or a class
    Timetable {
        /// Teacher ID
        #[arg(long, conflicts_with = "class", required_unless_present = "class")]
        teacher: Option<i64>,

        /// Class ID
        #[arg(long)]
        class: Option<String>,

        /// Output format (txt, csv or json)
        #[arg(short, long)]
        format: Option<String>,

        /// Write to a file in this directory (the configured output
        /// directory when given without a value); prints to stdout when omitted
        #[arg(short, long, num_args = 0..=1)]
        output: Option<Option<PathBuf>>,
    },
    /// List the subjects admissible for a teacher and class
    Subjects {
        /// Teacher ID
        #[arg(long)]
        teacher: Option<i64>,

        /// Class ID
        #[arg(long)]
        class: Option<String>,
    },
    /// Assign a subject to a timetable slot
    Assign {
        /// Day of week (Mon..Sat)
        #[arg(long)]
        day: String,

        /// Period (1..7)
        #[arg(long)]
        period: u8,

        /// Subject code
        #[arg(long)]
        subject: String,

        /// Teacher ID
        #[arg(long)]
        teacher: i64,

        /// Class ID
        #[arg(long)]
        class: String,

        /// Timetable the edit is made from
        #[arg(long, value_enum, default_value = "teacher")]
        view: ViewArg,
    },
    /// Show a student's attendance ledger
    Attendance {
        /// Student registration number
        #[arg(long)]
        reg_no: String,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// Output format (txt, csv or json)
        #[arg(short, long)]
        format: Option<String>,

        /// Write to a file in this directory (the configured output
        /// directory when given without a value); prints to stdout when omitted
        #[arg(short, long, num_args = 0..=1)]
        output: Option<Option<PathBuf>>,
    },
    /// Change the status of one attendance record
    SetStatus {
        /// Student registration number
        #[arg(long)]
        reg_no: String,

        /// Attendance record ID
        #[arg(long)]
        attendance_id: i64,

        /// New status (P, A, OD, ML, NT)
        #[arg(long)]
        status: String,
    },
    /// Show the marks weights of a subject
    MarksConfig {
        /// Subject code
        #[arg(long)]
        subject: String,
    },
    /// Set the marks weights of a subject
    SetMarksConfig {
        /// Subject code
        #[arg(long)]
        subject: String,

        /// Internal assessment weight
        #[arg(long)]
        internal: u8,

        /// External exam weight
        #[arg(long)]
        external: u8,

        /// Subject has a lab component
        #[arg(long)]
        has_lab: bool,

        /// Subject is assessed purely by practicals
        #[arg(long)]
        pure_practical: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging
    let level = cli.log_level.clone().unwrap_or_else(|| config.get_log_level());
    let _guard = init_logging(
        Some(&level),
        config.logging.file_path.as_deref().map(Path::new),
        config.logging.format == "json",
    )?;

    if let Err(e) = ConsoleMetrics::init() {
        warn!("Metrics disabled: {}", e);
    }

    let snapshot_path = cli.snapshot.clone().unwrap_or_else(|| config.snapshot_path());
    let repository: Arc<dyn AdminRepository> = Arc::new(
        SnapshotRepository::open(&snapshot_path)
            .with_context(|| format!("Failed to open snapshot {}", snapshot_path.display()))?,
    );
    let token = std::env::var("CAMPUS_TOKEN").unwrap_or_else(|_| "local-admin".to_string());
    let session = SessionContext::issue(&token, config.session.ttl_minutes);

    let timer = OperationTimer::new("campus-console");
    match cli.command {
        Commands::Timetable {
            teacher,
            class,
            format,
            output,
        } => {
            let view = view_from_args(teacher, class)?;
            let output = output.map(|dir| config.export_dir(dir));
            show_timetable(&config, repository, &session, view, format.as_deref(), output.as_deref()).await?;
        },
        Commands::Subjects { teacher, class } => {
            let mut service = TimetableService::new(repository, config.timetable.allow_overwrite);
            service.load_reference_data(&session).await?;
            for subject in service.admissible_for(teacher, class.as_deref()) {
                println!("{}\t{}", subject.subject_code, subject.subject_name);
            }
        },
        Commands::Assign {
            day,
            period,
            subject,
            teacher,
            class,
            view,
        } => {
            let day: Day = day.parse()?;
            let period = Period::new(period)?;
            let view = match view {
                ViewArg::Teacher => TimetableView::ByTeacher(teacher),
                ViewArg::Class => TimetableView::ByClass(class.clone()),
            };

            let mut service = TimetableService::new(repository, config.timetable.allow_overwrite);
            service.load_reference_data(&session).await?;
            service.open_view(&session, view.clone()).await?;

            let grid = service
                .board()
                .grid()
                .context("Timetable did not load")?;
            let draft = SlotDraft::open(grid, day, period)
                .with_class(&class)
                .with_teacher(teacher)
                .with_subject(&InputValidator::sanitize_text(&subject));
            let saved = service.upsert_slot(&session, &draft).await?;
            info!(
                day = %saved.day,
                period = %saved.period,
                class_id = %saved.class_id,
                subject = %saved.subject_code,
                "Assignment saved"
            );

            if let Some(grid) = service.board().grid() {
                print!("{}", render_timetable(grid, service.board().teachers()));
            }
        },
        Commands::Attendance {
            reg_no,
            from,
            to,
            format,
            output,
        } => {
            let range = DateRange::new(parse_optional_date(from.as_deref())?, parse_optional_date(to.as_deref())?);
            let mut service = AttendanceService::new(repository);
            service.set_range(range)?;
            service.open_student(&session, &reg_no).await?;

            match output.map(|dir| config.export_dir(dir)) {
                Some(dir) => {
                    let format = export_format(&config, format.as_deref())?;
                    let path = export_path(&dir, &format!("attendance_{reg_no}"), format)?;
                    let size = write_attendance(service.ledger(), format, &path)?;
                    ConsoleMetrics::default().record_export(format.extension(), size);
                    info!("Attendance written to {}", path.display());
                },
                None => print!("{}", render_attendance(service.ledger())),
            }
        },
        Commands::SetStatus {
            reg_no,
            attendance_id,
            status,
        } => {
            let status: AttendanceStatus = status.parse()?;
            let mut service = AttendanceService::new(repository);
            service.open_student(&session, &reg_no).await?;
            let record = service.update_status(&session, attendance_id, status).await?;
            println!(
                "{} {} {} -> {}",
                record.date, record.period, record.subject_code, record.status
            );
        },
        Commands::MarksConfig { subject } => {
            let service = marks_service(&config, repository);
            let marks = service.config_for(&session, subject.trim()).await?;
            println!(
                "{}: internal {} / external {} (lab: {}, pure practical: {})",
                marks.subject_code, marks.internal_weight, marks.external_weight, marks.has_lab, marks.is_pure_practical
            );
        },
        Commands::SetMarksConfig {
            subject,
            internal,
            external,
            has_lab,
            pure_practical,
        } => {
            let service = marks_service(&config, repository);
            let marks = MarksConfig {
                subject_code: subject.trim().to_string(),
                internal_weight: internal,
                external_weight: external,
                has_lab,
                is_pure_practical: pure_practical,
            };
            service.save(&session, &marks).await?;
            println!("Saved marks configuration for {}", marks.subject_code);
        },
    }
    timer.finish();

    Ok(())
}

fn view_from_args(teacher: Option<i64>, class: Option<String>) -> Result<TimetableView> {
    match (teacher, class) {
        (Some(teacher_id), _) => {
            InputValidator::validate_teacher_id(teacher_id)?;
            Ok(TimetableView::ByTeacher(teacher_id))
        },
        (None, Some(class_id)) => {
            InputValidator::validate_class_id(&class_id)?;
            Ok(TimetableView::ByClass(class_id.trim().to_string()))
        },
        (None, None) => Err(anyhow::anyhow!("Either --teacher or --class is required")),
    }
}

fn export_format(config: &AppConfig, format: Option<&str>) -> Result<OutputFormat> {
    match format {
        Some(raw) => Ok(raw.parse()?),
        None => config.export_format(),
    }
}

fn marks_service(config: &AppConfig, repository: Arc<dyn AdminRepository>) -> MarksConfigService {
    let cache = MarksConfigCache::new(config.cache.max_capacity, config.marks_config_ttl());
    MarksConfigService::new(repository, cache)
}

async fn show_timetable(
    config: &AppConfig,
    repository: Arc<dyn AdminRepository>,
    session: &SessionContext,
    view: TimetableView,
    format: Option<&str>,
    output: Option<&Path>,
) -> Result<()> {
    let mut service = TimetableService::new(repository, config.timetable.allow_overwrite);
    service.load_reference_data(session).await?;
    service.open_view(session, view.clone()).await?;

    let board = service.board();
    let grid = board.grid().context("Timetable did not load")?;
    match output {
        Some(dir) => {
            let format = export_format(config, format)?;
            let stem = match &view {
                TimetableView::ByTeacher(id) => format!("timetable_teacher_{id}"),
                TimetableView::ByClass(id) => format!("timetable_class_{id}"),
            };
            let path = export_path(dir, &stem, format)?;
            let size = write_timetable(grid, board.teachers(), format, &path)?;
            ConsoleMetrics::default().record_export(format.extension(), size);
            info!("Timetable written to {}", path.display());
        },
        None => print!("{}", render_timetable(grid, board.teachers())),
    }
    Ok(())
}
