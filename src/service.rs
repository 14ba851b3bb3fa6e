//! Screen-level services: each owns one view's state and talks to the
//! repository on its behalf.

use std::sync::Arc;

use crate::attendance::AttendanceLedger;
use crate::cache::MarksConfigCache;
use crate::error::{ConsoleError, Result};
use crate::metrics::{ConsoleMetrics, MetricsTimer};
use crate::models::{
    AttendanceRecord, AttendanceStatus, AttendanceUpdate, Class, DateRange, MarksConfig, SlotAssignment, Subject,
    Teacher, TeacherId, TimetableView,
};
use crate::repository::AdminRepository;
use crate::resolver::SlotConstraintResolver;
use crate::session::SessionContext;
use crate::timetable::{build_grid, SlotDraft, TimetableGrid};
use crate::validation::InputValidator;
use crate::view::{ApplyOutcome, ViewTicket, ViewTracker};

async fn timed<T, F>(metrics: &ConsoleMetrics, operation: &'static str, call: F) -> Result<T>
where
    F: std::future::Future<Output = Result<T>>,
{
    let timer = MetricsTimer::start(metrics, operation);
    let result = call.await;
    timer.finish(result.is_ok());
    result
}

/// Timetable screen: reference data, the selected view and its grid
#[derive(Debug, Default)]
pub struct TimetableBoard {
    tracker: ViewTracker<TimetableView>,
    grid: Option<TimetableGrid>,
    resolver: SlotConstraintResolver,
    teachers: Vec<Teacher>,
    classes: Vec<Class>,
}

impl TimetableBoard {
    /// Grid of the selected view, once its fetch has been applied
    #[must_use]
    pub const fn grid(&self) -> Option<&TimetableGrid> {
        self.grid.as_ref()
    }

    /// The selected view
    #[must_use]
    pub fn view(&self) -> Option<&TimetableView> {
        self.tracker.current()
    }

    /// Every teacher
    #[must_use]
    pub fn teachers(&self) -> &[Teacher] {
        &self.teachers
    }

    /// Every class
    #[must_use]
    pub fn classes(&self) -> &[Class] {
        &self.classes
    }

    /// Subject resolver over the loaded mappings
    #[must_use]
    pub const fn resolver(&self) -> &SlotConstraintResolver {
        &self.resolver
    }
}

/// Loads timetable grids and writes slot assignments
pub struct TimetableService {
    repository: Arc<dyn AdminRepository>,
    metrics: ConsoleMetrics,
    allow_overwrite: bool,
    board: TimetableBoard,
}

impl TimetableService {
    /// Service with an empty board; `allow_overwrite` lets an upsert replace an occupied cell
    #[must_use]
    pub fn new(repository: Arc<dyn AdminRepository>, allow_overwrite: bool) -> Self {
        Self {
            repository,
            metrics: ConsoleMetrics::default(),
            allow_overwrite,
            board: TimetableBoard::default(),
        }
    }

    /// Current screen state
    #[must_use]
    pub const fn board(&self) -> &TimetableBoard {
        &self.board
    }

    /// Fetch subjects, mappings, teachers and classes concurrently
    pub async fn load_reference_data(&mut self, session: &SessionContext) -> Result<()> {
        let repo = &self.repository;
        let (subjects, teacher_subjects, class_subjects, teachers, classes) = timed(&self.metrics, "reference_data", async {
            tokio::try_join!(
                repo.subjects(session),
                repo.teacher_subjects(session),
                repo.class_subjects(session),
                repo.teachers(session),
                repo.classes(session),
            )
        })
        .await?;

        tracing::debug!(
            subjects = subjects.len(),
            teacher_mappings = teacher_subjects.len(),
            class_mappings = class_subjects.len(),
            "Reference data loaded"
        );
        self.board.resolver = SlotConstraintResolver::new(subjects, &teacher_subjects, &class_subjects);
        self.board.teachers = teachers;
        self.board.classes = classes;
        Ok(())
    }

    /// Switch to another view; the old grid is dropped immediately
    pub fn select(&mut self, view: TimetableView) -> ViewTicket<TimetableView> {
        self.board.grid = None;
        self.board.tracker.select(view)
    }

    /// Fetch the assignments of the ticket's view
    pub async fn fetch(&self, session: &SessionContext, ticket: &ViewTicket<TimetableView>) -> Result<Vec<SlotAssignment>> {
        timed(&self.metrics, "timetable", self.repository.timetable(session, ticket.key())).await
    }

    /// Rebuild the grid from fetched assignments unless the view moved on
    pub fn apply(&mut self, ticket: &ViewTicket<TimetableView>, assignments: &[SlotAssignment]) -> ApplyOutcome {
        let view = ticket.key();
        if !self.board.tracker.is_current(ticket) {
            tracing::debug!(view = %view, "Discarding stale timetable fetch");
            self.metrics.record_stale_fetch(view.kind());
            return ApplyOutcome::Discarded;
        }
        let grid = build_grid(view, assignments);
        self.metrics.record_grid_build(view.kind(), grid.occupied());
        tracing::debug!(view = %view, occupied = grid.occupied(), "Timetable grid built");
        self.board.grid = Some(grid);
        ApplyOutcome::Applied
    }

    /// Select a view, fetch it and show it
    pub async fn open_view(&mut self, session: &SessionContext, view: TimetableView) -> Result<ApplyOutcome> {
        let ticket = self.select(view);
        let assignments = self.fetch(session, &ticket).await?;
        Ok(self.apply(&ticket, &assignments))
    }

    /// Subjects the draft may choose from
    pub fn admissible_subjects(&mut self, draft: &SlotDraft) -> Vec<&Subject> {
        let (teacher_id, class_id) = draft.selection();
        self.admissible_for(teacher_id, class_id)
    }

    /// Subjects admissible for a (teacher, class) selection
    pub fn admissible_for(&mut self, teacher_id: Option<TeacherId>, class_id: Option<&str>) -> Vec<&Subject> {
        self.board.resolver.admissible(teacher_id, class_id)
    }

    /// Write one slot, then rebuild the grid from a fresh fetch.
    ///
    /// Nothing on the board changes unless the store accepted the write.
    pub async fn upsert_slot(&mut self, session: &SessionContext, draft: &SlotDraft) -> Result<SlotAssignment> {
        let result = self.try_upsert_slot(session, draft).await;
        match &result {
            Ok(_) => self.metrics.record_slot_upsert("success"),
            Err(e) => {
                self.metrics.record_slot_upsert("error");
                self.metrics.record_error(e.kind(), "upsert_slot");
            },
        }
        result
    }

    async fn try_upsert_slot(&mut self, session: &SessionContext, draft: &SlotDraft) -> Result<SlotAssignment> {
        let ticket = self
            .board
            .tracker
            .current_ticket()
            .filter(|t| *t.key() == draft.view)
            .ok_or_else(|| ConsoleError::Validation(format!("{} is not the open timetable", draft.view)))?;

        let upsert = draft.to_upsert()?;
        InputValidator::validate_subject_code(&upsert.subject_code)?;
        InputValidator::validate_class_id(&upsert.class_id)?;
        InputValidator::validate_teacher_id(upsert.teacher_id)?;
        self.board
            .resolver
            .require_admissible(upsert.teacher_id, &upsert.class_id, &upsert.subject_code)?;

        if let Some(existing) = self.board.grid.as_ref().and_then(|g| draft.replaces(g)) {
            if !self.allow_overwrite {
                return Err(ConsoleError::Validation(format!(
                    "{} {} is already assigned to {} / {}",
                    upsert.day, upsert.period, existing.class_id, existing.subject_code
                )));
            }
            tracing::info!(
                day = %upsert.day,
                period = %upsert.period,
                previous_class = %existing.class_id,
                previous_subject = %existing.subject_code,
                "Overwriting assigned slot"
            );
        }

        timed(&self.metrics, "upsert_slot", self.repository.upsert_slot(session, &upsert)).await?;
        tracing::info!(
            view = %draft.view,
            day = %upsert.day,
            period = %upsert.period,
            class_id = %upsert.class_id,
            teacher_id = upsert.teacher_id,
            subject = %upsert.subject_code,
            "Slot saved"
        );

        let assignments = self.fetch(session, &ticket).await?;
        self.apply(&ticket, &assignments);

        let saved = self
            .board
            .grid
            .as_ref()
            .and_then(|g| g.cell_at(upsert.day, upsert.period))
            .cloned();
        Ok(saved.unwrap_or_else(|| {
            tracing::warn!(day = %upsert.day, period = %upsert.period, "Saved slot missing from refreshed timetable");
            upsert.to_assignment()
        }))
    }
}

/// Loads one student's ledger and edits record statuses
pub struct AttendanceService {
    repository: Arc<dyn AdminRepository>,
    metrics: ConsoleMetrics,
    ledger: AttendanceLedger,
}

impl AttendanceService {
    /// Service with an empty ledger
    #[must_use]
    pub fn new(repository: Arc<dyn AdminRepository>) -> Self {
        Self {
            repository,
            metrics: ConsoleMetrics::default(),
            ledger: AttendanceLedger::new(),
        }
    }

    /// Current ledger state
    #[must_use]
    pub const fn ledger(&self) -> &AttendanceLedger {
        &self.ledger
    }

    /// Select a student
    pub fn select(&mut self, reg_no: &str) -> Result<ViewTicket<String>> {
        InputValidator::validate_reg_no(reg_no)?;
        Ok(self.ledger.select(reg_no.trim()))
    }

    /// Fetch the records of the ticket's student
    pub async fn fetch(&self, session: &SessionContext, ticket: &ViewTicket<String>) -> Result<Vec<AttendanceRecord>> {
        timed(&self.metrics, "attendance_records", self.repository.attendance_records(session, ticket.key())).await
    }

    /// Install fetched records unless another student was selected meanwhile
    pub fn apply(&mut self, ticket: &ViewTicket<String>, records: Vec<AttendanceRecord>) -> ApplyOutcome {
        let count = records.len();
        let outcome = self.ledger.apply(ticket, records);
        match outcome {
            ApplyOutcome::Applied => self.metrics.record_attendance_loaded(count),
            ApplyOutcome::Discarded => self.metrics.record_stale_fetch("student"),
        }
        outcome
    }

    /// Select a student, fetch the ledger and show it
    pub async fn open_student(&mut self, session: &SessionContext, reg_no: &str) -> Result<ApplyOutcome> {
        let ticket = self.select(reg_no)?;
        let records = self.fetch(session, &ticket).await?;
        Ok(self.apply(&ticket, records))
    }

    /// Restrict the filtered views to `range`
    pub fn set_range(&mut self, range: DateRange) -> Result<()> {
        InputValidator::validate_date_range(&range)?;
        self.ledger.set_range(range);
        Ok(())
    }

    /// Change a record's status once the store has accepted it
    pub async fn update_status(
        &mut self,
        session: &SessionContext,
        attendance_id: i64,
        status: AttendanceStatus,
    ) -> Result<&AttendanceRecord> {
        if self.ledger.find(attendance_id).is_none() {
            return Err(ConsoleError::NotFound(format!("attendance record {attendance_id}")));
        }

        let update = AttendanceUpdate { attendance_id, status };
        if let Err(e) = timed(&self.metrics, "update_attendance", self.repository.update_attendance(session, &update)).await {
            self.metrics.record_error(e.kind(), "update_attendance");
            return Err(e);
        }

        self.metrics.record_attendance_update(status.code());
        tracing::info!(attendance_id, status = %status, "Attendance status changed");
        self.ledger.update_status(attendance_id, status)
    }
}

/// Cache-aside access to marks weight configurations
pub struct MarksConfigService {
    repository: Arc<dyn AdminRepository>,
    metrics: ConsoleMetrics,
    cache: MarksConfigCache,
}

impl MarksConfigService {
    /// Service reading through `cache`
    #[must_use]
    pub fn new(repository: Arc<dyn AdminRepository>, cache: MarksConfigCache) -> Self {
        Self {
            repository,
            metrics: ConsoleMetrics::default(),
            cache,
        }
    }

    /// Fetch every stored configuration and fill the cache with it
    pub async fn load_all(&self, session: &SessionContext) -> Result<Vec<MarksConfig>> {
        let configs = timed(&self.metrics, "marks_configs", self.repository.marks_configs(session)).await?;
        self.cache.prime(&configs);
        Ok(configs)
    }

    /// Configuration of a subject.
    ///
    /// Served from the cache when fresh; otherwise the full list is fetched,
    /// then the single subject; a subject with nothing stored gets the 40/60
    /// default, which is not cached.
    pub async fn config_for(&self, session: &SessionContext, subject_code: &str) -> Result<MarksConfig> {
        InputValidator::validate_subject_code(subject_code)?;
        if let Some(config) = self.cache.get(subject_code) {
            self.metrics.record_cache_lookup(true);
            return Ok(config);
        }
        self.metrics.record_cache_lookup(false);

        if let Some(config) = self
            .load_all(session)
            .await?
            .into_iter()
            .find(|c| c.subject_code == subject_code)
        {
            return Ok(config);
        }

        match timed(&self.metrics, "marks_config", self.repository.marks_config(session, subject_code)).await? {
            Some(config) => {
                self.cache.insert(config.clone());
                Ok(config)
            },
            None => {
                tracing::debug!(subject = subject_code, "No marks configuration stored, using default");
                Ok(MarksConfig::default_for(subject_code))
            },
        }
    }

    /// Validate and store a configuration; the whole cache is dropped on success
    pub async fn save(&self, session: &SessionContext, config: &MarksConfig) -> Result<()> {
        InputValidator::validate_marks_config(config)?;
        timed(&self.metrics, "save_marks_config", self.repository.save_marks_config(session, config)).await?;
        self.cache.invalidate_all();
        tracing::info!(
            subject = %config.subject_code,
            internal = config.internal_weight,
            external = config.external_weight,
            "Marks configuration updated"
        );
        Ok(())
    }
}
