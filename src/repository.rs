use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use crate::error::{ConsoleError, Result};
use crate::models::{
    AttendanceRecord, AttendanceUpdate, Class, ClassSubjectMapping, MarksConfig, SlotAssignment, SlotUpsert, Subject,
    Teacher, TeacherSubjectMapping, TimetableView,
};
use crate::session::SessionContext;

/// External read/write collaborator of the admin console.
///
/// Every call is a single atomic request/response. Failures come back as
/// [`ConsoleError::Persistence`] carrying the store's message, or
/// [`ConsoleError::SessionExpired`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AdminRepository: Send + Sync {
    /// Every teacher↔subject pair
    async fn teacher_subjects(&self, session: &SessionContext) -> Result<Vec<TeacherSubjectMapping>>;
    /// Every class↔subject pair
    async fn class_subjects(&self, session: &SessionContext) -> Result<Vec<ClassSubjectMapping>>;
    /// Every subject
    async fn subjects(&self, session: &SessionContext) -> Result<Vec<Subject>>;
    /// Every teacher
    async fn teachers(&self, session: &SessionContext) -> Result<Vec<Teacher>>;
    /// Every class
    async fn classes(&self, session: &SessionContext) -> Result<Vec<Class>>;
    /// Slot assignments of one teacher or one class
    async fn timetable(&self, session: &SessionContext, view: &TimetableView) -> Result<Vec<SlotAssignment>>;
    /// Attendance records of one student
    async fn attendance_records(&self, session: &SessionContext, reg_no: &str) -> Result<Vec<AttendanceRecord>>;
    /// Write one slot, replacing the class's entry at that slot
    async fn upsert_slot(&self, session: &SessionContext, slot: &SlotUpsert) -> Result<()>;
    /// Change the status of one attendance record
    async fn update_attendance(&self, session: &SessionContext, update: &AttendanceUpdate) -> Result<()>;
    /// Every stored marks configuration
    async fn marks_configs(&self, session: &SessionContext) -> Result<Vec<MarksConfig>>;
    /// Stored marks configuration of one subject
    async fn marks_config(&self, session: &SessionContext, subject_code: &str) -> Result<Option<MarksConfig>>;
    /// Create or replace the marks configuration of a subject
    async fn save_marks_config(&self, session: &SessionContext, config: &MarksConfig) -> Result<()>;
}

/// Everything the snapshot store holds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Teachers
    #[serde(default)]
    pub teachers: Vec<Teacher>,
    /// Classes
    #[serde(default)]
    pub classes: Vec<Class>,
    /// Subjects
    #[serde(default)]
    pub subjects: Vec<Subject>,
    /// Teacher↔subject pairs
    #[serde(default)]
    pub teacher_subjects: Vec<TeacherSubjectMapping>,
    /// Class↔subject pairs
    #[serde(default)]
    pub class_subjects: Vec<ClassSubjectMapping>,
    /// Registered students, by reg no
    #[serde(default)]
    pub students: Vec<String>,
    /// Slot assignments
    #[serde(default)]
    pub timetable: Vec<SlotAssignment>,
    /// Attendance ledger of every student
    #[serde(default)]
    pub attendance: Vec<AttendanceRecord>,
    /// Marks weight configurations
    #[serde(default)]
    pub marks_configs: Vec<MarksConfig>,
}

impl Snapshot {
    /// Read a snapshot from a `.json`, `.yaml` or `.yml` file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        if is_yaml(path) {
            Ok(serde_yaml::from_str(&raw)?)
        } else {
            Ok(serde_json::from_str(&raw)?)
        }
    }

    /// Write the snapshot, choosing the format from the file extension
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let raw = if is_yaml(path) {
            serde_yaml::to_string(self)?
        } else {
            serde_json::to_string_pretty(self)?
        };
        std::fs::write(path, raw)?;
        Ok(())
    }

    fn next_timetable_id(&self) -> i64 {
        self.timetable.iter().filter_map(|t| t.timetable_id).max().unwrap_or(0) + 1
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    )
}

/// In-memory stand-in for the admin backend.
///
/// Applies the backend's write rules (mapping checks, one entry per class
/// slot, no double-booked teacher) and optionally writes itself back to the
/// snapshot file after every successful write.
#[derive(Debug, Default)]
pub struct SnapshotRepository {
    state: RwLock<Snapshot>,
    persist_to: Option<PathBuf>,
}

impl SnapshotRepository {
    /// Store over an in-memory snapshot, never written to disk
    #[must_use]
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            state: RwLock::new(snapshot),
            persist_to: None,
        }
    }

    /// Store loaded from `path` that writes changes back to it
    pub fn open(path: &Path) -> Result<Self> {
        let snapshot = Snapshot::load(path)?;
        tracing::info!(
            path = %path.display(),
            assignments = snapshot.timetable.len(),
            records = snapshot.attendance.len(),
            "Snapshot loaded"
        );
        Ok(Self {
            state: RwLock::new(snapshot),
            persist_to: Some(path.to_path_buf()),
        })
    }

    /// A copy of the current contents
    pub async fn snapshot(&self) -> Snapshot {
        self.state.read().await.clone()
    }

    /// Persist `next`, then make it the live state.
    ///
    /// On a failed write-back the live state is left as it was.
    async fn commit(&self, live: &mut Snapshot, next: Snapshot) -> Result<()> {
        let next = match self.persist_to.clone() {
            Some(path) => tokio::task::spawn_blocking(move || {
                next.save(&path)?;
                Ok::<_, ConsoleError>(next)
            })
            .await
            .map_err(|e| ConsoleError::Persistence(format!("Failed to save snapshot: {e}")))?
            .map_err(|e| ConsoleError::Persistence(format!("Failed to save snapshot: {e}")))?,
            None => next,
        };
        *live = next;
        Ok(())
    }
}

fn authorize(session: &SessionContext) -> Result<()> {
    session.ensure_active(Utc::now()).map(|_| ())
}

#[async_trait]
impl AdminRepository for SnapshotRepository {
    async fn teacher_subjects(&self, session: &SessionContext) -> Result<Vec<TeacherSubjectMapping>> {
        authorize(session)?;
        Ok(self.state.read().await.teacher_subjects.clone())
    }

    async fn class_subjects(&self, session: &SessionContext) -> Result<Vec<ClassSubjectMapping>> {
        authorize(session)?;
        Ok(self.state.read().await.class_subjects.clone())
    }

    async fn subjects(&self, session: &SessionContext) -> Result<Vec<Subject>> {
        authorize(session)?;
        Ok(self.state.read().await.subjects.clone())
    }

    async fn teachers(&self, session: &SessionContext) -> Result<Vec<Teacher>> {
        authorize(session)?;
        Ok(self.state.read().await.teachers.clone())
    }

    async fn classes(&self, session: &SessionContext) -> Result<Vec<Class>> {
        authorize(session)?;
        Ok(self.state.read().await.classes.clone())
    }

    async fn timetable(&self, session: &SessionContext, view: &TimetableView) -> Result<Vec<SlotAssignment>> {
        authorize(session)?;
        let state = self.state.read().await;
        Ok(state.timetable.iter().filter(|t| view.includes(t)).cloned().collect())
    }

    async fn attendance_records(&self, session: &SessionContext, reg_no: &str) -> Result<Vec<AttendanceRecord>> {
        authorize(session)?;
        let state = self.state.read().await;
        if !state.students.iter().any(|s| s == reg_no) {
            return Err(ConsoleError::Persistence("Student not found".to_string()));
        }
        let mut records: Vec<AttendanceRecord> =
            state.attendance.iter().filter(|r| r.reg_no == reg_no).cloned().collect();
        records.sort_by(|a, b| b.date.cmp(&a.date).then(a.period.cmp(&b.period)));
        Ok(records)
    }

    async fn upsert_slot(&self, session: &SessionContext, slot: &SlotUpsert) -> Result<()> {
        authorize(session)?;
        let mut state = self.state.write().await;

        let class_has_subject = state
            .class_subjects
            .iter()
            .any(|m| m.class_id == slot.class_id && m.subject_code == slot.subject_code);
        if !class_has_subject {
            return Err(ConsoleError::Persistence(format!(
                "Class {} is not assigned subject {}",
                slot.class_id, slot.subject_code
            )));
        }

        let teacher_has_subject = state
            .teacher_subjects
            .iter()
            .any(|m| m.teacher_id == slot.teacher_id && m.subject_code == slot.subject_code);
        if !teacher_has_subject {
            return Err(ConsoleError::Persistence(format!(
                "Teacher {} is not assigned subject {}",
                slot.teacher_id, slot.subject_code
            )));
        }

        let same_slot = |t: &SlotAssignment| t.day == slot.day && t.period == slot.period;
        let teacher_busy_elsewhere = state
            .timetable
            .iter()
            .any(|t| same_slot(t) && t.teacher_id == slot.teacher_id && t.class_id != slot.class_id);
        if teacher_busy_elsewhere {
            return Err(ConsoleError::Persistence(
                "Teacher is already busy in another class at this time".to_string(),
            ));
        }

        let mut next = state.clone();
        let timetable_id = next.next_timetable_id();
        next.timetable
            .retain(|t| !(same_slot(t) && t.class_id == slot.class_id));
        let mut entry = slot.to_assignment();
        entry.timetable_id = Some(timetable_id);
        next.timetable.push(entry);

        self.commit(&mut state, next).await?;
        tracing::info!(
            day = %slot.day,
            period = %slot.period,
            class_id = %slot.class_id,
            teacher_id = slot.teacher_id,
            subject = %slot.subject_code,
            "Timetable updated"
        );
        Ok(())
    }

    async fn update_attendance(&self, session: &SessionContext, update: &AttendanceUpdate) -> Result<()> {
        authorize(session)?;
        let mut state = self.state.write().await;
        let mut next = state.clone();
        let record = next
            .attendance
            .iter_mut()
            .find(|r| r.attendance_id == update.attendance_id)
            .ok_or_else(|| ConsoleError::Persistence("Attendance record not found".to_string()))?;
        record.status = update.status;

        self.commit(&mut state, next).await?;
        tracing::info!(
            attendance_id = update.attendance_id,
            status = %update.status,
            "Attendance updated"
        );
        Ok(())
    }

    async fn marks_configs(&self, session: &SessionContext) -> Result<Vec<MarksConfig>> {
        authorize(session)?;
        Ok(self.state.read().await.marks_configs.clone())
    }

    async fn marks_config(&self, session: &SessionContext, subject_code: &str) -> Result<Option<MarksConfig>> {
        authorize(session)?;
        let state = self.state.read().await;
        Ok(state
            .marks_configs
            .iter()
            .find(|c| c.subject_code == subject_code)
            .cloned())
    }

    async fn save_marks_config(&self, session: &SessionContext, config: &MarksConfig) -> Result<()> {
        authorize(session)?;
        let mut state = self.state.write().await;
        if !state.subjects.iter().any(|s| s.subject_code == config.subject_code) {
            return Err(ConsoleError::Persistence("Subject not found".to_string()));
        }
        let mut next = state.clone();
        match next
            .marks_configs
            .iter_mut()
            .find(|c| c.subject_code == config.subject_code)
        {
            Some(existing) => *existing = config.clone(),
            None => next.marks_configs.push(config.clone()),
        }

        self.commit(&mut state, next).await?;
        tracing::info!(subject = %config.subject_code, "Marks configuration saved");
        Ok(())
    }
}
