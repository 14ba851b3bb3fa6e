//! Services driven against the snapshot store

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tempfile::tempdir;

use campus_admin_core::cache::MarksConfigCache;
use campus_admin_core::error::{ConsoleError, Result};
use campus_admin_core::models::{
    AttendanceRecord, AttendanceStatus, AttendanceUpdate, Class, ClassSubjectMapping, Day, MarksConfig, Period,
    SlotAssignment, SlotUpsert, Subject, Teacher, TeacherSubjectMapping, TimetableView,
};
use campus_admin_core::repository::{AdminRepository, Snapshot, SnapshotRepository};
use campus_admin_core::service::{AttendanceService, MarksConfigService, TimetableService};
use campus_admin_core::session::SessionContext;
use campus_admin_core::timetable::{SlotDraft, FREE_LABEL};
use campus_admin_core::utils::parse_date;
use campus_admin_core::view::ApplyOutcome;

fn period(n: u8) -> Period {
    Period::new(n).unwrap()
}

fn fixture() -> Snapshot {
    let teacher = |id: i64, name: &str| Teacher {
        teacher_id: id,
        employee_no: format!("E{id:03}"),
        name: name.to_string(),
    };
    let class = |id: &str, year: u8, section: &str| Class {
        class_id: id.to_string(),
        year,
        section: section.to_string(),
    };
    let tsm = |t: i64, s: &str| TeacherSubjectMapping {
        teacher_id: t,
        subject_code: s.to_string(),
    };
    let csm = |c: &str, s: &str| ClassSubjectMapping {
        class_id: c.to_string(),
        subject_code: s.to_string(),
    };
    let attendance = |id: i64, date: &str, p: u8, status: AttendanceStatus| AttendanceRecord {
        attendance_id: id,
        reg_no: "21CS001".to_string(),
        date: parse_date(date).unwrap(),
        period: period(p),
        subject_code: "CS201".to_string(),
        status,
        teacher_name: Some("R. Kumar".to_string()),
    };

    Snapshot {
        teachers: vec![teacher(7, "R. Kumar"), teacher(8, "S. Iyer")],
        classes: vec![class("CSE-2-A", 2, "A"), class("CSE-2-B", 2, "B")],
        subjects: vec![Subject::new("CS201", "Data Structures"), Subject::new("MA201", "Discrete Mathematics")],
        teacher_subjects: vec![tsm(7, "CS201"), tsm(8, "MA201"), tsm(8, "CS201")],
        class_subjects: vec![csm("CSE-2-A", "CS201"), csm("CSE-2-A", "MA201"), csm("CSE-2-B", "CS201")],
        students: vec!["21CS001".to_string()],
        timetable: vec![SlotAssignment {
            timetable_id: Some(1),
            day: Day::Tue,
            period: period(1),
            class_id: "CSE-2-A".to_string(),
            teacher_id: 8,
            subject_code: "MA201".to_string(),
        }],
        attendance: vec![
            attendance(1, "2024-01-01", 1, AttendanceStatus::Present),
            attendance(2, "2024-01-02", 1, AttendanceStatus::Absent),
            attendance(3, "2024-01-03", 1, AttendanceStatus::OnDuty),
        ],
        marks_configs: Vec::new(),
    }
}

fn session() -> SessionContext {
    SessionContext::issue("token", 60)
}

/// Reads go to the snapshot store, every write fails
struct ReadOnlyStore(SnapshotRepository);

#[async_trait]
impl AdminRepository for ReadOnlyStore {
    async fn teacher_subjects(&self, s: &SessionContext) -> Result<Vec<TeacherSubjectMapping>> {
        self.0.teacher_subjects(s).await
    }
    async fn class_subjects(&self, s: &SessionContext) -> Result<Vec<ClassSubjectMapping>> {
        self.0.class_subjects(s).await
    }
    async fn subjects(&self, s: &SessionContext) -> Result<Vec<Subject>> {
        self.0.subjects(s).await
    }
    async fn teachers(&self, s: &SessionContext) -> Result<Vec<Teacher>> {
        self.0.teachers(s).await
    }
    async fn classes(&self, s: &SessionContext) -> Result<Vec<Class>> {
        self.0.classes(s).await
    }
    async fn timetable(&self, s: &SessionContext, view: &TimetableView) -> Result<Vec<SlotAssignment>> {
        self.0.timetable(s, view).await
    }
    async fn attendance_records(&self, s: &SessionContext, reg_no: &str) -> Result<Vec<AttendanceRecord>> {
        self.0.attendance_records(s, reg_no).await
    }
    async fn upsert_slot(&self, _: &SessionContext, _: &SlotUpsert) -> Result<()> {
        Err(ConsoleError::Persistence("Network error".to_string()))
    }
    async fn update_attendance(&self, _: &SessionContext, _: &AttendanceUpdate) -> Result<()> {
        Err(ConsoleError::Persistence("Network error".to_string()))
    }
    async fn marks_configs(&self, s: &SessionContext) -> Result<Vec<MarksConfig>> {
        self.0.marks_configs(s).await
    }
    async fn marks_config(&self, s: &SessionContext, code: &str) -> Result<Option<MarksConfig>> {
        self.0.marks_config(s, code).await
    }
    async fn save_marks_config(&self, _: &SessionContext, _: &MarksConfig) -> Result<()> {
        Err(ConsoleError::Persistence("Network error".to_string()))
    }
}

async fn timetable_service(repo: Arc<dyn AdminRepository>, allow_overwrite: bool, view: TimetableView) -> TimetableService {
    let session = session();
    let mut service = TimetableService::new(repo, allow_overwrite);
    service.load_reference_data(&session).await.unwrap();
    assert_eq!(service.open_view(&session, view).await.unwrap(), ApplyOutcome::Applied);
    service
}

#[tokio::test]
async fn test_upsert_shows_new_assignment_at_edited_cell_only() {
    let repo = Arc::new(SnapshotRepository::new(fixture()));
    let mut service = timetable_service(repo, true, TimetableView::ByTeacher(7)).await;

    let draft = SlotDraft::new(TimetableView::ByTeacher(7), Day::Mon, period(3))
        .with_class("CSE-2-A")
        .with_subject("CS201");
    let saved = service.upsert_slot(&session(), &draft).await.unwrap();
    assert_eq!(saved.class_id, "CSE-2-A");
    assert!(saved.timetable_id.is_some());

    let board = service.board();
    let grid = board.grid().unwrap();
    for day in Day::ALL {
        for p in Period::all() {
            let label = grid.cell_label(day, p, board.teachers());
            if day == Day::Mon && p == period(3) {
                assert_eq!(label, "CSE-2-A / CS201");
            } else {
                assert_eq!(label, FREE_LABEL);
            }
        }
    }
}

#[tokio::test]
async fn test_stale_timetable_fetch_is_discarded() {
    let repo = Arc::new(SnapshotRepository::new(fixture()));
    let session = session();
    let mut service = TimetableService::new(repo, true);

    let first = service.select(TimetableView::ByClass("CSE-2-A".into()));
    let first_rows = service.fetch(&session, &first).await.unwrap();
    let second = service.select(TimetableView::ByTeacher(7));
    let second_rows = service.fetch(&session, &second).await.unwrap();

    assert_eq!(service.apply(&first, &first_rows), ApplyOutcome::Discarded);
    assert!(service.board().grid().is_none());

    assert_eq!(service.apply(&second, &second_rows), ApplyOutcome::Applied);
    assert_eq!(service.board().grid().unwrap().view(), &TimetableView::ByTeacher(7));
    assert_eq!(service.board().grid().unwrap().occupied(), 0);
}

#[tokio::test]
async fn test_failed_write_keeps_grid() {
    let repo = Arc::new(ReadOnlyStore(SnapshotRepository::new(fixture())));
    let view = TimetableView::ByClass("CSE-2-A".into());
    let mut service = timetable_service(repo, true, view.clone()).await;
    let before = service.board().grid().unwrap().clone();

    let draft = SlotDraft::new(view, Day::Wed, period(2)).with_teacher(7).with_subject("CS201");
    let err = service.upsert_slot(&session(), &draft).await.unwrap_err();
    assert!(matches!(err, ConsoleError::Persistence(ref m) if m == "Network error"));
    assert_eq!(service.board().grid().unwrap(), &before);
}

#[tokio::test]
async fn test_overwrite_rejected_when_disabled() {
    let repo = Arc::new(SnapshotRepository::new(fixture()));
    let view = TimetableView::ByClass("CSE-2-A".into());
    let mut service = timetable_service(repo.clone(), false, view.clone()).await;

    let draft = SlotDraft::new(view, Day::Tue, period(1)).with_teacher(7).with_subject("CS201");
    let err = service.upsert_slot(&session(), &draft).await.unwrap_err();
    assert!(matches!(err, ConsoleError::Validation(ref m) if m.contains("already assigned")));
    assert_eq!(repo.snapshot().await.timetable[0].subject_code, "MA201");
}

#[tokio::test]
async fn test_overwrite_replaces_when_enabled() {
    let repo = Arc::new(SnapshotRepository::new(fixture()));
    let view = TimetableView::ByClass("CSE-2-A".into());
    let mut service = timetable_service(repo.clone(), true, view.clone()).await;

    let draft = SlotDraft::new(view, Day::Tue, period(1)).with_teacher(7).with_subject("CS201");
    service.upsert_slot(&session(), &draft).await.unwrap();

    let grid = service.board().grid().unwrap();
    assert_eq!(grid.cell_label(Day::Tue, period(1), service.board().teachers()), "CS201 / R. Kumar");
    assert_eq!(repo.snapshot().await.timetable.len(), 1);
}

#[tokio::test]
async fn test_busy_teacher_message_passes_through() {
    let repo = Arc::new(SnapshotRepository::new(fixture()));
    let view = TimetableView::ByClass("CSE-2-B".into());
    let mut service = timetable_service(repo, true, view.clone()).await;

    let draft = SlotDraft::new(view, Day::Tue, period(1)).with_teacher(8).with_subject("CS201");
    let err = service.upsert_slot(&session(), &draft).await.unwrap_err();
    assert_eq!(err.to_string(), "Teacher is already busy in another class at this time");
    assert_eq!(service.board().grid().unwrap().occupied(), 0);
}

#[tokio::test]
async fn test_missing_subject_is_a_validation_error() {
    let repo = Arc::new(SnapshotRepository::new(fixture()));
    let view = TimetableView::ByTeacher(7);
    let mut service = timetable_service(repo, true, view.clone()).await;

    let draft = SlotDraft::new(view, Day::Mon, period(1)).with_class("CSE-2-A");
    let err = service.upsert_slot(&session(), &draft).await.unwrap_err();
    assert!(matches!(err, ConsoleError::Validation(ref m) if m == "Select Subject"));
}

#[tokio::test]
async fn test_admissible_subjects_for_draft() {
    let repo = Arc::new(SnapshotRepository::new(fixture()));
    let view = TimetableView::ByClass("CSE-2-A".into());
    let mut service = timetable_service(repo, true, view.clone()).await;

    let blank = SlotDraft::new(view.clone(), Day::Mon, period(1));
    assert_eq!(service.admissible_subjects(&blank).len(), 2);

    let with_teacher = blank.with_teacher(7);
    let codes: Vec<String> = service
        .admissible_subjects(&with_teacher)
        .iter()
        .map(|s| s.subject_code.clone())
        .collect();
    assert_eq!(codes, vec!["CS201"]);
}

#[tokio::test]
async fn test_expired_session_fails_every_call() {
    let repo = Arc::new(SnapshotRepository::new(fixture()));
    let expired = SessionContext::new("token", Utc::now() - Duration::hours(2), Duration::minutes(30));

    let mut timetable = TimetableService::new(repo.clone(), true);
    assert!(matches!(
        timetable.load_reference_data(&expired).await,
        Err(ConsoleError::SessionExpired)
    ));

    let mut attendance = AttendanceService::new(repo);
    assert!(matches!(
        attendance.open_student(&expired, "21CS001").await,
        Err(ConsoleError::SessionExpired)
    ));
}

#[tokio::test]
async fn test_attendance_update_persists_and_patches_ledger() {
    let repo = Arc::new(SnapshotRepository::new(fixture()));
    let session = session();
    let mut service = AttendanceService::new(repo.clone());
    service.open_student(&session, "21CS001").await.unwrap();

    let first_date = service.ledger().records()[0].date;
    assert_eq!(first_date, parse_date("2024-01-03").unwrap());

    let updated = service.update_status(&session, 2, AttendanceStatus::MedicalLeave).await.unwrap();
    assert_eq!(updated.status, AttendanceStatus::MedicalLeave);
    assert_eq!(service.ledger().stats().ml, 1);

    let stored = repo.snapshot().await;
    assert_eq!(stored.attendance.iter().find(|r| r.attendance_id == 2).unwrap().status, AttendanceStatus::MedicalLeave);
}

#[tokio::test]
async fn test_failed_attendance_update_keeps_ledger() {
    let repo = Arc::new(ReadOnlyStore(SnapshotRepository::new(fixture())));
    let session = session();
    let mut service = AttendanceService::new(repo);
    service.open_student(&session, "21CS001").await.unwrap();

    assert!(service.update_status(&session, 2, AttendanceStatus::Present).await.is_err());
    assert_eq!(service.ledger().find(2).unwrap().status, AttendanceStatus::Absent);
}

#[tokio::test]
async fn test_unknown_student() {
    let repo = Arc::new(SnapshotRepository::new(fixture()));
    let mut service = AttendanceService::new(repo);
    let err = service.open_student(&session(), "99XX999").await.unwrap_err();
    assert_eq!(err.to_string(), "Student not found");
}

#[tokio::test]
async fn test_stale_attendance_fetch_is_discarded() {
    let repo = Arc::new(SnapshotRepository::new(fixture()));
    let session = session();
    let mut service = AttendanceService::new(repo);

    let first = service.select("21CS001").unwrap();
    let records = service.fetch(&session, &first).await.unwrap();
    let _second = service.select("21CS002").unwrap();

    assert_eq!(service.apply(&first, records), ApplyOutcome::Discarded);
    assert!(service.ledger().records().is_empty());
}

#[tokio::test]
async fn test_marks_config_default_then_saved_value() {
    let repo = Arc::new(SnapshotRepository::new(fixture()));
    let session = session();
    let service = MarksConfigService::new(repo, MarksConfigCache::new(64, StdDuration::from_secs(300)));

    let initial = service.config_for(&session, "CS201").await.unwrap();
    assert_eq!((initial.internal_weight, initial.external_weight), (40, 60));

    let updated = MarksConfig {
        subject_code: "CS201".to_string(),
        internal_weight: 25,
        external_weight: 75,
        has_lab: true,
        is_pure_practical: false,
    };
    service.save(&session, &updated).await.unwrap();
    assert_eq!(service.config_for(&session, "CS201").await.unwrap(), updated);

    let bad = MarksConfig {
        internal_weight: 30,
        ..updated
    };
    assert!(matches!(service.save(&session, &bad).await, Err(ConsoleError::Validation(_))));
}

#[tokio::test]
async fn test_snapshot_file_is_written_back() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("campus.yaml");
    fixture().save(&path).unwrap();

    let repo = Arc::new(SnapshotRepository::open(&path).unwrap());
    let view = TimetableView::ByTeacher(7);
    let mut service = timetable_service(repo, true, view.clone()).await;
    let draft = SlotDraft::new(view, Day::Sat, period(7)).with_class("CSE-2-B").with_subject("CS201");
    service.upsert_slot(&session(), &draft).await.unwrap();

    let reloaded = Snapshot::load(&path).unwrap();
    assert_eq!(reloaded.timetable.len(), 2);
    assert!(reloaded
        .timetable
        .iter()
        .any(|t| t.day == Day::Sat && t.class_id == "CSE-2-B" && t.teacher_id == 7));
}

#[tokio::test]
async fn test_failed_write_back_leaves_store_unchanged() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("campus.json");
    fixture().save(&path).unwrap();
    let repo = Arc::new(SnapshotRepository::open(&path).unwrap());

    std::fs::remove_file(&path).unwrap();
    std::fs::create_dir(&path).unwrap();

    let view = TimetableView::ByTeacher(7);
    let mut service = timetable_service(repo.clone(), true, view.clone()).await;
    let draft = SlotDraft::new(view.clone(), Day::Mon, period(3)).with_class("CSE-2-A").with_subject("CS201");
    let err = service.upsert_slot(&session(), &draft).await.unwrap_err();
    assert!(matches!(err, ConsoleError::Persistence(ref m) if m.starts_with("Failed to save snapshot")));

    assert!(repo.timetable(&session(), &view).await.unwrap().is_empty());
    assert_eq!(service.board().grid().unwrap().occupied(), 0);
    assert_eq!(repo.snapshot().await, fixture());
}

#[tokio::test]
async fn test_subject_code_with_punctuation_can_be_scheduled() {
    let mut snapshot = fixture();
    snapshot.subjects.push(Subject::new("MA.101", "Calculus I"));
    snapshot.teacher_subjects.push(TeacherSubjectMapping {
        teacher_id: 7,
        subject_code: "MA.101".to_string(),
    });
    snapshot.class_subjects.push(ClassSubjectMapping {
        class_id: "CSE-2-A".to_string(),
        subject_code: "MA.101".to_string(),
    });
    let repo = Arc::new(SnapshotRepository::new(snapshot));
    let view = TimetableView::ByTeacher(7);
    let mut service = timetable_service(repo, true, view.clone()).await;

    let offered: Vec<String> = service
        .admissible_for(Some(7), Some("CSE-2-A"))
        .iter()
        .map(|s| s.subject_code.clone())
        .collect();
    assert!(offered.contains(&"MA.101".to_string()));

    let draft = SlotDraft::new(view, Day::Wed, period(2)).with_class("CSE-2-A").with_subject("MA.101");
    let saved = service.upsert_slot(&session(), &draft).await.unwrap();
    assert_eq!(saved.subject_code, "MA.101");
}

#[tokio::test]
async fn test_ledger_opens_for_slash_separated_reg_no() {
    let mut snapshot = fixture();
    snapshot.students.push("2021/CS/001".to_string());
    let repo = Arc::new(SnapshotRepository::new(snapshot));
    let mut service = AttendanceService::new(repo);

    let outcome = service.open_student(&session(), "2021/CS/001").await.unwrap();
    assert_eq!(outcome, ApplyOutcome::Applied);
    assert_eq!(service.ledger().reg_no(), Some("2021/CS/001"));
    assert!(service.ledger().records().is_empty());
}
