//! Weekly timetable grid projection and slot editing.
//!
//! A grid is always fixed on one entity (a teacher or a class) and covers the
//! six-day week by seven periods. Grids are rebuilt from the fetched
//! assignment list after every confirmed write; they are never patched
//! optimistically.

use crate::error::{ConsoleError, Result};
use crate::models::{ClassId, Day, Period, SlotAssignment, SlotUpsert, Teacher, TeacherId, TimetableView};

const DAYS: usize = Day::ALL.len();
const PERIODS: usize = Period::PER_DAY as usize;

/// Label rendered for an unassigned cell
pub const FREE_LABEL: &str = "Free";

/// The 6 × 7 grid of one teacher's or one class's week
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimetableGrid {
    view: TimetableView,
    cells: [[Option<SlotAssignment>; PERIODS]; DAYS],
}

/// One day of a grid, periods in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimetableRow<'a> {
    /// Day of the row
    pub day: Day,
    /// Every period of the day with its assignment, if any
    pub cells: Vec<(Period, Option<&'a SlotAssignment>)>,
}

/// Project a flat assignment list onto the grid of `view`.
///
/// Assignments are indexed by (day, period) in one pass. When two
/// assignments claim the same cell the first one is kept; assignments that do
/// not belong to the viewed entity are skipped.
#[must_use]
pub fn build_grid(view: &TimetableView, assignments: &[SlotAssignment]) -> TimetableGrid {
    let mut cells: [[Option<SlotAssignment>; PERIODS]; DAYS] = Default::default();
    let mut skipped = 0usize;

    for assignment in assignments {
        if !view.includes(assignment) {
            skipped += 1;
            continue;
        }
        let cell = &mut cells[assignment.day.index()][assignment.period.index()];
        if let Some(existing) = cell {
            tracing::warn!(
                view = %view,
                day = %assignment.day,
                period = %assignment.period,
                kept = %existing.subject_code,
                dropped = %assignment.subject_code,
                "Duplicate assignment for one cell"
            );
            continue;
        }
        *cell = Some(assignment.clone());
    }

    if skipped > 0 {
        tracing::debug!(view = %view, skipped, "Ignored assignments outside the viewed entity");
    }

    TimetableGrid {
        view: view.clone(),
        cells,
    }
}

impl TimetableGrid {
    /// An empty grid for `view`
    #[must_use]
    pub fn empty(view: TimetableView) -> Self {
        Self {
            view,
            cells: Default::default(),
        }
    }

    /// The entity this grid is fixed on
    #[must_use]
    pub const fn view(&self) -> &TimetableView {
        &self.view
    }

    /// Assignment at (day, period), if the slot is taken
    #[must_use]
    pub fn cell_at(&self, day: Day, period: Period) -> Option<&SlotAssignment> {
        self.cells[day.index()][period.index()].as_ref()
    }

    /// Rows of the grid, Monday first
    #[must_use]
    pub fn rows(&self) -> Vec<TimetableRow<'_>> {
        Day::ALL
            .into_iter()
            .map(|day| TimetableRow {
                day,
                cells: Period::all().map(|p| (p, self.cell_at(day, p))).collect(),
            })
            .collect()
    }

    /// Every assignment on the grid, in day then period order
    pub fn assignments(&self) -> impl Iterator<Item = &SlotAssignment> {
        self.cells.iter().flatten().flatten()
    }

    /// Number of taken slots
    #[must_use]
    pub fn occupied(&self) -> usize {
        self.assignments().count()
    }

    /// Display text for a cell.
    ///
    /// A teacher's grid shows `class / subject`, a class's grid shows
    /// `subject / teacher name`, falling back to the teacher id when the
    /// teacher is not in `teachers`.
    #[must_use]
    pub fn cell_label(&self, day: Day, period: Period, teachers: &[Teacher]) -> String {
        let Some(entry) = self.cell_at(day, period) else {
            return FREE_LABEL.to_string();
        };
        match self.view {
            TimetableView::ByTeacher(_) => format!("{} / {}", entry.class_id, entry.subject_code),
            TimetableView::ByClass(_) => {
                let teacher = teachers
                    .iter()
                    .find(|t| t.teacher_id == entry.teacher_id)
                    .map_or_else(|| entry.teacher_id.to_string(), |t| t.name.clone());
                format!("{} / {}", entry.subject_code, teacher)
            },
        }
    }
}

/// Edit state of one slot before it is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotDraft {
    /// View the edit was started from
    pub view: TimetableView,
    /// Day being edited
    pub day: Day,
    /// Period being edited
    pub period: Period,
    /// Chosen class; fixed by a class view
    pub class_id: Option<ClassId>,
    /// Chosen teacher; fixed by a teacher view
    pub teacher_id: Option<TeacherId>,
    /// Chosen subject
    pub subject_code: Option<String>,
}

impl SlotDraft {
    /// A blank draft with the view's fixed side filled in
    #[must_use]
    pub fn new(view: TimetableView, day: Day, period: Period) -> Self {
        let (teacher_id, class_id) = match &view {
            TimetableView::ByTeacher(id) => (Some(*id), None),
            TimetableView::ByClass(id) => (None, Some(id.clone())),
        };
        Self {
            view,
            day,
            period,
            class_id,
            teacher_id,
            subject_code: None,
        }
    }

    /// Start editing a cell of `grid`, prefilled from its current assignment
    #[must_use]
    pub fn open(grid: &TimetableGrid, day: Day, period: Period) -> Self {
        let mut draft = Self::new(grid.view.clone(), day, period);
        if let Some(entry) = grid.cell_at(day, period) {
            draft.class_id = Some(entry.class_id.clone());
            draft.teacher_id = Some(entry.teacher_id);
            draft.subject_code = Some(entry.subject_code.clone());
        }
        draft
    }

    /// Choose the class
    #[must_use]
    pub fn with_class(mut self, class_id: &str) -> Self {
        self.class_id = Some(class_id.to_string());
        self
    }

    /// Choose the teacher
    #[must_use]
    pub const fn with_teacher(mut self, teacher_id: TeacherId) -> Self {
        self.teacher_id = Some(teacher_id);
        self
    }

    /// Choose the subject
    #[must_use]
    pub fn with_subject(mut self, subject_code: &str) -> Self {
        self.subject_code = Some(subject_code.to_string());
        self
    }

    /// The (teacher, class) pair that decides which subjects are admissible
    #[must_use]
    pub fn selection(&self) -> (Option<TeacherId>, Option<&str>) {
        match &self.view {
            TimetableView::ByTeacher(id) => (Some(*id), self.class_id.as_deref()),
            TimetableView::ByClass(id) => (self.teacher_id, Some(id.as_str())),
        }
    }

    /// The assignment this draft would overwrite on `grid`
    #[must_use]
    pub fn replaces<'g>(&self, grid: &'g TimetableGrid) -> Option<&'g SlotAssignment> {
        grid.cell_at(self.day, self.period)
    }

    /// Validate the draft into a write payload.
    ///
    /// The subject is always required. A teacher view requires an explicit
    /// class and a class view an explicit teacher; the fixed side always comes
    /// from the view.
    pub fn to_upsert(&self) -> Result<SlotUpsert> {
        let subject_code = self
            .subject_code
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConsoleError::Validation("Select Subject".to_string()))?;

        let (class_id, teacher_id) = match &self.view {
            TimetableView::ByTeacher(teacher_id) => {
                let class_id = self
                    .class_id
                    .as_deref()
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .ok_or_else(|| ConsoleError::Validation("Select Class".to_string()))?;
                (class_id.to_string(), *teacher_id)
            },
            TimetableView::ByClass(class_id) => {
                let teacher_id = self
                    .teacher_id
                    .filter(|t| *t > 0)
                    .ok_or_else(|| ConsoleError::Validation("Select Teacher".to_string()))?;
                (class_id.clone(), teacher_id)
            },
        };

        Ok(SlotUpsert {
            day: self.day,
            period: self.period,
            subject_code: subject_code.to_string(),
            class_id,
            teacher_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn period(n: u8) -> Period {
        Period::new(n).unwrap()
    }

    fn slot(day: Day, p: u8, class_id: &str, teacher_id: TeacherId, subject: &str) -> SlotAssignment {
        SlotAssignment {
            timetable_id: None,
            day,
            period: period(p),
            class_id: class_id.to_string(),
            teacher_id,
            subject_code: subject.to_string(),
        }
    }

    #[test]
    fn first_assignment_wins_a_cell() {
        let view = TimetableView::ByTeacher(7);
        let grid = build_grid(
            &view,
            &[slot(Day::Mon, 1, "CSE-2-A", 7, "CS201"), slot(Day::Mon, 1, "CSE-2-B", 7, "CS202")],
        );
        assert_eq!(grid.cell_at(Day::Mon, period(1)).unwrap().subject_code, "CS201");
        assert_eq!(grid.occupied(), 1);
    }

    #[test]
    fn assignments_of_other_entities_are_skipped() {
        let grid = build_grid(&TimetableView::ByClass("CSE-2-A".into()), &[slot(Day::Tue, 2, "CSE-2-B", 7, "CS201")]);
        assert_eq!(grid.occupied(), 0);
    }

    #[test]
    fn rows_cover_the_whole_week() {
        let grid = TimetableGrid::empty(TimetableView::ByTeacher(1));
        let rows = grid.rows();
        assert_eq!(rows.len(), 6);
        assert!(rows.iter().all(|r| r.cells.len() == 7 && r.cells.iter().all(|(_, c)| c.is_none())));
        assert_eq!(rows[0].day, Day::Mon);
        assert_eq!(rows[5].day, Day::Sat);
    }

    #[test]
    fn labels_depend_on_the_view() {
        let teachers = vec![Teacher {
            teacher_id: 7,
            employee_no: "E007".into(),
            name: "R. Kumar".into(),
        }];
        let entry = slot(Day::Wed, 4, "CSE-2-A", 7, "CS201");
        let by_teacher = build_grid(&TimetableView::ByTeacher(7), std::slice::from_ref(&entry));
        let by_class = build_grid(&TimetableView::ByClass("CSE-2-A".into()), std::slice::from_ref(&entry));
        assert_eq!(by_teacher.cell_label(Day::Wed, period(4), &teachers), "CSE-2-A / CS201");
        assert_eq!(by_class.cell_label(Day::Wed, period(4), &teachers), "CS201 / R. Kumar");
        assert_eq!(by_class.cell_label(Day::Wed, period(4), &[]), "CS201 / 7");
        assert_eq!(by_class.cell_label(Day::Thu, period(4), &teachers), FREE_LABEL);
    }

    #[test]
    fn open_prefills_from_existing_entry() {
        let grid = build_grid(&TimetableView::ByClass("CSE-2-A".into()), &[slot(Day::Fri, 5, "CSE-2-A", 3, "MA201")]);
        let draft = SlotDraft::open(&grid, Day::Fri, period(5));
        assert_eq!(draft.teacher_id, Some(3));
        assert_eq!(draft.subject_code.as_deref(), Some("MA201"));

        let blank = SlotDraft::open(&grid, Day::Fri, period(6));
        assert_eq!(blank.teacher_id, None);
        assert_eq!(blank.class_id.as_deref(), Some("CSE-2-A"));
        assert_eq!(blank.subject_code, None);
    }

    #[test]
    fn to_upsert_requires_subject_and_counterpart() {
        let by_teacher = SlotDraft::new(TimetableView::ByTeacher(7), Day::Mon, period(3));
        assert!(matches!(by_teacher.to_upsert(), Err(ConsoleError::Validation(m)) if m == "Select Subject"));

        let no_class = by_teacher.clone().with_subject("CS201");
        assert!(matches!(no_class.to_upsert(), Err(ConsoleError::Validation(m)) if m == "Select Class"));

        let by_class = SlotDraft::new(TimetableView::ByClass("CSE-2-A".into()), Day::Mon, period(3)).with_subject("CS201");
        assert!(matches!(by_class.to_upsert(), Err(ConsoleError::Validation(m)) if m == "Select Teacher"));

        let ok = no_class.with_class("CSE-2-A").to_upsert().unwrap();
        assert_eq!(ok.teacher_id, 7);
        assert_eq!(ok.class_id, "CSE-2-A");
    }

    #[test]
    fn fixed_side_comes_from_the_view() {
        let draft = SlotDraft::new(TimetableView::ByClass("CSE-2-A".into()), Day::Sat, period(7))
            .with_teacher(9)
            .with_class("OTHER")
            .with_subject("CS201");
        let upsert = draft.to_upsert().unwrap();
        assert_eq!(upsert.class_id, "CSE-2-A");
        assert_eq!(draft.selection(), (Some(9), Some("CSE-2-A")));
    }
}
