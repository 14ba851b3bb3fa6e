//! Admissible-subject resolution for the slot being edited.
//!
//! A slot is only meaningful when its subject sits inside both the teacher's
//! teaching load and the class's curriculum. The check runs before the write
//! is attempted so the edit form only ever offers jointly authorized subjects.

use std::collections::HashMap;

use crate::error::{ConsoleError, Result};
use crate::mapping::MappingIndex;
use crate::models::{ClassId, ClassSubjectMapping, Subject, TeacherId, TeacherSubjectMapping};

/// Subjects admissible for a slot, in input order.
///
/// If either side of the selection is unset (an empty class id counts as
/// unset), every subject is returned unfiltered. Otherwise only subjects both
/// mapped to the teacher and offered to the class remain; an empty result is
/// valid.
#[must_use]
pub fn admissible_subjects<'a>(
    index: &MappingIndex,
    all_subjects: &'a [Subject],
    teacher_id: Option<TeacherId>,
    class_id: Option<&str>,
) -> Vec<&'a Subject> {
    admissible_positions(index, all_subjects, teacher_id, class_id)
        .into_iter()
        .map(|i| &all_subjects[i])
        .collect()
}

fn admissible_positions(
    index: &MappingIndex,
    all_subjects: &[Subject],
    teacher_id: Option<TeacherId>,
    class_id: Option<&str>,
) -> Vec<usize> {
    match (teacher_id, class_id.filter(|c| !c.is_empty())) {
        (Some(teacher_id), Some(class_id)) => all_subjects
            .iter()
            .enumerate()
            .filter(|(_, s)| {
                index.teacher_teaches(teacher_id, &s.subject_code) && index.class_offers(class_id, &s.subject_code)
            })
            .map(|(i, _)| i)
            .collect(),
        _ => (0..all_subjects.len()).collect(),
    }
}

type SelectionKey = (Option<TeacherId>, Option<ClassId>);

/// Memoized admissible-subject lookup over one set of mappings and subjects.
///
/// Results are cached per `(teacher, class)` selection; replacing either the
/// mappings or the subject list drops every cached result.
#[derive(Debug, Default)]
pub struct SlotConstraintResolver {
    index: MappingIndex,
    subjects: Vec<Subject>,
    memo: HashMap<SelectionKey, Vec<usize>>,
}

impl SlotConstraintResolver {
    /// Create a resolver from freshly fetched lists
    #[must_use]
    pub fn new(
        subjects: Vec<Subject>,
        teacher_mappings: &[TeacherSubjectMapping],
        class_mappings: &[ClassSubjectMapping],
    ) -> Self {
        Self {
            index: MappingIndex::build(teacher_mappings, class_mappings),
            subjects,
            memo: HashMap::new(),
        }
    }

    /// Replace both mapping lists
    pub fn replace_mappings(
        &mut self,
        teacher_mappings: &[TeacherSubjectMapping],
        class_mappings: &[ClassSubjectMapping],
    ) {
        self.index = MappingIndex::build(teacher_mappings, class_mappings);
        self.memo.clear();
    }

    /// Replace the subject list
    pub fn replace_subjects(&mut self, subjects: Vec<Subject>) {
        self.subjects = subjects;
        self.memo.clear();
    }

    /// The underlying mapping index
    #[must_use]
    pub const fn index(&self) -> &MappingIndex {
        &self.index
    }

    /// Every known subject
    #[must_use]
    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    /// Number of cached selections
    #[must_use]
    pub fn cached_selections(&self) -> usize {
        self.memo.len()
    }

    /// Admissible subjects for the selection, computed once per selection
    pub fn admissible(&mut self, teacher_id: Option<TeacherId>, class_id: Option<&str>) -> Vec<&Subject> {
        let class_id = class_id.filter(|c| !c.is_empty());
        let key = (teacher_id, class_id.map(str::to_string));
        let positions = self
            .memo
            .entry(key)
            .or_insert_with(|| admissible_positions(&self.index, &self.subjects, teacher_id, class_id));
        positions.iter().map(|&i| &self.subjects[i]).collect()
    }

    /// Fail unless `subject_code` may occupy a slot taught by the teacher to the class
    pub fn require_admissible(&mut self, teacher_id: TeacherId, class_id: &str, subject_code: &str) -> Result<()> {
        let admissible = self.admissible(Some(teacher_id), Some(class_id));
        if admissible.is_empty() {
            return Err(ConsoleError::Validation(format!(
                "no subject is jointly authorized for teacher {teacher_id} and class {class_id}"
            )));
        }
        if !admissible.iter().any(|s| s.subject_code == subject_code) {
            return Err(ConsoleError::Validation(format!(
                "subject {subject_code} is not mapped to both teacher {teacher_id} and class {class_id}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> SlotConstraintResolver {
        SlotConstraintResolver::new(
            vec![Subject::new("MATH101", "Calculus"), Subject::new("PHY101", "Physics")],
            &[TeacherSubjectMapping {
                teacher_id: 1,
                subject_code: "MATH101".into(),
            }],
            &[
                ClassSubjectMapping {
                    class_id: "CSE-1-A".into(),
                    subject_code: "MATH101".into(),
                },
                ClassSubjectMapping {
                    class_id: "CSE-1-A".into(),
                    subject_code: "PHY101".into(),
                },
            ],
        )
    }

    #[test]
    fn intersection_when_both_sides_set() {
        let mut r = resolver();
        let codes: Vec<_> = r.admissible(Some(1), Some("CSE-1-A")).iter().map(|s| s.subject_code.clone()).collect();
        assert_eq!(codes, vec!["MATH101"]);
    }

    #[test]
    fn incomplete_selection_returns_everything() {
        let mut r = resolver();
        assert_eq!(r.admissible(None, Some("CSE-1-A")).len(), 2);
        assert_eq!(r.admissible(Some(1), Some("")).len(), 2);
        assert_eq!(r.admissible(None, None).len(), 2);
    }

    #[test]
    fn memo_is_reused_and_cleared_on_replace() {
        let mut r = resolver();
        r.admissible(Some(1), Some("CSE-1-A"));
        r.admissible(Some(1), Some("CSE-1-A"));
        assert_eq!(r.cached_selections(), 1);
        r.replace_mappings(&[], &[]);
        assert_eq!(r.cached_selections(), 0);
        assert!(r.admissible(Some(1), Some("CSE-1-A")).is_empty());
    }

    #[test]
    fn require_admissible_reports_validation_errors() {
        let mut r = resolver();
        assert!(r.require_admissible(1, "CSE-1-A", "MATH101").is_ok());
        assert!(matches!(
            r.require_admissible(1, "CSE-1-A", "PHY101"),
            Err(ConsoleError::Validation(_))
        ));
        assert!(matches!(
            r.require_admissible(2, "CSE-1-A", "MATH101"),
            Err(ConsoleError::Validation(m)) if m.contains("jointly")
        ));
    }
}
