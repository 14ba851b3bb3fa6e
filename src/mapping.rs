//! Lookup sets over the teacher↔subject and class↔subject relations.

use std::collections::{HashMap, HashSet};

use crate::models::{ClassSubjectMapping, TeacherId, TeacherSubjectMapping};

/// Teacher→subjects and class→subjects lookup built from the two mapping lists.
///
/// The index is a pure function of its inputs and is rebuilt whenever either
/// list changes; duplicate pairs collapse into one entry.
#[derive(Debug, Clone, Default)]
pub struct MappingIndex {
    teacher_subjects: HashMap<TeacherId, HashSet<String>>,
    class_subjects: HashMap<String, HashSet<String>>,
}

impl MappingIndex {
    /// Build the index in one pass over each list
    #[must_use]
    pub fn build(teacher_mappings: &[TeacherSubjectMapping], class_mappings: &[ClassSubjectMapping]) -> Self {
        let mut teacher_subjects: HashMap<TeacherId, HashSet<String>> = HashMap::new();
        for m in teacher_mappings {
            teacher_subjects
                .entry(m.teacher_id)
                .or_default()
                .insert(m.subject_code.clone());
        }

        let mut class_subjects: HashMap<String, HashSet<String>> = HashMap::new();
        for m in class_mappings {
            class_subjects
                .entry(m.class_id.clone())
                .or_default()
                .insert(m.subject_code.clone());
        }

        tracing::debug!(
            teachers = teacher_subjects.len(),
            classes = class_subjects.len(),
            "Mapping index built"
        );

        Self {
            teacher_subjects,
            class_subjects,
        }
    }

    /// True iff the teacher is mapped to the subject
    #[must_use]
    pub fn teacher_teaches(&self, teacher_id: TeacherId, subject_code: &str) -> bool {
        self.teacher_subjects
            .get(&teacher_id)
            .is_some_and(|s| s.contains(subject_code))
    }

    /// True iff the class is mapped to the subject
    #[must_use]
    pub fn class_offers(&self, class_id: &str, subject_code: &str) -> bool {
        self.class_subjects
            .get(class_id)
            .is_some_and(|s| s.contains(subject_code))
    }

    /// Subjects the teacher is mapped to, in no particular order
    pub fn subjects_taught_by(&self, teacher_id: TeacherId) -> impl Iterator<Item = &str> {
        self.teacher_subjects
            .get(&teacher_id)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// Subjects the class is mapped to, in no particular order
    pub fn subjects_offered_to<'a>(&'a self, class_id: &str) -> impl Iterator<Item = &'a str> {
        self.class_subjects
            .get(class_id)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }
}
