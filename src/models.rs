//! Data models for timetable and attendance handling
//!
//! This module contains the data structures shared by the core: reference
//! data (subjects, teachers, classes), the two mapping relations, slot
//! assignments, attendance records and the write payloads sent to the
//! repository.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ConsoleError, Result};

/// Teacher primary key
pub type TeacherId = i64;

/// Class identifier such as `CSE-2-A`
pub type ClassId = String;

/// Day of the teaching week
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Day {
    /// Monday
    Mon,
    /// Tuesday
    Tue,
    /// Wednesday
    Wed,
    /// Thursday
    Thu,
    /// Friday
    Fri,
    /// Saturday
    Sat,
}

impl Day {
    /// The fixed six-day week, in grid order
    pub const ALL: [Self; 6] = [Self::Mon, Self::Tue, Self::Wed, Self::Thu, Self::Fri, Self::Sat];

    /// Short name as stored by the backend
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mon => "Mon",
            Self::Tue => "Tue",
            Self::Wed => "Wed",
            Self::Thu => "Thu",
            Self::Fri => "Fri",
            Self::Sat => "Sat",
        }
    }

    /// Row index of this day in a timetable grid
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Day {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self> {
        let t = s.trim();
        Self::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(t))
            .ok_or_else(|| ConsoleError::Validation(format!("unknown day: {t} (expected Mon..Sat)")))
    }
}

/// Teaching period within a day, 1 through 7
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Period(u8);

impl Period {
    /// Number of periods in a teaching day
    pub const PER_DAY: u8 = 7;

    /// Create a period, rejecting values outside 1..=7
    pub fn new(value: u8) -> Result<Self> {
        if (1..=Self::PER_DAY).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ConsoleError::Validation(format!(
                "period must be between 1 and {}, got {value}",
                Self::PER_DAY
            )))
        }
    }

    /// All periods of a day, in grid order
    pub fn all() -> impl Iterator<Item = Self> {
        (1..=Self::PER_DAY).map(Self)
    }

    /// The period number
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Column index of this period in a timetable grid
    #[must_use]
    pub const fn index(self) -> usize {
        (self.0 - 1) as usize
    }
}

impl TryFrom<u8> for Period {
    type Error = ConsoleError;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Period> for u8 {
    fn from(period: Period) -> Self {
        period.0
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// A subject offered by the college
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Subject code such as `CS201`
    pub subject_code: String,
    /// Display name
    pub subject_name: String,
    /// Credit weight
    #[serde(default)]
    pub credits: Option<u32>,
    /// Semester the subject belongs to
    #[serde(default)]
    pub semester: Option<u32>,
}

impl Subject {
    /// Create a subject with only code and name
    #[must_use]
    pub fn new(code: &str, name: &str) -> Self {
        Self {
            subject_code: code.to_string(),
            subject_name: name.to_string(),
            credits: None,
            semester: None,
        }
    }
}

/// A teacher, as listed by the admin endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teacher {
    /// Primary key
    pub teacher_id: TeacherId,
    /// Employee number
    pub employee_no: String,
    /// Display name
    pub name: String,
}

/// A class (batch section) of students
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
    /// Class identifier
    pub class_id: ClassId,
    /// Year of study
    pub year: u8,
    /// Section letter
    pub section: String,
}

/// Teacher is authorized to teach a subject
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TeacherSubjectMapping {
    /// Teacher primary key
    pub teacher_id: TeacherId,
    /// Subject code
    pub subject_code: String,
}

/// Subject is part of a class's curriculum
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassSubjectMapping {
    /// Class identifier
    pub class_id: ClassId,
    /// Subject code
    pub subject_code: String,
}

/// Which entity a timetable grid is fixed on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimetableView {
    /// One teacher's week; the class varies per cell
    ByTeacher(TeacherId),
    /// One class's week; the teacher varies per cell
    ByClass(ClassId),
}

impl TimetableView {
    /// True if the assignment belongs to the entity this view is fixed on
    #[must_use]
    pub fn includes(&self, assignment: &SlotAssignment) -> bool {
        match self {
            Self::ByTeacher(id) => assignment.teacher_id == *id,
            Self::ByClass(id) => assignment.class_id == *id,
        }
    }

    /// Label used in logs and metrics
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ByTeacher(_) => "teacher",
            Self::ByClass(_) => "class",
        }
    }
}

impl fmt::Display for TimetableView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ByTeacher(id) => write!(f, "teacher {id}"),
            Self::ByClass(id) => write!(f, "class {id}"),
        }
    }
}

/// One occupied timetable cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotAssignment {
    /// Store-assigned key, absent before the first write
    #[serde(default)]
    pub timetable_id: Option<i64>,
    /// Day of week
    pub day: Day,
    /// Period of the day
    pub period: Period,
    /// Class taught in this slot
    pub class_id: ClassId,
    /// Teacher teaching this slot
    pub teacher_id: TeacherId,
    /// Subject taught
    pub subject_code: String,
}

/// Write payload for a slot upsert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotUpsert {
    /// Day of week
    pub day: Day,
    /// Period of the day
    pub period: Period,
    /// Subject to teach
    pub subject_code: String,
    /// Class to teach
    pub class_id: ClassId,
    /// Teacher to teach it
    pub teacher_id: TeacherId,
}

impl SlotUpsert {
    /// The assignment this upsert produces once the store accepts it
    #[must_use]
    pub fn to_assignment(&self) -> SlotAssignment {
        SlotAssignment {
            timetable_id: None,
            day: self.day,
            period: self.period,
            class_id: self.class_id.clone(),
            teacher_id: self.teacher_id,
            subject_code: self.subject_code.clone(),
        }
    }
}

/// Attendance status of one student in one period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceStatus {
    /// Present
    #[serde(rename = "P")]
    Present,
    /// Absent
    #[serde(rename = "A")]
    Absent,
    /// On duty, counted as attended
    #[serde(rename = "OD")]
    OnDuty,
    /// Medical leave
    #[serde(rename = "ML")]
    MedicalLeave,
    /// Explicitly recorded as not taken
    #[serde(rename = "NT")]
    NotTaken,
}

impl AttendanceStatus {
    /// Every status the backend accepts
    pub const ALL: [Self; 5] = [
        Self::Present,
        Self::Absent,
        Self::OnDuty,
        Self::MedicalLeave,
        Self::NotTaken,
    ];

    /// Status code as stored by the backend
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Present => "P",
            Self::Absent => "A",
            Self::OnDuty => "OD",
            Self::MedicalLeave => "ML",
            Self::NotTaken => "NT",
        }
    }

    /// True if this status counts toward the attendance percentage
    #[must_use]
    pub const fn counts_as_attended(self) -> bool {
        matches!(self, Self::Present | Self::OnDuty)
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for AttendanceStatus {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self> {
        let t = s.trim();
        Self::ALL
            .into_iter()
            .find(|st| st.code().eq_ignore_ascii_case(t))
            .ok_or_else(|| ConsoleError::Validation(format!("Invalid status: {t}")))
    }
}

/// One ledger entry: a student's status for one (date, period)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    /// Record primary key
    pub attendance_id: i64,
    /// Student registration number
    pub reg_no: String,
    /// Calendar date of the session
    pub date: NaiveDate,
    /// Period of the session
    pub period: Period,
    /// Subject of the session
    pub subject_code: String,
    /// Recorded status
    pub status: AttendanceStatus,
    /// Teacher who took the session
    #[serde(default)]
    pub teacher_name: Option<String>,
}

/// Write payload for an attendance status edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceUpdate {
    /// Record to update
    pub attendance_id: i64,
    /// New status
    pub status: AttendanceStatus,
}

/// Summary statistics over a set of attendance records
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AttendanceStats {
    /// Number of records
    pub total: usize,
    /// Records with status P
    pub present: usize,
    /// Records with status A
    pub absent: usize,
    /// Records with status OD
    pub od: usize,
    /// Records with status ML
    pub ml: usize,
    /// (present + od) / total * 100, rounded to two decimals
    pub percentage: f64,
}

/// Date range for filtering attendance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    /// Start date (inclusive, optional)
    pub start: Option<NaiveDate>,
    /// End date (inclusive, optional)
    pub end: Option<NaiveDate>,
}

impl DateRange {
    /// Create a range from optional bounds
    #[must_use]
    pub const fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// True if `date` falls inside both bounds
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}

/// Grading weights for a subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarksConfig {
    /// Subject the weights apply to
    pub subject_code: String,
    /// Internal assessment weight (percent)
    pub internal_weight: u8,
    /// External exam weight (percent)
    pub external_weight: u8,
    /// Subject has a lab component
    #[serde(default)]
    pub has_lab: bool,
    /// Subject is assessed purely by practicals
    #[serde(default)]
    pub is_pure_practical: bool,
}

impl MarksConfig {
    /// Default 40/60 split used when no configuration is stored
    #[must_use]
    pub fn default_for(subject_code: &str) -> Self {
        Self {
            subject_code: subject_code.to_string(),
            internal_weight: 40,
            external_weight: 60,
            has_lab: false,
            is_pure_practical: false,
        }
    }
}

/// Output format for exported grids
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Comma-separated values format
    Csv,
    /// Plain text format
    Txt,
    /// JSON format
    Json,
}

impl OutputFormat {
    /// Get the file extension for this format
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Txt => "txt",
            Self::Json => "json",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "txt" => Ok(Self::Txt),
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(ConsoleError::Validation(format!("Invalid format: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_rejects_out_of_range() {
        assert!(Period::new(0).is_err());
        assert!(Period::new(8).is_err());
        assert_eq!(Period::new(7).unwrap().index(), 6);
        assert_eq!(Period::all().count(), 7);
    }

    #[test]
    fn day_parses_case_insensitively() {
        assert_eq!("mon".parse::<Day>().unwrap(), Day::Mon);
        assert_eq!(" Sat ".parse::<Day>().unwrap(), Day::Sat);
        assert!("Sun".parse::<Day>().is_err());
    }

    #[test]
    fn status_serializes_as_backend_codes() {
        let json = serde_json::to_string(&AttendanceStatus::OnDuty).unwrap();
        assert_eq!(json, "\"OD\"");
        let back: AttendanceStatus = serde_json::from_str("\"NT\"").unwrap();
        assert_eq!(back, AttendanceStatus::NotTaken);
    }

    #[test]
    fn slot_assignment_rejects_bad_period_on_deserialize() {
        let raw = r#"{"day":"Mon","period":9,"class_id":"CSE-2-A","teacher_id":7,"subject_code":"CS201"}"#;
        assert!(serde_json::from_str::<SlotAssignment>(raw).is_err());
    }

    #[test]
    fn date_range_bounds_are_inclusive() {
        let d = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        let range = DateRange::new(Some(d("2024-01-02")), Some(d("2024-01-03")));
        assert!(!range.contains(d("2024-01-01")));
        assert!(range.contains(d("2024-01-02")));
        assert!(range.contains(d("2024-01-03")));
        assert!(DateRange::default().contains(d("1999-12-31")));
    }
}
