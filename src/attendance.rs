//! Range filtering, statistics and the date × period grid of one student's
//! attendance ledger.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::error::{ConsoleError, Result};
use crate::models::{AttendanceRecord, AttendanceStats, AttendanceStatus, DateRange, Period};
use crate::utils::{round2, weekday_label};
use crate::view::{ApplyOutcome, ViewTicket, ViewTracker};

/// Keep the records whose date falls inside `range` (both bounds inclusive)
#[must_use]
pub fn filter_by_range<'a>(records: &'a [AttendanceRecord], range: &DateRange) -> Vec<&'a AttendanceRecord> {
    records.iter().filter(|r| range.contains(r.date)).collect()
}

/// Count statuses and compute the attendance percentage.
///
/// On duty counts as attended alongside present; absent and medical leave do
/// not. `NT` records count toward the total only.
pub fn compute_stats<'a, I>(records: I) -> AttendanceStats
where
    I: IntoIterator<Item = &'a AttendanceRecord>,
{
    let mut stats = AttendanceStats::default();
    let mut attended = 0usize;
    for record in records {
        stats.total += 1;
        if record.status.counts_as_attended() {
            attended += 1;
        }
        match record.status {
            AttendanceStatus::Present => stats.present += 1,
            AttendanceStatus::Absent => stats.absent += 1,
            AttendanceStatus::OnDuty => stats.od += 1,
            AttendanceStatus::MedicalLeave => stats.ml += 1,
            AttendanceStatus::NotTaken => {},
        }
    }
    stats.percentage = if stats.total > 0 {
        round2(attended as f64 / stats.total as f64 * 100.0)
    } else {
        0.0
    };
    stats
}

/// What a (date, period) cell of the ledger shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceCell<'a> {
    /// No record exists for the cell
    NoRecord,
    /// A record exists, possibly with status `NT`
    Recorded(&'a AttendanceRecord),
}

/// One date of the ledger grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRow<'a> {
    /// Calendar date
    pub date: NaiveDate,
    /// Short weekday name, e.g. `Mon`
    pub weekday: &'static str,
    /// Records of the date keyed by period
    pub periods: BTreeMap<Period, &'a AttendanceRecord>,
}

impl<'a> DateRow<'a> {
    /// The cell for `period`; a missing record is distinct from an `NT` record
    #[must_use]
    pub fn cell(&self, period: Period) -> AttendanceCell<'a> {
        self.periods
            .get(&period)
            .map_or(AttendanceCell::NoRecord, |r| AttendanceCell::Recorded(*r))
    }
}

/// Group records by date into rows, most recent date first
pub fn build_date_grid<'a, I>(records: I) -> Vec<DateRow<'a>>
where
    I: IntoIterator<Item = &'a AttendanceRecord>,
{
    let mut grouped: BTreeMap<NaiveDate, BTreeMap<Period, &'a AttendanceRecord>> = BTreeMap::new();
    for record in records {
        if let Some(previous) = grouped.entry(record.date).or_default().insert(record.period, record) {
            tracing::warn!(
                date = %record.date,
                period = %record.period,
                replaced = previous.attendance_id,
                kept = record.attendance_id,
                "Duplicate attendance record for one cell"
            );
        }
    }

    grouped
        .into_iter()
        .rev()
        .map(|(date, periods)| DateRow {
            date,
            weekday: weekday_label(date),
            periods,
        })
        .collect()
}

/// The attendance ledger of the selected student.
///
/// Holds the last confirmed record list plus the active date range; every
/// derived view (filtered list, stats, date grid) is recomputed from it on
/// demand.
#[derive(Debug, Default)]
pub struct AttendanceLedger {
    tracker: ViewTracker<String>,
    records: Vec<AttendanceRecord>,
    range: DateRange,
}

impl AttendanceLedger {
    /// An empty ledger with no student selected
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a student; records of the previous student are dropped
    pub fn select(&mut self, reg_no: &str) -> ViewTicket<String> {
        self.records.clear();
        self.tracker.select(reg_no.to_string())
    }

    /// Deselect the student
    pub fn clear(&mut self) {
        self.records.clear();
        self.tracker.clear();
    }

    /// Registration number of the selected student
    #[must_use]
    pub fn reg_no(&self) -> Option<&str> {
        self.tracker.current().map(String::as_str)
    }

    /// Ticket for re-fetching the selected student
    #[must_use]
    pub fn current_ticket(&self) -> Option<ViewTicket<String>> {
        self.tracker.current_ticket()
    }

    /// Install fetched records unless the selection moved on meanwhile
    pub fn apply(&mut self, ticket: &ViewTicket<String>, records: Vec<AttendanceRecord>) -> ApplyOutcome {
        if !self.tracker.is_current(ticket) {
            tracing::debug!(reg_no = %ticket.key(), "Discarding stale attendance fetch");
            return ApplyOutcome::Discarded;
        }
        self.records = records;
        ApplyOutcome::Applied
    }

    /// Set the date filter
    pub fn set_range(&mut self, range: DateRange) {
        self.range = range;
    }

    /// Active date filter
    #[must_use]
    pub const fn range(&self) -> &DateRange {
        &self.range
    }

    /// Every record of the student, unfiltered
    #[must_use]
    pub fn records(&self) -> &[AttendanceRecord] {
        &self.records
    }

    /// Record with the given id
    #[must_use]
    pub fn find(&self, attendance_id: i64) -> Option<&AttendanceRecord> {
        self.records.iter().find(|r| r.attendance_id == attendance_id)
    }

    /// Records inside the active date range
    #[must_use]
    pub fn filtered(&self) -> Vec<&AttendanceRecord> {
        filter_by_range(&self.records, &self.range)
    }

    /// Statistics over the filtered records
    #[must_use]
    pub fn stats(&self) -> AttendanceStats {
        compute_stats(self.filtered())
    }

    /// Date grid over the filtered records
    #[must_use]
    pub fn date_grid(&self) -> Vec<DateRow<'_>> {
        build_date_grid(self.filtered())
    }

    /// Replace the status of one record after the store accepted the change
    pub fn update_status(&mut self, attendance_id: i64, status: AttendanceStatus) -> Result<&AttendanceRecord> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.attendance_id == attendance_id)
            .ok_or_else(|| ConsoleError::NotFound(format!("attendance record {attendance_id}")))?;
        record.status = status;
        Ok(record)
    }
}
