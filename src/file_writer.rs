//! File writing utilities for timetable and attendance export.
//!
//! This module writes a timetable grid or a student's attendance ledger to
//! files in TXT (fixed-width table), CSV or JSON, with the same layout the
//! console prints.

use crate::attendance::{AttendanceCell, AttendanceLedger};
use crate::error::Result;
use crate::models::{Day, OutputFormat, Period, Teacher};
use crate::timetable::TimetableGrid;
use csv::Writer;
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const CELL_WIDTH: usize = 18;
const EMPTY_MARK: &str = "-";

/// Build the output path `output_dir/<stem>.<ext>`, creating the directory.
///
/// # Arguments
///
/// * `output_dir` - Base output directory
/// * `stem` - File name without extension, e.g. `timetable_class_CSE-2-A`
/// * `format` - Output format deciding the extension
pub fn export_path(output_dir: &Path, stem: &str, format: OutputFormat) -> Result<PathBuf> {
    create_dir_all(output_dir)?;
    let safe_stem: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    Ok(output_dir.join(format!("{safe_stem}.{}", format.extension())))
}

/// Write a timetable grid to a file in the specified format.
///
/// # Arguments
///
/// * `grid` - The grid to write
/// * `teachers` - Teacher list used to label cells of a class view
/// * `format` - Output format (TXT, CSV, or JSON)
/// * `file_path` - Path to the output file
///
/// # Errors
///
/// Returns an error if file creation or writing fails.
pub fn write_timetable(grid: &TimetableGrid, teachers: &[Teacher], format: OutputFormat, file_path: &Path) -> Result<u64> {
    match format {
        OutputFormat::Txt => write_timetable_txt(grid, teachers, file_path)?,
        OutputFormat::Csv => write_timetable_csv(grid, teachers, file_path)?,
        OutputFormat::Json => write_timetable_json(grid, file_path)?,
    }
    Ok(std::fs::metadata(file_path)?.len())
}

/// Render a timetable grid as a fixed-width table
#[must_use]
pub fn render_timetable(grid: &TimetableGrid, teachers: &[Teacher]) -> String {
    let mut out = format!("Timetable for {}\n", grid.view());
    out.push_str(&format!("{:<5}", "Day"));
    for period in Period::all() {
        out.push_str(&format!("| {:<w$}", period.to_string(), w = CELL_WIDTH));
    }
    out.push('\n');

    for day in Day::ALL {
        out.push_str(&format!("{:<5}", day.as_str()));
        for period in Period::all() {
            let label = grid.cell_label(day, period, teachers);
            out.push_str(&format!("| {:<w$}", truncate(&label, CELL_WIDTH), w = CELL_WIDTH));
        }
        out.push('\n');
    }
    out
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(width - 1).collect();
        cut.push('~');
        cut
    }
}

fn write_timetable_txt(grid: &TimetableGrid, teachers: &[Teacher], file_path: &Path) -> Result<()> {
    let file = File::create(file_path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(render_timetable(grid, teachers).as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Header row: `Day, P1 .. P7`; one row per day
fn write_timetable_csv(grid: &TimetableGrid, teachers: &[Teacher], file_path: &Path) -> Result<()> {
    let file = File::create(file_path)?;
    let mut writer = Writer::from_writer(file);

    let mut header = vec!["Day".to_string()];
    header.extend(Period::all().map(|p| p.to_string()));
    writer.write_record(&header)?;

    for day in Day::ALL {
        let mut row = vec![day.to_string()];
        row.extend(Period::all().map(|p| grid.cell_label(day, p, teachers)));
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}

/// A JSON array of the occupied slots
fn write_timetable_json(grid: &TimetableGrid, file_path: &Path) -> Result<()> {
    let file = File::create(file_path)?;
    let writer = BufWriter::new(file);

    let document = serde_json::json!({
        "view": grid.view().to_string(),
        "assignments": grid.assignments().collect::<Vec<_>>(),
    });

    serde_json::to_writer_pretty(writer, &document)?;
    Ok(())
}

/// Write the filtered attendance ledger and its statistics.
///
/// # Errors
///
/// Returns an error if file creation or writing fails.
pub fn write_attendance(ledger: &AttendanceLedger, format: OutputFormat, file_path: &Path) -> Result<u64> {
    match format {
        OutputFormat::Txt => write_attendance_txt(ledger, file_path)?,
        OutputFormat::Csv => write_attendance_csv(ledger, file_path)?,
        OutputFormat::Json => write_attendance_json(ledger, file_path)?,
    }
    Ok(std::fs::metadata(file_path)?.len())
}

/// Render the ledger's date grid and stats as a fixed-width table
#[must_use]
pub fn render_attendance(ledger: &AttendanceLedger) -> String {
    let stats = ledger.stats();
    let mut out = format!(
        "Attendance for {}\nTotal: {}  Present: {}  Absent: {}  OD: {}  ML: {}  Percentage: {:.2}%\n",
        ledger.reg_no().unwrap_or(EMPTY_MARK),
        stats.total,
        stats.present,
        stats.absent,
        stats.od,
        stats.ml,
        stats.percentage
    );

    out.push_str(&format!("{:<12}{:<5}", "Date", "Day"));
    for period in Period::all() {
        out.push_str(&format!("{:<4}", period.to_string()));
    }
    out.push('\n');

    for row in ledger.date_grid() {
        out.push_str(&format!("{:<12}{:<5}", row.date.to_string(), row.weekday));
        for period in Period::all() {
            let mark = match row.cell(period) {
                AttendanceCell::NoRecord => EMPTY_MARK,
                AttendanceCell::Recorded(record) => record.status.code(),
            };
            out.push_str(&format!("{mark:<4}"));
        }
        out.push('\n');
    }
    out
}

fn write_attendance_txt(ledger: &AttendanceLedger, file_path: &Path) -> Result<()> {
    let file = File::create(file_path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(render_attendance(ledger).as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Header row: `ID, Date, Day, Period, Subject, Status, Teacher`
fn write_attendance_csv(ledger: &AttendanceLedger, file_path: &Path) -> Result<()> {
    let file = File::create(file_path)?;
    let mut writer = Writer::from_writer(file);

    writer.write_record(["ID", "Date", "Day", "Period", "Subject", "Status", "Teacher"])?;

    for row in ledger.date_grid() {
        for record in row.periods.values() {
            writer.write_record(&[
                record.attendance_id.to_string(),
                row.date.to_string(),
                row.weekday.to_string(),
                record.period.get().to_string(),
                record.subject_code.clone(),
                record.status.code().to_string(),
                record.teacher_name.clone().unwrap_or_default(),
            ])?;
        }
    }

    writer.flush()?;
    Ok(())
}

fn write_attendance_json(ledger: &AttendanceLedger, file_path: &Path) -> Result<()> {
    let file = File::create(file_path)?;
    let writer = BufWriter::new(file);

    let document = serde_json::json!({
        "reg_no": ledger.reg_no(),
        "range": ledger.range(),
        "stats": ledger.stats(),
        "records": ledger.filtered(),
    });

    serde_json::to_writer_pretty(writer, &document)?;
    Ok(())
}
