//! Campus Admin Core - timetable and attendance administration
//!
//! A Rust library holding the data-intensive core of a college admin
//! console: the weekly timetable grid with its subject constraints and the
//! per-student attendance ledger.
//!
//! # Features
//!
//! - Admissible-subject resolution from teacher and class mappings
//! - 6 × 7 timetable grids by teacher or by class, with validated slot upserts
//! - Attendance filtering, statistics and date × period grids
//! - Stale-fetch protection for every selectable view
//! - Cache-aside marks weight configuration
//! - Export to multiple formats (TXT, CSV, JSON)

/// Attendance ledger aggregation
pub mod attendance;
/// Marks configuration cache
pub mod cache;
/// Configuration management
pub mod config;
/// Error types
pub mod error;
/// Timetable and attendance export
pub mod file_writer;
/// Logging setup and utilities
pub mod logging;
/// Teacher/class subject mappings
pub mod mapping;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// Repository pattern for data access
pub mod repository;
/// Admissible-subject resolution
pub mod resolver;
/// Screen-level services
pub mod service;
/// Authenticated session context
pub mod session;
/// Timetable grid and slot drafts
pub mod timetable;
/// Date and number helpers
pub mod utils;
/// Input validation and sanitization
pub mod validation;
/// Stale-fetch tracking
pub mod view;

// Re-export key components for easier access
pub use error::{ConsoleError, Result};
pub use models::{AttendanceRecord, AttendanceStatus, DateRange, OutputFormat, SlotAssignment, TimetableView};
pub use repository::{AdminRepository, SnapshotRepository};
pub use resolver::{admissible_subjects, SlotConstraintResolver};
pub use service::{AttendanceService, MarksConfigService, TimetableService};
pub use session::SessionContext;
pub use timetable::{build_grid, SlotDraft, TimetableGrid};
