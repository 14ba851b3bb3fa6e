use crate::error::{ConsoleError, Result};
use crate::models::{DateRange, MarksConfig, TeacherId};

/// Longest subject code or registration number the store accepts
pub const MAX_KEY_LEN: usize = 50;

fn invalid(message: impl Into<String>) -> ConsoleError {
    ConsoleError::Validation(message.into())
}

fn stored_key(value: &str, label: &str) -> Result<()> {
    let value = value.trim();
    if value.is_empty() {
        return Err(invalid(format!("{label} cannot be empty")));
    }

    if value.chars().count() > MAX_KEY_LEN {
        return Err(invalid(format!("{label} too long (max {MAX_KEY_LEN} characters)")));
    }

    if value.chars().any(char::is_control) {
        return Err(invalid(format!("{label} contains control characters")));
    }

    Ok(())
}

/// Validation utilities for console input
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Validate a subject code such as `CS201` or `MA.101`
    pub fn validate_subject_code(code: &str) -> Result<()> {
        stored_key(code, "Subject code")
    }

    /// Validate a class identifier such as `CSE-2-A`
    pub fn validate_class_id(class_id: &str) -> Result<()> {
        let class_id = class_id.trim();
        if class_id.is_empty() {
            return Err(invalid("Class ID cannot be empty"));
        }

        if class_id.len() > 10 {
            return Err(invalid("Class ID too long (max 10 characters)"));
        }

        if class_id.contains('\0') || class_id.contains('\r') || class_id.contains('\n') {
            return Err(invalid("Class ID contains invalid characters"));
        }

        Ok(())
    }

    /// Validate a student registration number such as `2021/CS/001`
    pub fn validate_reg_no(reg_no: &str) -> Result<()> {
        stored_key(reg_no, "Registration number")
    }

    /// Validate a teacher primary key
    pub fn validate_teacher_id(teacher_id: TeacherId) -> Result<()> {
        if teacher_id <= 0 {
            return Err(invalid("Teacher ID must be greater than 0"));
        }

        Ok(())
    }

    /// Validate date range
    pub fn validate_date_range(range: &DateRange) -> Result<()> {
        if let (Some(start), Some(end)) = (range.start, range.end) {
            if start > end {
                return Err(invalid("Start date cannot be after end date"));
            }

            let days = (end - start).num_days();
            if days > 365 * 5 {
                tracing::warn!(days, "Large attendance date range");
            }
        }

        Ok(())
    }

    /// Validate marks weights: each at most 100, summing to 100
    pub fn validate_marks_config(config: &MarksConfig) -> Result<()> {
        Self::validate_subject_code(&config.subject_code)?;

        if config.internal_weight > 100 || config.external_weight > 100 {
            return Err(invalid("Weights cannot exceed 100"));
        }

        if u16::from(config.internal_weight) + u16::from(config.external_weight) != 100 {
            return Err(invalid(format!(
                "Weights must sum to 100 (got {} + {})",
                config.internal_weight, config.external_weight
            )));
        }

        Ok(())
    }

    /// Sanitize text input
    #[must_use]
    pub fn sanitize_text(text: &str) -> String {
        text.chars()
            .filter(|c| !c.is_control() || *c == '\n' || *c == '\t' || *c == '\r')
            .collect::<String>()
            .trim()
            .to_string()
    }
}
