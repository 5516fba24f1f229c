//! # Field Validation
//!
//! Normalization of the free-text answers and parsing of the time commitment.

use crate::domain::errors::ValidationError;

/// Trims and truncates to at most `max_chars` characters (not bytes).
pub fn truncate_chars(input: &str, max_chars: usize) -> String {
    input.trim().chars().take(max_chars).collect()
}

/// Parses hours per day. Accepts `.` or `,` as decimal separator; the value
/// must be finite and within `(0, max_hours]`.
pub fn parse_hours(input: &str, max_hours: f64) -> Result<f64, ValidationError> {
    let trimmed = input.trim();
    let normalized = trimmed.replace(',', ".");
    let value: f64 = normalized
        .parse()
        .map_err(|_| ValidationError::NotANumber(trimmed.to_string()))?;

    if !value.is_finite() {
        return Err(ValidationError::NotANumber(trimmed.to_string()));
    }
    if value <= 0.0 || value > max_hours {
        return Err(ValidationError::OutOfRange {
            value,
            max: max_hours,
        });
    }
    Ok(value)
}

pub fn format_hours(hours: f64) -> String {
    format!("{hours:.1} h")
}
