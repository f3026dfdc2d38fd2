use std::time::Duration;

use crate::error::{AppError, AppResult, ValidationError};

pub(crate) fn parse_bool_env(s: &str) -> AppResult<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "no" | "n" | "off" => Ok(false),
        _ => Err(AppError::validation(ValidationError::InvalidBoolean {
            value: s.to_owned(),
        })),
    }
}

/// Parses `500ms`, `10s`, `2m` or `1h`; a bare number means seconds.
///
/// # Errors
///
/// Returns an error for empty, malformed, overflowing, or zero durations.
pub fn parse_duration_arg(s: &str) -> AppResult<Duration> {
    let value = s.trim();
    if value.is_empty() {
        return Err(AppError::validation(ValidationError::DurationEmpty));
    }

    let unit_start = value
        .find(|ch: char| !ch.is_ascii_digit())
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(unit_start);
    if number.is_empty() {
        return Err(AppError::validation(
            ValidationError::InvalidDurationFormat {
                value: value.to_owned(),
            },
        ));
    }
    let number: u64 = number.parse().map_err(|err| {
        AppError::validation(ValidationError::InvalidDurationNumber {
            value: value.to_owned(),
            source: err,
        })
    })?;

    let millis_per_unit: u64 = match unit {
        "ms" => 1,
        "" | "s" => 1_000,
        "m" => 60_000,
        "h" => 3_600_000,
        other => {
            return Err(AppError::validation(ValidationError::InvalidDurationUnit {
                unit: other.to_owned(),
            }));
        }
    };
    let millis = number
        .checked_mul(millis_per_unit)
        .ok_or_else(|| AppError::validation(ValidationError::DurationOverflow))?;
    if millis == 0 {
        return Err(AppError::validation(ValidationError::DurationZero));
    }
    Ok(Duration::from_millis(millis))
}
