// ABOUTME: Input normalization and validation shared by the services
// ABOUTME: Trims text, checks lengths and ranges, and normalizes lists, URLs and emails
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use std::collections::HashSet;

use chrono::NaiveDate;
use url::Url;

use crate::errors::{AppError, AppResult};

/// Trim a value, turning blank strings into `None`
#[must_use]
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Require a trimmed, non-empty value of at most `max` characters
///
/// # Errors
///
/// Returns an invalid input error naming `field`
pub fn require_text(field: &str, value: &str, max: usize) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input(format!("{field} is required")));
    }
    check_max_len(field, Some(trimmed), max)?;
    Ok(trimmed.to_owned())
}

/// Reject values longer than `max` characters
///
/// # Errors
///
/// Returns an invalid input error naming `field`
pub fn check_max_len(field: &str, value: Option<&str>, max: usize) -> AppResult<()> {
    match value {
        Some(v) if v.chars().count() > max => Err(AppError::invalid_input(format!(
            "{field} must be at most {max} characters"
        ))),
        _ => Ok(()),
    }
}

/// Trim entries, drop blanks, and remove case-insensitive duplicates keeping the first
#[must_use]
pub fn normalize_list(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .map(|item| item.trim().to_owned())
        .filter(|item| !item.is_empty() && seen.insert(item.to_lowercase()))
        .collect()
}

/// Require an absolute http or https URL
///
/// # Errors
///
/// Returns an invalid input error naming `field`
pub fn validate_http_url(field: &str, value: &str) -> AppResult<String> {
    let trimmed = value.trim();
    let url = Url::parse(trimmed)
        .map_err(|_| AppError::invalid_input(format!("{field} must be a valid URL")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::invalid_input(format!(
            "{field} must use http or https"
        )));
    }
    Ok(trimmed.to_owned())
}

/// Require `min <= value <= max`
///
/// # Errors
///
/// Returns a value-out-of-range error naming `field`
pub fn check_range_f64(field: &str, value: Option<f64>, min: f64, max: f64) -> AppResult<()> {
    match value {
        Some(v) if !v.is_finite() || v < min || v > max => Err(AppError::out_of_range(format!(
            "{field} must be between {min} and {max}"
        ))),
        _ => Ok(()),
    }
}

/// Require `min <= value <= max`
///
/// # Errors
///
/// Returns a value-out-of-range error naming `field`
pub fn check_range_i64(field: &str, value: Option<i64>, min: i64, max: i64) -> AppResult<()> {
    match value {
        Some(v) if v < min || v > max => Err(AppError::out_of_range(format!(
            "{field} must be between {min} and {max}"
        ))),
        _ => Ok(()),
    }
}

/// Require a finite, non-negative quantity
///
/// # Errors
///
/// Returns a value-out-of-range error naming `field`
pub fn check_non_negative(field: &str, value: Option<f64>) -> AppResult<()> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(AppError::out_of_range(format!(
            "{field} must be zero or greater"
        ))),
        _ => Ok(()),
    }
}

/// Trim, lowercase and syntactically check an email address
///
/// # Errors
///
/// Returns an invalid input error if the address is malformed
pub fn normalize_email(value: &str) -> AppResult<String> {
    let email = value.trim().to_lowercase();
    let invalid = || AppError::invalid_input(format!("Invalid email address: {}", value.trim()));

    if email.len() > 254 || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    let domain_ok = !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..");
    if local.is_empty() || !domain_ok {
        return Err(invalid());
    }
    Ok(email)
}

/// Parse a `YYYY-MM-DD` date
///
/// # Errors
///
/// Returns an invalid input error naming `field`
pub fn parse_date(field: &str, value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::invalid_input(format!("{field} must be a date (YYYY-MM-DD)")))
}
