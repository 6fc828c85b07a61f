//! Field validation. Rules record every violation so the client sees all of
//! them in one response.

use crate::error::{AppError, FieldError};
use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Default)]
pub struct Violations {
    errors: Vec<FieldError>,
}

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    /// Record `message` when `value` is missing; pass the value through.
    pub fn require<T>(&mut self, field: &str, value: Option<T>, message: &str) -> Option<T> {
        if value.is_none() {
            self.push(field, message);
        }
        value
    }

    /// Required string: missing or blank (after trim) records `message`. Returns the trimmed value.
    pub fn require_text(&mut self, field: &str, value: Option<&str>, message: &str) -> Option<String> {
        let trimmed = value.map(str::trim).filter(|s| !s.is_empty());
        self.require(field, trimmed, message).map(String::from)
    }

    pub fn length(&mut self, field: &str, value: &str, min: usize, max: usize, too_short: &str, too_long: &str) {
        let n = value.chars().count();
        if n < min {
            self.push(field, too_short);
        } else if n > max {
            self.push(field, too_long);
        }
    }

    pub fn range(&mut self, field: &str, value: f64, min: f64, max: f64, too_low: &str, too_high: &str) {
        if value < min {
            self.push(field, too_low);
        } else if value > max {
            self.push(field, too_high);
        }
    }

    pub fn email(&mut self, field: &str, value: &str, message: &str) {
        if !is_email(value) {
            self.push(field, message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(self) -> Result<(), AppError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self.errors))
        }
    }
}

pub fn is_email(value: &str) -> bool {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    let re = EMAIL.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$")
            .expect("valid regex")
    });
    re.is_match(value)
}
