//! Request validation for form generation.
//!
//! Collects every problem before answering, so the caller can fix the whole
//! request in one go.

use serde_json::{Map, Value};
use std::fmt;

use super::role::MAX_ACCOMPANYING;

/// Form type accepted by the generator.
pub const SUPPORTED_FORM_TYPE: &str = "japanese_visa_family";

#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field that failed validation
    pub field: String,
    pub message: String,
    /// Suggestion for how to fix the error
    pub suggestion: Option<String>,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.field, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, ". {}", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Default)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn to_message(&self) -> String {
        self.errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Ok if no errors, otherwise the joined message.
    pub fn into_result(self) -> Result<(), String> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self.to_message())
        }
    }
}

pub fn validate_form_type(value: &str, field: &str, errors: &mut ValidationErrors) {
    if value != SUPPORTED_FORM_TYPE {
        errors.add(
            ValidationError::new(field, format!("unsupported form type '{}'", value))
                .with_suggestion(format!("use '{}'", SUPPORTED_FORM_TYPE)),
        );
    }
}

pub fn validate_members(members: &Map<String, Value>, field: &str, errors: &mut ValidationErrors) {
    if members.is_empty() {
        errors.add(
            ValidationError::new(field, "No member data provided")
                .with_suggestion("include at least the 'primary' member"),
        );
    }
}

/// `member_count` counts the primary applicant plus accompanying members.
pub fn validate_member_count(count: Option<u32>, field: &str, errors: &mut ValidationErrors) {
    let max = u32::from(MAX_ACCOMPANYING) + 1;
    if let Some(count) = count {
        if count == 0 || count > max {
            errors.add(ValidationError::new(
                field,
                format!("member count must be between 1 and {}", max),
            ));
        }
    }
}
