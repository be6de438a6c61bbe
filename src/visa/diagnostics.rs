//! Non-fatal problems recorded while mapping and filling a batch.
//!
//! Anything in here was skipped, not failed: the batch still produces its
//! artifacts and the caller gets the list back to show or assert on.

use serde::Serialize;
use std::fmt;

use super::role::ApplicantRole;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Logical field has no PDF field identifier in the mapping file.
    FieldNotConfigured {
        role: ApplicantRole,
        field: String,
    },
    /// Mapping names a PDF field the template does not contain.
    FieldNotFoundInTemplate {
        role: ApplicantRole,
        field: String,
        pdf_field: String,
    },
    /// Mapping uses a partial name shared by several template fields; use
    /// the dotted qualified name instead.
    AmbiguousFieldName {
        role: ApplicantRole,
        field: String,
        pdf_field: String,
    },
    /// The template field exists but its widgets could not be written.
    FieldWriteFailed {
        role: ApplicantRole,
        field: String,
        pdf_field: String,
        error: String,
    },
    /// No mapping slice exists for this role; nothing was written to the PDF for it.
    RoleNotConfigured { role: ApplicantRole },
    /// Member record was not an object or was empty.
    MalformedApplicantRecord { member: String },
    /// Member key is not `primary` or `accompanying1`..`accompanying7`.
    UnknownMember { member: String },
    /// The extraction step reported a failure for this member's document.
    ExtractionFailed {
        member: String,
        filename: Option<String>,
        error: String,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FieldNotConfigured { role, field } => {
                write!(f, "logical field '{field}' for {role} not found in mapping configuration")
            }
            Self::FieldNotFoundInTemplate {
                role,
                field,
                pdf_field,
            } => write!(
                f,
                "PDF field '{pdf_field}' (mapped from '{field}') for {role} not found in PDF template"
            ),
            Self::AmbiguousFieldName {
                role,
                field,
                pdf_field,
            } => write!(
                f,
                "PDF field name '{pdf_field}' (mapped from '{field}') for {role} matches several template fields"
            ),
            Self::FieldWriteFailed {
                role,
                field,
                pdf_field,
                error,
            } => write!(
                f,
                "could not write PDF field '{pdf_field}' (mapped from '{field}') for {role}: {error}"
            ),
            Self::RoleNotConfigured { role } => {
                write!(f, "no mapping configuration found for {role}")
            }
            Self::MalformedApplicantRecord { member } => {
                write!(f, "record for '{member}' is empty or not an object")
            }
            Self::UnknownMember { member } => write!(f, "unknown member key '{member}'"),
            Self::ExtractionFailed {
                member,
                filename,
                error,
            } => match filename {
                Some(name) => write!(f, "extraction failed for '{member}' ({name}): {error}"),
                None => write!(f, "extraction failed for '{member}': {error}"),
            },
        }
    }
}

/// Record a diagnostic and emit it as a warning.
pub(crate) fn record(diagnostics: &mut Vec<Diagnostic>, diagnostic: Diagnostic) {
    log::warn!("{}", diagnostic);
    diagnostics.push(diagnostic);
}
