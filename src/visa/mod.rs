//! Visa form pipeline - turns extracted passport records into a filled
//! application PDF, a Word summary and an email draft.
//!
//! - `mapper` - raw records to logical form fields
//! - `pdf_filler` - logical fields into the AcroForm template
//! - `composer` / `docx` - Word document and email text
//! - `service` - the end-to-end `VisaFormGenerator`

pub mod artifacts;
pub mod composer;
pub mod diagnostics;
pub mod docx;
pub mod mapper;
pub mod mapping_config;
pub mod pdf_filler;
pub mod role;
pub mod service;
pub mod traits;
pub mod transform;
pub mod validation;

pub use artifacts::{ArtifactKind, ArtifactStore, GeneratedArtifact};
pub use composer::{DocumentComposer, EmailMessage};
pub use diagnostics::Diagnostic;
pub use mapper::{FormFieldMapper, MappedApplicants, MappedBatch, RawApplicantRecord, TransformedFieldSet};
pub use mapping_config::{ConfigError, FieldMappingConfig};
pub use pdf_filler::{FillReport, PdfFormFiller};
pub use role::ApplicantRole;
pub use service::{ApplicantBatch, GenerationReport, VisaFormGenerator};
pub use traits::{Generator, Validator};
pub use transform::Translations;

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors while filling the PDF template.
#[derive(Debug, Error)]
pub enum FillError {
    #[error("failed to read PDF template {path}: {source}", path = path.display())]
    TemplateUnreadable {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },
    #[error("failed to save filled PDF to {path}: {source}", path = path.display())]
    PersistenceFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Fatal errors while writing the Word document.
#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("failed to build Word document: {0}")]
    Package(#[from] zip::result::ZipError),
    #[error("failed to save Word document to {path}: {source}", path = path.display())]
    PersistenceFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that abort a whole generation request.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no valid member data provided")]
    NoValidApplicants,
    #[error("failed to prepare output directory: {0}")]
    OutputDir(#[source] std::io::Error),
    #[error(transparent)]
    Fill(#[from] FillError),
    #[error(transparent)]
    Compose(#[from] ComposeError),
}
