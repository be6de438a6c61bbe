//! End-to-end generation: map the batch, fill the PDF, write the Word
//! document and compose the email draft.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use super::artifacts::{ArtifactKind, ArtifactStore, GeneratedArtifact};
use super::composer::{DocumentComposer, EmailMessage};
use super::diagnostics::Diagnostic;
use super::mapper::FormFieldMapper;
use super::mapping_config::FieldMappingConfig;
use super::pdf_filler::PdfFormFiller;
use super::traits::Generator;
use super::transform::Translations;
use super::PipelineError;

/// All members submitted together in one request.
#[derive(Debug, Clone)]
pub struct ApplicantBatch {
    /// Embedded in both artifact names so they can be downloaded by id.
    pub job_id: Uuid,
    /// Member key (`primary`, `accompanying1`..) to extracted record.
    pub members: Map<String, Value>,
    /// Timestamp embedded in artifact names and document metadata.
    pub requested_at: DateTime<Utc>,
}

impl ApplicantBatch {
    pub fn new(members: Map<String, Value>) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            members,
            requested_at: Utc::now(),
        }
    }
}

/// Everything produced for one batch.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub job_id: Uuid,
    pub pdf: GeneratedArtifact,
    pub word: GeneratedArtifact,
    pub email: EmailMessage,
    pub members_processed: usize,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct VisaFormGenerator {
    mapper: FormFieldMapper,
    filler: PdfFormFiller,
    template_path: PathBuf,
    store: ArtifactStore,
}

impl VisaFormGenerator {
    /// The template is `config.pdf_name()` inside `template_dir`; the name is
    /// sanitized so a mapping file cannot point outside that directory.
    pub fn new(
        config: Arc<FieldMappingConfig>,
        template_dir: &Path,
        store: ArtifactStore,
        translations: Translations,
    ) -> Self {
        let template_path = template_dir.join(sanitize_filename::sanitize(config.pdf_name()));
        Self {
            mapper: FormFieldMapper::new(translations),
            filler: PdfFormFiller::new(config),
            template_path,
            store,
        }
    }

    pub fn template_path(&self) -> &Path {
        &self.template_path
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }
}

impl Generator<ApplicantBatch> for VisaFormGenerator {
    fn generate(&self, batch: ApplicantBatch) -> Result<GenerationReport, PipelineError> {
        let job_id = batch.job_id;
        log::info!("Job {}: processing {} members", job_id, batch.members.len());

        let mapped = self.mapper.map_batch(&batch.members);
        if mapped.applicants.is_empty() {
            return Err(PipelineError::NoValidApplicants);
        }

        self.store.ensure_dir().map_err(PipelineError::OutputDir)?;

        let pdf = self.store.allocate(job_id, ArtifactKind::Pdf, batch.requested_at);
        let fill = self.filler.fill(&self.template_path, &mapped.applicants, &pdf.path)?;

        let word = self.store.allocate(job_id, ArtifactKind::Word, batch.requested_at);
        if let Err(e) = DocumentComposer::compose_document(&mapped.applicants, &word.path, batch.requested_at) {
            if let Err(cleanup) = fs::remove_file(&pdf.path) {
                log::warn!("Job {}: could not remove {}: {}", job_id, pdf.path.display(), cleanup);
            }
            return Err(e.into());
        }

        let email = DocumentComposer::compose_message(&mapped.applicants);

        let mut diagnostics = mapped.diagnostics;
        diagnostics.extend(fill.diagnostics);

        log::info!(
            "Job {}: generated {} and {} for {} members ({} diagnostics)",
            job_id,
            pdf.path.display(),
            word.path.display(),
            mapped.applicants.len(),
            diagnostics.len()
        );

        Ok(GenerationReport {
            job_id,
            pdf,
            word,
            email,
            members_processed: mapped.applicants.len(),
            diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_template_path_stays_in_template_dir() {
        let config = FieldMappingConfig::new("../../etc/form.pdf", BTreeMap::new());
        let generator = VisaFormGenerator::new(
            Arc::new(config),
            Path::new("templates"),
            ArtifactStore::new("out"),
            Translations::default(),
        );

        assert_eq!(generator.template_path().parent(), Some(Path::new("templates")));
        assert!(generator.template_path().to_string_lossy().ends_with("form.pdf"));
    }

    #[test]
    fn test_empty_batch_is_rejected_before_touching_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("out"));
        let generator = VisaFormGenerator::new(
            Arc::new(FieldMappingConfig::default()),
            dir.path(),
            store,
            Translations::default(),
        );

        let result = generator.generate(ApplicantBatch::new(Map::new()));
        assert!(matches!(result, Err(PipelineError::NoValidApplicants)));
        assert!(!dir.path().join("out").exists());
    }
}
