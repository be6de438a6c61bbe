use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::visa::validation::{self, ValidationErrors, SUPPORTED_FORM_TYPE};
use crate::visa::{Diagnostic, GenerationReport, Validator};

fn default_form_type() -> String {
    SUPPORTED_FORM_TYPE.to_string()
}

/// Body of `POST /api/generate-japanese-forms`.
#[derive(Deserialize, Debug, ToSchema)]
pub struct GenerateFormsRequest {
    /// `primary` and `accompanying1`..`accompanying7`, each an extracted passport record.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub members: Map<String, Value>,
    #[serde(default = "default_form_type")]
    pub form_type: String,
    /// Total number of members including the primary applicant.
    #[serde(default)]
    pub member_count: Option<u32>,
}

impl Validator for GenerateFormsRequest {
    fn validate(&self) -> Result<(), String> {
        let mut errors = ValidationErrors::new();
        validation::validate_form_type(&self.form_type, "form_type", &mut errors);
        validation::validate_members(&self.members, "members", &mut errors);
        validation::validate_member_count(self.member_count, "member_count", &mut errors);
        errors.into_result()
    }
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct GenerateFormsResponse {
    pub success: bool,
    pub job_id: String,
    pub pdf_path: String,
    pub word_path: String,
    pub email_subject: String,
    pub email_body: String,
    pub members_processed: usize,
    /// Members and fields that were skipped.
    #[schema(value_type = Vec<Object>)]
    pub diagnostics: Vec<Value>,
}

impl GenerateFormsResponse {
    pub fn from_report(report: &GenerationReport) -> Self {
        Self {
            success: true,
            job_id: report.job_id.to_string(),
            pdf_path: format!("/api/download/pdf/{}", report.job_id),
            word_path: format!("/api/download/word/{}", report.job_id),
            email_subject: report.email.subject.clone(),
            email_body: report.email.body.clone(),
            members_processed: report.members_processed,
            diagnostics: report.diagnostics.iter().map(diagnostic_json).collect(),
        }
    }
}

fn diagnostic_json(diagnostic: &Diagnostic) -> Value {
    let mut value = serde_json::to_value(diagnostic).unwrap_or(Value::Null);
    if let Value::Object(ref mut object) = value {
        object.insert("message".to_string(), Value::String(diagnostic.to_string()));
    }
    value
}
