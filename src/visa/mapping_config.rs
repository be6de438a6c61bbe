//! Field-mapping configuration: logical passport fields to PDF field names.
//!
//! The file is read once at startup and shared read-only afterwards.
//!
//! ```json
//! {
//!   "pdf_name": "visa_request_form.pdf",
//!   "primary_applicant": { "passport_number": "Text5", ... },
//!   "accompanying1": { "passport_number": "Text41", ... }
//! }
//! ```

use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::role::ApplicantRole;

const PDF_NAME_KEY: &str = "pdf_name";
const PRIMARY_APPLICANT_KEY: &str = "primary_applicant";
const DEFAULT_PDF_NAME: &str = "visa_request_form.pdf";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read mapping configuration {path}: {source}", path = path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("mapping configuration is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("mapping configuration must be a JSON object")]
    NotAnObject,
    #[error("mapping for '{key}' must be an object of string values")]
    InvalidSlice { key: String },
}

/// Logical-field to PDF-field-identifier table for one role.
pub type RoleMapping = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMappingConfig {
    pdf_name: String,
    roles: BTreeMap<ApplicantRole, RoleMapping>,
}

impl FieldMappingConfig {
    pub fn new(pdf_name: impl Into<String>, roles: BTreeMap<ApplicantRole, RoleMapping>) -> Self {
        Self {
            pdf_name: pdf_name.into(),
            roles,
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&raw)?;
        log::info!(
            "Loaded field mapping from {} ({} roles, template '{}')",
            path.display(),
            config.roles.len(),
            config.pdf_name
        );
        Ok(config)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(raw)?;
        let object = value.as_object().ok_or(ConfigError::NotAnObject)?;

        let mut pdf_name = DEFAULT_PDF_NAME.to_string();
        let mut roles = BTreeMap::new();

        for (key, entry) in object {
            if key == PDF_NAME_KEY {
                if let Some(name) = entry.as_str() {
                    pdf_name = name.to_string();
                }
                continue;
            }

            let role = if key == PRIMARY_APPLICANT_KEY {
                ApplicantRole::Primary
            } else {
                match key.parse::<ApplicantRole>() {
                    Ok(role) => role,
                    Err(_) => {
                        log::warn!("Ignoring unknown key '{}' in mapping configuration", key);
                        continue;
                    }
                }
            };

            roles.insert(role, parse_slice(key, entry)?);
        }

        Ok(Self { pdf_name, roles })
    }

    /// Template filename, relative to the template directory.
    pub fn pdf_name(&self) -> &str {
        &self.pdf_name
    }

    pub fn for_role(&self, role: ApplicantRole) -> Option<&RoleMapping> {
        self.roles.get(&role).filter(|mapping| !mapping.is_empty())
    }
}

fn parse_slice(key: &str, entry: &Value) -> Result<RoleMapping, ConfigError> {
    let invalid = || ConfigError::InvalidSlice {
        key: key.to_string(),
    };

    entry
        .as_object()
        .ok_or_else(invalid)?
        .iter()
        .map(|(field, pdf_field)| {
            pdf_field
                .as_str()
                .map(|id| (field.clone(), id.to_string()))
                .ok_or_else(invalid)
        })
        .collect()
}
