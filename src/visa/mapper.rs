//! Maps one applicant's extracted record onto logical form fields.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::diagnostics::{self, Diagnostic};
use super::role::ApplicantRole;
use super::transform::{self, Translations};

/// Logical form-field names produced by the mapper.
pub mod fields {
    pub const FULL_NAME: &str = "full_name_japanese_order";
    pub const PASSPORT_NUMBER: &str = "passport_number";
    pub const DATE_OF_BIRTH: &str = "date_of_birth";
    pub const NATIONALITY: &str = "nationality";
    pub const BIRTH_PLACE: &str = "birth_place";
    pub const SEX: &str = "sex";
    pub const ISSUING_AUTHORITY: &str = "issuing_authority";
    pub const ISSUE_DATE: &str = "issue_date";
    pub const EXPIRATION_DATE: &str = "expiration_date";
}

/// One applicant's record as returned by the extraction step.
pub type RawApplicantRecord = Map<String, Value>;

/// Logical form-field name to final, form-ready string value.
pub type TransformedFieldSet = BTreeMap<String, String>;

/// Transformed records keyed by role, in display order.
pub type MappedApplicants = BTreeMap<ApplicantRole, TransformedFieldSet>;

/// Result of mapping a whole batch.
#[derive(Debug, Clone, Default)]
pub struct MappedBatch {
    pub applicants: MappedApplicants,
    pub diagnostics: Vec<Diagnostic>,
}

/// Stateless mapper over an injected set of translation tables.
#[derive(Debug, Clone, Default)]
pub struct FormFieldMapper {
    translations: Translations,
}

impl FormFieldMapper {
    pub fn new(translations: Translations) -> Self {
        Self { translations }
    }

    /// Map one record. Keys absent from `record` stay absent in the output,
    /// except the full name and issuing authority which default to `""`.
    pub fn map(&self, role: ApplicantRole, record: &RawApplicantRecord) -> TransformedFieldSet {
        let mut out = TransformedFieldSet::new();

        let surname = text(record, "surname").unwrap_or_default();
        let given_names = text(record, "given_names").unwrap_or_default();
        out.insert(
            fields::FULL_NAME.to_string(),
            transform::full_name_japanese_order(&surname, &given_names),
        );

        if let Some(number) = first_text(record, &["passport_number", "card_number", "license_number"]) {
            out.insert(fields::PASSPORT_NUMBER.to_string(), number);
        }

        if let Some(date) = text(record, "date_of_birth") {
            out.insert(fields::DATE_OF_BIRTH.to_string(), transform::format_japanese_date(&date));
        }

        if let Some(nationality) = text(record, "nationality") {
            out.insert(
                fields::NATIONALITY.to_string(),
                self.translations.nationality.translate(&nationality),
            );
        }

        if let Some(place) = first_text(record, &["place_of_birth", "country_of_birth"]) {
            out.insert(fields::BIRTH_PLACE.to_string(), self.translations.place.translate(&place));
        }

        if let Some(sex) = text(record, "sex") {
            out.insert(fields::SEX.to_string(), sex.to_uppercase());
        }

        out.insert(
            fields::ISSUING_AUTHORITY.to_string(),
            transform::issuing_authority(text(record, "issuing_authority").as_deref()),
        );

        if let Some(date) = text(record, "date_of_issue") {
            out.insert(fields::ISSUE_DATE.to_string(), transform::format_japanese_date(&date));
        }

        if let Some(date) = text(record, "date_of_expiration") {
            out.insert(fields::EXPIRATION_DATE.to_string(), transform::format_japanese_date(&date));
        }

        log::debug!("Mapped {} into {} form fields", role, out.len());
        out
    }

    /// Map every member of a batch, skipping (and reporting) members that
    /// cannot be mapped without affecting the others.
    pub fn map_batch(&self, members: &Map<String, Value>) -> MappedBatch {
        let mut batch = MappedBatch::default();

        for (member, value) in members {
            let role = match member.parse::<ApplicantRole>() {
                Ok(role) => role,
                Err(_) => {
                    diagnostics::record(
                        &mut batch.diagnostics,
                        Diagnostic::UnknownMember {
                            member: member.clone(),
                        },
                    );
                    continue;
                }
            };

            let record = match value.as_object() {
                Some(record) if !record.is_empty() => record,
                _ => {
                    diagnostics::record(
                        &mut batch.diagnostics,
                        Diagnostic::MalformedApplicantRecord {
                            member: member.clone(),
                        },
                    );
                    continue;
                }
            };

            if let Some(error) = record.get("error") {
                diagnostics::record(
                    &mut batch.diagnostics,
                    Diagnostic::ExtractionFailed {
                        member: member.clone(),
                        filename: text(record, "filename"),
                        error: scalar_to_string(error).unwrap_or_default(),
                    },
                );
                continue;
            }

            batch.applicants.insert(role, self.map(role, record));
        }

        log::info!(
            "Mapped {} of {} members ({} skipped)",
            batch.applicants.len(),
            members.len(),
            batch.diagnostics.len()
        );
        batch
    }
}

/// Non-blank value for `key`, stringified if it is a scalar.
fn text(record: &RawApplicantRecord, key: &str) -> Option<String> {
    record
        .get(key)
        .and_then(scalar_to_string)
        .filter(|value| !value.trim().is_empty())
}

fn first_text(record: &RawApplicantRecord, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| text(record, key))
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
