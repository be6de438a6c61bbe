//! Word document and email text summarising every applicant.
//!
//! Output depends only on the mapped applicants (and, for the Word
//! package, a caller-supplied timestamp), so the same batch always reads
//! the same.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::docx::{self, Block};
use super::mapper::{fields, MappedApplicants, TransformedFieldSet};
use super::role::ApplicantRole;
use super::ComposeError;

const PRIMARY_HEADING: &str = "主たる申請者";
const ACCOMPANYING_HEADING: &str = "同行家族";
const NAME_LABEL: &str = "名前：";
const PASSPORT_LABEL: &str = "パスポート番号：";
const BIRTH_DATE_LABEL: &str = "生年月日：";
const SUBJECT_PREFIX: &str = "ビザ申請書類提出 - ";
const SUBJECT_PLACEHOLDER: &str = "Applicant";
const DOCUMENT_TITLE: &str = "重複プロファイル解消のお願い";

const REQUEST_LINES: [&str; 4] = [
    "ビザ面接の予約をしようとしたところ、以下のメッセージが表示されました。",
    "「あなたの個人情報は、当社のデータベースに既に存在するプロファイルと一致します。」",
    "しかし、古いプロファイルのログイン情報がわからず、現在予約手続きを進められない状況です。",
    "お手数ですが、古いプロファイルを削除いただけますようお願い申し上げます。",
];

const DOCUMENT_CLOSING: [&str; 3] = [
    "※ 全員分のパスポートのコピーを添付しております。",
    "お忙しいところ恐れ入りますが、至急ご対応いただけますと幸いです。",
    "どうぞよろしくお願い申し上げます。",
];

const EMAIL_OPENING: [&str; 4] = [
    "ご担当者様",
    "",
    "ビザ申請に必要な書類を提出させていただきます。",
    "",
];

const EMAIL_CLOSING: [&str; 4] = [
    "※ 全員分のパスポートのコピーを添付してください。",
    "",
    "お忙しいところ恐れ入りますが、至急ご対応いただけますと幸いです。",
    "どうぞよろしくお願い申し上げます。",
];

/// Subject and body of the outbound email draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub subject: String,
    pub body: String,
}

/// One applicant's block in the document and email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicantSection {
    pub heading: String,
    pub lines: [String; 3],
}

/// Sections in display order: primary first, then accompanying members by
/// ascending index. Absent or empty records produce no section.
pub fn applicant_sections(applicants: &MappedApplicants) -> Vec<ApplicantSection> {
    applicants
        .iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(role, values)| ApplicantSection {
            heading: section_heading(*role),
            lines: [
                labelled(NAME_LABEL, values, fields::FULL_NAME),
                labelled(PASSPORT_LABEL, values, fields::PASSPORT_NUMBER),
                labelled(BIRTH_DATE_LABEL, values, fields::DATE_OF_BIRTH),
            ],
        })
        .collect()
}

fn section_heading(role: ApplicantRole) -> String {
    match role {
        ApplicantRole::Primary => PRIMARY_HEADING.to_string(),
        ApplicantRole::Accompanying(index) => {
            format!("{}{}", ACCOMPANYING_HEADING, kanji_numeral(index))
        }
    }
}

fn kanji_numeral(index: u8) -> String {
    const NUMERALS: [&str; 7] = ["一", "二", "三", "四", "五", "六", "七"];
    usize::from(index)
        .checked_sub(1)
        .and_then(|i| NUMERALS.get(i))
        .map(|numeral| numeral.to_string())
        .unwrap_or_else(|| index.to_string())
}

fn labelled(label: &str, values: &TransformedFieldSet, key: &str) -> String {
    format!("{}{}", label, values.get(key).map(String::as_str).unwrap_or(""))
}

/// Stateless composer for the Word document and email draft.
pub struct DocumentComposer;

impl DocumentComposer {
    /// Paragraph/heading layout of the Word document.
    pub fn document_blocks(applicants: &MappedApplicants) -> Vec<Block> {
        let mut blocks = vec![Block::Paragraph(DOCUMENT_TITLE.to_string())];
        blocks.extend(REQUEST_LINES.iter().map(|line| Block::Paragraph(line.to_string())));

        for section in applicant_sections(applicants) {
            blocks.push(Block::Heading(section.heading));
            blocks.extend(section.lines.into_iter().map(Block::Paragraph));
        }

        blocks.extend(DOCUMENT_CLOSING.iter().map(|line| Block::Paragraph(line.to_string())));
        blocks
    }

    /// Write the Word document to `output`.
    pub fn compose_document(
        applicants: &MappedApplicants,
        output: &Path,
        generated_at: DateTime<Utc>,
    ) -> Result<PathBuf, ComposeError> {
        let blocks = Self::document_blocks(applicants);
        docx::write_document(&blocks, generated_at, output)?;
        log::info!("Wrote {} ({} blocks)", output.display(), blocks.len());
        Ok(output.to_path_buf())
    }

    pub fn compose_message(applicants: &MappedApplicants) -> EmailMessage {
        let primary_name = applicants
            .get(&ApplicantRole::Primary)
            .and_then(|values| values.get(fields::FULL_NAME))
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .unwrap_or(SUBJECT_PLACEHOLDER);

        let mut lines: Vec<String> = EMAIL_OPENING.iter().map(|line| line.to_string()).collect();
        lines.push(DOCUMENT_TITLE.to_string());
        lines.extend(REQUEST_LINES.iter().map(|line| line.to_string()));
        lines.push(String::new());
        lines.push("【申請者情報】".to_string());
        lines.push(String::new());

        for section in applicant_sections(applicants) {
            lines.push(format!("■ {}", section.heading));
            lines.extend(section.lines);
            lines.push(String::new());
        }

        lines.extend(EMAIL_CLOSING.iter().map(|line| line.to_string()));

        EmailMessage {
            subject: format!("{}{}", SUBJECT_PREFIX, primary_name),
            body: lines.join("\n"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn applicant(name: &str, number: Option<&str>, birth: Option<&str>) -> TransformedFieldSet {
        let mut values = TransformedFieldSet::new();
        values.insert(fields::FULL_NAME.to_string(), name.to_string());
        if let Some(number) = number {
            values.insert(fields::PASSPORT_NUMBER.to_string(), number.to_string());
        }
        if let Some(birth) = birth {
            values.insert(fields::DATE_OF_BIRTH.to_string(), birth.to_string());
        }
        values
    }

    #[test]
    fn test_sections_skip_missing_indices() {
        let mut applicants = MappedApplicants::new();
        applicants.insert(ApplicantRole::Accompanying(3), applicant("SMITH JANE", None, None));
        applicants.insert(ApplicantRole::Primary, applicant("SMITH JOHN", Some("A1"), None));

        let sections = applicant_sections(&applicants);
        let headings: Vec<_> = sections.iter().map(|s| s.heading.as_str()).collect();
        assert_eq!(headings, vec!["主たる申請者", "同行家族三"]);
    }

    #[test]
    fn test_missing_values_keep_labels() {
        let mut applicants = MappedApplicants::new();
        applicants.insert(ApplicantRole::Primary, applicant("SMITH JOHN", None, None));

        let sections = applicant_sections(&applicants);
        assert_eq!(
            sections[0].lines,
            [
                "名前：SMITH JOHN".to_string(),
                "パスポート番号：".to_string(),
                "生年月日：".to_string(),
            ]
        );
    }

    #[test]
    fn test_empty_record_has_no_section() {
        let mut applicants = MappedApplicants::new();
        applicants.insert(ApplicantRole::Primary, applicant("SMITH JOHN", None, None));
        applicants.insert(ApplicantRole::Accompanying(1), TransformedFieldSet::new());

        assert_eq!(applicant_sections(&applicants).len(), 1);
        let message = DocumentComposer::compose_message(&applicants);
        assert!(!message.body.contains("同行家族"));
    }

    #[test]
    fn test_message_subject() {
        let mut applicants = MappedApplicants::new();
        applicants.insert(ApplicantRole::Primary, applicant("SMITH JOHN", Some("A1"), Some("1990年05月15日")));

        let message = DocumentComposer::compose_message(&applicants);
        assert_eq!(message.subject, "ビザ申請書類提出 - SMITH JOHN");
        assert!(message.body.contains("■ 主たる申請者\n名前：SMITH JOHN\nパスポート番号：A1\n生年月日：1990年05月15日"));
        assert_eq!(message, DocumentComposer::compose_message(&applicants));
    }

    #[test]
    fn test_message_subject_placeholder() {
        let mut applicants = MappedApplicants::new();
        applicants.insert(ApplicantRole::Accompanying(1), applicant("DOE JANE", None, None));
        assert_eq!(
            DocumentComposer::compose_message(&applicants).subject,
            "ビザ申請書類提出 - Applicant"
        );

        applicants.insert(ApplicantRole::Primary, applicant("", None, None));
        assert_eq!(
            DocumentComposer::compose_message(&applicants).subject,
            "ビザ申請書類提出 - Applicant"
        );
    }

    #[test]
    fn test_document_blocks_layout() {
        let mut applicants = MappedApplicants::new();
        applicants.insert(ApplicantRole::Primary, applicant("SMITH JOHN", Some("A1"), None));

        let blocks = DocumentComposer::document_blocks(&applicants);
        let headings: Vec<_> = blocks
            .iter()
            .filter_map(|block| match block {
                Block::Heading(text) => Some(text.as_str()),
                Block::Paragraph(_) => None,
            })
            .collect();
        assert_eq!(headings, vec!["主たる申請者"]);
        assert_eq!(blocks.first(), Some(&Block::Paragraph(DOCUMENT_TITLE.to_string())));
    }
}
