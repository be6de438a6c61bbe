//! Value transformations from extracted passport values to the conventions
//! the Japanese visa form expects.
//!
//! None of these functions fail: input they cannot interpret is passed
//! through unchanged.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use std::collections::HashMap;

const NATIONALITIES: [(&str, &str); 5] = [
    ("UNITED STATES", "アメリカ合衆国"),
    ("JAPAN", "日本"),
    ("UNITED KINGDOM", "イギリス"),
    ("CANADA", "カナダ"),
    ("AUSTRALIA", "オーストラリア"),
];

const PLACES: [(&str, &str); 3] = [
    ("UNITED STATES", "アメリカ合衆国"),
    ("CALIFORNIA", "カリフォルニア州"),
    ("NEW YORK", "ニューヨーク州"),
];

lazy_static! {
    static ref DEFAULT_TRANSLATIONS: Translations = Translations {
        nationality: TranslationTable::from_pairs(NATIONALITIES),
        place: TranslationTable::from_pairs(PLACES),
    };
}

/// Case-insensitive lookup table with verbatim pass-through on a miss.
#[derive(Debug, Clone, Default)]
pub struct TranslationTable {
    entries: HashMap<String, String>,
}

impl TranslationTable {
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(key, value)| (normalize_key(key.as_ref()), value.into()))
                .collect(),
        }
    }

    pub fn translate(&self, value: &str) -> String {
        self.entries
            .get(&normalize_key(value))
            .cloned()
            .unwrap_or_else(|| value.to_string())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize_key(value: &str) -> String {
    value.trim().to_uppercase()
}

/// Translation tables used by the mapper, built once at startup.
#[derive(Debug, Clone)]
pub struct Translations {
    pub nationality: TranslationTable,
    pub place: TranslationTable,
}

impl Default for Translations {
    fn default() -> Self {
        DEFAULT_TRANSLATIONS.clone()
    }
}

/// Format an ISO `YYYY-MM-DD` date as `YYYY年MM月DD日`.
///
/// Values without a `-` separator, or that do not parse as a calendar date,
/// are returned unchanged.
pub fn format_japanese_date(iso_date: &str) -> String {
    if !iso_date.contains('-') {
        return iso_date.to_string();
    }

    match NaiveDate::parse_from_str(iso_date.trim(), "%Y-%m-%d") {
        Ok(date) => date.format("%Y年%m月%d日").to_string(),
        Err(e) => {
            log::debug!("Leaving unparseable date '{}' as-is: {}", iso_date, e);
            iso_date.to_string()
        }
    }
}

/// Surname first, both upper-cased, joined by a single space.
pub fn full_name_japanese_order(surname: &str, given_names: &str) -> String {
    format!(
        "{} {}",
        surname.trim().to_uppercase(),
        given_names.trim().to_uppercase()
    )
    .trim()
    .to_string()
}

/// Upper-cased issuing authority, or an empty string when absent.
pub fn issuing_authority(authority: Option<&str>) -> String {
    authority.map(|a| a.trim().to_uppercase()).unwrap_or_default()
}
