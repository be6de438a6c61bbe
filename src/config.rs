//! Runtime configuration, resolved once at startup and passed into the
//! services that need it.

use std::env;
use std::path::PathBuf;

const DEFAULT_MAPPING_CONFIG: &str = "pdf_config/visa_form_mapping.json";
const DEFAULT_TEMPLATE_DIR: &str = "template_file";
const DEFAULT_OUTPUT_DIR: &str = "generated_forms";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub mapping_config: PathBuf,
    pub template_dir: PathBuf,
    pub output_dir: PathBuf,
    pub host: String,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mapping_config: PathBuf::from(DEFAULT_MAPPING_CONFIG),
            template_dir: PathBuf::from(DEFAULT_TEMPLATE_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl AppConfig {
    /// Read the configuration from the environment (and `.env`, if present).
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match value("PORT") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                log::warn!("Invalid PORT '{}', using default {}", raw, DEFAULT_PORT);
                DEFAULT_PORT
            }),
            None => defaults.port,
        };

        Self {
            mapping_config: value("VISA_MAPPING_CONFIG")
                .map(PathBuf::from)
                .unwrap_or(defaults.mapping_config),
            template_dir: value("VISA_TEMPLATE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.template_dir),
            output_dir: value("VISA_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            host: value("HOST").unwrap_or(defaults.host),
            port,
        }
    }
}
