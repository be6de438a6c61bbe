//! Generated files in the shared output directory.
//!
//! Names start with a sortable timestamp and carry the job id, so a job's
//! files can be found by id while "latest by name" still works.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const ARTIFACT_STEM: &str = "japanese_visa_form";
const DOWNLOAD_STEM: &str = "japanese_visa_application";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Pdf,
    Word,
}

impl ArtifactKind {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Word => "docx",
        }
    }

    /// Parse the `{format}` segment of a download URL.
    pub fn from_format(format: &str) -> Option<Self> {
        match format.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "word" | "docx" => Some(Self::Word),
            _ => None,
        }
    }

    fn matches(&self, path: &Path) -> bool {
        path.extension().and_then(|ext| ext.to_str()) == Some(self.extension())
    }
}

/// A file produced for one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedArtifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ensure_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir)
    }

    /// Reserve the output path for a job's artifact.
    pub fn allocate(&self, job_id: Uuid, kind: ArtifactKind, created_at: DateTime<Utc>) -> GeneratedArtifact {
        GeneratedArtifact {
            kind,
            path: self.dir.join(artifact_file_name(job_id, kind, created_at)),
            created_at,
        }
    }

    /// The artifact of `kind` generated for `job_id`, if it still exists.
    pub fn find(&self, job_id: Uuid, kind: ArtifactKind) -> io::Result<Option<PathBuf>> {
        let marker = format!("_{}_", job_id);
        Ok(self
            .list(kind)?
            .into_iter()
            .find(|path| file_name(path).is_some_and(|name| name.contains(&marker))))
    }

    /// Lexicographically last artifact of `kind`, i.e. the most recent one.
    ///
    /// Under concurrent requests this may belong to another job; prefer
    /// [`ArtifactStore::find`].
    pub fn latest(&self, kind: ArtifactKind) -> io::Result<Option<PathBuf>> {
        let mut paths = self.list(kind)?;
        paths.sort();
        Ok(paths.pop())
    }

    fn list(&self, kind: ArtifactKind) -> io::Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && kind.matches(&path) {
                paths.push(path);
            }
        }
        Ok(paths)
    }
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|name| name.to_str())
}

/// `20250102_030405_123456_<job>_japanese_visa_form.pdf`
pub fn artifact_file_name(job_id: Uuid, kind: ArtifactKind, created_at: DateTime<Utc>) -> String {
    format!(
        "{}_{:06}_{}_{}.{}",
        created_at.format("%Y%m%d_%H%M%S"),
        created_at.timestamp_subsec_micros(),
        job_id,
        ARTIFACT_STEM,
        kind.extension()
    )
}

/// Filename offered to the browser when downloading.
pub fn download_file_name(kind: ArtifactKind, now: DateTime<Utc>) -> String {
    format!("{}_{}.{}", DOWNLOAD_STEM, now.format("%Y%m%d_%H%M%S"), kind.extension())
}
