//! Delivery package construction.
//!
//! A package is a ZIP holding `manifest.json` plus one text file per
//! succeeded task under `outputs/`. The manifest carries a SHA-256
//! checksum per entry so the ingestion service can verify the payload
//! it received.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use folio_core::types::DbId;
use folio_db::models::file_task::FileTask;
use folio_db::models::template::ChainTemplate;

/// One delivered file in the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Original input file path as scanned.
    pub source_path: String,
    /// Path of the output text inside the package.
    pub output_file: String,
    /// SHA-256 of the output text, hex-encoded.
    pub sha256: String,
}

/// The top-level delivery manifest for a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportManifest {
    pub job_id: DbId,
    pub template_name: String,
    pub template_version: i32,
    pub file_count: usize,
    pub entries: Vec<ManifestEntry>,
}

impl ExportManifest {
    /// Validate that the manifest is well-formed.
    ///
    /// Returns an empty `Vec` if valid; otherwise a list of
    /// human-readable errors.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.template_name.is_empty() {
            errors.push("Template name must not be empty".to_string());
        }
        if self.entries.is_empty() {
            errors.push("Manifest must include at least one entry".to_string());
        }
        if self.file_count != self.entries.len() {
            errors.push(format!(
                "file_count {} does not match {} entries",
                self.file_count,
                self.entries.len()
            ));
        }

        for entry in &self.entries {
            if entry.source_path.is_empty() {
                errors.push("Entry has an empty source path".to_string());
            }
            if entry.output_file.is_empty() {
                errors.push(format!("{}: output file path is missing", entry.source_path));
            }
            if entry.sha256.len() != 64 {
                errors.push(format!("{}: malformed sha256 checksum", entry.source_path));
            }
        }

        errors
    }
}

/// Why a package could not be built.
#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error("I/O error writing package: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Failed to encode manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("Task {0} has no recorded output")]
    MissingOutput(DbId),
}

/// A built package on disk.
#[derive(Debug, Clone)]
pub struct BuiltPackage {
    pub path: PathBuf,
    pub manifest: ExportManifest,
}

/// Builds delivery packages from succeeded tasks.
pub struct PackageBuilder;

impl PackageBuilder {
    /// Hex-encoded SHA-256 of a byte slice.
    pub fn sha256_hex(bytes: &[u8]) -> String {
        let digest = Sha256::digest(bytes);
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Output path inside the package for one task.
    fn output_file_name(task: &FileTask) -> String {
        let stem = Path::new(&task.file_path)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("output");
        format!("outputs/{stem}_{}.txt", task.id)
    }

    /// Build the package ZIP for one export.
    ///
    /// Synchronous (file I/O and compression); callers run it on a
    /// blocking thread. Every task must be succeeded with an output;
    /// anything else is a caller bug surfaced as
    /// [`PackageError::MissingOutput`].
    pub fn build(
        package_dir: &Path,
        export_id: DbId,
        job_id: DbId,
        template: &ChainTemplate,
        tasks: &[FileTask],
    ) -> Result<BuiltPackage, PackageError> {
        std::fs::create_dir_all(package_dir)?;
        let path = package_dir.join(format!("job_{job_id}_export_{export_id}.zip"));

        let mut entries = Vec::with_capacity(tasks.len());
        let mut outputs = Vec::with_capacity(tasks.len());
        for task in tasks {
            let text = task
                .output_text
                .as_deref()
                .ok_or(PackageError::MissingOutput(task.id))?;
            let output_file = Self::output_file_name(task);
            entries.push(ManifestEntry {
                source_path: task.file_path.clone(),
                output_file: output_file.clone(),
                sha256: Self::sha256_hex(text.as_bytes()),
            });
            outputs.push((output_file, text.to_string()));
        }

        let manifest = ExportManifest {
            job_id,
            template_name: template.name.clone(),
            template_version: template.version,
            file_count: entries.len(),
            entries,
        };

        let file = File::create(&path)?;
        let mut writer = ZipWriter::new(file);
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        writer.start_file("manifest.json", options)?;
        writer.write_all(serde_json::to_string_pretty(&manifest)?.as_bytes())?;

        for (output_file, text) in &outputs {
            writer.start_file(output_file.as_str(), options)?;
            writer.write_all(text.as_bytes())?;
        }

        writer.finish()?;

        Ok(BuiltPackage { path, manifest })
    }
}
