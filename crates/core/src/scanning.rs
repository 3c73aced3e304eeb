//! File-type allow-list and pure helpers for the folder scanner.
//!
//! The I/O walker lives in `folio-pipeline`; this module only decides
//! which files count as scannable documents.

use std::path::Path;

// ── Constants ────────────────────────────────────────────────────────

/// Scanned-page image extensions recognised by the scanner.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff", "bmp", "webp", "jp2"];

/// Document container extensions.
pub const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "djvu"];

/// All supported input file extensions (union of the above).
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "tif", "tiff", "bmp", "webp", "jp2", // images
    "pdf", "djvu", // documents
];

// ── Pure functions ───────────────────────────────────────────────────

/// Extract the lowercase extension of a path, without the dot.
pub fn file_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Whether a path's extension is on the supported allow-list.
pub fn is_supported_file(path: &Path) -> bool {
    file_extension(path)
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(
            file_extension(&PathBuf::from("scan/Page_001.TIF")),
            Some("tif".to_string())
        );
    }

    #[test]
    fn supported_extensions_accepted() {
        assert!(is_supported_file(&PathBuf::from("a.png")));
        assert!(is_supported_file(&PathBuf::from("b.jpeg")));
        assert!(is_supported_file(&PathBuf::from("c.pdf")));
        assert!(is_supported_file(&PathBuf::from("nested/dir/d.TIFF")));
    }

    #[test]
    fn unsupported_extensions_rejected() {
        assert!(!is_supported_file(&PathBuf::from("notes.txt")));
        assert!(!is_supported_file(&PathBuf::from("archive.zip")));
        assert!(!is_supported_file(&PathBuf::from("Thumbs.db")));
    }

    #[test]
    fn extensionless_files_rejected() {
        assert!(!is_supported_file(&PathBuf::from("README")));
        assert_eq!(file_extension(&PathBuf::from("README")), None);
    }

    #[test]
    fn allow_list_is_the_union() {
        for ext in IMAGE_EXTENSIONS.iter().chain(DOCUMENT_EXTENSIONS) {
            assert!(SUPPORTED_EXTENSIONS.contains(ext), "{ext} missing");
        }
        assert_eq!(
            SUPPORTED_EXTENSIONS.len(),
            IMAGE_EXTENSIONS.len() + DOCUMENT_EXTENSIONS.len()
        );
    }
}
