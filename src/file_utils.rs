use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::xliff::{DocumentVersion, Xliff, detect_version, parse_xliff};

// @module: File and bundle utilities

/// Extension of interchange documents
pub const XLIFF_EXTENSION: &str = "xliff";

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    /// Find files with a specific extension in a directory, sorted by path
    pub fn find_files<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Vec<PathBuf>> {
        let mut result = Vec::new();
        let extension = extension.trim_start_matches('.');

        for entry in WalkDir::new(dir.as_ref()).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if path.is_file() {
                if let Some(ext) = path.extension() {
                    if ext.to_string_lossy().eq_ignore_ascii_case(extension) {
                        result.push(path.to_path_buf());
                    }
                }
            }
        }

        result.sort();
        Ok(result)
    }

    /// Every interchange document under a bundle directory
    pub fn find_bundle_documents<P: AsRef<Path>>(bundle: P) -> Result<Vec<PathBuf>> {
        let bundle = bundle.as_ref();
        if !Self::dir_exists(bundle) {
            return Err(anyhow::anyhow!("Bundle directory does not exist: {:?}", bundle));
        }
        Self::find_files(bundle, XLIFF_EXTENSION)
    }

    /// Path of `path` relative to `base`, or `path` itself when it is not below `base`
    pub fn relative_path<'a>(base: &Path, path: &'a Path) -> &'a Path {
        path.strip_prefix(base).unwrap_or(path)
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        // Ensure the parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Read a current-dialect document.
    ///
    /// Returns `None` for a legacy document, which bundle workflows skip.
    pub fn read_document<P: AsRef<Path>>(path: P) -> Result<Option<Xliff>> {
        let path = path.as_ref();
        let text = Self::read_to_string(path)?;
        let version = detect_version(&text)
            .with_context(|| format!("Failed to read document: {:?}", path))?;
        if version == DocumentVersion::Legacy {
            return Ok(None);
        }
        let doc = parse_xliff(&text)
            .with_context(|| format!("Failed to parse document: {:?}", path))?;
        Ok(Some(doc))
    }

    /// Write a document only when its serialization changed.
    ///
    /// Returns true when the file was written.
    pub fn write_document<P: AsRef<Path>>(path: P, doc: &Xliff) -> Result<bool> {
        let path = path.as_ref();
        let text = doc.to_xml_string();
        if Self::file_exists(path) && Self::read_to_string(path)? == text {
            return Ok(false);
        }
        Self::write_to_file(path, &text)?;
        Ok(true)
    }
}
