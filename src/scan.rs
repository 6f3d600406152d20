//! Turns command-line paths into the list of files to work on.

use crate::config::CompiledFilters;
use crate::undo::HISTORY_FILE_NAME;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Failed to read directory {path}: {source}")]
    ReadDirectory { path: PathBuf, source: io::Error },
}

/// Lists the top-level regular files of `dir` that pass `filters`, sorted by
/// name. The undo history file is never listed.
pub fn scan_directory(dir: &Path, filters: &CompiledFilters) -> Result<Vec<PathBuf>, ScanError> {
    let entries = fs::read_dir(dir).map_err(|source| ScanError::ReadDirectory {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files: Vec<PathBuf> = entries
        .flatten()
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .is_some_and(|name| name != HISTORY_FILE_NAME)
        })
        .filter(|path| filters.should_include(path))
        .collect();

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    debug!(dir = %dir.display(), files = files.len(), "scanned directory");
    Ok(files)
}

/// Expands a mix of file and directory arguments.
///
/// Files are taken as given, in argument order; directories contribute their
/// filtered top-level files. A path listed twice is kept once.
pub fn collect_files(paths: &[PathBuf], filters: &CompiledFilters) -> Result<Vec<PathBuf>, ScanError> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for path in paths {
        let found = if path.is_dir() {
            scan_directory(path, filters)?
        } else if path.is_file() {
            vec![path.clone()]
        } else {
            return Err(ScanError::NotFound { path: path.clone() });
        };

        for file in found {
            if seen.insert(file.clone()) {
                files.push(file);
            }
        }
    }

    Ok(files)
}
