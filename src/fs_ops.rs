//! File system access used by the rename and organize coordinators.
//!
//! All disk mutations go through [`FileOperations`]. [`LocalFileOperations`]
//! is the implementation used in production; tests can substitute their own
//! to simulate failures.

use crate::rule_engine::FileMetadata;
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

/// The file system operations a coordinator needs.
pub trait FileOperations {
    /// Whether anything exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Renames or moves a file. Implementations should fall back to copy and
    /// delete when a plain rename is not possible (e.g. across devices).
    fn move_file(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Creates a directory and any missing parents.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Removes a directory if it is empty. Returns whether it was removed.
    fn remove_dir_if_empty(&self, path: &Path) -> io::Result<bool>;

    /// Metadata used by rename rules.
    fn metadata(&self, path: &Path) -> FileMetadata;
}

/// [`FileOperations`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileOperations;

impl FileOperations for LocalFileOperations {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn move_file(&self, from: &Path, to: &Path) -> io::Result<()> {
        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(rename_err) => {
                if !from.is_file() {
                    return Err(rename_err);
                }
                debug!(
                    from = %from.display(),
                    to = %to.display(),
                    error = %rename_err,
                    "rename failed, falling back to copy"
                );
                copy_then_remove(from, to)
            }
        }
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn remove_dir_if_empty(&self, path: &Path) -> io::Result<bool> {
        if !path.is_dir() {
            return Ok(false);
        }
        if fs::read_dir(path)?.next().is_some() {
            return Ok(false);
        }
        fs::remove_dir(path)?;
        Ok(true)
    }

    fn metadata(&self, path: &Path) -> FileMetadata {
        FileMetadata::from_path(path)
    }
}

/// Copies `from` to `to`, checks the size, then removes `from`.
/// A short copy is deleted and the source is kept.
fn copy_then_remove(from: &Path, to: &Path) -> io::Result<()> {
    let source_size = fs::metadata(from)?.len();
    fs::copy(from, to)?;

    let dest_size = fs::metadata(to)?.len();
    if dest_size != source_size {
        let _ = fs::remove_file(to);
        return Err(io::Error::other(format!(
            "Copy verification failed: source {} bytes, dest {} bytes",
            source_size, dest_size
        )));
    }

    fs::remove_file(from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_move_file_renames() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let from = temp_dir.path().join("a.txt");
        let to = temp_dir.path().join("b.txt");
        fs::write(&from, "content").unwrap();

        LocalFileOperations.move_file(&from, &to).expect("Move failed");

        assert!(!from.exists());
        assert_eq!(fs::read_to_string(&to).unwrap(), "content");
    }

    #[test]
    fn test_move_missing_file_fails() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let result = LocalFileOperations.move_file(
            &temp_dir.path().join("missing.txt"),
            &temp_dir.path().join("b.txt"),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_copy_then_remove() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let from = temp_dir.path().join("a.bin");
        let to = temp_dir.path().join("b.bin");
        fs::write(&from, [1u8, 2, 3, 4]).unwrap();

        copy_then_remove(&from, &to).expect("Copy failed");

        assert!(!from.exists());
        assert_eq!(fs::read(&to).unwrap(), vec![1u8, 2, 3, 4]);
    }

    #[test]
    fn test_remove_dir_if_empty() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let ops = LocalFileOperations;

        let empty = temp_dir.path().join("empty");
        let full = temp_dir.path().join("full");
        fs::create_dir(&empty).unwrap();
        fs::create_dir(&full).unwrap();
        fs::write(full.join("x.txt"), "x").unwrap();

        assert!(ops.remove_dir_if_empty(&empty).unwrap());
        assert!(!empty.exists());
        assert!(!ops.remove_dir_if_empty(&full).unwrap());
        assert!(full.exists());
        assert!(!ops.remove_dir_if_empty(&temp_dir.path().join("missing")).unwrap());
    }
}
