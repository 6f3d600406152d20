/// Undo support for rename and organize runs.
///
/// Every applied run produces an [`UndoLog`]: the list of `(current, original)`
/// path pairs it created. Replaying the log in reverse order moves each file
/// back. A log is consumed by [`UndoManager::undo`], so a run can be undone at
/// most once.
///
/// The CLI keeps the log of the last run in a JSON history file inside the
/// directory it worked on, so `tidyren undo <dir>` can pick it up later.
use crate::fs_ops::FileOperations;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Name of the history file written next to the organized/renamed files.
pub const HISTORY_FILE_NAME: &str = ".tidyren_history.json";

/// Which kind of run produced a log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndoKind {
    Rename,
    Organize,
}

/// A single move to revert: the file now at `current_path` used to live at
/// `original_path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoLogEntry {
    pub current_path: PathBuf,
    pub original_path: PathBuf,
}

/// Everything needed to revert one applied run.
#[derive(Debug, Serialize, Deserialize)]
pub struct UndoLog {
    pub kind: UndoKind,
    /// RFC 3339 timestamp of the run.
    pub timestamp: String,
    pub entries: Vec<UndoLogEntry>,
    /// Directories the run created. Removed on undo if left empty.
    #[serde(default)]
    pub created_dirs: Vec<PathBuf>,
}

impl UndoLog {
    pub fn new(kind: UndoKind) -> Self {
        Self {
            kind,
            timestamp: chrono::Utc::now().to_rfc3339(),
            entries: Vec::new(),
            created_dirs: Vec::new(),
        }
    }

    /// Records that `original` now lives at `current`.
    pub fn record(&mut self, current: PathBuf, original: PathBuf) {
        self.entries.push(UndoLogEntry {
            current_path: current,
            original_path: original,
        });
    }

    pub fn record_created_dir(&mut self, dir: PathBuf) {
        self.created_dirs.push(dir);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn history_file_path(base_path: &Path) -> PathBuf {
        base_path.join(HISTORY_FILE_NAME)
    }

    /// Writes this log as the history of `base_path`, replacing any older one.
    pub fn save(&self, base_path: &Path) -> Result<(), HistoryError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| HistoryError::WriteFailed {
            source: io::Error::new(
                io::ErrorKind::InvalidData,
                format!("JSON serialization failed: {}", e),
            ),
        })?;

        fs::write(Self::history_file_path(base_path), json)
            .map_err(|source| HistoryError::WriteFailed { source })
    }

    /// Loads the history of `base_path`, if there is one.
    pub fn load(base_path: &Path) -> Result<Option<Self>, HistoryError> {
        let history_path = Self::history_file_path(base_path);
        if !history_path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&history_path)
            .map_err(|source| HistoryError::ReadFailed { source })?;

        serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| HistoryError::InvalidFormat {
                reason: format!("JSON parse error: {}", e),
            })
    }

    /// Deletes the history file of `base_path`.
    pub fn delete(base_path: &Path) -> Result<(), HistoryError> {
        let history_path = Self::history_file_path(base_path);
        if history_path.exists() {
            fs::remove_file(&history_path)
                .map_err(|source| HistoryError::WriteFailed { source })?;
        }
        Ok(())
    }
}

/// Errors around the persisted history file.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Invalid base path {path}: directory does not exist")]
    InvalidBasePath { path: PathBuf },

    #[error("No previous operation found to undo in {path}")]
    NoHistory { path: PathBuf },

    #[error("Failed to read history file: {source}")]
    ReadFailed { source: io::Error },

    #[error("Failed to write history file: {source}")]
    WriteFailed { source: io::Error },

    #[error("Invalid history file format: {reason}")]
    InvalidFormat { reason: String },
}

/// Outcome of replaying an undo log.
#[derive(Debug, Default)]
pub struct UndoReport {
    /// Files moved back to their original location.
    pub restored_files: usize,
    /// Files that could not be moved back, with the reason.
    pub failed_restores: Vec<(PathBuf, String)>,
    /// Files that were no longer where the log expected them.
    pub skipped_files: Vec<(PathBuf, String)>,
    /// Created directories removed because they ended up empty.
    pub removed_dirs: usize,
    retry: Vec<UndoLogEntry>,
}

impl UndoReport {
    /// Total number of log entries processed.
    pub fn total_processed(&self) -> usize {
        self.restored_files + self.failed_restores.len() + self.skipped_files.len()
    }

    /// Entries that did not come back, skipped ones included.
    pub fn failed(&self) -> usize {
        self.failed_restores.len() + self.skipped_files.len()
    }

    /// Returns true if every entry was restored.
    pub fn is_complete_success(&self) -> bool {
        self.failed_restores.is_empty() && self.skipped_files.is_empty()
    }
}

enum RestoreError {
    Missing(PathBuf, String),
    Failed(PathBuf, String),
}

/// Replays undo logs.
pub struct UndoManager;

impl UndoManager {
    /// Reverts a run by moving every file back, newest move first.
    ///
    /// Each entry is handled on its own: a failure is recorded in the report
    /// and the remaining entries are still processed.
    ///
    /// # Edge Cases Handled
    ///
    /// * **File not found**: Skipped with a note that the file couldn't be found
    /// * **File name conflict**: The conflicting file is backed up with a timestamp suffix
    /// * **Permission denied**: Recorded as a failure with the error reason
    pub fn undo<F: FileOperations>(log: UndoLog, ops: &F) -> UndoReport {
        info!(kind = ?log.kind, entries = log.len(), "undoing run");

        let mut report = UndoReport::default();
        for entry in log.entries.into_iter().rev() {
            match Self::restore_file(&entry, ops) {
                Ok(()) => report.restored_files += 1,
                Err(RestoreError::Missing(path, reason)) => {
                    warn!(path = %path.display(), "undo skipped: {}", reason);
                    report.skipped_files.push((path, reason));
                }
                Err(RestoreError::Failed(path, reason)) => {
                    warn!(path = %path.display(), "undo failed: {}", reason);
                    report.failed_restores.push((path, reason));
                    report.retry.push(entry);
                }
            }
        }

        // Deepest directories first so nested category folders can go too
        let mut dirs = log.created_dirs;
        dirs.sort_by_key(|d| std::cmp::Reverse(d.components().count()));
        for dir in dirs {
            match ops.remove_dir_if_empty(&dir) {
                Ok(true) => report.removed_dirs += 1,
                Ok(false) => {}
                Err(e) => debug!(dir = %dir.display(), error = %e, "could not remove directory"),
            }
        }

        report
    }

    /// Undoes the run recorded in the history file of `base_path`.
    ///
    /// The history file is deleted when everything was restored. Otherwise it
    /// is rewritten with only the entries that failed, so the user can fix the
    /// problem and retry.
    pub fn undo_from_history<F: FileOperations>(
        base_path: &Path,
        ops: &F,
    ) -> Result<UndoReport, HistoryError> {
        if !base_path.is_dir() {
            return Err(HistoryError::InvalidBasePath {
                path: base_path.to_path_buf(),
            });
        }

        let log = UndoLog::load(base_path)?.ok_or_else(|| HistoryError::NoHistory {
            path: base_path.to_path_buf(),
        })?;
        let kind = log.kind;
        let created_dirs = log.created_dirs.clone();

        let mut report = Self::undo(log, ops);

        if report.retry.is_empty() {
            if let Err(e) = UndoLog::delete(base_path) {
                warn!(error = %e, "could not delete history file");
            }
        } else {
            let mut remaining = UndoLog::new(kind);
            // Entries were collected newest first; store them oldest first again
            remaining.entries = std::mem::take(&mut report.retry);
            remaining.entries.reverse();
            // Folders still holding unrestored files are cleaned up on retry
            remaining.created_dirs = created_dirs.into_iter().filter(|d| ops.exists(d)).collect();
            remaining.save(base_path)?;
        }

        Ok(report)
    }

    fn restore_file<F: FileOperations>(entry: &UndoLogEntry, ops: &F) -> Result<(), RestoreError> {
        if !ops.exists(&entry.current_path) {
            return Err(RestoreError::Missing(
                entry.current_path.clone(),
                "File not found at expected location".to_string(),
            ));
        }

        let mut backup = None;
        if ops.exists(&entry.original_path) {
            let backup_path = Self::generate_backup_path(&entry.original_path);
            ops.move_file(&entry.original_path, &backup_path)
                .map_err(|e| {
                    RestoreError::Failed(
                        entry.original_path.clone(),
                        format!("Could not backup conflicting file: {}", e),
                    )
                })?;
            backup = Some(backup_path);
        }

        if let Some(parent) = entry.original_path.parent()
            && !ops.exists(parent)
        {
            ops.create_dir_all(parent).map_err(|e| {
                RestoreError::Failed(
                    entry.current_path.clone(),
                    format!("Could not recreate {}: {}", parent.display(), e),
                )
            })?;
        }

        ops.move_file(&entry.current_path, &entry.original_path)
            .map_err(|e| {
                // Put the conflicting file back where it was
                if let Some(backup_path) = &backup
                    && let Err(restore_err) = ops.move_file(backup_path, &entry.original_path)
                {
                    warn!(
                        backup = %backup_path.display(),
                        error = %restore_err,
                        "could not put backup back"
                    );
                }
                RestoreError::Failed(
                    entry.current_path.clone(),
                    format!("Failed to restore file: {}", e),
                )
            })
    }

    /// Generates a backup path for a file by appending a timestamp.
    ///
    /// Example: `file.txt` becomes `file.txt.bak.20251109-143052`
    fn generate_backup_path(original_path: &Path) -> PathBuf {
        let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let filename = original_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file");

        let backup_name = format!("{}.bak.{}", filename, timestamp);

        match original_path.parent() {
            Some(parent) => parent.join(backup_name),
            None => PathBuf::from(backup_name),
        }
    }
}
