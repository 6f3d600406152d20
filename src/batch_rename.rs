//! Batch rename: preview a rule pipeline over many files, apply it, undo it.
//!
//! A batch always goes through a dry-run preview first. The preview lists the
//! proposed name of every file together with its conflict status, and apply
//! refuses to run while the preview is stale or contains conflicts.
//!
//! ```text
//! Idle -> Previewing -> Previewed -> Applying -> Applied | PartiallyFailed
//! Applied | PartiallyFailed -> Undoing -> Idle
//! ```
//!
//! Changing the file list or the rules drops the preview and returns the
//! coordinator to `Idle`.

use crate::conflict::{ConflictDetector, ProposedName, is_same_file};
use crate::fs_ops::{FileOperations, LocalFileOperations};
use crate::rename_rule::RenameRule;
use crate::rule_engine::RenameRuleEngine;
use crate::undo::{UndoKind, UndoLog, UndoManager, UndoReport};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Proposed outcome for one file of the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenamePreviewItem {
    pub original_path: PathBuf,
    pub original_name: String,
    pub new_name: String,
    pub new_path: PathBuf,
    pub has_conflict: bool,
    pub conflict_reason: Option<String>,
    /// False when the rules leave the name untouched.
    pub will_change: bool,
}

/// Result of applying a batch.
#[derive(Debug)]
pub struct RenameReport {
    pub renamed: usize,
    pub failed: usize,
    /// Files that could not be renamed, with the reason.
    pub failures: Vec<(PathBuf, String)>,
    /// Log of the renames that happened, for [`BatchRenameCoordinator::undo`].
    pub undo_log: UndoLog,
}

impl RenameReport {
    /// Aggregate status line, e.g. `Renamed 4, failed 1`.
    pub fn summary(&self) -> String {
        format!("Renamed {}, failed {}", self.renamed, self.failed)
    }
}

/// Where a coordinator is in its preview/apply/undo cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameState {
    Idle,
    Previewing,
    Previewed,
    Applying,
    Applied,
    PartiallyFailed,
    Undoing,
}

/// Errors that stop a batch before any file is touched.
#[derive(Debug, Error)]
pub enum RenameError {
    #[error("No current preview: preview the batch before applying")]
    NotPreviewed,

    #[error("{count} file(s) have naming conflicts; resolve them before applying")]
    Conflicts { count: usize },

    #[error("Cannot {action} while the batch is {state:?}")]
    InvalidState {
        action: &'static str,
        state: RenameState,
    },
}

/// Result type for batch rename operations.
pub type RenameResult<T> = Result<T, RenameError>;

/// Computes the proposed names for `files` without touching the disk beyond
/// metadata reads and existence checks.
pub fn preview_batch<F: FileOperations>(
    files: &[PathBuf],
    rules: &[RenameRule],
    ops: &F,
) -> Vec<RenamePreviewItem> {
    let mut engine = RenameRuleEngine::new(rules);

    let proposed: Vec<ProposedName> = files
        .iter()
        .map(|path| {
            let original_name = file_name_of(path);
            let new_name = engine.apply(&original_name, &ops.metadata(path));
            let new_path = match path.parent() {
                Some(parent) => parent.join(&new_name),
                None => PathBuf::from(&new_name),
            };
            ProposedName {
                original_path: path.clone(),
                new_path,
                new_name,
            }
        })
        .collect();

    let conflicts = ConflictDetector::detect_ordered(&proposed);

    let items: Vec<RenamePreviewItem> = proposed
        .into_iter()
        .zip(conflicts)
        .map(|(proposal, conflict)| {
            let original_name = file_name_of(&proposal.original_path);
            RenamePreviewItem {
                will_change: proposal.new_name != original_name,
                original_name,
                original_path: proposal.original_path,
                new_name: proposal.new_name,
                new_path: proposal.new_path,
                has_conflict: conflict.has_conflict,
                conflict_reason: conflict.reason,
            }
        })
        .collect();

    info!(
        files = items.len(),
        changes = items.iter().filter(|i| i.will_change).count(),
        conflicts = conflict_count(&items),
        "rename preview computed"
    );

    items
}

/// Renames every changing item of a preview.
///
/// Refuses to start if any item has a conflict. Per-file failures are
/// counted in the report and do not stop the batch.
pub fn apply_batch<F, P>(
    items: &[RenamePreviewItem],
    ops: &F,
    mut on_progress: P,
) -> RenameResult<RenameReport>
where
    F: FileOperations,
    P: FnMut(usize, usize),
{
    let conflicts = conflict_count(items);
    if conflicts > 0 {
        return Err(RenameError::Conflicts { count: conflicts });
    }

    let changing: Vec<&RenamePreviewItem> = items.iter().filter(|i| i.will_change).collect();
    let total = changing.len();

    let mut undo_log = UndoLog::new(UndoKind::Rename);
    let mut failures = Vec::new();

    for (done, item) in changing.into_iter().enumerate() {
        match rename_one(item, ops) {
            Ok(()) => {
                debug!(
                    from = %item.original_path.display(),
                    to = %item.new_path.display(),
                    "renamed"
                );
                undo_log.record(item.new_path.clone(), item.original_path.clone());
            }
            Err(reason) => {
                warn!(path = %item.original_path.display(), "rename failed: {}", reason);
                failures.push((item.original_path.clone(), reason));
            }
        }
        on_progress(done + 1, total);
    }

    let report = RenameReport {
        renamed: undo_log.len(),
        failed: failures.len(),
        failures,
        undo_log,
    };
    info!("{}", report.summary());
    Ok(report)
}

fn rename_one<F: FileOperations>(item: &RenamePreviewItem, ops: &F) -> Result<(), String> {
    if !ops.exists(&item.original_path) {
        return Err("File no longer exists".to_string());
    }

    // The disk may have changed since the preview; never overwrite.
    // A case-only rename on a case-insensitive volume sees itself as the target.
    if ops.exists(&item.new_path) && !is_same_file(&item.original_path, &item.new_path) {
        return Err(format!("{} already exists", item.new_path.display()));
    }

    ops.move_file(&item.original_path, &item.new_path)
        .map_err(|e| e.to_string())
}

/// Number of items flagged as conflicting.
pub fn conflict_count(items: &[RenamePreviewItem]) -> usize {
    items.iter().filter(|i| i.has_conflict).count()
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Holds the files and rules of one batch and walks it through
/// preview, apply and undo.
pub struct BatchRenameCoordinator<F: FileOperations = LocalFileOperations> {
    ops: F,
    files: Vec<PathBuf>,
    rules: Vec<RenameRule>,
    preview: Option<Vec<RenamePreviewItem>>,
    state: RenameState,
}

impl BatchRenameCoordinator<LocalFileOperations> {
    /// Creates a coordinator working on the local file system.
    pub fn new() -> Self {
        Self::with_ops(LocalFileOperations)
    }
}

impl Default for BatchRenameCoordinator<LocalFileOperations> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: FileOperations> BatchRenameCoordinator<F> {
    pub fn with_ops(ops: F) -> Self {
        Self {
            ops,
            files: Vec::new(),
            rules: Vec::new(),
            preview: None,
            state: RenameState::Idle,
        }
    }

    pub fn state(&self) -> RenameState {
        self.state
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn rules(&self) -> &[RenameRule] {
        &self.rules
    }

    /// Replaces the selected files. Drops any preview.
    pub fn set_files(&mut self, files: Vec<PathBuf>) {
        self.files = files;
        self.invalidate();
    }

    /// Replaces the rule list. Drops any preview.
    pub fn set_rules(&mut self, rules: Vec<RenameRule>) {
        self.rules = rules;
        self.invalidate();
    }

    /// Enables or disables one rule. Drops any preview.
    pub fn set_rule_enabled(&mut self, index: usize, enabled: bool) {
        if let Some(rule) = self.rules.get_mut(index) {
            rule.enabled = enabled;
            self.invalidate();
        }
    }

    fn invalidate(&mut self) {
        self.preview = None;
        self.state = RenameState::Idle;
    }

    fn ensure_not_busy(&self, action: &'static str) -> RenameResult<()> {
        match self.state {
            RenameState::Previewing | RenameState::Applying | RenameState::Undoing => {
                Err(RenameError::InvalidState {
                    action,
                    state: self.state,
                })
            }
            _ => Ok(()),
        }
    }

    /// Computes a fresh preview of the current files and rules.
    pub fn preview(&mut self) -> RenameResult<&[RenamePreviewItem]> {
        self.ensure_not_busy("preview")?;
        self.state = RenameState::Previewing;

        let items = preview_batch(&self.files, &self.rules, &self.ops);
        self.state = RenameState::Previewed;
        Ok(self.preview.insert(items).as_slice())
    }

    /// The current preview, if it is still valid.
    pub fn current_preview(&self) -> Option<&[RenamePreviewItem]> {
        self.preview.as_deref()
    }

    /// Conflicts in the current preview. Zero when there is no preview.
    pub fn conflict_count(&self) -> usize {
        self.preview.as_deref().map(conflict_count).unwrap_or(0)
    }

    /// Applies the current preview.
    pub fn apply(&mut self) -> RenameResult<RenameReport> {
        self.apply_with_progress(|_, _| {})
    }

    /// Applies the current preview, reporting `(done, total)` after each file.
    pub fn apply_with_progress<P>(&mut self, on_progress: P) -> RenameResult<RenameReport>
    where
        P: FnMut(usize, usize),
    {
        self.ensure_not_busy("apply")?;
        if self.state != RenameState::Previewed {
            return Err(RenameError::NotPreviewed);
        }
        let items = self.preview.as_deref().ok_or(RenameError::NotPreviewed)?;

        self.state = RenameState::Applying;
        match apply_batch(items, &self.ops, on_progress) {
            Ok(report) => {
                // The files moved, so the old preview no longer describes the disk
                self.preview = None;
                self.state = if report.failed == 0 {
                    RenameState::Applied
                } else {
                    RenameState::PartiallyFailed
                };
                Ok(report)
            }
            Err(e) => {
                self.state = RenameState::Previewed;
                Err(e)
            }
        }
    }

    /// Reverts an applied batch. The log is consumed.
    pub fn undo(&mut self, undo_log: UndoLog) -> RenameResult<UndoReport> {
        if !matches!(
            self.state,
            RenameState::Applied | RenameState::PartiallyFailed
        ) {
            return Err(RenameError::InvalidState {
                action: "undo",
                state: self.state,
            });
        }

        self.state = RenameState::Undoing;
        let report = UndoManager::undo(undo_log, &self.ops);
        self.state = RenameState::Idle;
        Ok(report)
    }
}
