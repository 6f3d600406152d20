//! Conflict detection for proposed rename targets.
//!
//! A target conflicts when an earlier item of the same batch already claimed
//! it, or when a different file already sits at that path on disk. The batch
//! is walked in input order and the first claimant wins.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Reason reported for a target that is already taken.
pub const NAME_EXISTS: &str = "Name already exists";

/// Reason reported for a target name the file system cannot hold.
pub const INVALID_NAME: &str = "Invalid file name";

/// One proposed rename handed to the detector.
#[derive(Debug, Clone)]
pub struct ProposedName {
    pub original_path: PathBuf,
    pub new_path: PathBuf,
    pub new_name: String,
}

/// Conflict status for one proposed rename.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConflictInfo {
    pub has_conflict: bool,
    pub reason: Option<String>,
}

impl ConflictInfo {
    fn clear() -> Self {
        Self::default()
    }

    fn conflict(reason: &str) -> Self {
        Self {
            has_conflict: true,
            reason: Some(reason.to_string()),
        }
    }
}

/// Checks proposed rename targets against each other and against the disk.
pub struct ConflictDetector;

impl ConflictDetector {
    /// Returns the conflict status of every proposal, keyed by original path.
    pub fn detect(proposed: &[ProposedName]) -> HashMap<PathBuf, ConflictInfo> {
        Self::detect_ordered(proposed)
            .into_iter()
            .zip(proposed)
            .map(|(info, item)| (item.original_path.clone(), info))
            .collect()
    }

    /// Same as [`detect`](Self::detect) but returns results in input order.
    pub fn detect_ordered(proposed: &[ProposedName]) -> Vec<ConflictInfo> {
        let mut used_targets: HashSet<String> = HashSet::new();

        proposed
            .iter()
            .map(|item| {
                if !is_valid_file_name(&item.new_name) {
                    return ConflictInfo::conflict(INVALID_NAME);
                }

                // Claim the target first so later duplicates are flagged even
                // if this item is itself in conflict with the disk.
                let key = target_key(&item.new_path);
                if !used_targets.insert(key) {
                    return ConflictInfo::conflict(NAME_EXISTS);
                }

                let original_name = item
                    .original_path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();

                if item.new_name != original_name
                    && item.new_path.exists()
                    && !is_same_file(&item.original_path, &item.new_path)
                {
                    return ConflictInfo::conflict(NAME_EXISTS);
                }

                ConflictInfo::clear()
            })
            .collect()
    }
}

/// Case-insensitive identity of a target path.
fn target_key(path: &Path) -> String {
    path.to_string_lossy().to_lowercase()
}

/// Rejects names that would escape the directory or cannot be created.
pub fn is_valid_file_name(name: &str) -> bool {
    !name.trim().is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

/// True when both paths resolve to the same file, e.g. a case-only rename
/// on a case-insensitive file system.
pub fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
