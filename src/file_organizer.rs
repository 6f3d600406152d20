/// Auto-organizer: sorts files into category folders.
///
/// Organizing is split in two phases. [`OrganizerCoordinator::analyze`] is a
/// dry run that classifies every file and works out where it would go.
/// [`OrganizerCoordinator::apply`] then creates the category folders and
/// moves the files, renaming on collision (`photo.jpg` becomes `photo_1.jpg`).
/// The resulting [`UndoLog`] reverts the run.
use crate::file_category::{Category, FileMapper};
use crate::fs_ops::{FileOperations, LocalFileOperations};
use crate::rule_engine::split_name;
use crate::undo::{UndoKind, UndoLog, UndoManager, UndoReport};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that stop an organize run before any file is moved.
#[derive(Debug, Error)]
pub enum OrganizeError {
    #[error("Destination {path} exists and is not a directory")]
    DestinationNotDirectory { path: PathBuf },

    #[error("Failed to create destination {path}: {source}")]
    CreateDestination { path: PathBuf, source: io::Error },
}

/// Result type for organize operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Where category folders are created.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Destination {
    /// A category folder next to each source file.
    #[default]
    AlongsideSource,
    /// All category folders under one root.
    Root(PathBuf),
}

impl Destination {
    fn folder_for(&self, source: &Path, category: Category) -> PathBuf {
        let base = match self {
            Destination::AlongsideSource => source.parent().unwrap_or(Path::new("")),
            Destination::Root(root) => root.as_path(),
        };
        base.join(category.name())
    }

    /// True when `source` already sits in the folder for `category`.
    fn already_holds(&self, source: &Path, category: Category) -> bool {
        let Some(parent) = source.parent() else {
            return false;
        };
        match self {
            Destination::AlongsideSource => {
                parent.file_name().is_some_and(|name| name == category.name())
            }
            Destination::Root(root) => parent == root.join(category.name()),
        }
    }
}

/// Organizer options.
#[derive(Debug, Clone)]
pub struct OrganizeOptions {
    pub destination: Destination,
    /// Sniff content when the extension does not identify the file.
    pub detect_content: bool,
}

impl Default for OrganizeOptions {
    fn default() -> Self {
        Self {
            destination: Destination::AlongsideSource,
            detect_content: true,
        }
    }
}

/// One file the plan will move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedMove {
    pub source: PathBuf,
    pub destination_dir: PathBuf,
    pub category: Category,
    pub size: u64,
}

/// Files of one category going to one folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrganizationCategory {
    pub name: String,
    pub destination_folder: PathBuf,
    pub file_count: usize,
    pub total_size: u64,
    pub files: Vec<PathBuf>,
}

/// Result of a dry-run analysis.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OrganizationPlan {
    /// Grouped view, ordered by category then folder.
    pub categories: Vec<OrganizationCategory>,
    /// Moves in input order.
    pub moves: Vec<PlannedMove>,
}

impl OrganizationPlan {
    pub fn total_files(&self) -> usize {
        self.moves.len()
    }

    pub fn total_size(&self) -> u64 {
        self.moves.iter().map(|m| m.size).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Number of files per category name.
    pub fn category_counts(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for category in &self.categories {
            *counts.entry(category.name.clone()).or_insert(0) += category.file_count;
        }
        counts
    }
}

/// Result of applying a plan.
#[derive(Debug)]
pub struct OrganizeReport {
    pub moved: usize,
    pub failed: usize,
    /// Files that could not be moved, with the reason.
    pub failures: Vec<(PathBuf, String)>,
    pub folders_created: usize,
    pub undo_log: UndoLog,
}

impl OrganizeReport {
    /// Aggregate status line, e.g. `Moved 4, failed 1`.
    pub fn summary(&self) -> String {
        format!("Moved {}, failed {}", self.moved, self.failed)
    }
}

/// Classifies files and moves them into category folders.
pub struct OrganizerCoordinator<F: FileOperations = LocalFileOperations> {
    ops: F,
    mapper: FileMapper,
    options: OrganizeOptions,
}

impl OrganizerCoordinator<LocalFileOperations> {
    pub fn new(mapper: FileMapper, options: OrganizeOptions) -> Self {
        Self::with_ops(LocalFileOperations, mapper, options)
    }
}

impl<F: FileOperations> OrganizerCoordinator<F> {
    pub fn with_ops(ops: F, mapper: FileMapper, options: OrganizeOptions) -> Self {
        Self {
            ops,
            mapper,
            options,
        }
    }

    /// Category of one file: its extension first, then its content.
    pub fn classify_file(&self, path: &Path) -> Category {
        let ext = path.extension().map(|e| e.to_string_lossy().to_string());

        if let Some(category) = ext.as_deref().and_then(|e| self.mapper.extension_to_category(e)) {
            return category;
        }

        let detected = if self.options.detect_content {
            detect_extension(path)
        } else {
            None
        };
        self.mapper.categorize(ext.as_deref(), detected.as_deref())
    }

    /// Plans where every file goes without touching the disk.
    ///
    /// Files already sitting in their category folder are left out, so
    /// analyzing an organized directory yields an empty plan.
    pub fn analyze(&self, files: &[PathBuf]) -> OrganizationPlan {
        let mut moves = Vec::new();
        let mut groups: BTreeMap<(Category, PathBuf), OrganizationCategory> = BTreeMap::new();

        for source in files {
            let category = self.classify_file(source);
            if self.options.destination.already_holds(source, category) {
                debug!(file = %source.display(), "already organized");
                continue;
            }

            let destination_dir = self.options.destination.folder_for(source, category);

            let size = self.ops.metadata(source).size;

            let group = groups
                .entry((category, destination_dir.clone()))
                .or_insert_with(|| OrganizationCategory {
                    name: category.name().to_string(),
                    destination_folder: destination_dir.clone(),
                    file_count: 0,
                    total_size: 0,
                    files: Vec::new(),
                });
            group.file_count += 1;
            group.total_size += size;
            group.files.push(source.clone());

            moves.push(PlannedMove {
                source: source.clone(),
                destination_dir,
                category,
                size,
            });
        }

        let plan = OrganizationPlan {
            categories: groups.into_values().collect(),
            moves,
        };
        info!(
            files = plan.total_files(),
            categories = plan.categories.len(),
            "organize plan computed"
        );
        plan
    }

    /// Moves every planned file, creating category folders as needed.
    ///
    /// Per-file failures are counted and do not stop the run.
    /// `on_progress` receives `(done, total)` after each file.
    ///
    /// # Errors
    ///
    /// Fails without moving anything if the destination root cannot be used.
    pub fn apply<P>(
        &self,
        plan: &OrganizationPlan,
        mut on_progress: P,
    ) -> OrganizeResult<OrganizeReport>
    where
        P: FnMut(usize, usize),
    {
        let total = plan.moves.len();
        let mut undo_log = UndoLog::new(UndoKind::Organize);
        let mut failures = Vec::new();
        let mut ready_dirs: HashSet<PathBuf> = HashSet::new();

        if let Destination::Root(root) = &self.options.destination
            && !plan.is_empty()
        {
            self.prepare_root(root, &mut undo_log)?;
            ready_dirs.insert(root.clone());
        }

        for (done, planned) in plan.moves.iter().enumerate() {
            match self.move_one(planned, &mut ready_dirs, &mut undo_log) {
                Ok(target) => {
                    debug!(
                        from = %planned.source.display(),
                        to = %target.display(),
                        "moved"
                    );
                    undo_log.record(target, planned.source.clone());
                }
                Err(reason) => {
                    warn!(file = %planned.source.display(), "move failed: {}", reason);
                    failures.push((planned.source.clone(), reason));
                }
            }
            on_progress(done + 1, total);
        }

        let report = OrganizeReport {
            moved: undo_log.len(),
            failed: failures.len(),
            failures,
            folders_created: undo_log.created_dirs.len(),
            undo_log,
        };
        info!("{}", report.summary());
        Ok(report)
    }

    fn prepare_root(&self, root: &Path, undo_log: &mut UndoLog) -> OrganizeResult<()> {
        if self.ops.exists(root) {
            if !root.is_dir() {
                return Err(OrganizeError::DestinationNotDirectory {
                    path: root.to_path_buf(),
                });
            }
            return Ok(());
        }

        self.ops
            .create_dir_all(root)
            .map_err(|source| OrganizeError::CreateDestination {
                path: root.to_path_buf(),
                source,
            })?;
        undo_log.record_created_dir(root.to_path_buf());
        Ok(())
    }

    fn move_one(
        &self,
        planned: &PlannedMove,
        ready_dirs: &mut HashSet<PathBuf>,
        undo_log: &mut UndoLog,
    ) -> Result<PathBuf, String> {
        if !self.ops.exists(&planned.source) {
            return Err("Source file not found".to_string());
        }

        let dir = &planned.destination_dir;
        if !ready_dirs.contains(dir) {
            if !self.ops.exists(dir) {
                self.ops
                    .create_dir_all(dir)
                    .map_err(|e| format!("Failed to create {}: {}", dir.display(), e))?;
                undo_log.record_created_dir(dir.clone());
            }
            ready_dirs.insert(dir.clone());
        }

        let file_name = planned
            .source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| "File has no name component".to_string())?;
        let target = unique_destination(dir, &file_name, |p| self.ops.exists(p));

        self.ops
            .move_file(&planned.source, &target)
            .map_err(|e| e.to_string())?;
        Ok(target)
    }

    /// Reverts an applied run. The log is consumed.
    pub fn undo(&self, undo_log: UndoLog) -> UndoReport {
        UndoManager::undo(undo_log, &self.ops)
    }
}

/// First free path for `file_name` in `dir`: the name itself, then
/// `stem_1.ext`, `stem_2.ext`, ...
pub fn unique_destination<E>(dir: &Path, file_name: &str, exists: E) -> PathBuf
where
    E: Fn(&Path) -> bool,
{
    let candidate = dir.join(file_name);
    if !exists(&candidate) {
        return candidate;
    }

    let (stem, ext) = split_name(file_name);
    (1u32..)
        .map(|n| dir.join(format!("{}_{}{}", stem, n, ext)))
        .find(|p| !exists(p))
        .unwrap_or(candidate)
}

/// Extension implied by the file's content, if recognizable.
fn detect_extension(path: &Path) -> Option<String> {
    match infer::get_from_path(path) {
        Ok(Some(kind)) => Some(kind.extension().to_string()),
        Ok(None) => None,
        Err(e) => {
            debug!(file = %path.display(), error = %e, "content detection failed");
            None
        }
    }
}
