//! tidyren - batch renaming and directory organization with preview and undo
//!
//! This library provides two file-management engines:
//! - a batch-rename pipeline: ordered, composable rules applied to many file
//!   names at once, previewed with conflict detection before anything moves;
//! - an auto-organizer that sorts files into category folders by extension.
//!
//! Both apply in two phases (dry-run preview, then execute) and hand back an
//! [`UndoLog`] that reverts the run.

pub mod batch_rename;
pub mod cli;
pub mod config;
pub mod conflict;
pub mod file_category;
pub mod file_organizer;
pub mod fs_ops;
pub mod output;
pub mod rename_rule;
pub mod rule_engine;
pub mod scan;
pub mod undo;

pub use batch_rename::{BatchRenameCoordinator, RenameError, RenamePreviewItem, RenameReport};
pub use config::{CompiledFilters, Config, ConfigError};
pub use conflict::{ConflictDetector, ConflictInfo};
pub use file_category::{Category, FileMapper, classify};
pub use file_organizer::{OrganizationPlan, OrganizeError, OrganizeReport, OrganizerCoordinator};
pub use fs_ops::{FileOperations, LocalFileOperations};
pub use rename_rule::{RenameRule, RuleAction};
pub use rule_engine::{FileMetadata, RenameRuleEngine, apply_rules};
pub use undo::{UndoLog, UndoManager, UndoReport};

pub use cli::{Command, run_cli};

/// Installs the global `tracing` subscriber, logging to stderr.
///
/// `RUST_LOG` selects what is logged; `verbose` forces debug output for this
/// crate. Calling it twice is harmless.
pub fn init_tracing(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("tidyren=debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
