//! Command-line interface module for tidyren.
//!
//! This module handles everything between the parsed command line and the
//! library:
//! - Building a rule pipeline from presets, rules files and flags
//! - Rename preview/apply with the undo history written afterwards
//! - Organize analysis/apply
//! - Undo from the history file
//! - Preset listing and extension classification
//!
//! ## Usage
//! ```bash
//! # Preview a rename
//! tidyren rename ~/Photos --find IMG_ --replace Vacation_ --dry-run
//!
//! # Number files and lowercase them
//! tidyren rename ~/Photos --counter --counter-padding 3 --case lower
//!
//! # Sort a directory into category folders, then revert it
//! tidyren organize ~/Downloads
//! tidyren undo ~/Downloads
//! ```

use crate::batch_rename::BatchRenameCoordinator;
use crate::config::{Config, load_rules_file};
use crate::file_organizer::{Destination, OrganizeOptions, OrganizerCoordinator};
use crate::fs_ops::LocalFileOperations;
use crate::output::OutputFormatter;
use crate::rename_rule::{CaseType, Position, RenameRule, RuleAction};
use crate::scan::{collect_files, scan_directory};
use crate::undo::{UndoLog, UndoManager};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// tidyren - batch rename and organize files, with preview and undo
#[derive(Parser, Debug)]
#[command(name = "tidyren")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Show debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (default: ./.tidyrenrc.toml, then ~/.config/tidyren/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Rename files through an ordered rule pipeline
    Rename(RenameArgs),

    /// Move files into category folders
    Organize {
        /// Directory to organize
        dir: PathBuf,

        /// Root for the category folders (default: inside DIR)
        #[arg(long)]
        dest: Option<PathBuf>,

        /// Show the plan without moving anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Revert the last rename or organize run in a directory
    Undo {
        /// Directory holding the history file
        dir: PathBuf,
    },

    /// List the rename presets from the configuration
    Presets,

    /// Show the category of file extensions
    Classify {
        #[arg(required = true)]
        extensions: Vec<String>,
    },
}

/// Arguments of `tidyren rename`.
///
/// Rules from `--preset` run first, then those of `--rules`, then the flag
/// rules in the order their flags are listed here.
#[derive(Args, Debug)]
pub struct RenameArgs {
    /// Files or directories to rename (directories contribute their files)
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Text to find
    #[arg(long)]
    pub find: Option<String>,

    /// Replacement for --find
    #[arg(long, default_value = "")]
    pub replace: String,

    /// Treat --find as a regular expression ($1 and ${name} expand in --replace)
    #[arg(long)]
    pub regex: bool,

    /// Match --find and --remove case-sensitively
    #[arg(long)]
    pub case_sensitive: bool,

    /// Text to delete from names
    #[arg(long)]
    pub remove: Option<String>,

    /// Text to put before names
    #[arg(long)]
    pub prefix: Option<String>,

    /// Text to put after names (before the extension)
    #[arg(long)]
    pub suffix: Option<String>,

    /// Insert a running number
    #[arg(long)]
    pub counter: bool,

    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub counter_start: i64,

    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub counter_step: i64,

    /// Minimum digits, zero padded
    #[arg(long, default_value_t = 0)]
    pub counter_padding: usize,

    #[arg(long, default_value = "")]
    pub counter_prefix: String,

    #[arg(long, default_value = "")]
    pub counter_suffix: String,

    #[arg(long, value_enum, default_value_t = PositionArg::Suffix)]
    pub counter_position: PositionArg,

    /// Change the case of names
    #[arg(long, value_enum)]
    pub case: Option<CaseArg>,

    /// New extension (empty string removes it)
    #[arg(long)]
    pub ext: Option<String>,

    /// Insert the modification date, strftime FORMAT (e.g. %Y-%m-%d)
    #[arg(long, value_name = "FORMAT")]
    pub date: Option<String>,

    #[arg(long, value_enum, default_value_t = PositionArg::Prefix)]
    pub date_position: PositionArg,

    /// Start from a preset defined in the configuration
    #[arg(long)]
    pub preset: Option<String>,

    /// Start from a TOML file of [[rules]]
    #[arg(long, value_name = "FILE")]
    pub rules: Option<PathBuf>,

    /// Show the preview without renaming anything
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PositionArg {
    Prefix,
    Suffix,
}

impl From<PositionArg> for Position {
    fn from(position: PositionArg) -> Self {
        match position {
            PositionArg::Prefix => Position::Prefix,
            PositionArg::Suffix => Position::Suffix,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CaseArg {
    Upper,
    Lower,
    Title,
}

impl From<CaseArg> for CaseType {
    fn from(case: CaseArg) -> Self {
        match case {
            CaseArg::Upper => CaseType::Upper,
            CaseArg::Lower => CaseType::Lower,
            CaseArg::Title => CaseType::Title,
        }
    }
}

/// Runs a command with the default configuration lookup.
///
/// # Examples
///
/// ```no_run
/// use tidyren::cli::{Command, run_cli};
/// use std::path::PathBuf;
///
/// let result = run_cli(&Command::Undo { dir: PathBuf::from("/path/to/directory") });
/// if let Err(e) = result {
///     eprintln!("Error: {}", e);
/// }
/// ```
pub fn run_cli(command: &Command) -> Result<(), String> {
    run_cli_with_config(command, None)
}

/// Runs a command, reading configuration from `config_path` when given.
pub fn run_cli_with_config(command: &Command, config_path: Option<&Path>) -> Result<(), String> {
    match command {
        Command::Rename(args) => rename_files(args, &load_config(config_path)?),
        Command::Organize { dir, dest, dry_run } => {
            organize_directory(dir, dest.as_deref(), *dry_run, &load_config(config_path)?)
        }
        Command::Undo { dir } => undo_last_run(dir),
        Command::Presets => list_presets(&load_config(config_path)?),
        Command::Classify { extensions } => classify_extensions(extensions, &load_config(config_path)?),
    }
}

fn load_config(config_path: Option<&Path>) -> Result<Config, String> {
    Config::load(config_path).map_err(|e| format!("Error loading configuration: {}", e))
}

fn absolute(path: &Path) -> Result<PathBuf, String> {
    std::path::absolute(path).map_err(|e| format!("Invalid path {}: {}", path.display(), e))
}

/// Assembles the rule pipeline for a rename: preset rules, then rules-file
/// rules, then one rule per flag.
pub fn build_rules(args: &RenameArgs, config: &Config) -> Result<Vec<RenameRule>, String> {
    let mut rules = Vec::new();

    if let Some(name) = &args.preset {
        let preset = config.preset(name).map_err(|e| e.to_string())?;
        append_after(&mut rules, preset.rules.clone());
    }

    if let Some(path) = &args.rules {
        let loaded = load_rules_file(path)
            .map_err(|e| format!("Error loading rules from {}: {}", path.display(), e))?;
        append_after(&mut rules, loaded);
    }

    let flag_rules = flag_actions(args)
        .into_iter()
        .enumerate()
        .map(|(order, action)| RenameRule::new(order as i32, action))
        .collect();
    append_after(&mut rules, flag_rules);

    Ok(rules)
}

/// Appends `added`, shifting its orders so it runs after everything in
/// `rules` while keeping its own relative order.
fn append_after(rules: &mut Vec<RenameRule>, added: Vec<RenameRule>) {
    let Some(max) = rules.iter().map(|r| r.order).max() else {
        rules.extend(added);
        return;
    };
    let base = max.saturating_add(1);
    let min = added.iter().map(|r| r.order).min().unwrap_or(0);

    rules.extend(added.into_iter().map(|rule| {
        let order = base.saturating_add(rule.order.saturating_sub(min));
        rule.with_order(order)
    }));
}

fn flag_actions(args: &RenameArgs) -> Vec<RuleAction> {
    let mut actions = Vec::new();

    if let Some(find) = &args.find {
        actions.push(RuleAction::FindReplace {
            find_text: find.clone(),
            replace_text: args.replace.clone(),
            use_regex: args.regex,
            case_sensitive: args.case_sensitive,
        });
    }
    if let Some(text) = &args.remove {
        actions.push(RuleAction::RemoveText {
            text: text.clone(),
            case_sensitive: args.case_sensitive,
        });
    }
    if let Some(text) = &args.prefix {
        actions.push(RuleAction::AddText {
            text: text.clone(),
            position: Position::Prefix,
        });
    }
    if let Some(text) = &args.suffix {
        actions.push(RuleAction::AddText {
            text: text.clone(),
            position: Position::Suffix,
        });
    }
    if args.counter {
        actions.push(RuleAction::Counter {
            start: args.counter_start,
            step: args.counter_step,
            padding: args.counter_padding,
            prefix: args.counter_prefix.clone(),
            suffix: args.counter_suffix.clone(),
            position: args.counter_position.into(),
        });
    }
    if let Some(case) = args.case {
        actions.push(RuleAction::ChangeCase { case: case.into() });
    }
    if let Some(extension) = &args.ext {
        actions.push(RuleAction::ChangeExtension {
            extension: extension.clone(),
        });
    }
    if let Some(format) = &args.date {
        actions.push(RuleAction::DateTime {
            format: format.clone(),
            position: args.date_position.into(),
        });
    }

    actions
}

/// Directory whose history file records a rename: the directory argument if
/// exactly one was given, otherwise the parent of the first file.
fn history_base(paths: &[PathBuf], files: &[PathBuf]) -> Option<PathBuf> {
    if let [only] = paths
        && only.is_dir()
    {
        return Some(only.clone());
    }
    files.first().and_then(|f| f.parent()).map(Path::to_path_buf)
}

fn save_history(log: &UndoLog, base: &Path) {
    match log.save(base) {
        Ok(()) => OutputFormatter::plain(&format!(
            "History saved. Use 'tidyren undo {}' to revert changes.",
            base.display()
        )),
        Err(e) => {
            OutputFormatter::warning(&format!("Could not save history: {}", e));
            OutputFormatter::warning("Undo will not be available for this run.");
        }
    }
}

/// Previews and (unless `--dry-run`) applies a rename batch.
fn rename_files(args: &RenameArgs, config: &Config) -> Result<(), String> {
    let filters = config
        .compile_filters()
        .map_err(|e| format!("Error compiling filters: {}", e))?;
    let paths = args
        .paths
        .iter()
        .map(|p| absolute(p))
        .collect::<Result<Vec<_>, _>>()?;
    let files = collect_files(&paths, &filters).map_err(|e| e.to_string())?;

    if files.is_empty() {
        OutputFormatter::warning("No files found to rename.");
        return Ok(());
    }

    let rules = build_rules(args, config)?;
    if rules.is_empty() {
        return Err(
            "No rename rules given: use rule flags such as --find, --preset or --rules".to_string(),
        );
    }
    debug!(rules = rules.len(), files = files.len(), "starting rename");

    let base = history_base(&paths, &files);
    let mut coordinator = BatchRenameCoordinator::new();
    coordinator.set_files(files);
    coordinator.set_rules(rules);

    let preview = coordinator.preview().map_err(|e| e.to_string())?;
    let changing = preview.iter().filter(|item| item.will_change).count();
    OutputFormatter::header("PREVIEW");
    OutputFormatter::rename_preview(preview);

    if args.dry_run {
        OutputFormatter::dry_run_notice("No files were renamed.");
        return Ok(());
    }

    if changing == 0 {
        OutputFormatter::info("Nothing to rename.");
        return Ok(());
    }

    let pb = OutputFormatter::create_progress_bar(changing as u64);
    let result = coordinator.apply_with_progress(|done, _| pb.set_position(done as u64));
    pb.finish_and_clear();
    let report = result.map_err(|e| e.to_string())?;

    if report.failed == 0 {
        OutputFormatter::success(&report.summary());
    } else {
        OutputFormatter::warning(&report.summary());
        OutputFormatter::failures(&report.failures);
    }

    if !report.undo_log.is_empty()
        && let Some(base) = base
    {
        save_history(&report.undo_log, &base);
    }

    Ok(())
}

/// Sorts the files of `dir` into category folders.
fn organize_directory(
    dir: &Path,
    dest: Option<&Path>,
    dry_run: bool,
    config: &Config,
) -> Result<(), String> {
    let dir = absolute(dir)?;
    if !dir.is_dir() {
        return Err(format!("Not a directory: {}", dir.display()));
    }

    let filters = config
        .compile_filters()
        .map_err(|e| format!("Error compiling filters: {}", e))?;
    let mapper = config
        .organize
        .file_mapper()
        .map_err(|e| format!("Error loading configuration: {}", e))?;

    let destination = match dest.or(config.organize.destination.as_deref()) {
        Some(root) => Destination::Root(absolute(root)?),
        None => Destination::AlongsideSource,
    };

    let files = scan_directory(&dir, &filters).map_err(|e| e.to_string())?;
    let organizer = OrganizerCoordinator::new(
        mapper,
        OrganizeOptions {
            destination,
            detect_content: config.organize.detect_content,
        },
    );

    if dry_run {
        OutputFormatter::dry_run_notice(&format!("Analyzing contents of: {}", dir.display()));
    } else {
        OutputFormatter::info(&format!("Organizing contents of: {}", dir.display()));
    }

    let plan = organizer.analyze(&files);
    if plan.is_empty() {
        OutputFormatter::info("No files found to organize.");
        return Ok(());
    }

    OutputFormatter::header("PLAN");
    OutputFormatter::organize_plan(&plan);

    if dry_run {
        OutputFormatter::summary_table(&plan.category_counts(), plan.total_files());
        OutputFormatter::dry_run_notice("No files were moved.");
        return Ok(());
    }

    let pb = OutputFormatter::create_progress_bar(plan.total_files() as u64);
    let result = organizer.apply(&plan, |done, _| pb.set_position(done as u64));
    pb.finish_and_clear();
    let report = result.map_err(|e| e.to_string())?;

    OutputFormatter::summary_table(&plan.category_counts(), plan.total_files());
    if report.failed == 0 {
        OutputFormatter::success(&report.summary());
    } else {
        OutputFormatter::warning(&report.summary());
        OutputFormatter::failures(&report.failures);
    }

    if !report.undo_log.is_empty() {
        save_history(&report.undo_log, &dir);
    }

    Ok(())
}

/// Undoes the run recorded in the history file of `dir`.
fn undo_last_run(dir: &Path) -> Result<(), String> {
    let dir = absolute(dir)?;
    OutputFormatter::info("Undoing previous run...");

    let report = UndoManager::undo_from_history(&dir, &LocalFileOperations)
        .map_err(|e| e.to_string())?;
    info!(restored = report.restored_files, "undo finished");

    OutputFormatter::success("Undo complete!");
    OutputFormatter::plain(&format!("  Restored: {}", report.restored_files));
    if report.removed_dirs > 0 {
        OutputFormatter::plain(&format!("  Removed empty folders: {}", report.removed_dirs));
    }

    if !report.skipped_files.is_empty() {
        OutputFormatter::warning(&format!("Skipped: {}", report.skipped_files.len()));
        for (path, reason) in &report.skipped_files {
            OutputFormatter::plain(&format!("    - {}: {}", path.display(), reason));
        }
    }

    if !report.failed_restores.is_empty() {
        OutputFormatter::error(&format!("Failed: {}", report.failed_restores.len()));
        OutputFormatter::failures(&report.failed_restores);
        OutputFormatter::warning("The failed entries were kept in the history file.");
        OutputFormatter::warning("Fix the issues above and run undo again.");
    }

    Ok(())
}

fn list_presets(config: &Config) -> Result<(), String> {
    if config.presets.is_empty() {
        OutputFormatter::info("No presets configured.");
        return Ok(());
    }

    for preset in &config.presets {
        match &preset.description {
            Some(description) => OutputFormatter::header(&format!("{} - {}", preset.name, description)),
            None => OutputFormatter::header(&preset.name),
        }
        for (index, rule) in preset.rules.iter().enumerate() {
            OutputFormatter::plain(&format!("  {}. {}", index + 1, rule.describe()));
        }
    }

    Ok(())
}

fn classify_extensions(extensions: &[String], config: &Config) -> Result<(), String> {
    let mapper = config
        .organize
        .file_mapper()
        .map_err(|e| format!("Error loading configuration: {}", e))?;

    for ext in extensions {
        let category = mapper.categorize(Some(ext), None);
        OutputFormatter::plain(&format!(
            "{:<10} {:<14} {}",
            ext,
            category.name(),
            category.description()
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_rename(args: &[&str]) -> RenameArgs {
        let argv = ["tidyren", "rename"].iter().chain(args.iter());
        match Cli::try_parse_from(argv).expect("Failed to parse arguments").command {
            Command::Rename(args) => args,
            other => panic!("Expected rename command, got {:?}", other),
        }
    }

    #[test]
    fn test_flag_rules_follow_listed_order() {
        let args = parse_rename(&[
            "photos",
            "--ext",
            "jpeg",
            "--find",
            "IMG_",
            "--replace",
            "Trip_",
            "--case",
            "lower",
            "--counter",
        ]);

        let rules = build_rules(&args, &Config::default()).unwrap();
        let kinds: Vec<&RuleAction> = rules.iter().map(|r| &r.action).collect();

        assert!(matches!(kinds[0], RuleAction::FindReplace { .. }));
        assert!(matches!(kinds[1], RuleAction::Counter { .. }));
        assert!(matches!(kinds[2], RuleAction::ChangeCase { case: CaseType::Lower }));
        assert!(matches!(kinds[3], RuleAction::ChangeExtension { .. }));
        assert_eq!(rules.iter().map(|r| r.order).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_counter_defaults() {
        let args = parse_rename(&["photos", "--counter"]);
        let rules = build_rules(&args, &Config::default()).unwrap();

        assert_eq!(
            rules[0].action,
            RuleAction::Counter {
                start: 1,
                step: 1,
                padding: 0,
                prefix: String::new(),
                suffix: String::new(),
                position: Position::Suffix,
            }
        );
    }

    #[test]
    fn test_preset_rules_run_before_flags() {
        let config = Config::parse(
            r#"
            [[presets]]
            name = "trip"

            [[presets.rules]]
            type = "add_text"
            order = 5
            text = "A_"

            [[presets.rules]]
            type = "add_text"
            order = 7
            text = "B_"
            "#,
        )
        .unwrap();
        let args = parse_rename(&["photos", "--preset", "trip", "--suffix", "_x"]);

        let rules = build_rules(&args, &config).unwrap();
        assert_eq!(rules.iter().map(|r| r.order).collect::<Vec<_>>(), vec![5, 7, 8]);
        assert!(matches!(
            &rules[2].action,
            RuleAction::AddText { position: Position::Suffix, .. }
        ));
    }

    #[test]
    fn test_unknown_preset_is_an_error() {
        let args = parse_rename(&["photos", "--preset", "nope"]);
        let err = build_rules(&args, &Config::default()).unwrap_err();
        assert!(err.contains("nope"));
    }

    #[test]
    fn test_append_after_shifts_orders() {
        let mut rules = vec![RenameRule::find_replace("a", "b").with_order(3)];
        append_after(
            &mut rules,
            vec![
                RenameRule::find_replace("c", "d").with_order(-2),
                RenameRule::find_replace("e", "f").with_order(0),
            ],
        );
        assert_eq!(rules.iter().map(|r| r.order).collect::<Vec<_>>(), vec![3, 4, 6]);
    }

    #[test]
    fn test_append_after_saturates_extreme_orders() {
        let mut rules = vec![RenameRule::find_replace("a", "b").with_order(i32::MAX)];
        append_after(
            &mut rules,
            vec![
                RenameRule::find_replace("c", "d").with_order(i32::MIN),
                RenameRule::find_replace("e", "f").with_order(i32::MAX),
            ],
        );
        assert_eq!(
            rules.iter().map(|r| r.order).collect::<Vec<_>>(),
            vec![i32::MAX, i32::MAX, i32::MAX]
        );
    }

    #[test]
    fn test_history_base() {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp directory");
        let dir = temp_dir.path().to_path_buf();
        let file = dir.join("a.txt");

        assert_eq!(
            history_base(std::slice::from_ref(&dir), std::slice::from_ref(&file)),
            Some(dir.clone())
        );
        assert_eq!(
            history_base(&[file.clone(), file.clone()], std::slice::from_ref(&file)),
            Some(dir)
        );
        assert_eq!(history_base(&[], &[]), None);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["tidyren", "presets", "--config", "x.toml", "-v"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert!(matches!(cli.command, Command::Presets));
    }
}
