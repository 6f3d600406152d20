//! Output formatting and styling module.
//!
//! Everything the CLI shows the user goes through [`OutputFormatter`]:
//! colored status lines, progress bars and the preview tables for rename and
//! organize runs. Diagnostics go through `tracing` instead.

use crate::batch_rename::RenamePreviewItem;
use crate::file_organizer::OrganizationPlan;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::path::PathBuf;

const PROGRESS_TEMPLATE: &str = "{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}";

/// Manages all CLI output with consistent styling and formatting.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// ```no_run
    /// use tidyren::output::OutputFormatter;
    /// OutputFormatter::success("Renamed 12 files");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn plain(message: &str) {
        println!("{}", message);
    }

    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints a dry-run notice.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Creates a progress bar for `total` file operations.
    ///
    /// ```no_run
    /// use tidyren::output::OutputFormatter;
    /// let pb = OutputFormatter::create_progress_bar(100);
    /// pb.inc(1);
    /// pb.finish_with_message("Completed!");
    /// ```
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let style = ProgressStyle::default_bar()
            .template(PROGRESS_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        let pb = ProgressBar::new(total);
        pb.set_style(style);
        pb
    }

    /// Prints the proposed names of a rename batch.
    ///
    /// Unchanged names are dimmed and conflicts are shown in red with their
    /// reason.
    pub fn rename_preview(items: &[RenamePreviewItem]) {
        let width = items
            .iter()
            .map(|item| item.original_name.chars().count())
            .max()
            .unwrap_or(0);

        for item in items {
            let original = format!("{:<width$}", item.original_name, width = width);
            if item.has_conflict {
                let reason = item.conflict_reason.as_deref().unwrap_or("Conflict");
                println!(
                    "  {} → {}  {}",
                    original,
                    item.new_name.red(),
                    format!("({})", reason).red()
                );
            } else if item.will_change {
                println!("  {} → {}", original, item.new_name.green());
            } else {
                println!("  {}", format!("{}   (unchanged)", original).dimmed());
            }
        }

        let changing = items.iter().filter(|i| i.will_change).count();
        let conflicts = items.iter().filter(|i| i.has_conflict).count();
        println!(
            "\n{} of {} files will be renamed, {} conflict(s)",
            changing.to_string().bold(),
            items.len(),
            if conflicts > 0 {
                conflicts.to_string().red().bold()
            } else {
                conflicts.to_string().green()
            }
        );
    }

    /// Prints where each category of an organize plan goes.
    pub fn organize_plan(plan: &OrganizationPlan) {
        for category in &plan.categories {
            println!(
                "  {} → {}/  ({} {}, {})",
                category.name.bold(),
                category.destination_folder.display(),
                category.file_count,
                if category.file_count == 1 { "file" } else { "files" },
                format_size(category.total_size)
            );
            for file in &category.files {
                let name = file
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| file.display().to_string());
                println!("      - {}", name);
            }
        }
    }

    /// Prints per-file failures of a batch.
    pub fn failures(failures: &[(PathBuf, String)]) {
        for (path, reason) in failures {
            eprintln!("    {} {}: {}", "-".red(), path.display(), reason);
        }
    }

    /// Prints a summary table with file counts by category.
    ///
    /// ```no_run
    /// use tidyren::output::OutputFormatter;
    /// use std::collections::HashMap;
    ///
    /// let mut counts = HashMap::new();
    /// counts.insert("Documents".to_string(), 15);
    /// counts.insert("Images".to_string(), 8);
    /// OutputFormatter::summary_table(&counts, 23);
    /// ```
    pub fn summary_table(category_counts: &HashMap<String, usize>, total_files: usize) {
        Self::header("SUMMARY");

        let mut categories: Vec<_> = category_counts.iter().collect();
        categories.sort_by_key(|&(name, _)| name);

        let width = categories
            .iter()
            .map(|(name, _)| name.len())
            .max()
            .unwrap_or(0)
            .max("Category".len());

        println!(
            "{:<width$} | {}",
            "Category".bold(),
            "Files".bold(),
            width = width
        );
        println!("{}", "-".repeat(width + 10));

        for (category, count) in &categories {
            println!(
                "{:<width$} | {} {}",
                category,
                count.to_string().green(),
                if **count == 1 { "file" } else { "files" },
                width = width
            );
        }

        println!("{}", "-".repeat(width + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total_files.to_string().green().bold(),
            if total_files == 1 { "file" } else { "files" },
            width = width
        );
    }
}

/// Human-readable byte count, e.g. `1.5 MB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", size, UNITS[unit])
}
