//! Applies an ordered list of rename rules to file names.
//!
//! The engine works on a `(name, extension)` pair: every rule edits one or
//! both halves and the final name is their concatenation. Rules are compiled
//! once per batch, so a counter keeps running across all files of the batch
//! and starts over when a new engine is created.
//!
//! # Examples
//!
//! ```
//! use tidyren::rename_rule::RenameRule;
//! use tidyren::rule_engine::{FileMetadata, RenameRuleEngine};
//!
//! let rules = vec![RenameRule::find_replace("IMG_", "Vacation_")];
//! let mut engine = RenameRuleEngine::new(&rules);
//! let meta = FileMetadata::default();
//!
//! assert_eq!(engine.apply("IMG_001.jpg", &meta), "Vacation_001.jpg");
//! assert_eq!(engine.apply("IMG_002.jpg", &meta), "Vacation_002.jpg");
//! ```

use crate::rename_rule::{CaseType, Position, RenameRule, RuleAction, active_rules};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};
use regex::{NoExpand, Regex, RegexBuilder};
use std::fs;
use std::path::Path;
use tracing::warn;

/// Widest zero padding a counter will produce.
pub const MAX_COUNTER_PADDING: usize = 255;

/// Per-file information some rules need.
#[derive(Debug, Clone, Default)]
pub struct FileMetadata {
    /// Last-modified time, if the platform reports one.
    pub modified: Option<DateTime<Local>>,
    /// File size in bytes.
    pub size: u64,
}

impl FileMetadata {
    /// Reads metadata from disk. Unreadable files yield empty metadata.
    pub fn from_path(path: &Path) -> Self {
        match fs::metadata(path) {
            Ok(meta) => Self {
                modified: meta.modified().ok().map(DateTime::<Local>::from),
                size: meta.len(),
            },
            Err(_) => Self::default(),
        }
    }
}

/// Splits a file name into its stem and extension (dot included).
///
/// A leading dot does not start an extension, so `.bashrc` has none.
pub fn split_name(file_name: &str) -> (String, String) {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => (
            file_name[..idx].to_string(),
            file_name[idx..].to_string(),
        ),
        _ => (file_name.to_string(), String::new()),
    }
}

/// A rule ready to run. Rules that failed to compile hold no pattern and
/// leave names untouched.
#[derive(Debug)]
enum CompiledRule {
    Replace {
        pattern: Option<Regex>,
        replacement: String,
        expand: bool,
    },
    AddText {
        text: String,
        position: Position,
    },
    Counter {
        next: i64,
        step: i64,
        padding: usize,
        prefix: String,
        suffix: String,
        position: Position,
    },
    ChangeCase(CaseType),
    ChangeExtension(String),
    DateTime {
        format: Option<String>,
        position: Position,
    },
}

impl CompiledRule {
    fn compile(rule: &RenameRule) -> Self {
        match &rule.action {
            RuleAction::FindReplace {
                find_text,
                replace_text,
                use_regex,
                case_sensitive,
            } => {
                let source = if *use_regex {
                    find_text.clone()
                } else {
                    regex::escape(find_text)
                };
                CompiledRule::Replace {
                    pattern: compile_pattern(&source, find_text.is_empty(), *case_sensitive),
                    replacement: replace_text.clone(),
                    expand: *use_regex,
                }
            }
            RuleAction::RemoveText {
                text,
                case_sensitive,
            } => CompiledRule::Replace {
                pattern: compile_pattern(&regex::escape(text), text.is_empty(), *case_sensitive),
                replacement: String::new(),
                expand: false,
            },
            RuleAction::AddText { text, position } => CompiledRule::AddText {
                text: text.clone(),
                position: *position,
            },
            RuleAction::Counter {
                start,
                step,
                padding,
                prefix,
                suffix,
                position,
            } => CompiledRule::Counter {
                next: *start,
                step: *step,
                padding: (*padding).min(MAX_COUNTER_PADDING),
                prefix: prefix.clone(),
                suffix: suffix.clone(),
                position: *position,
            },
            RuleAction::ChangeCase { case } => CompiledRule::ChangeCase(*case),
            RuleAction::ChangeExtension { extension } => {
                CompiledRule::ChangeExtension(normalize_extension(extension))
            }
            RuleAction::DateTime { format, position } => {
                let valid = !StrftimeItems::new(format).any(|item| item == Item::Error);
                if !valid {
                    warn!(format = %format, "invalid date format, rule disabled");
                }
                CompiledRule::DateTime {
                    format: valid.then(|| format.clone()),
                    position: *position,
                }
            }
        }
    }

    fn apply(&mut self, name: &mut String, extension: &mut String, metadata: &FileMetadata) {
        match self {
            CompiledRule::Replace {
                pattern,
                replacement,
                expand,
            } => {
                if let Some(re) = pattern {
                    let replaced = if *expand {
                        re.replace_all(name.as_str(), replacement.as_str())
                            .into_owned()
                    } else {
                        re.replace_all(name.as_str(), NoExpand(replacement.as_str()))
                            .into_owned()
                    };
                    *name = replaced;
                }
            }
            CompiledRule::AddText { text, position } => insert(name, text, *position),
            CompiledRule::Counter {
                next,
                step,
                padding,
                prefix,
                suffix,
                position,
            } => {
                let value = format!("{}{:0width$}{}", prefix, *next, suffix, width = *padding);
                insert(name, &value, *position);
                *next = next.saturating_add(*step);
            }
            CompiledRule::ChangeCase(case) => {
                *name = match case {
                    CaseType::Upper => name.to_uppercase(),
                    CaseType::Lower => name.to_lowercase(),
                    CaseType::Title => title_case(name),
                };
            }
            CompiledRule::ChangeExtension(new_extension) => {
                *extension = new_extension.clone();
            }
            CompiledRule::DateTime { format, position } => {
                if let (Some(format), Some(modified)) = (format.as_deref(), metadata.modified) {
                    let stamp = modified.format(format).to_string();
                    insert(name, &stamp, *position);
                }
            }
        }
    }
}

fn compile_pattern(source: &str, empty: bool, case_sensitive: bool) -> Option<Regex> {
    if empty {
        return None;
    }
    match RegexBuilder::new(source)
        .case_insensitive(!case_sensitive)
        .build()
    {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(pattern = %source, error = %e, "invalid rename pattern, rule disabled");
            None
        }
    }
}

fn insert(name: &mut String, text: &str, position: Position) {
    match position {
        Position::Prefix => name.insert_str(0, text),
        Position::Suffix => name.push_str(text),
    }
}

/// Turns `"jpg"`, `".jpg"` and `"  .jpg "` into `".jpg"`; blank input into `""`.
fn normalize_extension(extension: &str) -> String {
    let trimmed = extension.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(".{}", trimmed)
    }
}

/// Uppercases the first letter of each word and lowercases the rest.
/// Whitespace, `_`, `-` and `.` separate words.
pub fn title_case(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut word_start = true;

    for c in text.chars() {
        if c.is_whitespace() || matches!(c, '_' | '-' | '.') {
            word_start = true;
            result.push(c);
        } else if word_start {
            result.extend(c.to_uppercase());
            word_start = false;
        } else {
            result.extend(c.to_lowercase());
        }
    }

    result
}

/// Runs a rule pipeline over a batch of file names.
///
/// Create one engine per batch: counter rules advance once per call to
/// [`apply`](Self::apply).
#[derive(Debug)]
pub struct RenameRuleEngine {
    rules: Vec<CompiledRule>,
}

impl RenameRuleEngine {
    /// Compiles the enabled rules in ascending order.
    pub fn new(rules: &[RenameRule]) -> Self {
        Self {
            rules: active_rules(rules)
                .into_iter()
                .map(CompiledRule::compile)
                .collect(),
        }
    }

    /// Returns true when no enabled rules are present.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Produces the new name for one file. Never fails: a rule that cannot
    /// run leaves the name as it found it.
    pub fn apply(&mut self, original_name: &str, metadata: &FileMetadata) -> String {
        let (mut name, mut extension) = split_name(original_name);

        for rule in &mut self.rules {
            rule.apply(&mut name, &mut extension, metadata);
        }

        name + &extension
    }
}

/// One-shot convenience over [`RenameRuleEngine`] for a single file.
pub fn apply_rules(original_name: &str, rules: &[RenameRule], metadata: &FileMetadata) -> String {
    RenameRuleEngine::new(rules).apply(original_name, metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn meta() -> FileMetadata {
        FileMetadata::default()
    }

    fn rule(order: i32, action: RuleAction) -> RenameRule {
        RenameRule::new(order, action)
    }

    fn counter(start: i64, step: i64, padding: usize, position: Position) -> RuleAction {
        RuleAction::Counter {
            start,
            step,
            padding,
            prefix: String::new(),
            suffix: String::new(),
            position,
        }
    }

    #[test]
    fn test_split_name() {
        assert_eq!(split_name("photo.jpg"), ("photo".into(), ".jpg".into()));
        assert_eq!(
            split_name("archive.tar.gz"),
            ("archive.tar".into(), ".gz".into())
        );
        assert_eq!(split_name("README"), ("README".into(), String::new()));
        assert_eq!(split_name(".bashrc"), (".bashrc".into(), String::new()));
        assert_eq!(split_name("trailing."), ("trailing".into(), ".".into()));
    }

    #[test]
    fn test_vacation_example() {
        let rules = vec![RenameRule::find_replace("IMG_", "Vacation_")];
        let mut engine = RenameRuleEngine::new(&rules);

        assert_eq!(engine.apply("IMG_001.jpg", &meta()), "Vacation_001.jpg");
        assert_eq!(engine.apply("IMG_002.jpg", &meta()), "Vacation_002.jpg");
    }

    #[test]
    fn test_all_rules_disabled_is_identity() {
        let rules = vec![
            RenameRule::find_replace("a", "b").with_enabled(false),
            rule(1, counter(1, 1, 3, Position::Prefix)).with_enabled(false),
            rule(
                2,
                RuleAction::ChangeExtension {
                    extension: "png".into(),
                },
            )
            .with_enabled(false),
        ];
        let mut engine = RenameRuleEngine::new(&rules);
        assert!(engine.is_empty());

        for name in ["alpha.txt", "banana", ".hidden", "a.b.c"] {
            assert_eq!(engine.apply(name, &meta()), name);
        }
    }

    #[test]
    fn test_find_replace_literal_case_sensitivity() {
        let sensitive = vec![rule(
            0,
            RuleAction::FindReplace {
                find_text: "img".into(),
                replace_text: "pic".into(),
                use_regex: false,
                case_sensitive: true,
            },
        )];
        assert_eq!(apply_rules("IMG_img.jpg", &sensitive, &meta()), "IMG_pic.jpg");

        let insensitive = vec![rule(
            0,
            RuleAction::FindReplace {
                find_text: "img".into(),
                replace_text: "pic".into(),
                use_regex: false,
                case_sensitive: false,
            },
        )];
        assert_eq!(apply_rules("IMG_img.jpg", &insensitive, &meta()), "pic_pic.jpg");
    }

    #[test]
    fn test_find_replace_literal_treats_metacharacters_literally() {
        let rules = vec![rule(
            0,
            RuleAction::FindReplace {
                find_text: "(1)".into(),
                replace_text: "$1".into(),
                use_regex: false,
                case_sensitive: true,
            },
        )];
        assert_eq!(apply_rules("photo (1).png", &rules, &meta()), "photo $1.png");
    }

    #[test]
    fn test_find_replace_only_touches_name_portion() {
        let rules = vec![RenameRule::find_replace("jpg", "x")];
        assert_eq!(apply_rules("jpg.jpg", &rules, &meta()), "x.jpg");
    }

    #[test]
    fn test_find_replace_regex_with_groups() {
        let rules = vec![rule(
            0,
            RuleAction::FindReplace {
                find_text: r"(\d+)-(\d+)".into(),
                replace_text: "${2}_$1".into(),
                use_regex: true,
                case_sensitive: true,
            },
        )];
        assert_eq!(apply_rules("scan 12-34.pdf", &rules, &meta()), "scan 34_12.pdf");
    }

    #[test]
    fn test_invalid_regex_is_noop() {
        let rules = vec![
            rule(
                0,
                RuleAction::FindReplace {
                    find_text: "[unclosed(".into(),
                    replace_text: "x".into(),
                    use_regex: true,
                    case_sensitive: false,
                },
            ),
            rule(
                1,
                RuleAction::AddText {
                    text: "ok_".into(),
                    position: Position::Prefix,
                },
            ),
        ];
        // The broken rule is skipped, the rest of the pipeline still runs
        assert_eq!(apply_rules("file.txt", &rules, &meta()), "ok_file.txt");
    }

    #[test]
    fn test_empty_find_text_is_noop() {
        let rules = vec![RenameRule::find_replace("", "x")];
        assert_eq!(apply_rules("file.txt", &rules, &meta()), "file.txt");
    }

    #[test]
    fn test_add_text_prefix_and_suffix() {
        let rules = vec![
            rule(
                0,
                RuleAction::AddText {
                    text: "new_".into(),
                    position: Position::Prefix,
                },
            ),
            rule(
                1,
                RuleAction::AddText {
                    text: "_final".into(),
                    position: Position::Suffix,
                },
            ),
        ];
        assert_eq!(apply_rules("report.docx", &rules, &meta()), "new_report_final.docx");
    }

    #[test]
    fn test_remove_text() {
        let rules = vec![rule(
            0,
            RuleAction::RemoveText {
                text: " copy".into(),
                case_sensitive: false,
            },
        )];
        assert_eq!(
            apply_rules("notes copy COPY.txt", &rules, &meta()),
            "notes.txt"
        );
    }

    #[test]
    fn test_counter_sequence_padding() {
        let rules = vec![rule(0, counter(1, 1, 3, Position::Prefix))];
        let mut engine = RenameRuleEngine::new(&rules);

        let names: Vec<String> = (0..12)
            .map(|i| engine.apply(&format!("f{}", i), &meta()))
            .collect();

        for (i, name) in names.iter().enumerate() {
            assert_eq!(name, &format!("{:03}f{}", i + 1, i));
        }
    }

    #[test]
    fn test_counter_padding_is_capped() {
        let rules = vec![rule(0, counter(7, 1, usize::MAX, Position::Prefix))];
        let mut engine = RenameRuleEngine::new(&rules);

        let name = engine.apply("f.txt", &meta());
        let digits = name.trim_end_matches("f.txt");
        assert_eq!(digits.len(), MAX_COUNTER_PADDING);
        assert!(digits.ends_with('7'));
        assert!(digits.trim_end_matches('7').chars().all(|c| c == '0'));
    }

    #[test]
    fn test_counter_step_prefix_suffix() {
        let rules = vec![rule(
            0,
            RuleAction::Counter {
                start: 10,
                step: 5,
                padding: 0,
                prefix: "_(".into(),
                suffix: ")".into(),
                position: Position::Suffix,
            },
        )];
        let mut engine = RenameRuleEngine::new(&rules);
        assert_eq!(engine.apply("a.txt", &meta()), "a_(10).txt");
        assert_eq!(engine.apply("b.txt", &meta()), "b_(15).txt");
    }

    #[test]
    fn test_counter_resets_with_new_engine() {
        let rules = vec![rule(0, counter(1, 1, 2, Position::Suffix))];

        let mut first = RenameRuleEngine::new(&rules);
        first.apply("a", &meta());
        assert_eq!(first.apply("b", &meta()), "b02");

        let mut second = RenameRuleEngine::new(&rules);
        assert_eq!(second.apply("a", &meta()), "a01");
    }

    #[test]
    fn test_change_case_keeps_extension() {
        let upper = vec![rule(
            0,
            RuleAction::ChangeCase {
                case: CaseType::Upper,
            },
        )];
        assert_eq!(apply_rules("hello.jpg", &upper, &meta()), "HELLO.jpg");

        let lower = vec![rule(
            0,
            RuleAction::ChangeCase {
                case: CaseType::Lower,
            },
        )];
        assert_eq!(apply_rules("HeLLo.JPG", &lower, &meta()), "hello.JPG");

        let title = vec![rule(
            0,
            RuleAction::ChangeCase {
                case: CaseType::Title,
            },
        )];
        assert_eq!(
            apply_rules("my holiday_PHOTOS-day one.png", &title, &meta()),
            "My Holiday_Photos-Day One.png"
        );
    }

    #[test]
    fn test_change_extension_normalizes_dot() {
        for ext in ["png", ".png", " .png "] {
            let rules = vec![rule(
                0,
                RuleAction::ChangeExtension {
                    extension: ext.into(),
                },
            )];
            assert_eq!(apply_rules("image.jpeg", &rules, &meta()), "image.png");
        }

        let remove = vec![rule(
            0,
            RuleAction::ChangeExtension {
                extension: String::new(),
            },
        )];
        assert_eq!(apply_rules("image.jpeg", &remove, &meta()), "image");
    }

    #[test]
    fn test_date_time_rule() {
        let modified = Local.with_ymd_and_hms(2024, 3, 9, 14, 30, 0).unwrap();
        let metadata = FileMetadata {
            modified: Some(modified),
            size: 0,
        };
        let rules = vec![rule(
            0,
            RuleAction::DateTime {
                format: "%Y%m%d_".into(),
                position: Position::Prefix,
            },
        )];
        assert_eq!(apply_rules("IMG.jpg", &rules, &metadata), "20240309_IMG.jpg");
    }

    #[test]
    fn test_date_time_without_timestamp_or_bad_format_is_noop() {
        let rules = vec![rule(
            0,
            RuleAction::DateTime {
                format: "%Y".into(),
                position: Position::Suffix,
            },
        )];
        assert_eq!(apply_rules("a.txt", &rules, &meta()), "a.txt");

        let metadata = FileMetadata {
            modified: Some(Local::now()),
            size: 0,
        };
        let bad = vec![rule(
            0,
            RuleAction::DateTime {
                format: "%Q%".into(),
                position: Position::Suffix,
            },
        )];
        assert_eq!(apply_rules("a.txt", &bad, &metadata), "a.txt");
    }

    #[test]
    fn test_rules_run_in_order() {
        // Prefix added first, then upper-cased along with the rest of the name
        let rules = vec![
            rule(
                2,
                RuleAction::ChangeCase {
                    case: CaseType::Upper,
                },
            ),
            rule(
                1,
                RuleAction::AddText {
                    text: "x_".into(),
                    position: Position::Prefix,
                },
            ),
        ];
        assert_eq!(apply_rules("name.txt", &rules, &meta()), "X_NAME.txt");
    }

    #[test]
    fn test_metadata_from_missing_path() {
        let metadata = FileMetadata::from_path(Path::new("/non/existent/file.txt"));
        assert!(metadata.modified.is_none());
        assert_eq!(metadata.size, 0);
    }
}
