//! Rename rule definitions.
//!
//! A rule is one step of a rename pipeline. Rules are plain data: they are
//! loaded from TOML presets or built from command-line flags, then handed to
//! the [`RenameRuleEngine`](crate::rule_engine::RenameRuleEngine) which
//! compiles and applies them.
//!
//! # Configuration Format
//!
//! ```toml
//! [[rules]]
//! type = "find_replace"
//! order = 0
//! find_text = "IMG_"
//! replace_text = "Vacation_"
//!
//! [[rules]]
//! type = "counter"
//! order = 1
//! start = 1
//! padding = 3
//! prefix = "_"
//! position = "suffix"
//! ```

use serde::{Deserialize, Serialize};

/// Where inserted text goes relative to the name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    /// Before the name.
    #[default]
    Prefix,
    /// After the name, before the extension.
    Suffix,
}

/// Case transformation applied by [`RuleAction::ChangeCase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseType {
    Upper,
    #[default]
    Lower,
    Title,
}

/// The transformation a rule performs.
///
/// Every variant only carries the fields its rule type uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleAction {
    /// Replace occurrences of `find_text` with `replace_text`.
    FindReplace {
        find_text: String,
        #[serde(default)]
        replace_text: String,
        #[serde(default)]
        use_regex: bool,
        #[serde(default)]
        case_sensitive: bool,
    },
    /// Insert fixed text before or after the name.
    AddText {
        text: String,
        #[serde(default)]
        position: Position,
    },
    /// Delete every occurrence of `text`.
    RemoveText {
        text: String,
        #[serde(default)]
        case_sensitive: bool,
    },
    /// Insert a running number.
    Counter {
        #[serde(default = "default_counter_start")]
        start: i64,
        #[serde(default = "default_counter_step")]
        step: i64,
        #[serde(default)]
        padding: usize,
        #[serde(default)]
        prefix: String,
        #[serde(default)]
        suffix: String,
        #[serde(default = "default_counter_position")]
        position: Position,
    },
    /// Change the case of the name (the extension is left alone).
    ChangeCase {
        #[serde(default)]
        case: CaseType,
    },
    /// Replace the extension. An empty extension removes it.
    ChangeExtension {
        #[serde(default)]
        extension: String,
    },
    /// Insert the file's last-modified time, formatted with strftime syntax.
    DateTime {
        #[serde(default = "default_date_format")]
        format: String,
        #[serde(default)]
        position: Position,
    },
}

fn default_counter_start() -> i64 {
    1
}

fn default_counter_step() -> i64 {
    1
}

fn default_counter_position() -> Position {
    Position::Suffix
}

/// Default format for [`RuleAction::DateTime`].
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

fn default_enabled() -> bool {
    true
}

/// A single step of a rename pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenameRule {
    /// Rules run in ascending order. Equal orders keep their list position.
    #[serde(default)]
    pub order: i32,

    /// Disabled rules are skipped entirely.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(flatten)]
    pub action: RuleAction,
}

impl RenameRule {
    /// Creates an enabled rule with the given order.
    pub fn new(order: i32, action: RuleAction) -> Self {
        Self {
            order,
            enabled: true,
            action,
        }
    }

    /// Literal, case-sensitive find and replace.
    pub fn find_replace(find: &str, replace: &str) -> Self {
        Self::new(
            0,
            RuleAction::FindReplace {
                find_text: find.to_string(),
                replace_text: replace.to_string(),
                use_regex: false,
                case_sensitive: true,
            },
        )
    }

    /// Sets the order, builder style.
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Sets the enabled flag, builder style.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Short human-readable summary, used when listing presets.
    pub fn describe(&self) -> String {
        let summary = match &self.action {
            RuleAction::FindReplace {
                find_text,
                replace_text,
                use_regex,
                ..
            } => {
                let kind = if *use_regex { "regex" } else { "replace" };
                format!("{} '{}' -> '{}'", kind, find_text, replace_text)
            }
            RuleAction::AddText { text, position } => {
                format!("add '{}' as {:?}", text, position)
            }
            RuleAction::RemoveText { text, .. } => format!("remove '{}'", text),
            RuleAction::Counter {
                start,
                step,
                padding,
                position,
                ..
            } => format!(
                "counter from {} step {} pad {} as {:?}",
                start, step, padding, position
            ),
            RuleAction::ChangeCase { case } => format!("case {:?}", case),
            RuleAction::ChangeExtension { extension } => format!("extension '{}'", extension),
            RuleAction::DateTime { format, position } => {
                format!("date '{}' as {:?}", format, position)
            }
        };

        if self.enabled {
            summary
        } else {
            format!("{} (disabled)", summary)
        }
    }
}

/// Stable ordering of the enabled rules.
pub fn active_rules(rules: &[RenameRule]) -> Vec<&RenameRule> {
    let mut active: Vec<&RenameRule> = rules.iter().filter(|r| r.enabled).collect();
    active.sort_by_key(|r| r.order);
    active
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct RuleFile {
        rules: Vec<RenameRule>,
    }

    #[test]
    fn test_active_rules_sorted_and_filtered() {
        let rules = vec![
            RenameRule::find_replace("a", "b").with_order(2),
            RenameRule::find_replace("c", "d").with_order(1).with_enabled(false),
            RenameRule::find_replace("e", "f").with_order(0),
            RenameRule::find_replace("g", "h").with_order(2),
        ];

        let active = active_rules(&rules);
        assert_eq!(active.len(), 3);
        assert_eq!(active[0].order, 0);
        // Equal orders keep list position
        assert!(matches!(&active[1].action, RuleAction::FindReplace { find_text, .. } if find_text == "a"));
        assert!(matches!(&active[2].action, RuleAction::FindReplace { find_text, .. } if find_text == "g"));
    }

    #[test]
    fn test_parse_rules_from_toml() {
        let content = r#"
            [[rules]]
            type = "find_replace"
            find_text = "IMG_"
            replace_text = "Vacation_"

            [[rules]]
            type = "counter"
            order = 1
            padding = 3

            [[rules]]
            type = "change_case"
            order = 2
            enabled = false
            case = "upper"
        "#;

        let parsed: RuleFile = toml::from_str(content).unwrap();
        assert_eq!(parsed.rules.len(), 3);

        assert!(parsed.rules[0].enabled);
        assert_eq!(parsed.rules[0].order, 0);
        assert_eq!(
            parsed.rules[0].action,
            RuleAction::FindReplace {
                find_text: "IMG_".to_string(),
                replace_text: "Vacation_".to_string(),
                use_regex: false,
                case_sensitive: false,
            }
        );

        assert_eq!(
            parsed.rules[1].action,
            RuleAction::Counter {
                start: 1,
                step: 1,
                padding: 3,
                prefix: String::new(),
                suffix: String::new(),
                position: Position::Suffix,
            }
        );

        assert!(!parsed.rules[2].enabled);
        assert_eq!(
            parsed.rules[2].action,
            RuleAction::ChangeCase {
                case: CaseType::Upper
            }
        );
    }

    #[test]
    fn test_unknown_rule_type_rejected() {
        let content = r#"
            [[rules]]
            type = "shuffle"
        "#;
        let parsed: Result<RuleFile, _> = toml::from_str(content);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_describe_marks_disabled_rules() {
        let rule = RenameRule::find_replace("x", "y").with_enabled(false);
        assert!(rule.describe().ends_with("(disabled)"));
        assert_eq!(
            RenameRule::find_replace("x", "y").describe(),
            "replace 'x' -> 'y'"
        );
    }
}
