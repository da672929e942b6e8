//! Window match rules and the persisted document layout
//!
//! A rule is identified by reference: every rule lives in its own [`RuleCell`]
//! behind an `Arc`, so two rules with identical fields stay distinct.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::common::color::Argb;
use crate::common::types::Position;
use crate::errors::EngineError;

/// One configured target window and its geometry/appearance overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MatchRule {
    /// Literal title or regular expression
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_label_override: Option<String>,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    #[serde(default)]
    pub width: i32,
    #[serde(default)]
    pub height: i32,
    /// Stored and written back untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotkeys: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_title_bar: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_width: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_argb: Option<Argb>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inactive_argb: Option<Argb>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimized_argb: Option<Argb>,
}

impl MatchRule {
    /// Eligible rules have a non-blank title, a positive size and are not disabled
    pub fn is_eligible(&self) -> bool {
        let has_title = self.title.as_deref().is_some_and(|t| !t.trim().is_empty());
        has_title && self.width > 0 && self.height > 0 && self.disabled != Some(true)
    }
}

/// Document-wide fallbacks; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GlobalDefaults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub millisecond_delay_to_move: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magnetize_pixel_distance: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_screen_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitor_millisecond_interval: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_border_width: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_argb: Option<Argb>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inactive_argb: Option<Argb>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimized_argb: Option<Argb>,
}

/// The configuration file as stored on disk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Document {
    #[serde(default)]
    pub windows: Vec<MatchRule>,
    #[serde(flatten)]
    pub defaults: GlobalDefaults,
}

/// Identity of a rule for the lifetime of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(pub u64);

/// Shared handle to a rule; panes keep a `Weak` of this
pub type RuleHandle = Arc<RuleCell>;

#[derive(Debug)]
pub struct RuleCell {
    id: RuleId,
    /// Compiled once; `None` when the title is absent or failed to compile
    pattern: Option<Regex>,
    rule: Mutex<MatchRule>,
}

impl RuleCell {
    /// Wraps a rule, compiling its title pattern.
    ///
    /// A title that is not a valid regular expression is reported once here
    /// and the rule is left out of pattern matching for good.
    pub fn new(id: RuleId, rule: MatchRule) -> Self {
        let pattern = match rule.title.as_deref() {
            Some(title) if !title.trim().is_empty() => match Regex::new(title) {
                Ok(re) => Some(re),
                Err(source) => {
                    let err = EngineError::ConfigurationRule {
                        title: title.to_string(),
                        source,
                    };
                    error!(rule = id.0, error = %err, "Skipping rule for pattern matching");
                    None
                }
            },
            _ => None,
        };

        Self {
            id,
            pattern,
            rule: Mutex::new(rule),
        }
    }

    pub fn id(&self) -> RuleId {
        self.id
    }

    fn lock(&self) -> MutexGuard<'_, MatchRule> {
        self.rule.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> MatchRule {
        self.lock().clone()
    }

    pub fn is_eligible(&self) -> bool {
        self.lock().is_eligible()
    }

    /// Case-insensitive literal comparison of the title against the rule
    pub fn matches_exactly(&self, title: &str) -> bool {
        self.lock()
            .title
            .as_deref()
            .is_some_and(|t| t.to_lowercase() == title.to_lowercase())
    }

    /// True when the pattern matches but the rule is not the literal title
    pub fn matches_pattern(&self, title: &str) -> bool {
        self.pattern.as_ref().is_some_and(|re| re.is_match(title)) && !self.matches_exactly(title)
    }

    /// Concrete copy bound to one literal title, keeping every override
    pub fn fork_for(&self, title: &str) -> MatchRule {
        let mut fork = self.snapshot();
        fork.title = Some(title.to_string());
        fork.disabled = Some(false);
        fork
    }

    pub fn disable(&self) {
        self.lock().disabled = Some(true);
    }

    pub fn set_position(&self, position: Position) {
        let mut rule = self.lock();
        rule.x = position.x;
        rule.y = position.y;
    }
}
