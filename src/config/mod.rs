//! Configuration management
//!
//! Match rules, document-wide defaults and the JSON document they live in.
//! Effective per-pane values are resolved rule first, then document, then the
//! built-in constants.

pub mod effective;
pub mod rules;
pub mod store;

pub use effective::{BorderColors, PaneSettings};
pub use rules::{Document, GlobalDefaults, MatchRule, RuleCell, RuleHandle, RuleId};
pub use store::ConfigStore;
