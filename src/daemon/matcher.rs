//! Title matching and rule forking
//!
//! Windows are matched against the unmatched rules in one batch per tick.
//! A literal (case-insensitive) match binds the rule as is. A pattern match
//! stamps out a concrete copy of the rule for that title and disables the
//! template, so the same window is never matched through the wildcard again.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{ConfigStore, MatchRule, RuleHandle, RuleId};

use super::backend::WindowId;

/// An enumerated window that has no pane yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub window: WindowId,
    pub title: String,
}

/// A window to build a pane for, and the rule the pane binds to
#[derive(Debug, Clone)]
pub struct PaneMatch {
    pub window: WindowId,
    pub title: String,
    pub rule: RuleHandle,
}

/// Result of one matching pass; rule-list changes are applied separately
#[derive(Debug, Default)]
pub struct MatchPlan {
    pub matches: Vec<PaneMatch>,
    /// Pattern rules that produced at least one fork, each listed once
    pub disable: Vec<RuleHandle>,
    /// Concrete rules synthesized from pattern matches
    pub forks: Vec<RuleHandle>,
}

impl MatchPlan {
    pub fn is_rewrite(&self) -> bool {
        !self.disable.is_empty() || !self.forks.is_empty()
    }

    /// Disable templates and append forks; returns whether the list changed
    pub fn apply(&self, store: &ConfigStore) -> bool {
        if !self.is_rewrite() {
            return false;
        }
        for rule in &self.disable {
            rule.disable();
        }
        store.append(self.forks.iter().cloned());
        store.mark_dirty();
        info!(
            disabled = self.disable.len(),
            forked = self.forks.len(),
            "Rewrote rules from pattern matches"
        );
        true
    }
}

/// Match every window against `candidates`, minting forks through `mint`
pub fn match_batch<F>(windows: &[Candidate], candidates: &[RuleHandle], mint: F) -> MatchPlan
where
    F: Fn(MatchRule) -> RuleHandle,
{
    let mut plan = MatchPlan::default();
    let mut consumed: HashSet<RuleId> = HashSet::new();
    let mut disabled: HashSet<RuleId> = HashSet::new();

    for candidate in windows {
        let exact = candidates
            .iter()
            .find(|rule| !consumed.contains(&rule.id()) && rule.matches_exactly(&candidate.title));

        if let Some(rule) = exact {
            debug!(window = candidate.window, title = %candidate.title, rule = rule.id().0, "Exact title match");
            consumed.insert(rule.id());
            plan.matches.push(PaneMatch {
                window: candidate.window,
                title: candidate.title.clone(),
                rule: Arc::clone(rule),
            });
            continue;
        }

        for rule in candidates
            .iter()
            .filter(|rule| rule.matches_pattern(&candidate.title))
        {
            debug!(window = candidate.window, title = %candidate.title, rule = rule.id().0, "Pattern title match");
            if disabled.insert(rule.id()) {
                plan.disable.push(Arc::clone(rule));
            }
            let fork = mint(rule.fork_for(&candidate.title));
            plan.forks.push(Arc::clone(&fork));
            plan.matches.push(PaneMatch {
                window: candidate.window,
                title: candidate.title.clone(),
                rule: fork,
            });
        }
    }

    plan
}
