//! Locating field labels.
//!
//! Two passes over the scope:
//! 1. *specific*: elements matching the known label selectors whose trimmed
//!    text contains a configured label;
//! 2. *fallback*: generic container tags whose trimmed text equals a label
//!    exactly. The stricter test keeps the broad scan from producing false
//!    positives.
//!
//! All specific entries precede all fallback entries.

use crate::config::{Rules, TicketKind};
use crate::processed::ProcessedTracker;
use dom::{Document, NodeKey};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchMethod {
    Specific,
    Fallback,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LabelEntry {
    pub node: NodeKey,
    pub kind: TicketKind,
    pub method: MatchMethod,
}

// When a text contains more than one label the first configured type wins.
// That order is incidental, not a guarantee.
fn classify(rules: &Rules, text: &str, exact: bool) -> Option<TicketKind> {
    rules
        .config
        .ticket_types
        .iter()
        .find(|t| {
            if exact {
                text == t.label
            } else {
                text.contains(t.label.as_str())
            }
        })
        .map(|t| t.kind)
}

pub fn find_labels(
    doc: &Document,
    scope: NodeKey,
    rules: &Rules,
    tracker: &ProcessedTracker,
) -> Vec<LabelEntry> {
    let mut entries = find_specific(doc, scope, rules);
    let specific = entries.len();
    find_fallback(doc, scope, rules, tracker, &mut entries);
    log::debug!(
        target: "linker.labels",
        "found {} labels ({specific} specific, {} fallback)",
        entries.len(),
        entries.len() - specific
    );
    entries
}

fn find_specific(doc: &Document, scope: NodeKey, rules: &Rules) -> Vec<LabelEntry> {
    let candidates = doc.query_selector_all(scope, &rules.label_selectors);
    log::trace!(target: "linker.labels", "{} specific label candidates", candidates.len());
    candidates
        .into_iter()
        .filter_map(|node| {
            let text = doc.text_content(node);
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            let kind = classify(rules, text, false)?;
            log::debug!(target: "linker.labels", "{kind} label {node} (specific)");
            Some(LabelEntry {
                node,
                kind,
                method: MatchMethod::Specific,
            })
        })
        .collect()
}

fn find_fallback(
    doc: &Document,
    scope: NodeKey,
    rules: &Rules,
    tracker: &ProcessedTracker,
    entries: &mut Vec<LabelEntry>,
) {
    let max_children = rules.config.max_fallback_children;
    for node in doc.query_selector_all(scope, &rules.fallback_selectors) {
        if doc.matches(node, &rules.any_value)
            || tracker.is_within_marked(doc, node)
            || doc.child_element_count(node) > max_children
        {
            continue;
        }
        let overlaps = entries
            .iter()
            .any(|e| doc.contains(e.node, node) || doc.contains(node, e.node));
        if overlaps {
            continue;
        }
        let text = doc.text_content(node);
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        if let Some(kind) = classify(rules, text, true) {
            log::debug!(target: "linker.labels", "{kind} label {node} (fallback)");
            entries.push(LabelEntry {
                node,
                kind,
                method: MatchMethod::Fallback,
            });
        }
    }
}
