use dom::{Document, NodeKey, SelectorList};
use std::collections::HashSet;
use std::sync::Arc;

/// Which containers have been rewritten.
///
/// Two layers:
/// - the per-pass set, emptied by [`ProcessedTracker::begin_pass`], which
///   keeps a container from being attributed to two labels in one pass;
/// - the marker set, which survives between passes until the caller clears it
///   with [`ProcessedTracker::clear_markers`].
///
/// Markers are mirrored onto the element as `<marker_attr>="true"` so that
/// the host can see them; the in-memory set stays authoritative.
#[derive(Debug, Clone)]
pub struct ProcessedTracker {
    marker_attr: Arc<str>,
    marked: HashSet<NodeKey>,
    this_pass: HashSet<NodeKey>,
}

impl ProcessedTracker {
    pub fn new(marker_attr: &str) -> Self {
        Self {
            marker_attr: Arc::from(marker_attr),
            marked: HashSet::new(),
            this_pass: HashSet::new(),
        }
    }

    pub fn marker_attr(&self) -> &str {
        &self.marker_attr
    }

    pub fn begin_pass(&mut self) {
        self.this_pass.clear();
    }

    pub fn is_marked(&self, key: NodeKey) -> bool {
        self.marked.contains(&key)
    }

    pub fn in_this_pass(&self, key: NodeKey) -> bool {
        self.this_pass.contains(&key)
    }

    /// Marked, or already handled during the current pass.
    pub fn is_claimed(&self, key: NodeKey) -> bool {
        self.is_marked(key) || self.in_this_pass(key)
    }

    /// Whether `key` is a marked container or lies inside one.
    pub fn is_within_marked(&self, doc: &Document, key: NodeKey) -> bool {
        if self.marked.is_empty() {
            return false;
        }
        self.is_marked(key) || doc.ancestors(key).any(|a| self.is_marked(a))
    }

    /// Record `key` as processed for this pass and mark it for later passes.
    pub fn claim(&mut self, doc: &mut Document, key: NodeKey) {
        self.this_pass.insert(key);
        self.marked.insert(key);
        if let Err(err) = doc.set_attribute(key, &self.marker_attr, "true") {
            log::warn!(target: "linker.processed", "cannot mark {key}: {err}");
        }
    }

    /// Forget all markers, including marker attributes left on elements that
    /// this tracker did not set (for instance after a host reload).
    pub fn clear_markers(&mut self, doc: &mut Document) {
        let mut stale: Vec<NodeKey> = self.marked.drain().filter(|k| doc.is_live(*k)).collect();
        if let Ok(list) = SelectorList::parse(&format!("[{}]", self.marker_attr)) {
            stale.extend(doc.query_selector_all(doc.root(), &list));
        }
        stale.sort_unstable();
        stale.dedup();
        for key in stale {
            if let Err(err) = doc.remove_attribute(key, &self.marker_attr) {
                log::warn!(target: "linker.processed", "cannot unmark {key}: {err}");
            }
        }
    }

    pub fn marked_count(&self) -> usize {
        self.marked.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom::parse_html;

    #[test]
    fn claim_marks_for_pass_and_beyond() {
        let mut doc = parse_html("<div><p>1</p></div>");
        let div = doc.children(doc.root())[0];
        let p = doc.children(div)[0];
        let mut tracker = ProcessedTracker::new("data-done");

        tracker.claim(&mut doc, div);
        assert!(tracker.is_claimed(div));
        assert_eq!(doc.attr(div, "data-done"), Some("true"));
        assert!(tracker.is_within_marked(&doc, p));

        tracker.begin_pass();
        assert!(!tracker.in_this_pass(div));
        assert!(tracker.is_marked(div));
    }

    #[test]
    fn clear_markers_removes_attributes_including_foreign_ones() {
        let mut doc = parse_html(r#"<div></div><span data-done="true"></span>"#);
        let div = doc.children(doc.root())[0];
        let span = doc.children(doc.root())[1];
        let mut tracker = ProcessedTracker::new("data-done");
        tracker.claim(&mut doc, div);

        tracker.clear_markers(&mut doc);
        assert!(!tracker.is_marked(div));
        assert_eq!(tracker.marked_count(), 0);
        assert!(!doc.has_attr(div, "data-done"));
        assert!(!doc.has_attr(span, "data-done"));
    }

    #[test]
    fn removed_nodes_are_dropped_quietly() {
        let mut doc = parse_html("<div></div>");
        let div = doc.children(doc.root())[0];
        let mut tracker = ProcessedTracker::new("data-done");
        tracker.claim(&mut doc, div);
        doc.remove(div).unwrap();
        tracker.clear_markers(&mut doc);
        assert_eq!(tracker.marked_count(), 0);
    }
}
