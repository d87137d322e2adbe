//! Associating a label with the element that holds its value.
//!
//! Resolution is an ordered chain of strategies, grouped into two attempts:
//!
//! 1. structural: [`WrapperLookup`], then [`DigitSibling`];
//! 2. nearest candidate: [`NearestCandidate`], then [`CloseSibling`].
//!
//! Within an attempt the first strategy that yields a node wins. The second
//! attempt only runs when the first yields nothing or a container that is
//! already claimed.

use crate::config::Rules;
use crate::distance::dom_distance;
use crate::labels::LabelEntry;
use crate::pattern::contains_digit;
use crate::processed::ProcessedTracker;
use dom::{Document, NodeKey};

pub struct ResolveContext<'a> {
    pub doc: &'a Document,
    pub rules: &'a Rules,
    pub tracker: &'a ProcessedTracker,
}

pub trait ResolveStrategy {
    fn name(&self) -> &'static str;

    fn resolve(&self, cx: &ResolveContext<'_>, label: &LabelEntry) -> Option<NodeKey>;
}

/// Nearest inclusive ancestor matching a field-wrapper selector (tried in
/// priority order), then the first value container inside it (value selectors
/// in priority order).
pub struct WrapperLookup;

impl ResolveStrategy for WrapperLookup {
    fn name(&self) -> &'static str {
        "wrapper"
    }

    fn resolve(&self, cx: &ResolveContext<'_>, label: &LabelEntry) -> Option<NodeKey> {
        let wrapper = cx
            .rules
            .wrapper_selectors
            .iter()
            .find_map(|sel| cx.doc.closest(label.node, sel))?;
        cx.rules
            .value_selectors
            .iter()
            .find_map(|sel| cx.doc.query_selector(wrapper, sel))
    }
}

/// The next element sibling, if its text contains any digit.
pub struct DigitSibling;

impl ResolveStrategy for DigitSibling {
    fn name(&self) -> &'static str {
        "digit-sibling"
    }

    fn resolve(&self, cx: &ResolveContext<'_>, label: &LabelEntry) -> Option<NodeKey> {
        let sibling = cx.doc.next_element_sibling(label.node)?;
        contains_digit(cx.doc.text_content(sibling).trim()).then_some(sibling)
    }
}

/// The unclaimed value container closest to the label, within
/// `max_candidate_distance`. Candidates are visited in value-selector priority
/// order, then document order; the first one at the minimal distance wins.
/// That tie-break is incidental.
pub struct NearestCandidate;

impl ResolveStrategy for NearestCandidate {
    fn name(&self) -> &'static str {
        "nearest"
    }

    fn resolve(&self, cx: &ResolveContext<'_>, label: &LabelEntry) -> Option<NodeKey> {
        let max = cx.rules.config.max_candidate_distance;
        let mut best: Option<(u32, NodeKey)> = None;
        for sel in &cx.rules.value_selectors {
            for candidate in cx.doc.query_selector_all(cx.doc.root(), sel) {
                if cx.tracker.is_claimed(candidate) {
                    continue;
                }
                let Some(distance) = dom_distance(cx.doc, label.node, candidate) else {
                    continue;
                };
                log::trace!(
                    target: "linker.resolve",
                    "candidate {candidate} at distance {distance} from {}",
                    label.node
                );
                if distance <= max && best.is_none_or(|(d, _)| distance < d) {
                    best = Some((distance, candidate));
                }
            }
        }
        best.map(|(_, candidate)| candidate)
    }
}

/// The next element sibling, if unclaimed, holding a digit run of the minimum
/// ticket length, and within `sibling_fallback_distance`.
pub struct CloseSibling;

impl ResolveStrategy for CloseSibling {
    fn name(&self) -> &'static str {
        "close-sibling"
    }

    fn resolve(&self, cx: &ResolveContext<'_>, label: &LabelEntry) -> Option<NodeKey> {
        let sibling = cx.doc.next_element_sibling(label.node)?;
        if cx.tracker.is_claimed(sibling) {
            return None;
        }
        if !cx
            .rules
            .pattern
            .has_digit_run(cx.doc.text_content(sibling).trim())
        {
            return None;
        }
        let distance = dom_distance(cx.doc, label.node, sibling)?;
        (distance <= cx.rules.config.sibling_fallback_distance).then_some(sibling)
    }
}

pub struct ValueResolver {
    structural: Vec<Box<dyn ResolveStrategy>>,
    nearest: Vec<Box<dyn ResolveStrategy>>,
}

impl Default for ValueResolver {
    fn default() -> Self {
        Self::new(
            vec![Box::new(WrapperLookup), Box::new(DigitSibling)],
            vec![Box::new(NearestCandidate), Box::new(CloseSibling)],
        )
    }
}

fn first_hit(
    chain: &[Box<dyn ResolveStrategy>],
    cx: &ResolveContext<'_>,
    label: &LabelEntry,
) -> Option<NodeKey> {
    chain.iter().find_map(|strategy| {
        let found = strategy.resolve(cx, label);
        if let Some(node) = found {
            log::debug!(
                target: "linker.resolve",
                "{} label {}: {} strategy picked {node}",
                label.kind,
                label.node,
                strategy.name()
            );
        }
        found
    })
}

impl ValueResolver {
    pub fn new(
        structural: Vec<Box<dyn ResolveStrategy>>,
        nearest: Vec<Box<dyn ResolveStrategy>>,
    ) -> Self {
        Self {
            structural,
            nearest,
        }
    }

    pub fn resolve(&self, cx: &ResolveContext<'_>, label: &LabelEntry) -> Option<NodeKey> {
        if let Some(found) = first_hit(&self.structural, cx, label) {
            if !cx.tracker.is_claimed(found) {
                return Some(found);
            }
            log::debug!(
                target: "linker.resolve",
                "{} label {}: {found} already processed, searching nearby",
                label.kind,
                label.node
            );
        }
        let found = first_hit(&self.nearest, cx, label);
        if found.is_none() {
            log::debug!(
                target: "linker.resolve",
                "{} label {}: no value container",
                label.kind,
                label.node
            );
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LinkerConfig, TicketKind};
    use crate::labels::MatchMethod;
    use dom::{SelectorList, parse_html};

    fn rules() -> Rules {
        Rules::new(LinkerConfig::default()).unwrap()
    }

    fn by_id(doc: &Document, id: &str) -> NodeKey {
        let list = SelectorList::parse(&format!(r#"[id="{id}"]"#)).unwrap();
        doc.query_selector(doc.root(), &list).unwrap()
    }

    fn label(node: NodeKey) -> LabelEntry {
        LabelEntry {
            node,
            kind: TicketKind::Central,
            method: MatchMethod::Specific,
        }
    }

    fn run(strategy: &dyn ResolveStrategy, doc: &Document, tracker: &ProcessedTracker, node: NodeKey) -> Option<NodeKey> {
        let rules = rules();
        let cx = ResolveContext {
            doc,
            rules: &rules,
            tracker,
        };
        strategy.resolve(&cx, &label(node))
    }

    fn tracker() -> ProcessedTracker {
        ProcessedTracker::new("data-kayako-processed")
    }

    #[test]
    fn wrapper_prefers_rich_text_body() {
        let doc = parse_html(
            r#"<div data-test-id="issue.views.field.base">
                 <span id="l">Central Zendesk Ticket IDs</span>
                 <div id="plain" data-test-id="issue.field.value">11111</div>
                 <div id="rich" data-test-id="issue.views.field.rich-text.rich-text-body">22222</div>
               </div>"#,
        );
        let found = run(&WrapperLookup, &doc, &tracker(), by_id(&doc, "l"));
        assert_eq!(found, Some(by_id(&doc, "rich")));
    }

    #[test]
    fn wrapper_priority_picks_prefix_match_first() {
        let doc = parse_html(
            r#"<div data-test-id="issue.views.issue-base.content">
                 <div data-test-id="issue.field.value" id="outer">1</div>
                 <div data-test-id="issue.views.field.text">
                   <span id="l">x</span>
                   <div data-test-id="issue.field.value" id="inner">2</div>
                 </div>
               </div>"#,
        );
        let found = run(&WrapperLookup, &doc, &tracker(), by_id(&doc, "l"));
        assert_eq!(found, Some(by_id(&doc, "inner")));
    }

    #[test]
    fn wrapper_misses_without_ancestor() {
        let doc = parse_html(r#"<div><span id="l">x</span><div data-test-id="issue.field.value">1</div></div>"#);
        assert_eq!(run(&WrapperLookup, &doc, &tracker(), by_id(&doc, "l")), None);
    }

    #[test]
    fn digit_sibling_needs_a_digit() {
        let doc = parse_html(
            r#"<div><span id="a">label</span><span id="b">n/a</span><span id="c">v2</span></div>"#,
        );
        assert_eq!(run(&DigitSibling, &doc, &tracker(), by_id(&doc, "a")), None);
        assert_eq!(
            run(&DigitSibling, &doc, &tracker(), by_id(&doc, "b")),
            Some(by_id(&doc, "c"))
        );
        assert_eq!(run(&DigitSibling, &doc, &tracker(), by_id(&doc, "c")), None);
    }

    #[test]
    fn nearest_picks_closest_within_threshold() {
        let doc = parse_html(
            r#"<div><div>
                 <span id="l">x</span>
                 <div><div data-test-id="issue.field.value" id="far">1</div></div>
                 <div data-test-id="issue.field.value" id="near">2</div>
               </div></div>"#,
        );
        let found = run(&NearestCandidate, &doc, &tracker(), by_id(&doc, "l"));
        assert_eq!(found, Some(by_id(&doc, "near")));
    }

    #[test]
    fn nearest_skips_claimed_candidates() {
        let mut doc = parse_html(
            r#"<div><span id="l">x</span>
                 <div data-test-id="issue.field.value" id="near">1</div>
                 <div><div data-test-id="issue.field.value" id="far">2</div></div>
               </div>"#,
        );
        let near = by_id(&doc, "near");
        let mut tracker = tracker();
        tracker.claim(&mut doc, near);
        let found = run(&NearestCandidate, &doc, &tracker, by_id(&doc, "l"));
        assert_eq!(found, Some(by_id(&doc, "far")));
    }

    #[test]
    fn nearest_respects_max_distance() {
        let doc = parse_html(
            r#"<div>
                 <span id="l">x</span>
                 <div><div><div><div><div><div>
                   <div data-test-id="issue.field.value" id="deep">1</div>
                 </div></div></div></div></div></div>
               </div>"#,
        );
        // l -> div (1), deep -> 7 levels up (7) = 8
        assert_eq!(run(&NearestCandidate, &doc, &tracker(), by_id(&doc, "l")), None);
    }

    #[test]
    fn nearest_accepts_candidate_at_max_distance() {
        let doc = parse_html(
            r#"<div>
                 <span id="l">x</span>
                 <div><div><div><div><div>
                   <div data-test-id="issue.field.value" id="deep">1</div>
                 </div></div></div></div></div>
               </div>"#,
        );
        // l -> div (1), deep -> 6 levels up (6) = 7
        let l = by_id(&doc, "l");
        let deep = by_id(&doc, "deep");
        assert_eq!(crate::distance::dom_distance(&doc, l, deep), Some(7));
        assert_eq!(run(&NearestCandidate, &doc, &tracker(), l), Some(deep));
    }

    #[test]
    fn nearest_tie_takes_the_first_candidate_seen() {
        let doc = parse_html(
            r#"<div>
                 <div data-test-id="issue.field.value" id="plain">1</div>
                 <span id="l">x</span>
                 <div data-test-id="issue.views.field.rich-text.rich-text-body" id="rich">2</div>
               </div>"#,
        );
        // Equidistant; the rich-text selector is enumerated first.
        let found = run(&NearestCandidate, &doc, &tracker(), by_id(&doc, "l"));
        assert_eq!(found, Some(by_id(&doc, "rich")));
    }

    #[test]
    fn close_sibling_requires_full_digit_run() {
        let doc = parse_html(
            r#"<div><span id="a">x</span><span id="b">1234</span><span id="c">123456</span></div>"#,
        );
        assert_eq!(run(&CloseSibling, &doc, &tracker(), by_id(&doc, "a")), None);
        assert_eq!(
            run(&CloseSibling, &doc, &tracker(), by_id(&doc, "b")),
            Some(by_id(&doc, "c"))
        );
    }

    #[test]
    fn close_sibling_honours_configured_distance() {
        let doc = parse_html(r#"<div><span id="l">x</span><span id="v">12345</span></div>"#);
        let (l, v) = (by_id(&doc, "l"), by_id(&doc, "v"));
        // Siblings are two hops apart through their parent.
        assert_eq!(crate::distance::dom_distance(&doc, l, v), Some(2));
        assert_eq!(run(&CloseSibling, &doc, &tracker(), l), Some(v));

        let config = LinkerConfig {
            sibling_fallback_distance: 1,
            ..LinkerConfig::default()
        };
        let rules = Rules::new(config).unwrap();
        let tracker = tracker();
        let cx = ResolveContext {
            doc: &doc,
            rules: &rules,
            tracker: &tracker,
        };
        assert_eq!(CloseSibling.resolve(&cx, &label(l)), None);
    }

    #[test]
    fn resolver_falls_back_to_digit_sibling_without_wrapper() {
        let doc = parse_html(r#"<div><span id="l">x</span><span id="v">See 98765</span></div>"#);
        let rules = rules();
        let tracker = tracker();
        let cx = ResolveContext {
            doc: &doc,
            rules: &rules,
            tracker: &tracker,
        };
        let found = ValueResolver::default().resolve(&cx, &label(by_id(&doc, "l")));
        assert_eq!(found, Some(by_id(&doc, "v")));
    }

    #[test]
    fn resolver_moves_on_when_structural_hit_is_claimed() {
        let mut doc = parse_html(
            r#"<div>
                 <div data-test-id="issue.views.field.base">
                   <span id="l">x</span>
                   <div data-test-id="issue.field.value" id="taken">11111</div>
                 </div>
                 <div data-test-id="issue.field.value" id="free">22222</div>
               </div>"#,
        );
        let taken = by_id(&doc, "taken");
        let mut tracker = tracker();
        tracker.claim(&mut doc, taken);
        let rules = rules();
        let cx = ResolveContext {
            doc: &doc,
            rules: &rules,
            tracker: &tracker,
        };
        let found = ValueResolver::default().resolve(&cx, &label(by_id(&doc, "l")));
        assert_eq!(found, Some(by_id(&doc, "free")));
    }

    #[test]
    fn resolver_gives_up_quietly() {
        let doc = parse_html(r#"<div><span id="l">x</span></div>"#);
        let rules = rules();
        let tracker = tracker();
        let cx = ResolveContext {
            doc: &doc,
            rules: &rules,
            tracker: &tracker,
        };
        assert_eq!(ValueResolver::default().resolve(&cx, &label(by_id(&doc, "l"))), None);
    }
}
