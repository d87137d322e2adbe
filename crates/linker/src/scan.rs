use crate::config::{ConfigError, LinkerConfig, Rules};
use crate::labels::find_labels;
use crate::processed::ProcessedTracker;
use crate::resolve::{ResolveContext, ValueResolver};
use crate::rewrite::link_ticket_ids;
use dom::{Document, NodeKey};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Scanning,
}

/// What one pass did. Purely informational.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PassReport {
    pub labels: usize,
    /// Containers claimed and run through the rewriter.
    pub containers: usize,
    /// Labels whose container was already claimed or could not be found.
    pub skipped: usize,
    pub links: usize,
}

/// Entry point: one call to [`ScanOrchestrator::run_pass`] is one pass.
///
/// The orchestrator owns the processed markers. Markers survive between
/// passes until [`ScanOrchestrator::clear_markers`] is called, which hosts do
/// before every pass they trigger (see [`ScanOrchestrator::rescan`]).
pub struct ScanOrchestrator {
    rules: Rules,
    resolver: ValueResolver,
    tracker: ProcessedTracker,
    state: ScanState,
}

impl ScanOrchestrator {
    pub fn new(config: LinkerConfig) -> Result<Self, ConfigError> {
        Ok(Self::with_rules(Rules::new(config)?))
    }

    pub fn with_rules(rules: Rules) -> Self {
        let tracker = ProcessedTracker::new(&rules.config.marker_attribute);
        Self {
            rules,
            resolver: ValueResolver::default(),
            tracker,
            state: ScanState::Idle,
        }
    }

    pub fn with_resolver(mut self, resolver: ValueResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn tracker(&self) -> &ProcessedTracker {
        &self.tracker
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn clear_markers(&mut self, doc: &mut Document) {
        self.tracker.clear_markers(doc);
    }

    /// Clear markers, then run a pass over the whole document.
    pub fn rescan(&mut self, doc: &mut Document) -> PassReport {
        self.clear_markers(doc);
        let root = doc.root();
        self.run_pass(doc, root)
    }

    pub fn run_pass(&mut self, doc: &mut Document, scope: NodeKey) -> PassReport {
        self.state = ScanState::Scanning;
        self.tracker.begin_pass();

        let labels = find_labels(doc, scope, &self.rules, &self.tracker);
        let mut report = PassReport {
            labels: labels.len(),
            ..PassReport::default()
        };

        for label in &labels {
            let container = {
                let cx = ResolveContext {
                    doc,
                    rules: &self.rules,
                    tracker: &self.tracker,
                };
                self.resolver.resolve(&cx, label)
            };
            let Some(container) = container else {
                report.skipped += 1;
                continue;
            };
            if self.tracker.is_claimed(container) {
                log::debug!(
                    target: "linker.scan",
                    "skipping already processed container {container} for {} label {}",
                    label.kind,
                    label.node
                );
                report.skipped += 1;
                continue;
            }
            let links = link_ticket_ids(doc, &self.rules, container, label.kind);
            self.tracker.claim(doc, container);
            report.containers += 1;
            report.links += links;
            log::debug!(
                target: "linker.scan",
                "{} label {} -> {container}: {links} links",
                label.kind,
                label.node
            );
        }

        self.state = ScanState::Idle;
        log::debug!(target: "linker.scan", "pass complete: {report:?}");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::LabelEntry;
    use crate::resolve::{ResolveStrategy, WrapperLookup};
    use dom::{SelectorList, parse_html};

    // Picks whatever element carries `data-pick`, ignoring the label.
    struct Picked;

    impl ResolveStrategy for Picked {
        fn name(&self) -> &'static str {
            "picked"
        }

        fn resolve(&self, cx: &ResolveContext<'_>, _label: &LabelEntry) -> Option<NodeKey> {
            let list = SelectorList::parse("[data-pick]").ok()?;
            cx.doc.query_selector(cx.doc.root(), &list)
        }
    }

    #[test]
    fn state_returns_to_idle() {
        let mut doc = parse_html("<p>nothing</p>");
        let mut scan = ScanOrchestrator::new(LinkerConfig::default()).unwrap();
        assert_eq!(scan.state(), ScanState::Idle);
        let report = scan.rescan(&mut doc);
        assert_eq!(report, PassReport::default());
        assert_eq!(scan.state(), ScanState::Idle);
    }

    #[test]
    fn one_container_serves_one_label_per_pass() {
        // Both labels resolve structurally to the same value; the second one
        // finds nothing else nearby and is skipped.
        let mut doc = parse_html(
            r#"<div data-test-id="issue.views.field.base">
                 <span data-test-id="issue.field.label">Central Zendesk Ticket IDs</span>
                 <span data-test-id="issue.field.label">MSO Zendesk IDs</span>
                 <div data-test-id="issue.field.value">12345</div>
               </div>"#,
        );
        let mut scan = ScanOrchestrator::new(LinkerConfig::default()).unwrap();
        let report = scan.rescan(&mut doc);
        assert_eq!(report.labels, 2);
        assert_eq!(report.containers, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.links, 1);
    }

    #[test]
    fn marked_containers_are_skipped_until_cleared() {
        let mut doc = parse_html(
            r#"<div><span data-test-id="issue.field.label">Central Zendesk Ticket IDs</span><span>12345</span></div>"#,
        );
        let mut scan = ScanOrchestrator::new(LinkerConfig::default()).unwrap();
        let root = doc.root();
        assert_eq!(scan.run_pass(&mut doc, root).containers, 1);
        assert_eq!(scan.tracker().marked_count(), 1);

        // Without clearing, the marked sibling is not claimed again.
        let second = scan.run_pass(&mut doc, root);
        assert_eq!(second.containers, 0);
        assert_eq!(second.skipped, 1);

        // After clearing it is reprocessed, but nothing new gets linked.
        let third = scan.rescan(&mut doc);
        assert_eq!(third.containers, 1);
        assert_eq!(third.links, 0);
    }

    #[test]
    fn custom_strategy_chain_replaces_the_default() {
        let html = r#"<div data-test-id="issue.views.field.base"><span data-test-id="issue.field.label">Central Zendesk Ticket IDs</span><div data-test-id="issue.field.value">11111</div></div><p data-pick="">22222</p>"#;
        let value = SelectorList::parse(r#"[data-test-id="issue.field.value"]"#).unwrap();
        let picked = SelectorList::parse("[data-pick]").unwrap();

        let mut doc = parse_html(html);
        let report = ScanOrchestrator::new(LinkerConfig::default()).unwrap().rescan(&mut doc);
        assert_eq!(report.links, 1);
        let v = doc.query_selector(doc.root(), &value).unwrap();
        assert!(doc.has_attr(v, "data-kayako-processed"));

        let mut doc = parse_html(html);
        let resolver = ValueResolver::new(vec![Box::new(Picked)], vec![Box::new(WrapperLookup)]);
        let mut scan = ScanOrchestrator::new(LinkerConfig::default())
            .unwrap()
            .with_resolver(resolver);
        assert_eq!(scan.rescan(&mut doc).links, 1);
        let p = doc.query_selector(doc.root(), &picked).unwrap();
        let v = doc.query_selector(doc.root(), &value).unwrap();
        assert!(doc.has_attr(p, "data-kayako-processed"));
        assert!(!doc.has_attr(v, "data-kayako-processed"));
        assert_eq!(doc.text_content(v), "11111");

        // Once the pick is claimed the second attempt takes over.
        let root = doc.root();
        let second = scan.run_pass(&mut doc, root);
        assert_eq!(second.containers, 1);
        assert_eq!(second.links, 1);
        assert!(doc.has_attr(v, "data-kayako-processed"));
    }
}
