//! Glue between a live page and the scan orchestrator.
//!
//! The page reports what happened (load, navigation, DOM mutations); the
//! linker coalesces those reports and, once things settle, clears the
//! processed markers and runs a fresh pass.

use crate::trigger::{DEFAULT_DEBOUNCE_MS, Debouncer, RescanTrigger};
use dom::{Document, MutationKind, MutationRecord, NodeKey};
use linker::{ConfigError, LinkerConfig, PassReport, ProcessedTracker, ScanOrchestrator};
use serde::Deserialize;
use std::time::{Duration, Instant};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub debounce_ms: u64,
    pub linker: LinkerConfig,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            linker: LinkerConfig::default(),
        }
    }
}

impl HostConfig {
    /// ```toml
    /// debounce_ms = 250
    ///
    /// [linker]
    /// min_id_len = 6
    /// ```
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        toml::from_str(input).map_err(ConfigError::Toml)
    }
}

/// The node a record is judged by: text changes count against the element
/// holding the text. Attribute changes are not observed at all.
fn record_subject(doc: &Document, record: &MutationRecord) -> Option<NodeKey> {
    match record.kind {
        MutationKind::CharacterData => doc.parent_element(record.target),
        MutationKind::ChildList => Some(record.target),
        MutationKind::Attributes { .. } => None,
    }
}

/// Whether a mutation record should schedule a rescan.
///
/// Only child-list and text changes count. Changes inside a marked container
/// are the linker's own output (or content it already handled) and are
/// ignored.
pub fn is_relevant(doc: &Document, tracker: &ProcessedTracker, record: &MutationRecord) -> bool {
    match record_subject(doc, record) {
        Some(subject) => !tracker.is_within_marked(doc, subject),
        None => false,
    }
}

pub struct TicketLinker {
    scan: ScanOrchestrator,
    debouncer: Debouncer,
    passes: u64,
}

impl TicketLinker {
    pub fn new(config: HostConfig) -> Result<Self, ConfigError> {
        let scan = ScanOrchestrator::new(config.linker)?;
        Ok(Self::with_orchestrator(
            scan,
            Duration::from_millis(config.debounce_ms),
        ))
    }

    pub fn with_orchestrator(scan: ScanOrchestrator, debounce: Duration) -> Self {
        Self {
            scan,
            debouncer: Debouncer::new(debounce),
            passes: 0,
        }
    }

    pub fn orchestrator(&self) -> &ScanOrchestrator {
        &self.scan
    }

    pub fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }

    /// Passes run so far.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn notify(&mut self, trigger: RescanTrigger, now: Instant) {
        log::trace!(target: "ticket_linker.host", "rescan requested: {trigger:?}");
        self.debouncer.notify(trigger, now);
    }

    /// Drain the document's pending mutation records and schedule a rescan if
    /// any of them is relevant. Returns the number of relevant records.
    pub fn notify_mutations(&mut self, doc: &mut Document, now: Instant) -> usize {
        let records = doc.take_mutations();
        if records.is_empty() {
            return 0;
        }
        let relevant = records
            .iter()
            .filter(|record| is_relevant(doc, self.scan.tracker(), record))
            .count();
        log::trace!(
            target: "ticket_linker.host",
            "{relevant} of {} mutation records relevant",
            records.len()
        );
        if relevant > 0 {
            self.notify(RescanTrigger::Mutation, now);
        }
        relevant
    }

    /// Run the pending pass if its debounce window has elapsed.
    pub fn poll(&mut self, doc: &mut Document, now: Instant) -> Option<PassReport> {
        let trigger = self.debouncer.poll(now)?;
        log::debug!(target: "ticket_linker.host", "rescanning after {trigger:?}");
        Some(self.run(doc, now))
    }

    /// Run a pass immediately, dropping any pending request.
    pub fn rescan_now(&mut self, doc: &mut Document, now: Instant) -> PassReport {
        self.debouncer.cancel();
        self.run(doc, now)
    }

    fn run(&mut self, doc: &mut Document, now: Instant) -> PassReport {
        // Records queued before the pass are covered by it.
        doc.take_mutations();
        let report = self.scan.rescan(doc);
        self.passes += 1;
        // The pass's own edits land inside containers it just marked, so this
        // only re-arms the debouncer if something else slipped in.
        self.notify_mutations(doc, now);
        log::debug!(
            target: "ticket_linker.host",
            "pass {} done: {} links in {} containers",
            self.passes,
            report.links,
            report.containers
        );
        report
    }
}
