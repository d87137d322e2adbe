//! Ticket-id linking for issue-tracker pages.
//!
//! A pass locates field labels ([`labels`]), resolves each to the element that
//! holds its value ([`resolve`]) and rewrites ticket ids found in that
//! element's text into links ([`rewrite`]). [`ScanOrchestrator`] drives a pass
//! and owns the processed markers that keep passes idempotent.

pub mod config;
pub mod distance;
pub mod labels;
pub mod pattern;
pub mod processed;
pub mod resolve;
pub mod rewrite;
pub mod scan;

pub use crate::config::{ConfigError, LinkerConfig, Rules, SelectorConfig, TicketKind, TicketType};
pub use crate::distance::dom_distance;
pub use crate::labels::{LabelEntry, MatchMethod, find_labels};
pub use crate::pattern::{TicketMatch, TicketPattern};
pub use crate::processed::ProcessedTracker;
pub use crate::resolve::{ResolveContext, ResolveStrategy, ValueResolver};
pub use crate::rewrite::{link_ticket_ids, rewrite};
pub use crate::scan::{PassReport, ScanOrchestrator, ScanState};
