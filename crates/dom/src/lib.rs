//! Arena-backed live DOM used by the ticket linker.
//!
//! The document is mutated in place and keeps stable [`NodeKey`]s, parent
//! links and a log of [`MutationRecord`]s so that callers can observe what a
//! pass changed.

mod document;
mod error;
mod mutation;
mod parse;
pub mod selector;
mod serialize;
mod types;

pub use crate::document::{Ancestors, Descendants, Document};
pub use crate::error::DomError;
pub use crate::mutation::{MutationKind, MutationRecord};
pub use crate::parse::{parse_html, parse_into};
pub use crate::selector::{Selector, SelectorError, SelectorList};
pub use crate::serialize::{inner_html, outer_html, outline};
pub use crate::types::{NodeKey, NodeKind};
