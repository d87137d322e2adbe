//! Mutation records, modelled on the MutationObserver record types.
//!
//! Every mutating [`crate::Document`] operation appends one record. Hosts drain
//! them with `Document::take_mutations` and decide whether a rescan is due.

use crate::NodeKey;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationKind {
    /// Children were added to or removed from `target`.
    ChildList,
    /// The text of the text/comment node `target` changed.
    CharacterData,
    /// An attribute on the element `target` changed.
    Attributes { name: Arc<str> },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationRecord {
    pub kind: MutationKind,
    pub target: NodeKey,
}

impl MutationRecord {
    pub fn child_list(target: NodeKey) -> Self {
        Self {
            kind: MutationKind::ChildList,
            target,
        }
    }

    pub fn character_data(target: NodeKey) -> Self {
        Self {
            kind: MutationKind::CharacterData,
            target,
        }
    }

    pub fn attributes(target: NodeKey, name: &str) -> Self {
        Self {
            kind: MutationKind::Attributes {
                name: Arc::from(name),
            },
            target,
        }
    }
}
