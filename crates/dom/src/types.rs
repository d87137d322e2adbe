use std::sync::Arc;

/// Stable identity of a node within one [`crate::Document`].
///
/// Keys are never reused after a node is removed, so a stale key can only
/// ever resolve to `DomError::MissingKey`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(pub u32);

impl NodeKey {
    /// Reserved sentinel for "unassigned/invalid" identity.
    pub const INVALID: NodeKey = NodeKey(0);
}

impl std::fmt::Display for NodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element {
        name: Arc<str>,
        attributes: Vec<(Arc<str>, Option<String>)>,
    },
    Text {
        text: String,
    },
    Comment {
        text: String,
    },
}

impl NodeKind {
    pub fn allows_children(&self) -> bool {
        matches!(self, NodeKind::Document | NodeKind::Element { .. })
    }
}

#[derive(Clone, Debug)]
pub(crate) struct NodeRecord {
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeKey>,
    pub(crate) children: Vec<NodeKey>,
    pub(crate) click_barrier: bool,
}

impl NodeRecord {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            click_barrier: false,
        }
    }
}
