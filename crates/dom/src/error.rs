use crate::NodeKey;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    InvalidKey(NodeKey),
    MissingKey(NodeKey),
    WrongNodeKind(NodeKey),
    InvalidParent(NodeKey),
    InvalidSibling { parent: NodeKey, before: NodeKey },
    CycleDetected { parent: NodeKey, child: NodeKey },
}

impl std::fmt::Display for DomError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomError::InvalidKey(key) => write!(f, "invalid node key {key}"),
            DomError::MissingKey(key) => write!(f, "node {key} is not in the document"),
            DomError::WrongNodeKind(key) => write!(f, "node {key} has the wrong kind"),
            DomError::InvalidParent(key) => write!(f, "node {key} cannot be used as a parent here"),
            DomError::InvalidSibling { parent, before } => {
                write!(f, "node {before} is not a child of {parent}")
            }
            DomError::CycleDetected { parent, child } => {
                write!(f, "inserting {child} under {parent} would create a cycle")
            }
        }
    }
}

impl std::error::Error for DomError {}
