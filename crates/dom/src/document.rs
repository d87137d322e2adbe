use crate::error::DomError;
use crate::mutation::MutationRecord;
use crate::types::{NodeKey, NodeKind, NodeRecord};
use std::collections::HashMap;
use std::sync::Arc;

/// Arena-backed live document.
///
/// Invariants:
/// - The document node is created with the arena and can never be removed.
/// - A node has at most one parent; operations never create cycles.
/// - Keys are allocated monotonically and never reused. Arena slots are
///   reused: `remove` and `replace_with` return the slots of the dropped
///   subtree to a free list, so the arena is bounded by the peak number of
///   nodes rather than by every node ever created.
/// - Element and attribute names are stored ASCII-lowercase.
/// - Every mutation of an attached or detached node appends exactly one
///   [`MutationRecord`]; node creation does not.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeRecord>,
    live: HashMap<NodeKey, usize>,
    free: Vec<usize>,
    next_key: u32,
    root: NodeKey,
    mutations: Vec<MutationRecord>,
}

impl Document {
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            live: HashMap::new(),
            free: Vec::new(),
            next_key: 1,
            root: NodeKey::INVALID,
            mutations: Vec::new(),
        };
        doc.root = doc.insert_node(NodeKind::Document);
        doc
    }

    pub fn root(&self) -> NodeKey {
        self.root
    }

    pub fn is_live(&self, key: NodeKey) -> bool {
        self.live.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Allocated arena slots, live or free.
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        // The document node itself is always live.
        self.live.len() <= 1
    }

    // ---- creation -------------------------------------------------------

    pub fn create_element(&mut self, name: &str) -> NodeKey {
        self.insert_node(NodeKind::Element {
            name: Arc::from(name.to_ascii_lowercase()),
            attributes: Vec::new(),
        })
    }

    pub fn create_element_with_attrs(&mut self, name: &str, attributes: &[(&str, &str)]) -> NodeKey {
        self.insert_node(NodeKind::Element {
            name: Arc::from(name.to_ascii_lowercase()),
            attributes: attributes
                .iter()
                .map(|(k, v)| (Arc::from(k.to_ascii_lowercase()), Some((*v).to_string())))
                .collect(),
        })
    }

    pub fn create_text(&mut self, text: &str) -> NodeKey {
        self.insert_node(NodeKind::Text {
            text: text.to_string(),
        })
    }

    pub fn create_comment(&mut self, text: &str) -> NodeKey {
        self.insert_node(NodeKind::Comment {
            text: text.to_string(),
        })
    }

    fn insert_node(&mut self, kind: NodeKind) -> NodeKey {
        let key = NodeKey(self.next_key);
        self.next_key += 1;
        let index = match self.free.pop() {
            Some(index) => {
                self.nodes[index] = NodeRecord::new(kind);
                index
            }
            None => {
                self.nodes.push(NodeRecord::new(kind));
                self.nodes.len() - 1
            }
        };
        self.live.insert(key, index);
        key
    }

    // ---- tree mutation --------------------------------------------------

    pub fn append_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<(), DomError> {
        self.check_insertable(parent, child)?;
        let parent_index = self.index(parent)?;
        let child_index = self.index(child)?;
        self.nodes[parent_index].children.push(child);
        self.nodes[child_index].parent = Some(parent);
        self.mutations.push(MutationRecord::child_list(parent));
        Ok(())
    }

    pub fn insert_before(
        &mut self,
        parent: NodeKey,
        child: NodeKey,
        before: NodeKey,
    ) -> Result<(), DomError> {
        self.check_insertable(parent, child)?;
        let before_index = self.index(before)?;
        if self.nodes[before_index].parent != Some(parent) {
            return Err(DomError::InvalidSibling { parent, before });
        }
        let parent_index = self.index(parent)?;
        let child_index = self.index(child)?;
        let siblings = &mut self.nodes[parent_index].children;
        let pos = siblings
            .iter()
            .position(|k| *k == before)
            .ok_or(DomError::InvalidSibling { parent, before })?;
        siblings.insert(pos, child);
        self.nodes[child_index].parent = Some(parent);
        self.mutations.push(MutationRecord::child_list(parent));
        Ok(())
    }

    /// Remove a node and its entire subtree. Keys in the subtree become invalid.
    pub fn remove(&mut self, key: NodeKey) -> Result<(), DomError> {
        if key == self.root {
            return Err(DomError::InvalidKey(key));
        }
        let index = self.index(key)?;
        if let Some(parent) = self.nodes[index].parent.take() {
            if let Some(parent_index) = self.live.get(&parent).copied() {
                self.nodes[parent_index].children.retain(|k| *k != key);
            }
            self.mutations.push(MutationRecord::child_list(parent));
        }
        self.drop_subtree(key);
        Ok(())
    }

    /// Replace `old` with `replacements`, in order, at `old`'s position.
    ///
    /// All replacements must be detached. On error the document is unchanged.
    pub fn replace_with(&mut self, old: NodeKey, replacements: &[NodeKey]) -> Result<(), DomError> {
        let old_index = self.index(old)?;
        let parent = self.nodes[old_index]
            .parent
            .ok_or(DomError::InvalidParent(old))?;
        for (i, &child) in replacements.iter().enumerate() {
            if child == old {
                return Err(DomError::CycleDetected { parent, child });
            }
            if replacements[..i].contains(&child) {
                return Err(DomError::InvalidParent(child));
            }
            self.check_insertable(parent, child)?;
        }
        let parent_index = self.index(parent)?;
        let pos = self.nodes[parent_index]
            .children
            .iter()
            .position(|k| *k == old)
            .ok_or(DomError::InvalidSibling { parent, before: old })?;
        self.nodes[parent_index]
            .children
            .splice(pos..=pos, replacements.iter().copied());
        for &child in replacements {
            let child_index = self.index(child)?;
            self.nodes[child_index].parent = Some(parent);
        }
        self.nodes[old_index].parent = None;
        self.drop_subtree(old);
        self.mutations.push(MutationRecord::child_list(parent));
        Ok(())
    }

    pub fn set_text(&mut self, key: NodeKey, text: &str) -> Result<(), DomError> {
        let index = self.index(key)?;
        match &mut self.nodes[index].kind {
            NodeKind::Text { text: existing } | NodeKind::Comment { text: existing } => {
                existing.clear();
                existing.push_str(text);
            }
            _ => return Err(DomError::WrongNodeKind(key)),
        }
        self.mutations.push(MutationRecord::character_data(key));
        Ok(())
    }

    pub fn set_attribute(&mut self, key: NodeKey, name: &str, value: &str) -> Result<(), DomError> {
        let index = self.index(key)?;
        let NodeKind::Element { attributes, .. } = &mut self.nodes[index].kind else {
            return Err(DomError::WrongNodeKind(key));
        };
        let name = name.to_ascii_lowercase();
        match attributes.iter().position(|(k, _)| **k == *name) {
            Some(pos) => attributes[pos].1 = Some(value.to_string()),
            None => attributes.push((Arc::from(name.as_str()), Some(value.to_string()))),
        }
        self.mutations.push(MutationRecord::attributes(key, &name));
        Ok(())
    }

    /// Returns whether the attribute was present.
    pub fn remove_attribute(&mut self, key: NodeKey, name: &str) -> Result<bool, DomError> {
        let index = self.index(key)?;
        let NodeKind::Element { attributes, .. } = &mut self.nodes[index].kind else {
            return Err(DomError::WrongNodeKind(key));
        };
        let before = attributes.len();
        attributes.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        let removed = attributes.len() != before;
        if removed {
            self.mutations
                .push(MutationRecord::attributes(key, &name.to_ascii_lowercase()));
        }
        Ok(removed)
    }

    /// Mark an element so that clicks dispatched inside it stop propagating
    /// once they reach it.
    pub fn set_click_barrier(&mut self, key: NodeKey) -> Result<(), DomError> {
        let index = self.index(key)?;
        if !matches!(self.nodes[index].kind, NodeKind::Element { .. }) {
            return Err(DomError::WrongNodeKind(key));
        }
        self.nodes[index].click_barrier = true;
        Ok(())
    }

    pub fn take_mutations(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.mutations)
    }

    pub fn pending_mutations(&self) -> &[MutationRecord] {
        &self.mutations
    }

    fn check_insertable(&self, parent: NodeKey, child: NodeKey) -> Result<(), DomError> {
        if parent == child || child == self.root {
            return Err(DomError::CycleDetected { parent, child });
        }
        let parent_index = self.index(parent)?;
        let child_index = self.index(child)?;
        if !self.nodes[parent_index].kind.allows_children() {
            return Err(DomError::InvalidParent(parent));
        }
        if self.nodes[child_index].parent.is_some() {
            return Err(DomError::InvalidParent(child));
        }
        if self.contains(child, parent) {
            return Err(DomError::CycleDetected { parent, child });
        }
        Ok(())
    }

    fn drop_subtree(&mut self, key: NodeKey) {
        let mut stack = vec![key];
        while let Some(current) = stack.pop() {
            if let Some(index) = self.live.remove(&current) {
                let record = std::mem::replace(&mut self.nodes[index], NodeRecord::new(NodeKind::Document));
                stack.extend(record.children);
                self.free.push(index);
            }
        }
    }

    fn index(&self, key: NodeKey) -> Result<usize, DomError> {
        if key == NodeKey::INVALID {
            return Err(DomError::InvalidKey(key));
        }
        self.live
            .get(&key)
            .copied()
            .ok_or(DomError::MissingKey(key))
    }

    fn record(&self, key: NodeKey) -> Option<&NodeRecord> {
        self.live.get(&key).map(|&index| &self.nodes[index])
    }

    // ---- reads ----------------------------------------------------------

    pub fn kind(&self, key: NodeKey) -> Option<&NodeKind> {
        self.record(key).map(|r| &r.kind)
    }

    pub fn is_element(&self, key: NodeKey) -> bool {
        matches!(self.kind(key), Some(NodeKind::Element { .. }))
    }

    pub fn is_text(&self, key: NodeKey) -> bool {
        matches!(self.kind(key), Some(NodeKind::Text { .. }))
    }

    pub fn tag_name(&self, key: NodeKey) -> Option<&str> {
        match self.kind(key) {
            Some(NodeKind::Element { name, .. }) => Some(name),
            _ => None,
        }
    }

    /// Data of a text node.
    pub fn text(&self, key: NodeKey) -> Option<&str> {
        match self.kind(key) {
            Some(NodeKind::Text { text }) => Some(text),
            _ => None,
        }
    }

    pub fn attributes(&self, key: NodeKey) -> &[(Arc<str>, Option<String>)] {
        match self.kind(key) {
            Some(NodeKind::Element { attributes, .. }) => attributes,
            _ => &[],
        }
    }

    /// Attribute value; valueless attributes read as `""`.
    pub fn attr(&self, key: NodeKey, name: &str) -> Option<&str> {
        self.attributes(key)
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_deref().unwrap_or(""))
    }

    pub fn has_attr(&self, key: NodeKey, name: &str) -> bool {
        self.attr(key, name).is_some()
    }

    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.record(key).and_then(|r| r.parent)
    }

    pub fn parent_element(&self, key: NodeKey) -> Option<NodeKey> {
        self.parent(key).filter(|p| self.is_element(*p))
    }

    pub fn children(&self, key: NodeKey) -> &[NodeKey] {
        self.record(key).map(|r| r.children.as_slice()).unwrap_or(&[])
    }

    pub fn element_children(&self, key: NodeKey) -> impl Iterator<Item = NodeKey> + '_ {
        self.children(key)
            .iter()
            .copied()
            .filter(move |c| self.is_element(*c))
    }

    pub fn child_element_count(&self, key: NodeKey) -> usize {
        self.element_children(key).count()
    }

    pub fn next_element_sibling(&self, key: NodeKey) -> Option<NodeKey> {
        let parent = self.parent(key)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|k| *k == key)?;
        siblings[pos + 1..]
            .iter()
            .copied()
            .find(|k| self.is_element(*k))
    }

    /// Strict ancestors, nearest first, ending at the document node.
    pub fn ancestors(&self, key: NodeKey) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.parent(key),
        }
    }

    /// Strict descendants in document (pre-)order.
    pub fn descendants(&self, key: NodeKey) -> Descendants<'_> {
        let mut stack: Vec<NodeKey> = self.children(key).to_vec();
        stack.reverse();
        Descendants { doc: self, stack }
    }

    /// Inclusive containment, as `Node.contains`.
    pub fn contains(&self, ancestor: NodeKey, node: NodeKey) -> bool {
        if !self.is_live(ancestor) || !self.is_live(node) {
            return false;
        }
        ancestor == node || self.ancestors(node).any(|a| a == ancestor)
    }

    /// Concatenated data of all descendant text nodes, as `Node.textContent`.
    pub fn text_content(&self, key: NodeKey) -> String {
        if let Some(text) = self.text(key) {
            return text.to_string();
        }
        let mut out = String::new();
        for node in self.descendants(key) {
            if let Some(text) = self.text(node) {
                out.push_str(text);
            }
        }
        out
    }

    /// Nodes a click dispatched at `target` bubbles through, target first.
    /// Propagation stops after the first node carrying a click barrier.
    pub fn click_path(&self, target: NodeKey) -> Vec<NodeKey> {
        let mut path = Vec::new();
        let mut current = Some(target).filter(|k| self.is_live(*k));
        while let Some(key) = current {
            path.push(key);
            if self.record(key).is_some_and(|r| r.click_barrier) {
                break;
            }
            current = self.parent(key);
        }
        path
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeKey>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeKey;

    fn next(&mut self) -> Option<NodeKey> {
        let current = self.next?;
        self.next = self.doc.parent(current);
        Some(current)
    }
}

pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeKey>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeKey;

    fn next(&mut self) -> Option<NodeKey> {
        let current = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(current).iter().rev().copied());
        Some(current)
    }
}
