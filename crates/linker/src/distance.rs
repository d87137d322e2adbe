use dom::{Document, NodeKey};

/// Structural proximity of two nodes, counted in parent hops through their
/// nearest shared ancestor.
///
/// - `Some(0)` when either node contains the other.
/// - Otherwise the hops from `a` up to the first ancestor containing `b`, plus
///   the hops from `b` up to that ancestor.
/// - `None` when `a` runs out of parents first, which only happens for nodes
///   in different trees (e.g. one of them is detached).
pub fn dom_distance(doc: &Document, a: NodeKey, b: NodeKey) -> Option<u32> {
    if !doc.is_live(a) || !doc.is_live(b) {
        return None;
    }
    if doc.contains(a, b) || doc.contains(b, a) {
        return Some(0);
    }

    let mut shared = a;
    let mut up = 0u32;
    while !doc.contains(shared, b) {
        shared = doc.parent(shared)?;
        up += 1;
    }

    let mut down = 0u32;
    let mut current = b;
    while current != shared {
        current = doc.parent(current)?;
        down += 1;
    }

    Some(up + down)
}
