//! Splicing ticket links into a value container's text.

use crate::config::{Rules, TicketKind, TicketType};
use crate::pattern::TicketMatch;
use dom::{Document, DomError, NodeKey};

/// Text nodes under `container` that may be rewritten, in document order:
/// non-blank, and not directly inside an anchor.
pub fn candidate_text_nodes(doc: &Document, container: NodeKey) -> Vec<NodeKey> {
    doc.descendants(container)
        .filter(|&node| {
            let Some(text) = doc.text(node) else {
                return false;
            };
            if text.trim().is_empty() {
                return false;
            }
            let in_link = doc
                .parent(node)
                .and_then(|p| doc.tag_name(p))
                .is_some_and(|name| name == "a");
            !in_link
        })
        .collect()
}

/// Replace every ticket id in `container`'s text with a link.
///
/// Returns whether anything changed. A kind without a configured ticket type
/// is rejected without touching the document.
pub fn rewrite(doc: &mut Document, rules: &Rules, container: NodeKey, kind: TicketKind) -> bool {
    link_ticket_ids(doc, rules, container, kind) > 0
}

/// Like [`rewrite`], returning the number of links created.
pub fn link_ticket_ids(
    doc: &mut Document,
    rules: &Rules,
    container: NodeKey,
    kind: TicketKind,
) -> usize {
    let Some(ticket) = rules.ticket_type(kind) else {
        log::warn!(target: "linker.rewrite", "no ticket type configured for {kind}; skipping {container}");
        return 0;
    };

    let mut links = 0;
    for node in candidate_text_nodes(doc, container) {
        let Some(text) = doc.text(node).map(str::to_string) else {
            continue;
        };
        let matches = rules.pattern().find_all(&text);
        if matches.is_empty() {
            continue;
        }
        log::trace!(
            target: "linker.rewrite",
            "{} {kind} ids in {node}: {:?}",
            matches.len(),
            text.trim()
        );
        match splice_links(doc, ticket, node, &text, &matches) {
            Ok(()) => links += matches.len(),
            Err(err) => {
                log::warn!(target: "linker.rewrite", "failed to rewrite {node}: {err}");
            }
        }
    }
    links
}

fn create_link(doc: &mut Document, ticket: &TicketType, ticket_id: &str) -> Result<NodeKey, DomError> {
    let href = ticket.href(ticket_id);
    let title = ticket.title(ticket_id);
    let link = doc.create_element_with_attrs(
        "a",
        &[
            ("href", href.as_str()),
            ("title", title.as_str()),
            ("class", ticket.link_class.as_str()),
            ("target", "_blank"),
            ("data-ticket-type", ticket.kind.as_str()),
        ],
    );
    let label = doc.create_text(ticket_id);
    doc.append_child(link, label)?;
    doc.set_click_barrier(link)?;
    Ok(link)
}

// Builds the replacement sequence detached, then swaps it in with one splice.
fn splice_links(
    doc: &mut Document,
    ticket: &TicketType,
    node: NodeKey,
    text: &str,
    matches: &[TicketMatch],
) -> Result<(), DomError> {
    let mut replacement = Vec::with_capacity(matches.len() * 2 + 1);
    let mut last = 0;
    for m in matches {
        if m.start > last {
            replacement.push(doc.create_text(&text[last..m.start]));
        }
        replacement.push(create_link(doc, ticket, &m.ticket_id)?);
        last = m.end;
    }
    if last < text.len() {
        replacement.push(doc.create_text(&text[last..]));
    }
    doc.replace_with(node, &replacement)
}
