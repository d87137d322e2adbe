use crate::{Document, NodeKey, NodeKind};

fn push_escaped(out: &mut String, text: &str, in_attribute: bool) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if in_attribute => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

fn is_void(name: &str) -> bool {
    matches!(
        name,
        "area" | "base" | "br" | "col" | "embed" | "hr" | "img" | "input" | "link" | "meta"
            | "param" | "source" | "track" | "wbr"
    )
}

fn write_node(doc: &Document, key: NodeKey, out: &mut String) {
    match doc.kind(key) {
        Some(NodeKind::Document) => {
            for &c in doc.children(key) {
                write_node(doc, c, out);
            }
        }
        Some(NodeKind::Element { name, attributes }) => {
            out.push('<');
            out.push_str(name);
            for (k, v) in attributes {
                out.push(' ');
                out.push_str(k);
                if let Some(v) = v {
                    out.push_str("=\"");
                    push_escaped(out, v, true);
                    out.push('"');
                }
            }
            out.push('>');
            if is_void(name) {
                return;
            }
            for &c in doc.children(key) {
                write_node(doc, c, out);
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
        Some(NodeKind::Text { text }) => push_escaped(out, text, false),
        Some(NodeKind::Comment { text }) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        None => {}
    }
}

pub fn outer_html(doc: &Document, key: NodeKey) -> String {
    let mut out = String::new();
    write_node(doc, key, &mut out);
    out
}

pub fn inner_html(doc: &Document, key: NodeKey) -> String {
    let mut out = String::new();
    for &c in doc.children(key) {
        write_node(doc, c, &mut out);
    }
    out
}

/// Indented one-line-per-node dump, capped at `cap` lines. Meant for logs and
/// test failure messages.
pub fn outline(doc: &Document, root: NodeKey, cap: usize) -> Vec<String> {
    fn walk(doc: &Document, key: NodeKey, depth: usize, out: &mut Vec<String>, left: &mut usize) {
        if *left == 0 {
            return;
        }
        *left -= 1;
        let indent = "  ".repeat(depth);
        match doc.kind(key) {
            Some(NodeKind::Document) => out.push(format!("{indent}#document")),
            Some(NodeKind::Element { name, attributes }) => {
                let mut line = format!("{indent}<{name}");
                for (k, v) in attributes {
                    match v {
                        Some(v) => line.push_str(&format!(r#" {k}="{v}""#)),
                        None => line.push_str(&format!(" {k}")),
                    }
                }
                line.push('>');
                out.push(line);
            }
            Some(NodeKind::Text { text }) => {
                let t = text.replace('\n', " ");
                let t = t.trim();
                if !t.is_empty() {
                    let show: String = if t.chars().count() > 40 {
                        let head: String = t.chars().take(40).collect();
                        format!("{head}…")
                    } else {
                        t.to_string()
                    };
                    out.push(format!("{indent}\"{show}\""));
                }
            }
            Some(NodeKind::Comment { text }) => out.push(format!("{indent}<!-- {text} -->")),
            None => return,
        }
        for &c in doc.children(key) {
            walk(doc, c, depth + 1, out, left);
        }
    }

    let mut out = Vec::new();
    let mut left = cap;
    walk(doc, root, 0, &mut out, &mut left);
    out
}
