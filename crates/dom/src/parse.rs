//! Tolerant HTML fragment parser.
//!
//! This is not an HTML5 tree builder. It exists so that hosts and tests can
//! describe documents as markup:
//! - Tag/attribute names are ASCII `[A-Za-z0-9:_-]`, stored lowercase.
//! - Void elements and `<x/>` never take children.
//! - `<script>`/`<style>` bodies are raw text.
//! - An end tag closes the nearest open element of the same name; stray end
//!   tags are ignored. Unclosed elements are closed at end of input.
//! - Entities: `&amp; &lt; &gt; &quot; &apos; &nbsp;` and well-formed numeric
//!   references. Anything else is left as written.

use crate::{Document, NodeKey};
use memchr::memchr;

#[derive(Debug, PartialEq, Eq)]
enum Token {
    StartTag {
        name: String,
        attributes: Vec<(String, Option<String>)>,
        self_closing: bool,
    },
    EndTag(String),
    Comment(String),
    Text(String),
}

fn is_void_element(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

fn is_name_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'-' || c == b'_' || c == b':'
}

fn decode_entities(s: &str) -> String {
    if memchr(b'&', s.as_bytes()).is_none() {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        let decoded = rest.find(';').filter(|&end| end <= 10).and_then(|end| {
            let body = &rest[1..end];
            let ch = match body {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => {
                    let num = body.strip_prefix('#')?;
                    let hex = num.strip_prefix('x').or_else(|| num.strip_prefix('X'));
                    let value = match hex {
                        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                        None => num.parse::<u32>().ok()?,
                    };
                    char::from_u32(value)
                }
            }?;
            Some((ch, end + 1))
        });
        match decoded {
            Some((ch, consumed)) => {
                out.push(ch);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn tokenize(input: &str) -> Vec<Token> {
    let mut out = Vec::new();
    let bytes = input.as_bytes();
    let len = bytes.len();
    let mut i = 0;
    // Slices are only cut at ASCII structural bytes, so they stay on UTF-8 boundaries.
    while i < len {
        if bytes[i] != b'<' {
            let start = i;
            i = memchr(b'<', &bytes[i..]).map_or(len, |rel| i + rel);
            out.push(Token::Text(decode_entities(&input[start..i])));
            continue;
        }
        if input[i..].starts_with("<!--") {
            let body_start = i + 4;
            match input[body_start..].find("-->") {
                Some(end) => {
                    out.push(Token::Comment(input[body_start..body_start + end].to_string()));
                    i = body_start + end + 3;
                }
                None => {
                    out.push(Token::Comment(input[body_start..].to_string()));
                    i = len;
                }
            }
            continue;
        }
        if i + 1 < len && bytes[i + 1] == b'!' {
            // Doctype and other declarations carry nothing we keep.
            i = memchr(b'>', &bytes[i..]).map_or(len, |rel| i + rel + 1);
            continue;
        }
        if i + 1 < len && bytes[i + 1] == b'/' {
            let start = i + 2;
            let mut j = start;
            while j < len && is_name_char(bytes[j]) {
                j += 1;
            }
            let name = input[start..j].to_ascii_lowercase();
            i = memchr(b'>', &bytes[j..]).map_or(len, |rel| j + rel + 1);
            if !name.is_empty() {
                out.push(Token::EndTag(name));
            }
            continue;
        }

        let start = i + 1;
        let mut k = start;
        while k < len && is_name_char(bytes[k]) {
            k += 1;
        }
        if k == start {
            // A lone '<' is text.
            out.push(Token::Text("<".to_string()));
            i += 1;
            continue;
        }
        let name = input[start..k].to_ascii_lowercase();
        let mut attributes = Vec::new();
        let mut self_closing = false;
        loop {
            while k < len && bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            if k >= len {
                break;
            }
            if bytes[k] == b'>' {
                k += 1;
                break;
            }
            if bytes[k] == b'/' {
                if k + 1 < len && bytes[k + 1] == b'>' {
                    self_closing = true;
                    k += 2;
                    break;
                }
                k += 1;
                continue;
            }
            let name_start = k;
            while k < len && is_name_char(bytes[k]) {
                k += 1;
            }
            if name_start == k {
                k += 1;
                continue;
            }
            let attr_name = input[name_start..k].to_ascii_lowercase();
            while k < len && bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            let mut value = None;
            if k < len && bytes[k] == b'=' {
                k += 1;
                while k < len && bytes[k].is_ascii_whitespace() {
                    k += 1;
                }
                if k < len && (bytes[k] == b'"' || bytes[k] == b'\'') {
                    let quote = bytes[k];
                    let vstart = k + 1;
                    let vend = memchr(quote, &bytes[vstart..]).map_or(len, |rel| vstart + rel);
                    value = Some(decode_entities(&input[vstart..vend]));
                    k = (vend + 1).min(len);
                } else {
                    let vstart = k;
                    while k < len && !bytes[k].is_ascii_whitespace() && bytes[k] != b'>' {
                        k += 1;
                    }
                    value = Some(decode_entities(&input[vstart..k]));
                }
            }
            attributes.push((attr_name, value));
        }
        if is_void_element(&name) {
            self_closing = true;
        }
        let raw = !self_closing && (name == "script" || name == "style");
        out.push(Token::StartTag {
            name: name.clone(),
            attributes,
            self_closing,
        });
        i = k;
        if raw {
            let close = format!("</{name}");
            let body_end = find_ignore_ascii_case(&input[i..], &close).map_or(len, |rel| i + rel);
            if body_end > i {
                out.push(Token::Text(input[i..body_end].to_string()));
            }
            out.push(Token::EndTag(name));
            i = memchr(b'>', &bytes[body_end..]).map_or(len, |rel| body_end + rel + 1);
        }
    }
    out
}

fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    let hay = haystack.as_bytes();
    let n = needle.len();
    (0..=hay.len().checked_sub(n)?).find(|&i| hay[i..i + n].eq_ignore_ascii_case(needle.as_bytes()))
}

/// Parse markup into a fresh [`Document`]. The returned document has no
/// pending mutation records.
pub fn parse_html(input: &str) -> Document {
    let mut doc = Document::new();
    let root = doc.root();
    parse_into(&mut doc, root, input);
    doc.take_mutations();
    doc
}

/// Parse markup and append the resulting nodes under `parent`.
///
/// Unlike [`parse_html`], mutation records are kept, so hosts can use this to
/// simulate content arriving in a live page.
pub fn parse_into(doc: &mut Document, parent: NodeKey, input: &str) {
    let mut open: Vec<(NodeKey, String)> = Vec::new();
    for token in tokenize(input) {
        let current = open.last().map_or(parent, |(k, _)| *k);
        match token {
            Token::Text(text) => {
                if text.is_empty() {
                    continue;
                }
                let node = doc.create_text(&text);
                append(doc, current, node);
            }
            Token::Comment(text) => {
                let node = doc.create_comment(&text);
                append(doc, current, node);
            }
            Token::StartTag {
                name,
                attributes,
                self_closing,
            } => {
                let node = doc.create_element(&name);
                for (k, v) in &attributes {
                    if let Err(err) = doc.set_attribute(node, k, v.as_deref().unwrap_or("")) {
                        log::debug!(target: "dom.parse", "dropping attribute {k}: {err}");
                    }
                }
                append(doc, current, node);
                if !self_closing {
                    open.push((node, name));
                }
            }
            Token::EndTag(name) => {
                if let Some(pos) = open.iter().rposition(|(_, n)| *n == name) {
                    open.truncate(pos);
                }
            }
        }
    }
}

fn append(doc: &mut Document, parent: NodeKey, child: NodeKey) {
    if let Err(err) = doc.append_child(parent, child) {
        log::debug!(target: "dom.parse", "dropping node {child}: {err}");
    }
}
