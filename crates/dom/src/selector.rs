//! A deliberately small selector language for querying [`Document`]s.
//!
//! Supported grammar (ASCII only):
//!
//! ```text
//! list      := compound ("," compound)*
//! compound  := (type | "*")? attribute*
//! attribute := "[" name "]" | "[" name op quoted "]"
//! op        := "=" | "^="
//! ```
//!
//! Combinators, pseudo-classes, classes and ids are not supported; callers
//! that need them should spell them as attribute selectors.

use crate::{Document, NodeKey};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    Empty,
    Unterminated(String),
    UnsupportedSyntax(String),
}

impl std::fmt::Display for SelectorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectorError::Empty => write!(f, "empty selector"),
            SelectorError::Unterminated(s) => write!(f, "unterminated selector: {s}"),
            SelectorError::UnsupportedSyntax(s) => write!(f, "unsupported selector syntax: {s}"),
        }
    }
}

impl std::error::Error for SelectorError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrMatch {
    Exists,
    Equals(String),
    Prefix(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrSelector {
    pub name: String,
    pub op: AttrMatch,
}

/// A single compound selector, e.g. `div[data-test-id^="issue"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    /// `None` matches any element.
    pub tag: Option<String>,
    pub attrs: Vec<AttrSelector>,
}

/// Comma-separated selectors; an element matches if any member matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList(pub Vec<Selector>);

fn is_name_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'-' || c == b'_' || c == b':'
}

impl Selector {
    pub fn parse(input: &str) -> Result<Selector, SelectorError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(SelectorError::Empty);
        }
        let bytes = s.as_bytes();
        let mut i = 0;
        let mut tag = None;

        if bytes[0] == b'*' {
            i = 1;
        } else {
            while i < bytes.len() && is_name_char(bytes[i]) {
                i += 1;
            }
            if i > 0 {
                tag = Some(s[..i].to_ascii_lowercase());
            }
        }

        let mut attrs = Vec::new();
        while i < bytes.len() {
            if bytes[i] != b'[' {
                return Err(SelectorError::UnsupportedSyntax(s.to_string()));
            }
            let close = s[i..]
                .find(']')
                .map(|rel| i + rel)
                .ok_or_else(|| SelectorError::Unterminated(s.to_string()))?;
            attrs.push(parse_attr(&s[i + 1..close], s)?);
            i = close + 1;
        }

        Ok(Selector { tag, attrs })
    }

    pub fn matches(&self, doc: &Document, key: NodeKey) -> bool {
        let Some(name) = doc.tag_name(key) else {
            return false;
        };
        if let Some(tag) = &self.tag {
            if !name.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        self.attrs.iter().all(|attr| {
            let Some(value) = doc.attr(key, &attr.name) else {
                return false;
            };
            match &attr.op {
                AttrMatch::Exists => true,
                AttrMatch::Equals(want) => value == want,
                AttrMatch::Prefix(want) => !want.is_empty() && value.starts_with(want.as_str()),
            }
        })
    }
}

// input: `data-test-id="issue.field.value"` (without brackets)
fn parse_attr(inner: &str, whole: &str) -> Result<AttrSelector, SelectorError> {
    let inner = inner.trim();
    let name_end = inner
        .bytes()
        .position(|b| !is_name_char(b))
        .unwrap_or(inner.len());
    if name_end == 0 {
        return Err(SelectorError::UnsupportedSyntax(whole.to_string()));
    }
    let name = inner[..name_end].to_ascii_lowercase();
    let rest = inner[name_end..].trim_start();
    if rest.is_empty() {
        return Ok(AttrSelector {
            name,
            op: AttrMatch::Exists,
        });
    }
    let (prefix, value) = if let Some(v) = rest.strip_prefix("^=") {
        (true, v)
    } else if let Some(v) = rest.strip_prefix('=') {
        (false, v)
    } else {
        return Err(SelectorError::UnsupportedSyntax(whole.to_string()));
    };
    let value = unquote(value.trim()).ok_or_else(|| SelectorError::Unterminated(whole.to_string()))?;
    let op = if prefix {
        AttrMatch::Prefix(value.to_string())
    } else {
        AttrMatch::Equals(value.to_string())
    };
    Ok(AttrSelector { name, op })
}

fn unquote(value: &str) -> Option<&str> {
    let bytes = value.as_bytes();
    match bytes.first() {
        Some(&q) if q == b'"' || q == b'\'' => {
            if bytes.len() >= 2 && bytes[bytes.len() - 1] == q {
                Some(&value[1..value.len() - 1])
            } else {
                None
            }
        }
        Some(_) => Some(value),
        None => None,
    }
}

impl SelectorList {
    pub fn parse(input: &str) -> Result<SelectorList, SelectorError> {
        let selectors = split_list(input)
            .into_iter()
            .map(Selector::parse)
            .collect::<Result<Vec<_>, _>>()?;
        if selectors.is_empty() {
            return Err(SelectorError::Empty);
        }
        Ok(SelectorList(selectors))
    }

    pub fn matches(&self, doc: &Document, key: NodeKey) -> bool {
        self.0.iter().any(|s| s.matches(doc, key))
    }
}

impl From<Selector> for SelectorList {
    fn from(selector: Selector) -> Self {
        SelectorList(vec![selector])
    }
}

// Splits on commas outside quotes.
fn split_list(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote: Option<u8> = None;
    let mut start = 0;
    for (i, b) in input.bytes().enumerate() {
        match (quote, b) {
            (Some(q), _) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(b),
            (None, b',') => {
                parts.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

impl Document {
    pub fn matches(&self, key: NodeKey, selectors: &SelectorList) -> bool {
        selectors.matches(self, key)
    }

    /// Descendants of `scope` matching any selector, in document order,
    /// each at most once.
    pub fn query_selector_all(&self, scope: NodeKey, selectors: &SelectorList) -> Vec<NodeKey> {
        self.descendants(scope)
            .filter(|k| selectors.matches(self, *k))
            .collect()
    }

    pub fn query_selector(&self, scope: NodeKey, selectors: &SelectorList) -> Option<NodeKey> {
        self.descendants(scope)
            .find(|k| selectors.matches(self, *k))
    }

    /// Nearest inclusive ancestor element matching `selectors`.
    pub fn closest(&self, key: NodeKey, selectors: &SelectorList) -> Option<NodeKey> {
        std::iter::once(key)
            .chain(self.ancestors(key))
            .find(|k| selectors.matches(self, *k))
    }
}
