//! Static configuration: ticket types, heuristics thresholds and the DOM
//! contract (selectors) the host page is expected to honour.
//!
//! The selectors are brittle coupling points to the host's markup. When the
//! host changes its markup they silently stop matching; that is accepted.

use crate::pattern::TicketPattern;
use dom::selector::{AttrMatch, AttrSelector, Selector};
use dom::{SelectorError, SelectorList};
use serde::Deserialize;

pub const DEFAULT_MIN_ID_LEN: usize = 5;
pub const MAX_MIN_ID_LEN: usize = 32;
pub const DEFAULT_MAX_FALLBACK_CHILDREN: usize = 50;
pub const DEFAULT_MAX_CANDIDATE_DISTANCE: u32 = 7;
pub const DEFAULT_SIBLING_FALLBACK_DISTANCE: u32 = 2;
pub const DEFAULT_MARKER_ATTRIBUTE: &str = "data-kayako-processed";

/// External system a ticket id routes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketKind {
    Central,
    Mso,
}

impl TicketKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketKind::Central => "central",
            TicketKind::Mso => "mso",
        }
    }
}

impl std::fmt::Display for TicketKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TicketType {
    pub kind: TicketKind,
    /// Label text that identifies the field.
    pub label: String,
    /// Link target is `base_url` followed by the ticket id.
    pub base_url: String,
    pub link_class: String,
    /// Link title is `"{title_prefix} {id}"`.
    pub title_prefix: String,
}

impl TicketType {
    pub fn central() -> Self {
        Self {
            kind: TicketKind::Central,
            label: "Central Zendesk Ticket IDs".to_string(),
            base_url: "https://central-supportdesk.kayako.com/agent/conversations/".to_string(),
            link_class: "kayako-link".to_string(),
            title_prefix: "Open Kayako Ticket".to_string(),
        }
    }

    pub fn mso() -> Self {
        Self {
            kind: TicketKind::Mso,
            label: "MSO Zendesk IDs".to_string(),
            base_url: "https://mso-portal.zendesk.com/agent/tickets/".to_string(),
            link_class: "mso-zendesk-link".to_string(),
            title_prefix: "Open MSO Zendesk Ticket".to_string(),
        }
    }

    pub fn href(&self, ticket_id: &str) -> String {
        format!("{}{}", self.base_url, ticket_id)
    }

    pub fn title(&self, ticket_id: &str) -> String {
        format!("{} {}", self.title_prefix, ticket_id)
    }
}

/// Selector strings; each entry is tried in list order where order matters.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub labels: Vec<String>,
    pub fallback_tags: Vec<String>,
    /// Field wrappers, highest priority first.
    pub wrappers: Vec<String>,
    /// Value containers, highest priority first.
    pub values: Vec<String>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        let own = |list: &[&str]| list.iter().map(|s| s.to_string()).collect();
        Self {
            labels: own(&[
                r#"[data-test-id="issue.views.field.rich-text.label"]"#,
                r#"[data-test-id="issue.field.label"]"#,
            ]),
            fallback_tags: own(&["div", "span", "label", "th", "td", "p"]),
            wrappers: own(&[
                r#"[data-test-id^="issue.views.field"]"#,
                r#"[data-test-id="issue.views.issue-base.content"]"#,
                r#"[data-test-id="issue.views.field.base"]"#,
            ]),
            values: own(&[
                r#"[data-test-id="issue.views.field.rich-text.rich-text-body"]"#,
                r#"[data-test-id="issue.field.value"]"#,
            ]),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LinkerConfig {
    pub min_id_len: usize,
    pub max_fallback_children: usize,
    pub max_candidate_distance: u32,
    pub sibling_fallback_distance: u32,
    pub marker_attribute: String,
    /// Earlier entries win when a label text contains several labels.
    pub ticket_types: Vec<TicketType>,
    pub selectors: SelectorConfig,
}

impl Default for LinkerConfig {
    fn default() -> Self {
        Self {
            min_id_len: DEFAULT_MIN_ID_LEN,
            max_fallback_children: DEFAULT_MAX_FALLBACK_CHILDREN,
            max_candidate_distance: DEFAULT_MAX_CANDIDATE_DISTANCE,
            sibling_fallback_distance: DEFAULT_SIBLING_FALLBACK_DISTANCE,
            marker_attribute: DEFAULT_MARKER_ATTRIBUTE.to_string(),
            ticket_types: vec![TicketType::central(), TicketType::mso()],
            selectors: SelectorConfig::default(),
        }
    }
}

impl LinkerConfig {
    /// Missing keys take their defaults.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        toml::from_str(input).map_err(ConfigError::Toml)
    }

    pub fn ticket_type(&self, kind: TicketKind) -> Option<&TicketType> {
        self.ticket_types.iter().find(|t| t.kind == kind)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Toml(toml::de::Error),
    Selector {
        field: &'static str,
        selector: String,
        source: SelectorError,
    },
    MissingSelectors(&'static str),
    InvalidBaseUrl {
        kind: TicketKind,
        source: url::ParseError,
    },
    RelativeBaseUrl(TicketKind),
    EmptyLabel(TicketKind),
    DuplicateKind(TicketKind),
    MinIdLength(usize),
    EmptyMarkerAttribute,
    InvalidMarkerAttribute(String),
    Pattern(regex::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Toml(err) => write!(f, "invalid linker config: {err}"),
            ConfigError::Selector {
                field,
                selector,
                source,
            } => write!(f, "selectors.{field}: {selector:?}: {source}"),
            ConfigError::MissingSelectors(field) => write!(f, "selectors.{field} is empty"),
            ConfigError::InvalidBaseUrl { kind, source } => {
                write!(f, "base_url for {kind} is not a valid url: {source}")
            }
            ConfigError::RelativeBaseUrl(kind) => {
                write!(f, "base_url for {kind} must be an absolute http(s) url")
            }
            ConfigError::EmptyLabel(kind) => write!(f, "label for {kind} is empty"),
            ConfigError::DuplicateKind(kind) => write!(f, "ticket type {kind} is configured twice"),
            ConfigError::MinIdLength(len) => {
                write!(f, "min_id_len must be between 1 and {MAX_MIN_ID_LEN}, got {len}")
            }
            ConfigError::EmptyMarkerAttribute => write!(f, "marker_attribute is empty"),
            ConfigError::InvalidMarkerAttribute(name) => {
                write!(f, "marker_attribute {name:?} is not a plain attribute name")
            }
            ConfigError::Pattern(err) => write!(f, "failed to build ticket pattern: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Toml(err) => Some(err),
            ConfigError::Selector { source, .. } => Some(source),
            ConfigError::InvalidBaseUrl { source, .. } => Some(source),
            ConfigError::Pattern(err) => Some(err),
            _ => None,
        }
    }
}

/// Validated configuration with parsed selectors and compiled pattern.
#[derive(Debug, Clone)]
pub struct Rules {
    pub config: LinkerConfig,
    pub(crate) label_selectors: SelectorList,
    pub(crate) fallback_selectors: SelectorList,
    pub(crate) wrapper_selectors: Vec<SelectorList>,
    pub(crate) value_selectors: Vec<SelectorList>,
    pub(crate) any_value: SelectorList,
    pub(crate) pattern: TicketPattern,
}

fn parse_each(field: &'static str, list: &[String]) -> Result<Vec<SelectorList>, ConfigError> {
    if list.is_empty() {
        return Err(ConfigError::MissingSelectors(field));
    }
    list.iter()
        .map(|s| {
            SelectorList::parse(s).map_err(|source| ConfigError::Selector {
                field,
                selector: s.clone(),
                source,
            })
        })
        .collect()
}

fn flatten(lists: &[SelectorList]) -> SelectorList {
    SelectorList(lists.iter().flat_map(|l| l.0.iter().cloned()).collect())
}

// Attribute names are stored lowercase, so the marker is too. It must also be
// usable as an `[name]` selector for the stale-marker sweep.
fn normalize_marker(name: &str) -> Result<String, ConfigError> {
    let name = name.trim().to_ascii_lowercase();
    if name.is_empty() {
        return Err(ConfigError::EmptyMarkerAttribute);
    }
    let expected = SelectorList(vec![Selector {
        tag: None,
        attrs: vec![AttrSelector {
            name: name.clone(),
            op: AttrMatch::Exists,
        }],
    }]);
    match SelectorList::parse(&format!("[{name}]")) {
        Ok(list) if list == expected => Ok(name),
        _ => Err(ConfigError::InvalidMarkerAttribute(name)),
    }
}

impl Rules {
    pub fn new(mut config: LinkerConfig) -> Result<Self, ConfigError> {
        if config.min_id_len == 0 || config.min_id_len > MAX_MIN_ID_LEN {
            return Err(ConfigError::MinIdLength(config.min_id_len));
        }
        config.marker_attribute = normalize_marker(&config.marker_attribute)?;
        for (i, ticket) in config.ticket_types.iter().enumerate() {
            if config.ticket_types[..i].iter().any(|t| t.kind == ticket.kind) {
                return Err(ConfigError::DuplicateKind(ticket.kind));
            }
            if ticket.label.trim().is_empty() {
                return Err(ConfigError::EmptyLabel(ticket.kind));
            }
            let parsed = url::Url::parse(&ticket.base_url).map_err(|source| {
                ConfigError::InvalidBaseUrl {
                    kind: ticket.kind,
                    source,
                }
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::RelativeBaseUrl(ticket.kind));
            }
        }

        let selectors = &config.selectors;
        let label_selectors = flatten(&parse_each("labels", &selectors.labels)?);
        let fallback_selectors = flatten(&parse_each("fallback_tags", &selectors.fallback_tags)?);
        let wrapper_selectors = parse_each("wrappers", &selectors.wrappers)?;
        let value_selectors = parse_each("values", &selectors.values)?;
        let any_value = flatten(&value_selectors);
        let pattern = TicketPattern::new(config.min_id_len).map_err(ConfigError::Pattern)?;

        Ok(Self {
            config,
            label_selectors,
            fallback_selectors,
            wrapper_selectors,
            value_selectors,
            any_value,
            pattern,
        })
    }

    pub fn pattern(&self) -> &TicketPattern {
        &self.pattern
    }

    pub fn ticket_type(&self, kind: TicketKind) -> Option<&TicketType> {
        self.config.ticket_type(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_compile() {
        let rules = Rules::new(LinkerConfig::default()).unwrap();
        assert_eq!(rules.wrapper_selectors.len(), 3);
        assert_eq!(rules.value_selectors.len(), 2);
        assert_eq!(rules.any_value.0.len(), 2);
        assert_eq!(rules.fallback_selectors.0.len(), 6);
    }

    #[test]
    fn toml_overrides_merge_with_defaults() {
        let config = LinkerConfig::from_toml_str(
            r#"
            min_id_len = 6

            [[ticket_types]]
            kind = "mso"
            label = "MSO IDs"
            base_url = "https://example.test/t/"
            link_class = "mso"
            title_prefix = "Open"
            "#,
        )
        .unwrap();
        assert_eq!(config.min_id_len, 6);
        assert_eq!(config.max_candidate_distance, DEFAULT_MAX_CANDIDATE_DISTANCE);
        assert_eq!(config.ticket_types.len(), 1);
        assert!(config.ticket_type(TicketKind::Central).is_none());
        assert_eq!(config.selectors, SelectorConfig::default());
    }

    #[test]
    fn rejects_bad_urls() {
        let mut config = LinkerConfig::default();
        config.ticket_types[0].base_url = "not a url".to_string();
        assert!(matches!(
            Rules::new(config),
            Err(ConfigError::InvalidBaseUrl {
                kind: TicketKind::Central,
                ..
            })
        ));

        let mut config = LinkerConfig::default();
        config.ticket_types[1].base_url = "mailto:desk@example.test".to_string();
        assert!(matches!(
            Rules::new(config),
            Err(ConfigError::RelativeBaseUrl(TicketKind::Mso))
        ));
    }

    #[test]
    fn rejects_duplicate_kinds_and_empty_labels() {
        let mut config = LinkerConfig::default();
        config.ticket_types.push(TicketType::central());
        assert!(matches!(
            Rules::new(config),
            Err(ConfigError::DuplicateKind(TicketKind::Central))
        ));

        let mut config = LinkerConfig::default();
        config.ticket_types[1].label = "  ".to_string();
        assert!(matches!(
            Rules::new(config),
            Err(ConfigError::EmptyLabel(TicketKind::Mso))
        ));
    }

    #[test]
    fn rejects_out_of_range_min_len() {
        for len in [0, MAX_MIN_ID_LEN + 1] {
            let config = LinkerConfig {
                min_id_len: len,
                ..LinkerConfig::default()
            };
            assert!(matches!(Rules::new(config), Err(ConfigError::MinIdLength(l)) if l == len));
        }
    }

    #[test]
    fn rejects_bad_selectors() {
        let mut config = LinkerConfig::default();
        config.selectors.values = vec!["div > p".to_string()];
        assert!(matches!(
            Rules::new(config),
            Err(ConfigError::Selector { field: "values", .. })
        ));

        let mut config = LinkerConfig::default();
        config.selectors.wrappers.clear();
        assert!(matches!(
            Rules::new(config),
            Err(ConfigError::MissingSelectors("wrappers"))
        ));
    }

    #[test]
    fn marker_attribute_is_lowercased_and_checked() {
        let config = LinkerConfig {
            marker_attribute: " data-Linked ".to_string(),
            ..LinkerConfig::default()
        };
        let rules = Rules::new(config).unwrap();
        assert_eq!(rules.config.marker_attribute, "data-linked");

        for bad in ["data.done", "data-x=1", "a,b", "[x]"] {
            let config = LinkerConfig {
                marker_attribute: bad.to_string(),
                ..LinkerConfig::default()
            };
            assert!(
                matches!(Rules::new(config), Err(ConfigError::InvalidMarkerAttribute(_))),
                "accepted {bad:?}"
            );
        }

        let config = LinkerConfig {
            marker_attribute: "   ".to_string(),
            ..LinkerConfig::default()
        };
        assert!(matches!(Rules::new(config), Err(ConfigError::EmptyMarkerAttribute)));
    }

    #[test]
    fn links_are_built_from_base_url() {
        let central = TicketType::central();
        assert_eq!(
            central.href("98765"),
            "https://central-supportdesk.kayako.com/agent/conversations/98765"
        );
        assert_eq!(central.title("98765"), "Open Kayako Ticket 98765");
    }
}
