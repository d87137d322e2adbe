//! TOML-described document scenarios.
//!
//! ```toml
//! [[scenario]]
//! name = "sibling value"
//! html = "<div>...</div>"
//! passes = 2
//!
//! [[scenario.expect]]
//! selector = '[data-test-id="issue.field.value"]'
//! inner_html = 'See <a ...>98765</a>'
//! ```

use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct ScenarioFile {
    #[serde(default)]
    pub scenario: Vec<Scenario>,
}

#[derive(Debug, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub html: String,
    #[serde(default = "default_passes")]
    pub passes: usize,
    /// Total number of links expected in the document afterwards.
    pub links: Option<usize>,
    #[serde(default)]
    pub expect: Vec<Expectation>,
}

#[derive(Debug, Deserialize)]
pub struct Expectation {
    pub selector: String,
    #[serde(default)]
    pub index: usize,
    pub inner_html: String,
}

fn default_passes() -> usize {
    1
}

#[derive(Debug)]
pub enum ScenarioError {
    Io(std::io::Error),
    Toml(toml::de::Error),
}

impl std::fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScenarioError::Io(err) => write!(f, "failed to read scenario file: {err}"),
            ScenarioError::Toml(err) => write!(f, "failed to parse scenario file: {err}"),
        }
    }
}

impl std::error::Error for ScenarioError {}

pub fn parse_scenarios(input: &str) -> Result<Vec<Scenario>, ScenarioError> {
    let file: ScenarioFile = toml::from_str(input).map_err(ScenarioError::Toml)?;
    Ok(file.scenario)
}

pub fn load_scenarios(path: &Path) -> Result<Vec<Scenario>, ScenarioError> {
    let input = std::fs::read_to_string(path).map_err(ScenarioError::Io)?;
    parse_scenarios(&input)
}
