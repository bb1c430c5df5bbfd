use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::reserved::BundlerTarget;

pub const DEFAULT_INCLUDE: &[&str] = &[
    r"\.[cm]?[jt]sx?(\?.*)?$",
    r"\.vue(\?.*)?$",
    r"\.svelte(\?.*)?$",
    r"\.astro(\?.*)?$",
];
pub const DEFAULT_EXCLUDE: &[&str] = &[r"[\\/]node_modules[\\/]"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Enforce {
    #[default]
    Pre,
    Post,
}

/// User-facing transformer options, deserializable from the plugin's JSON
/// configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransformOptions {
    /// Module ids matching any of these patterns are transformed.
    pub include: Vec<String>,
    /// Module ids matching any of these patterns are skipped, even if included.
    pub exclude: Vec<String>,
    pub enforce: Enforce,
    pub report_unresolved: bool,
    /// Bundler registries checked once at construction, in addition to WinterTC.
    pub targets: Vec<BundlerTarget>,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            include: DEFAULT_INCLUDE.iter().map(|p| p.to_string()).collect(),
            exclude: DEFAULT_EXCLUDE.iter().map(|p| p.to_string()).collect(),
            enforce: Enforce::Pre,
            report_unresolved: false,
            targets: Vec::new(),
        }
    }
}

impl TransformOptions {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Compiled include/exclude filter over module ids.
#[derive(Debug, Clone)]
pub struct IdFilter {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl IdFilter {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self, ConfigError> {
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
        })
    }

    pub fn matches(&self, id: &str) -> bool {
        self.include.iter().any(|re| re.is_match(id)) && !self.exclude.iter().any(|re| re.is_match(id))
    }
}

fn compile(patterns: &[String]) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })
        })
        .collect()
}
