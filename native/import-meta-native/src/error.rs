use std::fmt;

use thiserror::Error;

/// Fatal setup-time failures. These are raised before any module is
/// transformed and are never downgraded to diagnostics.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid binding key {key:?} at `{path}`: keys must be non-empty and must not contain '.'")]
    InvalidKey { path: String, key: String },

    #[error("duplicate binding key `{path}`")]
    DuplicateKey { path: String },

    #[error("cyclic binding object detected at `{path}`")]
    Cycle { path: String },

    #[error("unsupported binding value at `{path}`: {type_name} is neither a literal, a literal array, nor a function")]
    UnsupportedValue { path: String, type_name: String },

    #[error(transparent)]
    Reserved(#[from] ReservedPropertyErrors),

    #[error("invalid filter pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// One binding key that collides with a name owned by a runtime or bundler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedProperty {
    pub environment: &'static str,
    pub property: String,
}

impl fmt::Display for ReservedProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "The property name \"import.meta.{}\" is reserved by {} and cannot be used.",
            self.property, self.environment
        )
    }
}

/// Every reserved-name collision found by a single check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ReservedPropertyErrors {
    pub violations: Vec<ReservedProperty>,
}

impl fmt::Display for ReservedPropertyErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Reserved property names found.")?;
        for violation in &self.violations {
            write!(f, "\n  - {}", violation)?;
        }
        Ok(())
    }
}

/// Raised when a value outside the literal model reaches serialization.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LiteralError {
    #[error("value is not a valid literal: {0}")]
    InvalidLiteral(String),
}
