use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// DIAGNOSTIC CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const DIAG_PARSE: &str = "IM-PARSE";
pub const DIAG_NON_LITERAL_VALUE: &str = "IM-NON-LITERAL-VALUE";
pub const DIAG_NON_LITERAL_ARG: &str = "IM-NON-LITERAL-ARG";
pub const DIAG_NON_LITERAL_RETURN: &str = "IM-NON-LITERAL-RETURN";
pub const DIAG_RESOLVER_FAILED: &str = "IM-RESOLVER-FAILED";
pub const DIAG_UNCALLED_FUNCTION: &str = "IM-UNCALLED-FUNCTION";
pub const DIAG_UNRESOLVED: &str = "IM-UNRESOLVED";
pub const DIAG_UNSUPPORTED_SYNTAX: &str = "IM-UNSUPPORTED-SYNTAX";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A per-expression problem found during analysis. Always returned as data;
/// the analyzer never raises for these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub start: usize,
    pub end: usize,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

impl Diagnostic {
    pub fn error(code: &str, start: usize, end: usize, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, start, end, message)
    }

    pub fn warning(code: &str, start: usize, end: usize, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, start, end, message)
    }

    fn new(severity: Severity, code: &str, start: usize, end: usize, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: code.to_string(),
            start,
            end,
            message: message.into(),
            meta: None,
        }
    }

    pub fn with_meta(mut self, meta: serde_json::Value) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Moves the range from region-local offsets into the enclosing document.
    pub fn shifted(mut self, base_offset: usize) -> Self {
        self.start += base_offset;
        self.end += base_offset;
        self
    }
}
