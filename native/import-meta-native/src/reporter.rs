//! Forwards analysis diagnostics to the `log` facade.

use crate::analyze::AnalysisResult;
use crate::diagnostic::{Diagnostic, Severity};

const LOG_TARGET: &str = "import_meta";

/// Logs every diagnostic for module `id`, in source order.
/// Returns whether the parser rejected any part of the module.
pub fn report_analysis(id: &str, result: &AnalysisResult) -> bool {
    let mut sorted: Vec<&Diagnostic> = result.diagnostics.iter().collect();
    sorted.sort_by_key(|d| d.start);
    for diagnostic in sorted {
        report(id, diagnostic);
    }
    result.has_parse_error()
}

pub fn report(id: &str, diagnostic: &Diagnostic) {
    let level = match diagnostic.severity {
        Severity::Error => log::Level::Error,
        Severity::Warning => log::Level::Warn,
    };
    match &diagnostic.meta {
        Some(meta) => log::log!(
            target: LOG_TARGET,
            level,
            "[{}] {} ({}..{}) {}: {}",
            diagnostic.code,
            id,
            diagnostic.start,
            diagnostic.end,
            diagnostic.message,
            meta
        ),
        None => log::log!(
            target: LOG_TARGET,
            level,
            "[{}] {} ({}..{}) {}",
            diagnostic.code,
            id,
            diagnostic.start,
            diagnostic.end,
            diagnostic.message
        ),
    }
}
