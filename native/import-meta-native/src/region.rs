//! Script regions embedded in a host document.
//!
//! Component formats hold their code in several places (script blocks,
//! frontmatter, template expressions). Adapters locate those places as byte
//! ranges; each range is analysed on its own and the results are shifted back
//! into document offsets so the whole file is patched in one pass.

use oxc_span::SourceType;

use crate::analyze::{analyze, analyze_async, includes_import_meta, AnalysisResult, AnalyzeOptions};
use crate::bindings::BindingTable;
use crate::diagnostic::Diagnostic;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptRegion {
    pub start: usize,
    pub end: usize,
    pub source_type: SourceType,
    /// Astro frontmatter runs as a function body, so a top-level `return` is legal.
    pub allow_return: bool,
}

impl ScriptRegion {
    pub fn new(start: usize, end: usize, source_type: SourceType) -> Self {
        Self {
            start,
            end,
            source_type,
            allow_return: false,
        }
    }

    pub fn with_return_allowed(mut self) -> Self {
        self.allow_return = true;
        self
    }

    fn analyze_options(&self, base: &AnalyzeOptions) -> AnalyzeOptions {
        AnalyzeOptions {
            allow_return_outside_function: self.allow_return,
            ..base.with_source_type(self.source_type)
        }
    }

    pub fn text<'c>(&self, code: &'c str) -> &'c str {
        code.get(self.start..self.end).unwrap_or("")
    }
}

/// Output of an adapter: the regions to analyse plus anything the adapter
/// itself had to report about the host document.
#[derive(Debug, Default)]
pub struct RegionScan {
    pub regions: Vec<ScriptRegion>,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn analyze_regions(
    code: &str,
    scan: RegionScan,
    table: &BindingTable,
    options: &AnalyzeOptions,
) -> AnalysisResult {
    let mut merged = AnalysisResult {
        replacements: Vec::new(),
        diagnostics: scan.diagnostics,
    };

    for region in &scan.regions {
        let text = region.text(code);
        if !includes_import_meta(text) {
            continue;
        }
        let options = region.analyze_options(options);
        merge(&mut merged, analyze(text, table, &options).shifted(region.start));
    }

    merged
}

pub async fn analyze_regions_async(
    code: &str,
    scan: RegionScan,
    table: &BindingTable,
    options: &AnalyzeOptions,
) -> AnalysisResult {
    let mut merged = AnalysisResult {
        replacements: Vec::new(),
        diagnostics: scan.diagnostics,
    };

    for region in &scan.regions {
        let text = region.text(code);
        if !includes_import_meta(text) {
            continue;
        }
        let options = region.analyze_options(options);
        let result = analyze_async(text, table, &options).await;
        merge(&mut merged, result.shifted(region.start));
    }

    merged
}

// A region that failed to parse already carries no replacements.
fn merge(into: &mut AnalysisResult, region: AnalysisResult) {
    into.replacements.extend(region.replacements);
    into.diagnostics.extend(region.diagnostics);
}
