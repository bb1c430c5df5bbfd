//! Per-module transform entry point used by bundler integrations.
//!
//! A [`Transformer`] is built once per build from the user's bindings and
//! options. Construction validates everything that can fail; after that each
//! module transform only ever reports diagnostics.

use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::analyze::{includes_import_meta, AnalysisResult, AnalyzeOptions};
use crate::astro::scan_astro;
use crate::bindings::{BindingObject, BindingTable};
use crate::diagnostic::Diagnostic;
use crate::error::ConfigError;
use crate::lang::{source_type_for_id, Language};
use crate::options::{Enforce, IdFilter, TransformOptions};
use crate::patch::apply_replacements;
use crate::region::{analyze_regions, analyze_regions_async, RegionScan, ScriptRegion};
use crate::reporter::report_analysis;
use crate::reserved::{check_table, BundlerTarget};
use crate::sfc::scan_component;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformOutput {
    pub code: String,
    pub changed: bool,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub id: String,
    pub code: String,
}

impl SourceFile {
    pub fn new(id: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            code: code.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Transformer {
    table: Arc<BindingTable>,
    filter: IdFilter,
    options: TransformOptions,
}

impl Transformer {
    pub fn new(bindings: &BindingObject, options: TransformOptions) -> Result<Self, ConfigError> {
        Self::from_table(BindingTable::build(bindings)?, options)
    }

    /// Builds a transformer from JSON bindings. Functions cannot be expressed
    /// in JSON, so every binding is a value.
    pub fn from_json(bindings_json: &str, options_json: Option<&str>) -> Result<Self, ConfigError> {
        let bindings: serde_json::Value = serde_json::from_str(bindings_json)?;
        let options = match options_json {
            Some(json) => TransformOptions::from_json(json)?,
            None => TransformOptions::default(),
        };
        Self::from_table(BindingTable::from_json(&bindings)?, options)
    }

    /// Validates `table` against WinterTC and every configured target.
    pub fn from_table(table: BindingTable, options: TransformOptions) -> Result<Self, ConfigError> {
        check_table(&table, BundlerTarget::WinterTc)?;
        for target in &options.targets {
            check_table(&table, *target)?;
        }

        let filter = IdFilter::new(&options.include, &options.exclude)?;
        log::debug!(
            target: "import_meta",
            "binding table ready: {} access path(s)",
            table.len()
        );

        Ok(Self {
            table: Arc::new(table),
            filter,
            options,
        })
    }

    /// Checks the bindings against the registry of the bundler running this build.
    pub fn assert_target(&self, target: BundlerTarget) -> Result<(), ConfigError> {
        Ok(check_table(&self.table, target)?)
    }

    pub fn enforce(&self) -> Enforce {
        self.options.enforce
    }

    pub fn table(&self) -> &BindingTable {
        &self.table
    }

    /// `None` when the module is filtered out, has no `import.meta`, or there
    /// is nothing to bind.
    pub fn transform(&self, id: &str, code: &str) -> Option<TransformOutput> {
        let language = self.accept(id, code)?;
        let result = analyze_regions(code, scan(language, id, code), &self.table, &self.analyze_options());
        Some(finish(id, code, result))
    }

    pub async fn transform_async(&self, id: &str, code: &str) -> Option<TransformOutput> {
        let language = self.accept(id, code)?;
        let result =
            analyze_regions_async(code, scan(language, id, code), &self.table, &self.analyze_options())
                .await;
        Some(finish(id, code, result))
    }

    /// Transforms independent modules in parallel. Output order matches `files`.
    pub fn transform_batch(&self, files: &[SourceFile]) -> Vec<Option<TransformOutput>> {
        files
            .par_iter()
            .map(|file| self.transform(&file.id, &file.code))
            .collect()
    }

    fn accept(&self, id: &str, code: &str) -> Option<Language> {
        if self.table.is_empty() || !includes_import_meta(code) || !self.filter.matches(id) {
            return None;
        }
        let language = Language::detect(id);
        if language.is_none() {
            log::trace!(target: "import_meta", "skipping {}: unsupported module type", id);
        }
        language
    }

    fn analyze_options(&self) -> AnalyzeOptions {
        AnalyzeOptions {
            report_unresolved: self.options.report_unresolved,
            ..AnalyzeOptions::default()
        }
    }
}

fn scan(language: Language, id: &str, code: &str) -> RegionScan {
    match language {
        Language::Ecma => RegionScan {
            regions: vec![ScriptRegion::new(0, code.len(), source_type_for_id(id))],
            diagnostics: Vec::new(),
        },
        Language::Vue | Language::Svelte => scan_component(code),
        Language::Astro => scan_astro(code),
    }
}

fn finish(id: &str, code: &str, result: AnalysisResult) -> TransformOutput {
    report_analysis(id, &result);
    let changed = !result.replacements.is_empty();
    if !changed {
        log::trace!(target: "import_meta", "{}: nothing to replace", id);
    }
    TransformOutput {
        code: apply_replacements(code, &result.replacements).into_owned(),
        changed,
        diagnostics: result.diagnostics,
    }
}
