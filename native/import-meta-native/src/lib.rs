//! # import.meta Static Resolution
//!
//! Rewrites `import.meta.<path>` accesses and `import.meta.<path>(...)` calls
//! into literal source text at build time.
//!
//! ## Pipeline
//!
//! 1. **Bindings**: a nested [`BindingObject`] is flattened once per build into
//!    a [`BindingTable`] of dotted access paths (`env.MODE`). Malformed
//!    configuration and reserved names fail here with a [`ConfigError`].
//! 2. **Regions**: the module id picks a [`Language`]. Plain scripts are one
//!    region; Vue, Svelte and Astro files are split into the script regions
//!    they embed.
//! 3. **Analysis**: each region is parsed with oxc and every `import.meta`
//!    chain is resolved against the table. Problems come back as
//!    [`Diagnostic`]s and never abort the module.
//! 4. **Patching**: replacements are applied to the original text in one pass.
//!    Everything outside a replaced range is preserved byte for byte.
//!
//! ## Invariants
//!
//! - Only static member chains rooted at the `import.meta` meta-property match.
//!   `not_import.meta.x`, `import.meta["x"]` and `(import.meta).x` are ignored.
//! - Replacement text always re-parses to the value it was produced from.
//! - A failure in one expression never suppresses a sibling replacement.

#[cfg(feature = "napi")]
mod node;

mod analyze;
mod astro;
mod bindings;
mod diagnostic;
mod error;
mod lang;
mod literal;
mod options;
mod patch;
mod region;
mod reporter;
mod reserved;
mod sfc;
mod transform;

#[cfg(test)]
mod transform_tests;

#[cfg(feature = "napi")]
pub use node::{detect_language_native, transform_native, NativeTransformResult};

pub use analyze::{
    analyze, analyze_async, default_source_type, includes_import_meta, AnalysisResult,
    AnalyzeOptions, IMPORT_META,
};
pub use astro::scan_astro;
pub use bindings::{
    BindingEntry, BindingNode, BindingObject, BindingTable, Resolver, ResolverError,
    ResolverResult, AsyncResolverFn, SyncResolverFn, PATH_SEPARATOR,
};
pub use diagnostic::*;
pub use error::{ConfigError, LiteralError, ReservedProperty, ReservedPropertyErrors};
pub use lang::{source_type_for_id, source_type_for_lang, strip_query, Language};
pub use literal::{is_literal, serialize, LiteralValue, RegExpLiteral, Value};
pub use options::{Enforce, IdFilter, TransformOptions, DEFAULT_EXCLUDE, DEFAULT_INCLUDE};
pub use patch::{apply_replacements, SourceEditor, TextReplacement};
pub use region::{analyze_regions, analyze_regions_async, RegionScan, ScriptRegion};
pub use reporter::{report, report_analysis};
pub use reserved::{assert_not_reserved, check_table, BundlerTarget};
pub use sfc::{scan_component, script_blocks, ScriptBlock};
pub use transform::{SourceFile, TransformOutput, Transformer};
