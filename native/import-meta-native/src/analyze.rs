//! `import.meta` analyzer.
//!
//! Analysis runs in two passes over one parse:
//!
//! 1. **Collection**: a [`Visit`] walk records every `import.meta` access
//!    chain and every call whose callee is such a chain. Sites are recorded
//!    in post-order: call arguments, then the callee, then the call itself.
//! 2. **Evaluation**: sites are resolved against the [`BindingTable`] in
//!    that order, so `import.meta.outer(import.meta.inner)` hands the literal
//!    bound to `inner` to the `outer` resolver.
//!
//! The analyzer is a pure function of `(source, table)`. Every per-expression
//! failure comes back as a [`Diagnostic`]; nothing is raised.

use std::collections::{HashMap, HashSet};

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    Argument, CallExpression, ComputedMemberExpression, Expression, StaticMemberExpression,
};
use oxc_ast_visit::{walk, Visit};
use oxc_parser::{ParseOptions, Parser};
use oxc_span::{GetSpan, SourceType, Span};
use serde::Serialize;
use serde_json::json;

use crate::bindings::{BindingEntry, BindingTable, Resolver, ResolverResult};
use crate::diagnostic::{
    Diagnostic, DIAG_NON_LITERAL_ARG, DIAG_NON_LITERAL_RETURN, DIAG_NON_LITERAL_VALUE, DIAG_PARSE,
    DIAG_RESOLVER_FAILED, DIAG_UNCALLED_FUNCTION, DIAG_UNRESOLVED,
};
use crate::literal::{literal_from_expression, LiteralValue, Value};
use crate::patch::{drop_nested, TextReplacement};

pub const IMPORT_META: &str = "import.meta";

/// Cheap substring check run before parsing anything.
pub fn includes_import_meta(code: &str) -> bool {
    code.contains(IMPORT_META)
}

/// TypeScript + JSX module: the most permissive grammar for unknown input.
pub fn default_source_type() -> SourceType {
    SourceType::default()
        .with_typescript(true)
        .with_module(true)
        .with_jsx(true)
}

#[derive(Debug, Clone, Copy)]
pub struct AnalyzeOptions {
    pub source_type: SourceType,
    /// Emit a warning for each outermost `import.meta` chain with no binding.
    pub report_unresolved: bool,
    pub allow_return_outside_function: bool,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            source_type: default_source_type(),
            report_unresolved: false,
            allow_return_outside_function: false,
        }
    }
}

impl AnalyzeOptions {
    pub fn with_source_type(mut self, source_type: SourceType) -> Self {
        self.source_type = source_type;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub replacements: Vec<TextReplacement>,
    pub diagnostics: Vec<Diagnostic>,
}

impl AnalysisResult {
    pub fn has_parse_error(&self) -> bool {
        self.diagnostics.iter().any(|d| d.code == DIAG_PARSE)
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn shifted(self, base_offset: usize) -> Self {
        Self {
            replacements: self
                .replacements
                .into_iter()
                .map(|r| r.shifted(base_offset))
                .collect(),
            diagnostics: self
                .diagnostics
                .into_iter()
                .map(|d| d.shifted(base_offset))
                .collect(),
        }
    }
}

pub fn analyze(source: &str, table: &BindingTable, options: &AnalyzeOptions) -> AnalysisResult {
    let sites = match collect_sites(source, options) {
        Ok(sites) => sites,
        Err(result) => return result,
    };

    let mut evaluation = Evaluation::new(table, options, &sites);
    for index in 0..sites.len() {
        if let Some(call) = evaluation.visit_site(index) {
            let outcome = call.resolver.call(call.args);
            evaluation.complete_call(index, outcome);
        }
    }
    evaluation.finish()
}

/// Same as [`analyze`], awaiting async resolvers one call at a time in
/// source order.
pub async fn analyze_async(
    source: &str,
    table: &BindingTable,
    options: &AnalyzeOptions,
) -> AnalysisResult {
    let sites = match collect_sites(source, options) {
        Ok(sites) => sites,
        Err(result) => return result,
    };

    let mut evaluation = Evaluation::new(table, options, &sites);
    for index in 0..sites.len() {
        if let Some(call) = evaluation.visit_site(index) {
            let outcome = call.resolver.call_async(call.args).await;
            evaluation.complete_call(index, outcome);
        }
    }
    evaluation.finish()
}

// ═══════════════════════════════════════════════════════════════════════════════
// COLLECTION
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
struct Site {
    path: String,
    start: usize,
    end: usize,
    kind: SiteKind,
    /// The site is the object of a member access (`import.meta.n.toFixed`).
    member_object: bool,
}

#[derive(Debug)]
enum SiteKind {
    Access,
    Call { args: Vec<ArgSlot> },
}

#[derive(Debug)]
enum ArgSlot {
    Literal(LiteralValue),
    /// Another `import.meta` site; its value is known once that site is evaluated.
    Site(usize),
    Other {
        kind: &'static str,
        start: usize,
        end: usize,
    },
}

fn collect_sites(source: &str, options: &AnalyzeOptions) -> Result<Vec<Site>, AnalysisResult> {
    if !includes_import_meta(source) {
        return Err(AnalysisResult::default());
    }

    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, options.source_type)
        .with_options(ParseOptions {
            allow_return_outside_function: options.allow_return_outside_function,
            ..ParseOptions::default()
        })
        .parse();

    if ret.panicked || !ret.errors.is_empty() {
        let mut diagnostics: Vec<Diagnostic> = ret
            .errors
            .iter()
            .map(|error| {
                Diagnostic::error(DIAG_PARSE, 0, source.len(), format!("Failed to parse source: {}", error))
            })
            .collect();
        if diagnostics.is_empty() {
            diagnostics.push(Diagnostic::error(
                DIAG_PARSE,
                0,
                source.len(),
                "Failed to parse source: parser aborted",
            ));
        }
        return Err(AnalysisResult {
            replacements: Vec::new(),
            diagnostics,
        });
    }

    let mut collector = SiteCollector {
        source,
        sites: Vec::new(),
        by_span: HashMap::new(),
        callees: HashSet::new(),
    };
    collector.visit_program(&ret.program);
    Ok(collector.sites)
}

struct SiteCollector<'s> {
    source: &'s str,
    sites: Vec<Site>,
    by_span: HashMap<Span, usize>,
    /// Callee chains of `import.meta.*()` calls; handled by the call, not as accesses.
    callees: HashSet<Span>,
}

impl SiteCollector<'_> {
    fn push_site(&mut self, path: String, span: Span, kind: SiteKind) {
        self.by_span.insert(span, self.sites.len());
        self.sites.push(Site {
            path,
            start: span.start as usize,
            end: span.end as usize,
            kind,
            member_object: false,
        });
    }

    fn mark_member_object(&mut self, object: &Expression<'_>) {
        if let Some(&index) = self.by_span.get(&object.span()) {
            self.sites[index].member_object = true;
        }
    }

    fn classify_argument(&self, argument: &Argument<'_>) -> ArgSlot {
        let Some(expr) = argument.as_expression() else {
            let span = argument.span();
            return ArgSlot::Other {
                kind: "SpreadElement",
                start: span.start as usize,
                end: span.end as usize,
            };
        };

        if let Some(literal) = literal_from_expression(expr, self.source) {
            return ArgSlot::Literal(literal);
        }

        let inner = expr.without_parentheses();
        if let Some(&index) = self.by_span.get(&inner.span()) {
            return ArgSlot::Site(index);
        }

        let span = expr.span();
        ArgSlot::Other {
            kind: expression_kind(inner),
            start: span.start as usize,
            end: span.end as usize,
        }
    }
}

impl<'a> Visit<'a> for SiteCollector<'_> {
    fn visit_static_member_expression(&mut self, expr: &StaticMemberExpression<'a>) {
        walk::walk_static_member_expression(self, expr);
        self.mark_member_object(&expr.object);

        if self.callees.contains(&expr.span) {
            return;
        }
        if let Some(path) = import_meta_path(expr) {
            self.push_site(path, expr.span, SiteKind::Access);
        }
    }

    fn visit_computed_member_expression(&mut self, expr: &ComputedMemberExpression<'a>) {
        walk::walk_computed_member_expression(self, expr);
        self.mark_member_object(&expr.object);
    }

    fn visit_call_expression(&mut self, call: &CallExpression<'a>) {
        // Arguments first so nested import.meta sites are known before the call.
        for argument in &call.arguments {
            self.visit_argument(argument);
        }

        let callee_path = match &call.callee {
            Expression::StaticMemberExpression(member) => {
                import_meta_path(member).map(|path| (path, member.span))
            }
            _ => None,
        };

        let Some((path, callee_span)) = callee_path else {
            self.visit_expression(&call.callee);
            return;
        };

        self.callees.insert(callee_span);
        self.visit_expression(&call.callee);

        let args = call
            .arguments
            .iter()
            .map(|argument| self.classify_argument(argument))
            .collect();
        self.push_site(path, call.span, SiteKind::Call { args });
    }
}

/// Dotted path of a static member chain rooted directly at `import.meta`.
/// `not_import.meta.foo`, computed members and parenthesised objects all
/// break the chain.
fn import_meta_path(member: &StaticMemberExpression<'_>) -> Option<String> {
    let mut segments = vec![member.property.name.as_str()];
    let mut object = &member.object;

    loop {
        match object {
            Expression::MetaProperty(meta)
                if meta.meta.name == "import" && meta.property.name == "meta" =>
            {
                segments.reverse();
                return Some(segments.join("."));
            }
            Expression::StaticMemberExpression(inner) => {
                segments.push(inner.property.name.as_str());
                object = &inner.object;
            }
            _ => return None,
        }
    }
}

fn expression_kind(expr: &Expression<'_>) -> &'static str {
    match expr {
        Expression::Identifier(_) => "Identifier",
        Expression::StaticMemberExpression(_)
        | Expression::ComputedMemberExpression(_)
        | Expression::PrivateFieldExpression(_) => "MemberExpression",
        Expression::CallExpression(_) => "CallExpression",
        Expression::NewExpression(_) => "NewExpression",
        Expression::TemplateLiteral(_) => "TemplateLiteral",
        Expression::TaggedTemplateExpression(_) => "TaggedTemplateExpression",
        Expression::ArrayExpression(_) => "ArrayExpression",
        Expression::ObjectExpression(_) => "ObjectExpression",
        Expression::ArrowFunctionExpression(_) => "ArrowFunctionExpression",
        Expression::FunctionExpression(_) => "FunctionExpression",
        Expression::BinaryExpression(_) => "BinaryExpression",
        Expression::LogicalExpression(_) => "LogicalExpression",
        Expression::UnaryExpression(_) => "UnaryExpression",
        Expression::ConditionalExpression(_) => "ConditionalExpression",
        Expression::AwaitExpression(_) => "AwaitExpression",
        Expression::ThisExpression(_) => "ThisExpression",
        Expression::MetaProperty(_) => "MetaProperty",
        _ => "Expression",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVALUATION
// ═══════════════════════════════════════════════════════════════════════════════

struct PreparedCall {
    resolver: Resolver,
    args: Vec<Option<LiteralValue>>,
}

struct Evaluation<'t, 's> {
    table: &'t BindingTable,
    report_unresolved: bool,
    sites: &'s [Site],
    results: Vec<Option<LiteralValue>>,
    replacements: Vec<TextReplacement>,
    /// Unresolved-path warnings carry their site so inner chain prefixes can be dropped.
    diagnostics: Vec<(Option<usize>, Diagnostic)>,
}

impl<'t, 's> Evaluation<'t, 's> {
    fn new(table: &'t BindingTable, options: &AnalyzeOptions, sites: &'s [Site]) -> Self {
        Self {
            table,
            report_unresolved: options.report_unresolved,
            sites,
            results: vec![None; sites.len()],
            replacements: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push((None, diagnostic));
    }

    /// Resolves access sites in place. For a call to a bound resolver, returns
    /// the resolver and its arguments; the caller invokes it and reports back
    /// through [`Evaluation::complete_call`].
    fn visit_site(&mut self, index: usize) -> Option<PreparedCall> {
        let (sites, table) = (self.sites, self.table);
        let site = &sites[index];
        match (&site.kind, table.get(&site.path)) {
            (SiteKind::Access, Some(BindingEntry::Value(value))) => {
                self.record_value(index, value.clone(), ValueOrigin::Binding);
                None
            }
            (SiteKind::Access, Some(BindingEntry::Function(_))) => {
                self.push(
                    Diagnostic::warning(
                        DIAG_UNCALLED_FUNCTION,
                        site.start,
                        site.end,
                        format!(
                            "import.meta.{} is bound to a function and is only replaced when called",
                            site.path
                        ),
                    )
                    .with_meta(json!({ "accessPath": site.path })),
                );
                None
            }
            (SiteKind::Call { args }, Some(BindingEntry::Function(resolver))) => {
                let resolver = resolver.clone();
                let args = args
                    .iter()
                    .enumerate()
                    .map(|(position, slot)| self.resolve_argument(index, position, slot))
                    .collect();
                Some(PreparedCall { resolver, args })
            }
            // A value-bound path used as a callee is left untouched.
            (SiteKind::Call { .. }, Some(BindingEntry::Value(_))) => None,
            (_, None) => {
                if self.report_unresolved {
                    let what = match site.kind {
                        SiteKind::Access => "property",
                        SiteKind::Call { .. } => "method",
                    };
                    let diagnostic = Diagnostic::warning(
                        DIAG_UNRESOLVED,
                        site.start,
                        site.end,
                        format!("No binding for {} import.meta.{}", what, site.path),
                    )
                    .with_meta(json!({ "accessPath": site.path }));
                    self.diagnostics.push((Some(index), diagnostic));
                }
                None
            }
        }
    }

    fn resolve_argument(&mut self, call: usize, position: usize, slot: &ArgSlot) -> Option<LiteralValue> {
        let sites = self.sites;
        let (kind, start, end) = match slot {
            ArgSlot::Literal(value) => return Some(value.clone()),
            ArgSlot::Site(index) => {
                if let Some(value) = &self.results[*index] {
                    return Some(value.clone());
                }
                let site = &sites[*index];
                let kind = match site.kind {
                    SiteKind::Access => "MemberExpression",
                    SiteKind::Call { .. } => "CallExpression",
                };
                (kind, site.start, site.end)
            }
            ArgSlot::Other { kind, start, end } => (*kind, *start, *end),
        };

        let path = &sites[call].path;
        let diagnostic = Diagnostic::warning(
            DIAG_NON_LITERAL_ARG,
            start,
            end,
            format!(
                "Argument at index {} of method import.meta.{}() is not a literal",
                position, path
            ),
        )
        .with_meta(json!({
            "method": path,
            "argumentIndex": position,
            "argumentType": kind,
        }));
        self.push(diagnostic);
        None
    }

    fn complete_call(&mut self, index: usize, outcome: ResolverResult) {
        match outcome {
            Ok(value) => self.record_value(index, value, ValueOrigin::Return),
            Err(error) => {
                let site = &self.sites[index];
                let diagnostic = Diagnostic::error(
                    DIAG_RESOLVER_FAILED,
                    site.start,
                    site.end,
                    format!("Failed to execute method import.meta.{}(): {}", site.path, error),
                )
                .with_meta(json!({ "method": site.path, "error": error.message() }));
                self.push(diagnostic);
            }
        }
    }

    fn record_value(&mut self, index: usize, value: Value, origin: ValueOrigin) {
        let sites = self.sites;
        let site = &sites[index];
        let serialized = value
            .as_literal()
            .and_then(|literal| literal.to_source().ok().map(|text| (literal.clone(), text)));

        match serialized {
            Some((literal, text)) => {
                let text = if needs_parens(&literal, &text, site.member_object) {
                    format!("({})", text)
                } else {
                    text
                };
                self.replacements
                    .push(TextReplacement::new(site.start, site.end, text));
                self.results[index] = Some(literal);
            }
            None => {
                let diagnostic = match origin {
                    ValueOrigin::Binding => Diagnostic::error(
                        DIAG_NON_LITERAL_VALUE,
                        site.start,
                        site.end,
                        format!("Value for import.meta.{} is not a valid literal", site.path),
                    )
                    .with_meta(json!({ "accessPath": site.path, "valueType": value.type_name() })),
                    ValueOrigin::Return => Diagnostic::error(
                        DIAG_NON_LITERAL_RETURN,
                        site.start,
                        site.end,
                        format!(
                            "Return value of method import.meta.{}() is not a valid literal",
                            site.path
                        ),
                    )
                    .with_meta(json!({ "method": site.path, "returnType": value.type_name() })),
                };
                self.push(diagnostic);
            }
        }
    }

    fn finish(self) -> AnalysisResult {
        // An unbound `import.meta.env` inside `import.meta.env.MODE` shares its
        // start offset with the longer chain; only the outermost is reported.
        let mut longest: HashMap<usize, usize> = HashMap::new();
        for site in self.sites {
            let end = longest.entry(site.start).or_insert(site.end);
            *end = (*end).max(site.end);
        }

        let sites = self.sites;
        let diagnostics = self
            .diagnostics
            .into_iter()
            .filter(|(site, _)| match site {
                Some(index) => longest.get(&sites[*index].start) == Some(&sites[*index].end),
                None => true,
            })
            .map(|(_, diagnostic)| diagnostic)
            .collect();

        AnalysisResult {
            replacements: drop_nested(self.replacements),
            diagnostics,
        }
    }
}

/// A leading `-` turns into `--` or an unparenthesised `**` base, and a
/// number followed by `.` reads as a decimal point.
fn needs_parens(literal: &LiteralValue, text: &str, member_object: bool) -> bool {
    text.starts_with('-')
        || (member_object && matches!(literal, LiteralValue::Number(_) | LiteralValue::BigInt(_)))
}

#[derive(Debug, Clone, Copy)]
enum ValueOrigin {
    Binding,
    Return,
}
