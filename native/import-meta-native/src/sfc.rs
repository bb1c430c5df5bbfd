//! Script block extraction for single-file components (Vue and Svelte).
//!
//! Only top-level `<script>` blocks are code; templates and styles are left
//! alone. Vue keeps `<script>` and `<script setup>`, Svelte keeps the
//! instance `<script>` and `<script module>` / `context="module"`.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;

use crate::lang::source_type_for_lang;
use crate::region::{RegionScan, ScriptRegion};

lazy_static! {
    static ref SCRIPT_BLOCK_RE: Regex =
        Regex::new(r#"(?is)<script\b((?:[^>"']|"[^"]*"|'[^']*')*)>(.*?)</script\s*>"#).unwrap();
    static ref ATTR_RE: Regex =
        Regex::new(r#"(?i)([a-z0-9:@-]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^>\s]+)))?"#).unwrap();
    static ref HTML_COMMENT_RE: Regex = Regex::new(r"(?s)<!--.*?-->").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptBlock {
    pub start: usize,
    pub end: usize,
    pub attributes: HashMap<String, String>,
}

impl ScriptBlock {
    pub fn lang(&self) -> Option<&str> {
        self.attributes.get("lang").map(String::as_str)
    }

    pub fn is_external(&self) -> bool {
        self.attributes
            .get("src")
            .is_some_and(|src| !src.trim().is_empty())
    }
}

/// Every top-level `<script>` block, in document order. Blocks inside HTML
/// comments are ignored.
pub fn script_blocks(code: &str) -> Vec<ScriptBlock> {
    let comments: Vec<(usize, usize)> = HTML_COMMENT_RE
        .find_iter(code)
        .map(|m| (m.start(), m.end()))
        .collect();

    SCRIPT_BLOCK_RE
        .captures_iter(code)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            if comments
                .iter()
                .any(|&(start, end)| start <= whole.start() && whole.start() < end)
            {
                return None;
            }
            let content = caps.get(2)?;
            let attrs = caps.get(1).map_or("", |m| m.as_str());
            Some(ScriptBlock {
                start: content.start(),
                end: content.end(),
                attributes: parse_attributes(attrs),
            })
        })
        .collect()
}

fn parse_attributes(attrs: &str) -> HashMap<String, String> {
    ATTR_RE
        .captures_iter(attrs)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str().to_ascii_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or("true", |m| m.as_str());
            Some((name, value.to_string()))
        })
        .collect()
}

/// Inline, non-empty script blocks of a Vue or Svelte component.
pub fn scan_component(code: &str) -> RegionScan {
    let regions = script_blocks(code)
        .into_iter()
        .filter(|block| !block.is_external())
        .filter(|block| !code[block.start..block.end].trim().is_empty())
        .map(|block| ScriptRegion::new(block.start, block.end, source_type_for_lang(block.lang())))
        .collect();

    RegionScan {
        regions,
        diagnostics: Vec::new(),
    }
}
