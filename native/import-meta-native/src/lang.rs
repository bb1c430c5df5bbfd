//! Module-id based language detection.

use std::path::Path;

use lazy_static::lazy_static;
use oxc_span::SourceType;
use regex::Regex;

use crate::analyze::default_source_type;

lazy_static! {
    static ref ECMA_LIKE_RE: Regex = Regex::new(r"\.[cm]?[jt]sx?$").unwrap();
    static ref DTS_LIKE_RE: Regex = Regex::new(r"\.d\.[cm]?ts(\?.*)?$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Ecma,
    Vue,
    Svelte,
    Astro,
}

impl Language {
    /// `None` for declaration files and anything that is not a script or a
    /// supported component format.
    pub fn detect(id: &str) -> Option<Self> {
        if DTS_LIKE_RE.is_match(id) {
            return None;
        }

        let path = strip_query(id);
        if ECMA_LIKE_RE.is_match(path) {
            return Some(Language::Ecma);
        }

        match Path::new(path).extension().and_then(|ext| ext.to_str()) {
            Some("vue") => Some(Language::Vue),
            Some("svelte") => Some(Language::Svelte),
            Some("astro") => Some(Language::Astro),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Ecma => "ecma",
            Language::Vue => "vue",
            Language::Svelte => "svelte",
            Language::Astro => "astro",
        }
    }
}

/// `/src/App.vue?vue&type=script` → `/src/App.vue`
pub fn strip_query(id: &str) -> &str {
    id.split_once('?').map_or(id, |(path, _)| path)
}

/// Grammar for a plain script module, picked from its extension.
pub fn source_type_for_id(id: &str) -> SourceType {
    SourceType::from_path(strip_query(id)).unwrap_or_else(|_| default_source_type())
}

/// Grammar for a `<script lang="...">` block inside a component file.
/// Blocks without `lang` are read as TypeScript, which accepts plain JS too.
pub fn source_type_for_lang(lang: Option<&str>) -> SourceType {
    let base = SourceType::default().with_module(true).with_typescript(true);
    match lang.map(str::to_ascii_lowercase).as_deref() {
        Some("tsx") | Some("jsx") => base.with_jsx(true),
        _ => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_scripts() {
        for id in ["a.js", "a.mjs", "a.cjs", "a.ts", "a.mts", "a.cts", "a.jsx", "a.tsx"] {
            assert_eq!(Language::detect(id), Some(Language::Ecma), "{}", id);
        }
        assert_eq!(Language::detect("/src/main.ts?v=123"), Some(Language::Ecma));
    }

    #[test]
    fn test_detect_components() {
        assert_eq!(Language::detect("/src/App.vue"), Some(Language::Vue));
        assert_eq!(Language::detect("/src/App.vue?vue&type=style"), Some(Language::Vue));
        assert_eq!(Language::detect("Counter.svelte"), Some(Language::Svelte));
        assert_eq!(Language::detect("pages/index.astro"), Some(Language::Astro));
    }

    #[test]
    fn test_declaration_files_skipped() {
        assert_eq!(Language::detect("env.d.ts"), None);
        assert_eq!(Language::detect("env.d.mts"), None);
        assert_eq!(Language::detect("env.d.cts?raw"), None);
        assert_eq!(Language::detect("style.css"), None);
        assert_eq!(Language::detect("README"), None);
    }

    #[test]
    fn test_source_types() {
        assert!(source_type_for_id("a.tsx?x").is_jsx());
        assert!(source_type_for_id("a.ts").is_typescript());
        assert!(!source_type_for_id("a.ts").is_jsx());
        assert!(source_type_for_lang(Some("TSX")).is_jsx());
        assert!(source_type_for_lang(None).is_typescript());
    }
}
