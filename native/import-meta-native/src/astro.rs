//! Astro component scanner.
//!
//! Code lives in four places in an `.astro` file:
//!
//! - the `---` frontmatter fence at the top of the file
//! - `<script>` element bodies
//! - attribute expressions (`href={import.meta.env.BASE_URL}`)
//! - text expressions (`<p>{import.meta.env.MODE}</p>`)
//!
//! HTML comments, `<style>` bodies and quoted attribute values are skipped.
//! Spread (`{...props}`) and shorthand (`{title}`) attributes cannot be
//! split into a name and a standalone expression; they are reported when
//! they mention `import.meta` and otherwise ignored.

use crate::analyze::includes_import_meta;
use crate::diagnostic::{Diagnostic, DIAG_UNSUPPORTED_SYNTAX};
use crate::lang::source_type_for_lang;
use crate::region::{RegionScan, ScriptRegion};

const FENCE: &str = "---";

pub fn scan_astro(code: &str) -> RegionScan {
    let mut scanner = Scanner {
        code,
        bytes: code.as_bytes(),
        pos: 0,
        scan: RegionScan::default(),
    };
    scanner.frontmatter();
    scanner.markup();
    scanner.scan
}

struct Scanner<'c> {
    code: &'c str,
    bytes: &'c [u8],
    pos: usize,
    scan: RegionScan,
}

impl Scanner<'_> {
    fn frontmatter(&mut self) {
        let leading = self.code.len() - self.code.trim_start().len();
        if !self.code[leading..].starts_with(FENCE) {
            return;
        }
        let body_start = leading + FENCE.len();

        let mut search = body_start;
        while let Some(found) = self.code[search..].find("\n---") {
            let fence = search + found + 1;
            let after = fence + FENCE.len();
            let rest_of_line = self.code[after..].split('\n').next().unwrap_or("");
            if rest_of_line.trim().is_empty() {
                self.scan.regions.push(
                    ScriptRegion::new(body_start, fence, source_type_for_lang(Some("ts")))
                        .with_return_allowed(),
                );
                self.pos = after;
                return;
            }
            search = after;
        }
    }

    fn markup(&mut self) {
        while self.pos < self.bytes.len() {
            if self.at("<!--") {
                self.skip_past("-->");
            } else if self.at_tag("script") {
                self.raw_element("script", true);
            } else if self.at_tag("style") {
                self.raw_element("style", false);
            } else if self.bytes[self.pos] == b'<' && self.next_is_tag_start() {
                self.tag();
            } else if self.bytes[self.pos] == b'{' {
                self.text_expression();
            } else {
                self.pos += 1;
            }
        }
    }

    fn at(&self, needle: &str) -> bool {
        self.bytes[self.pos..].starts_with(needle.as_bytes())
    }

    /// `<name` followed by whitespace, `>` or `/`, case-insensitive.
    fn at_tag(&self, name: &str) -> bool {
        let open = self.pos + 1 + name.len();
        self.bytes[self.pos] == b'<'
            && self.bytes.len() > open
            && self.bytes[self.pos + 1..open].eq_ignore_ascii_case(name.as_bytes())
            && matches!(self.bytes[open], b'>' | b'/' | b' ' | b'\t' | b'\n' | b'\r')
    }

    fn next_is_tag_start(&self) -> bool {
        self.bytes
            .get(self.pos + 1)
            .is_some_and(|b| b.is_ascii_alphabetic() || *b == b'/')
    }

    fn skip_past(&mut self, needle: &str) {
        self.pos = match self.code[self.pos..].find(needle) {
            Some(offset) => self.pos + offset + needle.len(),
            None => self.bytes.len(),
        };
    }

    /// `<script>` and `<style>` bodies are raw text. Only script bodies are code.
    fn raw_element(&mut self, name: &str, is_code: bool) {
        self.tag();
        if self.code[..self.pos].ends_with("/>") {
            return;
        }
        let body_start = self.pos;
        let close = format!("</{}", name);
        let body_end = find_ignore_case(&self.code[body_start..], &close)
            .map_or(self.bytes.len(), |offset| body_start + offset);

        if is_code && !self.code[body_start..body_end].trim().is_empty() {
            self.push_code(body_start, body_end);
        }
        self.pos = body_end;
        if body_end < self.bytes.len() {
            self.skip_past(">");
        }
    }

    /// Walks an open or close tag up to and including its `>`.
    fn tag(&mut self) {
        let tag_start = self.pos;
        self.pos += 1;
        let name_end = self.bytes[self.pos..]
            .iter()
            .position(|b| b.is_ascii_whitespace() || matches!(b, b'>' | b'/' | b'{'))
            .map_or(self.bytes.len(), |offset| self.pos + offset.max(1));
        let name = self.code[tag_start + 1..name_end].trim_start_matches('/').to_string();
        self.pos = name_end;

        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'>' => {
                    self.pos += 1;
                    return;
                }
                quote @ (b'"' | b'\'' | b'`') => {
                    self.pos = match self.code[self.pos + 1..].find(quote as char) {
                        Some(offset) => self.pos + 1 + offset + 1,
                        None => self.bytes.len(),
                    };
                }
                b'{' => self.attribute_expression(&name),
                _ => self.pos += 1,
            }
        }
    }

    fn attribute_expression(&mut self, tag: &str) {
        let open = self.pos;
        let Some(close) = find_balanced_brace_end(self.bytes, open) else {
            self.pos = self.bytes.len();
            return;
        };
        self.pos = close;

        let before = self.code[..open].trim_end();
        if before.ends_with('=') {
            self.push_expression(open, close);
            return;
        }

        let inner = &self.code[open + 1..close - 1];
        if includes_import_meta(inner) {
            let kind = if inner.trim_start().starts_with("...") {
                "spread"
            } else {
                "shorthand"
            };
            self.scan.diagnostics.push(
                Diagnostic::warning(
                    DIAG_UNSUPPORTED_SYNTAX,
                    open,
                    close,
                    format!(
                        "<{}>: Skipping unsupported attribute syntax: {} for \"{}\"",
                        tag,
                        kind,
                        inner.trim()
                    ),
                )
                .with_meta(serde_json::json!({ "tag": tag, "kind": kind })),
            );
        }
    }

    fn text_expression(&mut self) {
        let open = self.pos;
        match find_balanced_brace_end(self.bytes, open) {
            Some(close) => {
                self.push_expression(open, close);
                self.pos = close;
            }
            None => self.pos = self.bytes.len(),
        }
    }

    fn push_code(&mut self, start: usize, end: usize) {
        self.scan
            .regions
            .push(ScriptRegion::new(start, end, source_type_for_lang(Some("ts"))));
    }

    /// `open..close` spans the braces; only the inside is analysed.
    fn push_expression(&mut self, open: usize, close: usize) {
        let (start, end) = (open + 1, close - 1);
        if self.code[start..end].trim().is_empty() {
            return;
        }
        self.scan
            .regions
            .push(ScriptRegion::new(start, end, source_type_for_lang(Some("tsx"))));
    }
}

fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle.as_bytes()))
}

/// Index just past the `}` matching the `{` at `start`. String, template and
/// comment contents are not counted.
fn find_balanced_brace_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = start;
    let mut in_string: Option<u8> = None;
    // Brace depth at which each open template literal started.
    let mut templates: Vec<usize> = Vec::new();

    while i < bytes.len() {
        let c = bytes[i];

        if c == b'\\' {
            i += 2;
            continue;
        }

        if let Some(quote) = in_string {
            if c == quote {
                in_string = None;
            }
            i += 1;
            continue;
        }

        if templates.last() == Some(&depth) {
            match c {
                b'`' => {
                    templates.pop();
                }
                b'$' if bytes.get(i + 1) == Some(&b'{') => {
                    depth += 1;
                    i += 2;
                    continue;
                }
                _ => {}
            }
            i += 1;
            continue;
        }

        match c {
            b'"' | b'\'' => in_string = Some(c),
            b'`' => templates.push(depth),
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = match find_bytes(&bytes[i + 2..], b"*/") {
                    Some(offset) => i + 2 + offset + 2,
                    None => bytes.len(),
                };
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                i = bytes[i..]
                    .iter()
                    .position(|b| *b == b'\n')
                    .map_or(bytes.len(), |offset| i + offset);
                continue;
            }
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
        i += 1;
    }

    None
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balanced_brace_end() {
        let src = b"{ a: '}', b: `${ {c: 1} }`, /* } */ d: {} } tail";
        let end = find_balanced_brace_end(src, 0).unwrap();
        assert_eq!(&src[end..], b" tail");
    }

    #[test]
    fn test_unbalanced_brace() {
        assert_eq!(find_balanced_brace_end(b"{ a: { b }", 0), None);
    }
}
