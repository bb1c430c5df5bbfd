//! Text patcher.
//!
//! Applies `{start, end, replacement}` edits to the original text. Every byte
//! outside a replaced range is copied through untouched.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Half-open byte range `[start, end)` of the text it was computed against,
/// plus the source text to put there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextReplacement {
    pub start: usize,
    pub end: usize,
    pub replacement: String,
}

impl TextReplacement {
    pub fn new(start: usize, end: usize, replacement: impl Into<String>) -> Self {
        Self {
            start,
            end,
            replacement: replacement.into(),
        }
    }

    pub fn shifted(mut self, base_offset: usize) -> Self {
        self.start += base_offset;
        self.end += base_offset;
        self
    }

    fn contains(&self, other: &TextReplacement) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

#[derive(Debug)]
struct Edit {
    start: usize,
    end: usize,
    text: String,
}

/// Editable view over an immutable source string. Edits are kept sorted and
/// disjoint; overwriting a range drops any earlier edit it overlaps.
#[derive(Debug)]
pub struct SourceEditor<'s> {
    source: &'s str,
    edits: Vec<Edit>,
}

impl<'s> SourceEditor<'s> {
    pub fn new(source: &'s str) -> Self {
        Self {
            source,
            edits: Vec::new(),
        }
    }

    pub fn overwrite(&mut self, start: usize, end: usize, text: &str) -> &mut Self {
        let valid = start <= end
            && end <= self.source.len()
            && self.source.is_char_boundary(start)
            && self.source.is_char_boundary(end);
        debug_assert!(valid, "invalid edit range {}..{}", start, end);
        if !valid {
            log::warn!("Skipping edit with invalid range {}..{}", start, end);
            return self;
        }

        self.edits.retain(|e| {
            let overlaps = e.start < end && start < e.end;
            let same_range = e.start == start && e.end == end;
            !(overlaps || same_range)
        });

        let index = self
            .edits
            .partition_point(|e| (e.start, e.end) <= (start, end));
        self.edits.insert(
            index,
            Edit {
                start,
                end,
                text: text.to_string(),
            },
        );
        self
    }

    pub fn has_changed(&self) -> bool {
        !self.edits.is_empty()
    }

    pub fn finish(self) -> String {
        let removed: usize = self.edits.iter().map(|e| e.end - e.start).sum();
        let added: usize = self.edits.iter().map(|e| e.text.len()).sum();
        let mut out = String::with_capacity(self.source.len() - removed + added);

        let mut cursor = 0;
        for edit in &self.edits {
            out.push_str(&self.source[cursor..edit.start]);
            out.push_str(&edit.text);
            cursor = edit.end;
        }
        out.push_str(&self.source[cursor..]);
        out
    }
}

/// Applies `replacements` to `source`. An empty list hands back the original
/// string without copying.
///
/// Replacements are applied in start order (ties keep their input order).
/// Overlapping ranges are a caller bug: debug builds assert, release builds
/// let the later edit win.
pub fn apply_replacements<'s>(source: &'s str, replacements: &[TextReplacement]) -> Cow<'s, str> {
    if replacements.is_empty() {
        return Cow::Borrowed(source);
    }

    let mut ordered: Vec<&TextReplacement> = replacements.iter().collect();
    ordered.sort_by_key(|r| r.start);
    debug_assert!(
        ordered.windows(2).all(|w| w[0].end <= w[1].start),
        "overlapping replacements passed to the patcher"
    );

    let mut editor = SourceEditor::new(source);
    for replacement in ordered {
        editor.overwrite(replacement.start, replacement.end, &replacement.replacement);
    }
    Cow::Owned(editor.finish())
}

/// Drops every replacement that lies inside another one. The enclosing
/// edit already covers the inner text, so keeping both would overlap.
pub(crate) fn drop_nested(mut replacements: Vec<TextReplacement>) -> Vec<TextReplacement> {
    replacements.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));
    let mut kept: Vec<TextReplacement> = Vec::with_capacity(replacements.len());
    for replacement in replacements {
        match kept.last() {
            Some(outer) if outer.contains(&replacement) => {}
            _ => kept.push(replacement),
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_list_is_identity() {
        let source = "const a = import.meta.a;";
        let out = apply_replacements(source, &[]);
        assert!(matches!(out, Cow::Borrowed(s) if std::ptr::eq(s, source)));
    }

    #[test]
    fn test_single_replacement() {
        let source = "const foo = import.meta.foo;";
        let out = apply_replacements(source, &[TextReplacement::new(12, 27, "true")]);
        assert_eq!(out, "const foo = true;");
    }

    #[test]
    fn test_unsorted_input_preserves_outside_text() {
        let source = "a(XX) + b(YYY)\n  // trailing  ";
        let replacements = vec![
            TextReplacement::new(10, 13, "\"long replacement\""),
            TextReplacement::new(2, 4, "1"),
        ];
        let out = apply_replacements(source, &replacements);
        assert_eq!(out, "a(1) + b(\"long replacement\")\n  // trailing  ");

        let removed: usize = replacements.iter().map(|r| r.end - r.start).sum();
        let added: usize = replacements.iter().map(|r| r.replacement.len()).sum();
        assert_eq!(out.len(), source.len() - removed + added);
    }

    #[test]
    fn test_multibyte_text_untouched() {
        let source = "const ü = import.meta.x; // ✓";
        let start = source.find("import").unwrap();
        let end = start + "import.meta.x".len();
        let out = apply_replacements(source, &[TextReplacement::new(start, end, "1")]);
        assert_eq!(out, "const ü = 1; // ✓");
    }

    #[test]
    fn test_editor_last_overlapping_edit_wins() {
        let mut editor = SourceEditor::new("0123456789");
        editor.overwrite(2, 5, "a");
        editor.overwrite(4, 7, "b");
        assert!(editor.has_changed());
        assert_eq!(editor.finish(), "0123b789");
    }

    #[test]
    fn test_editor_insertions() {
        let mut editor = SourceEditor::new("abc");
        editor.overwrite(1, 1, "<");
        editor.overwrite(1, 2, "B");
        assert_eq!(editor.finish(), "a<Bc");
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "overlapping replacements")]
    fn test_overlap_asserts_in_debug() {
        apply_replacements(
            "0123456789",
            &[TextReplacement::new(2, 5, "a"), TextReplacement::new(4, 7, "b")],
        );
    }

    #[test]
    fn test_drop_nested() {
        let kept = drop_nested(vec![
            TextReplacement::new(20, 30, "inner"),
            TextReplacement::new(0, 5, "first"),
            TextReplacement::new(10, 40, "outer"),
            TextReplacement::new(12, 18, "inner2"),
        ]);
        assert_eq!(
            kept,
            vec![
                TextReplacement::new(0, 5, "first"),
                TextReplacement::new(10, 40, "outer"),
            ]
        );
    }
}
