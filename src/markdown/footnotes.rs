//! Footnote maintenance on raw markdown
//!
//! Editors delete references and definitions independently, which leaves
//! dangling footnotes behind. [`sync_footnotes`] removes them so every
//! numeric reference `[^n]` has exactly one definition `[^n]: …` and every
//! definition is referenced. Numbers are never compacted; new footnotes
//! always take the next number above the highest one in use.

use std::collections::BTreeSet;
use std::ops::Range;
use std::sync::OnceLock;

use log::info;
use regex::Regex;

use crate::string_utils::{ceil_char_boundary, floor_char_boundary};

/// Body inserted for a new footnote when no text was selected.
pub const PLACEHOLDER_TEXT: &str = "Footnote text";

fn marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[\^(\d+)\]").expect("valid regex"))
}

fn definition_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[\^(\d+)\]:.*(?:\n|$)").expect("valid regex"))
}

/// Result of [`sync_footnotes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FootnoteSync {
    pub text: String,
    /// Whether anything was removed
    pub changed: bool,
}

/// Result of [`insert_footnote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FootnoteInsertion {
    pub text: String,
    /// Number given to the new footnote
    pub number: u64,
    /// Byte range of the definition body in `text`, for re-selection
    pub definition: Range<usize>,
}

struct Marker {
    number: String,
    range: Range<usize>,
}

/// References: `[^n]` not followed by `:`.
fn find_references(text: &str) -> Vec<Marker> {
    marker_regex()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            if text[whole.end()..].starts_with(':') {
                return None;
            }
            Some(Marker {
                number: caps[1].to_string(),
                range: whole.range(),
            })
        })
        .collect()
}

/// Definitions: `[^n]:` through the end of the line, newline included.
fn find_definitions(text: &str) -> Vec<Marker> {
    definition_regex()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(Marker {
                number: caps[1].to_string(),
                range: whole.range(),
            })
        })
        .collect()
}

/// Remove `ranges` from `text`, merging overlaps and working back to front.
fn remove_ranges(text: &str, mut ranges: Vec<Range<usize>>) -> String {
    ranges.sort_by_key(|r| r.start);
    let mut merged: Vec<Range<usize>> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if range.start <= last.end => last.end = last.end.max(range.end),
            _ => merged.push(range),
        }
    }

    let mut result = text.to_string();
    for range in merged.into_iter().rev() {
        result.replace_range(range, "");
    }
    result
}

/// One removal pass over `text`. Returns `None` when nothing needs removing.
fn sync_pass(text: &str) -> Option<String> {
    let references = find_references(text);
    let definitions = find_definitions(text);

    let referenced: BTreeSet<&str> = references.iter().map(|r| r.number.as_str()).collect();
    let defined: BTreeSet<&str> = definitions.iter().map(|d| d.number.as_str()).collect();

    let orphaned: Vec<&Marker> = references
        .iter()
        .filter(|r| !defined.contains(r.number.as_str()))
        .collect();

    let mut seen = BTreeSet::new();
    let unused: Vec<&Marker> = definitions
        .iter()
        .filter(|d| !referenced.contains(d.number.as_str()) || !seen.insert(d.number.as_str()))
        .collect();

    if orphaned.is_empty() && unused.is_empty() {
        return None;
    }
    if !orphaned.is_empty() {
        info!("Removed {} orphaned footnote reference(s)", orphaned.len());
    }
    if !unused.is_empty() {
        info!("Removed {} unused or duplicate footnote definition(s)", unused.len());
    }

    let ranges = orphaned
        .iter()
        .chain(unused.iter())
        .map(|m| m.range.clone())
        .collect();
    Some(remove_ranges(text, ranges))
}

/// Remove references without a definition and definitions without a reference.
///
/// Removals can expose new orphans (a deleted definition may have been the
/// only place another footnote was referenced), so passes repeat until the
/// text is stable. The result is therefore idempotent.
pub fn sync_footnotes(markdown: &str) -> FootnoteSync {
    let mut text = markdown.to_string();
    let mut changed = false;
    while let Some(next) = sync_pass(&text) {
        text = next;
        changed = true;
    }
    FootnoteSync { text, changed }
}

/// Next free footnote number: highest `[^n]` in use plus one, or 1.
pub fn next_footnote_number(markdown: &str) -> u64 {
    marker_regex()
        .captures_iter(markdown)
        .filter_map(|caps| caps[1].parse::<u64>().ok())
        .max()
        .map_or(1, |max| max.saturating_add(1))
}

/// Add a footnote for the selected text.
///
/// The reference goes right after the selection and the definition is
/// appended at the end of the document, carrying the selected text (or a
/// placeholder) as its body. Selection offsets are snapped to character
/// boundaries.
pub fn insert_footnote(markdown: &str, selection: Range<usize>) -> FootnoteInsertion {
    let start = floor_char_boundary(markdown, selection.start);
    let end = ceil_char_boundary(markdown, selection.end.max(start));
    let selected = &markdown[start..end];
    let number = next_footnote_number(markdown);

    let mut text = String::with_capacity(markdown.len() + selected.len() + 32);
    text.push_str(&markdown[..end]);
    text.push_str(&format!("[^{}]", number));
    text.push_str(&markdown[end..]);
    text.push_str(&format!("\n\n[^{}]: ", number));

    let body_start = text.len();
    text.push_str(if selected.is_empty() {
        PLACEHOLDER_TEXT
    } else {
        selected
    });
    let body_end = text.len();

    FootnoteInsertion {
        text,
        number,
        definition: body_start..body_end,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consistent_document_is_unchanged() {
        let source = "Text[^1] more[^2]\n\n[^1]: one\n[^2]: two\n";
        let sync = sync_footnotes(source);
        assert!(!sync.changed);
        assert_eq!(sync.text, source);
    }

    #[test]
    fn test_orphaned_reference_removed() {
        let sync = sync_footnotes("Text[^1] and[^3]\n\n[^1]: one\n");
        assert!(sync.changed);
        assert_eq!(sync.text, "Text[^1] and\n\n[^1]: one\n");
    }

    #[test]
    fn test_unused_definition_removed() {
        let sync = sync_footnotes("Text[^1]\n\n[^1]: one\n[^2]: two\n");
        assert!(sync.changed);
        assert_eq!(sync.text, "Text[^1]\n\n[^1]: one\n");
    }

    #[test]
    fn test_both_directions_in_one_call() {
        let sync = sync_footnotes("A[^1] B[^2]\n\n[^2]: two\n[^3]: three");
        assert_eq!(sync.text, "A B[^2]\n\n[^2]: two\n");
    }

    #[test]
    fn test_duplicate_definitions_collapse() {
        let sync = sync_footnotes("A[^1]\n\n[^1]: first\n[^1]: second\n");
        assert_eq!(sync.text, "A[^1]\n\n[^1]: first\n");
    }

    #[test]
    fn test_cascading_removal_is_idempotent() {
        // Definition 1 is unused; removing it orphans footnote 2
        let source = "Body\n\n[^1]: see[^2]\n[^2]: two\n";
        let first = sync_footnotes(source);
        assert!(first.changed);
        assert_eq!(first.text, "Body\n\n");

        let second = sync_footnotes(&first.text);
        assert!(!second.changed);
        assert_eq!(second.text, first.text);
    }

    #[test]
    fn test_idempotence_on_messy_input() {
        let sources = [
            "",
            "no footnotes",
            "[^1]",
            "[^1]:",
            "x[^5][^5]\n[^5]: a\n[^6]: b[^5]\n",
            "中文[^1]\n[^2]: 定义",
        ];
        for source in sources {
            let once = sync_footnotes(source);
            let twice = sync_footnotes(&once.text);
            assert!(!twice.changed, "not idempotent for {:?}", source);
        }
    }

    #[test]
    fn test_non_numeric_labels_are_ignored() {
        let source = "Text[^note]\n\n[^other]: x\n";
        assert!(!sync_footnotes(source).changed);
    }

    #[test]
    fn test_next_footnote_number() {
        assert_eq!(next_footnote_number(""), 1);
        assert_eq!(next_footnote_number("a[^1] b[^7]\n[^1]: x"), 8);
        // Gaps are never reused
        assert_eq!(next_footnote_number("a[^3]\n\n[^3]: x"), 4);
    }

    #[test]
    fn test_insert_footnote_with_selection() {
        let insertion = insert_footnote("Hello world", 6..11);
        assert_eq!(insertion.number, 1);
        assert_eq!(insertion.text, "Hello world[^1]\n\n[^1]: world");
        assert_eq!(&insertion.text[insertion.definition.clone()], "world");
    }

    #[test]
    fn test_insert_footnote_at_cursor() {
        let insertion = insert_footnote("A[^2]\n\n[^2]: b", 1..1);
        assert_eq!(insertion.number, 3);
        assert!(insertion.text.starts_with("A[^3][^2]"));
        assert_eq!(&insertion.text[insertion.definition.clone()], PLACEHOLDER_TEXT);
    }

    #[test]
    fn test_insert_footnote_snaps_to_char_boundary() {
        // Offset 1 falls inside the first character
        let insertion = insert_footnote("中文", 1..4);
        assert_eq!(&insertion.text[insertion.definition.clone()], "中文");
    }
}
