//! TeX math support
//!
//! CommonMark parsers tokenize `$…$` as ordinary text, which mangles TeX
//! (underscores turn into emphasis, backslashes get eaten). Math is therefore
//! lifted out of the source before comrak sees it: every span is replaced by
//! a private-use placeholder, and the math plugin later swaps placeholders
//! for rendered MathML.
//!
//! Delimiter rules:
//! - inline `$…$`: the opening `$` must not be followed by a space or tab,
//!   the closing `$` must not be preceded by one nor followed by a digit,
//!   and must not be escaped by an odd run of backslashes. `$$` with nothing
//!   between stays literal.
//! - block `$$…$$`: a line starting with `$$` (at most three spaces of
//!   indent) opens a block, closed by the first later line whose trimmed text
//!   ends with `$$`. Text before that last `$$` on the closing line is part of
//!   the formula. An unterminated block runs to the end of the document.

use latex2mathml::{latex_to_mathml, DisplayStyle};
use log::debug;
use regex::Regex;
use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::string_utils::escape_html;

// ─────────────────────────────────────────────────────────────────────────────
// Placeholders
// ─────────────────────────────────────────────────────────────────────────────

const INLINE_OPEN: char = '\u{E000}';
const INLINE_CLOSE: char = '\u{E001}';
const BLOCK_OPEN: char = '\u{E002}';
const BLOCK_CLOSE: char = '\u{E003}';

const SENTINELS: [char; 4] = [INLINE_OPEN, INLINE_CLOSE, BLOCK_OPEN, BLOCK_CLOSE];

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new("(\u{E000}(\\d+)\u{E001})|(\u{E002}(\\d+)\u{E003})").expect("valid regex")
    })
}

/// One formula lifted out of the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MathSpan {
    /// TeX between the delimiters
    pub latex: String,
    /// `$$` block formula rather than inline `$`
    pub display: bool,
    /// Exact source text the placeholder replaced, delimiters included
    pub source: String,
}

/// Source with math replaced by placeholders, plus the lifted spans.
#[derive(Debug, Clone, Default)]
pub struct MathExtraction {
    pub source: String,
    pub spans: Vec<MathSpan>,
}

/// A placeholder found inside a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaceholderMatch {
    pub start: usize,
    pub end: usize,
    pub index: usize,
    pub display: bool,
}

impl MathExtraction {
    /// Extraction that leaves the source untouched.
    pub fn passthrough(source: &str) -> Self {
        Self {
            source: source.to_string(),
            spans: Vec::new(),
        }
    }

    /// Locate placeholders in `text` that refer to known spans.
    pub fn find_placeholders(&self, text: &str) -> Vec<PlaceholderMatch> {
        if self.spans.is_empty() {
            return Vec::new();
        }
        placeholder_regex()
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let (index, display) = match (caps.get(2), caps.get(4)) {
                    (Some(n), _) => (n.as_str().parse().ok()?, false),
                    (None, Some(n)) => (n.as_str().parse().ok()?, true),
                    _ => return None,
                };
                (index < self.spans.len()).then_some(PlaceholderMatch {
                    start: whole.start(),
                    end: whole.end(),
                    index,
                    display,
                })
            })
            .collect()
    }

    /// Put the original source back wherever a placeholder appears.
    ///
    /// Used for contexts where math is not rendered: code, raw HTML, URLs.
    pub fn restore(&self, text: &str) -> String {
        let matches = self.find_placeholders(text);
        if matches.is_empty() {
            return text.to_string();
        }
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for m in matches {
            out.push_str(&text[last..m.start]);
            out.push_str(&self.spans[m.index].source);
            last = m.end;
        }
        out.push_str(&text[last..]);
        out
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Source Scanner
// ─────────────────────────────────────────────────────────────────────────────

/// Lift all math spans out of `source`.
///
/// Math inside fenced code blocks and code spans is left alone. Sources that
/// already contain the private-use sentinels are passed through unchanged.
pub fn extract(source: &str) -> MathExtraction {
    if source.contains(SENTINELS) {
        debug!("Source contains math placeholder characters, skipping math extraction");
        return MathExtraction::passthrough(source);
    }

    let lines: Vec<&str> = source.split_inclusive('\n').collect();
    let mut out = String::with_capacity(source.len());
    let mut spans = Vec::new();
    let mut paragraph = Paragraph::default();
    let mut fence: Option<(u8, usize)> = None;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        let (prefix_len, containers) = split_containers(line);
        let content = &line[prefix_len..];

        if let Some((marker, len)) = fence {
            out.push_str(line);
            if closes_fence(content, marker, len) {
                fence = None;
            }
            i += 1;
            continue;
        }

        if let Some(opened) = opening_fence(content) {
            paragraph.flush(&mut out, &mut spans);
            fence = Some(opened);
            out.push_str(line);
            i += 1;
            continue;
        }

        if let Some(block) = scan_block(&lines, i, content, &containers) {
            let had_paragraph = !paragraph.lines.is_empty();
            paragraph.flush(&mut out, &mut spans);
            let placeholder = format!("{}{}{}", BLOCK_OPEN, spans.len(), BLOCK_CLOSE);
            spans.push(MathSpan {
                latex: block.latex,
                display: true,
                source: block.source,
            });

            if containers.is_empty() {
                if !out.is_empty() && !out.ends_with("\n\n") {
                    out.push('\n');
                }
                out.push_str(&" ".repeat(block.indent));
                out.push_str(&placeholder);
                out.push_str("\n\n");
            } else {
                // Keep the formula its own paragraph inside the container
                let blank = continuation_prefix(&containers);
                let opens_item = containers.iter().any(|c| matches!(c, Container::Item(_)));
                if had_paragraph && !opens_item {
                    out.push_str(blank.trim_end());
                    out.push('\n');
                }
                out.push_str(&line[..prefix_len]);
                out.push_str(&" ".repeat(block.indent));
                out.push_str(&placeholder);
                out.push('\n');
                if let Some(next) = lines.get(block.next_line) {
                    match strip_continuation(next, &containers) {
                        Some(rest) if !rest.trim().is_empty() => {
                            out.push_str(blank.trim_end());
                            out.push('\n');
                        }
                        // Plain text here would be a lazy continuation line
                        None if !next.trim().is_empty() && split_containers(next).1.is_empty() => {
                            out.push('\n');
                        }
                        _ => {}
                    }
                }
            }
            i = block.next_line;
            continue;
        }

        let quote_depth = containers.iter().filter(|c| **c == Container::Quote).count();
        let opens_item = containers.iter().any(|c| matches!(c, Container::Item(_)));

        if content.trim().is_empty() {
            paragraph.flush(&mut out, &mut spans);
            out.push_str(line);
        } else if is_atx_heading(content) {
            paragraph.flush(&mut out, &mut spans);
            out.push_str(&scan_inline(content, &[&line[..prefix_len]], &mut spans));
        } else if content.trim_start().starts_with('|') {
            paragraph.flush(&mut out, &mut spans);
            out.push_str(&line[..prefix_len]);
            out.push_str(&scan_table_row(content, &mut spans));
        } else {
            if opens_item || quote_depth > paragraph.quote_depth {
                paragraph.flush(&mut out, &mut spans);
            }
            if paragraph.lines.is_empty() {
                paragraph.quote_depth = quote_depth;
            }
            paragraph.lines.push((&line[..prefix_len], content));
        }
        i += 1;
    }
    paragraph.flush(&mut out, &mut spans);

    MathExtraction { source: out, spans }
}

/// Lines of one paragraph, split into container prefix and content.
#[derive(Default)]
struct Paragraph<'s> {
    lines: Vec<(&'s str, &'s str)>,
    quote_depth: usize,
}

impl Paragraph<'_> {
    fn flush(&mut self, out: &mut String, spans: &mut Vec<MathSpan>) {
        if self.lines.is_empty() {
            return;
        }
        let text: String = self.lines.iter().map(|(_, content)| *content).collect();
        let prefixes: Vec<&str> = self.lines.iter().map(|(prefix, _)| *prefix).collect();
        out.push_str(&scan_inline(&text, &prefixes, spans));
        self.lines.clear();
        self.quote_depth = 0;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Container Prefixes
// ─────────────────────────────────────────────────────────────────────────────

/// Block container opened by a line prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    /// `>` blockquote marker
    Quote,
    /// List item; content starts this many columns after the marker's indent
    Item(usize),
}

fn list_marker_width(rest: &str) -> Option<usize> {
    let bytes = rest.as_bytes();
    let marker = match bytes.first()? {
        b'-' | b'*' | b'+' => 1,
        b'0'..=b'9' => {
            let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
            if digits > 9 || !matches!(bytes.get(digits), Some(b'.') | Some(b')')) {
                return None;
            }
            digits + 1
        }
        _ => return None,
    };
    let spaces = bytes[marker..].iter().take_while(|&&b| b == b' ').count();
    (1..=4).contains(&spaces).then_some(marker + spaces)
}

/// Byte length of the blockquote and list markers opening `line`.
fn split_containers(line: &str) -> (usize, Vec<Container>) {
    let mut containers = Vec::new();
    let mut pos = 0;
    loop {
        let rest = &line[pos..];
        let indent = leading_spaces(rest);
        if indent > 3 {
            break;
        }
        let after = &rest[indent..];
        if after.starts_with('>') {
            pos += indent + 1;
            if line[pos..].starts_with(' ') {
                pos += 1;
            }
            containers.push(Container::Quote);
        } else if let Some(width) = list_marker_width(after) {
            pos += indent + width;
            containers.push(Container::Item(indent + width));
        } else {
            break;
        }
    }
    (pos, containers)
}

/// Strip the prefix a continuation line of `containers` must carry.
///
/// Returns `None` when the line does not continue them (a quote marker is
/// missing or a list item is not indented enough).
fn strip_continuation<'s>(line: &'s str, containers: &[Container]) -> Option<&'s str> {
    let mut rest = line;
    for container in containers {
        match container {
            Container::Quote => {
                let indent = leading_spaces(rest);
                if indent > 3 || !rest[indent..].starts_with('>') {
                    return None;
                }
                rest = &rest[indent + 1..];
                if rest.starts_with(' ') {
                    rest = &rest[1..];
                }
            }
            Container::Item(width) => {
                if rest.trim().is_empty() {
                    return Some(rest);
                }
                if leading_spaces(rest) < *width {
                    return None;
                }
                rest = &rest[*width..];
            }
        }
    }
    Some(rest)
}

/// Prefix continuing `containers` on a new line.
fn continuation_prefix(containers: &[Container]) -> String {
    containers
        .iter()
        .map(|c| match c {
            Container::Quote => "> ".to_string(),
            Container::Item(width) => " ".repeat(*width),
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Block Scanning
// ─────────────────────────────────────────────────────────────────────────────

fn leading_spaces(line: &str) -> usize {
    line.bytes().take_while(|&b| b == b' ').count()
}

fn is_atx_heading(line: &str) -> bool {
    let indent = leading_spaces(line);
    if indent > 3 {
        return false;
    }
    let rest = &line[indent..];
    let hashes = rest.bytes().take_while(|&b| b == b'#').count();
    (1..=6).contains(&hashes)
        && rest[hashes..]
            .chars()
            .next()
            .map_or(true, |c| c == ' ' || c == '\t' || c == '\n' || c == '\r')
}

fn opening_fence(line: &str) -> Option<(u8, usize)> {
    let indent = leading_spaces(line);
    if indent > 3 {
        return None;
    }
    let rest = &line[indent..];
    let marker = *rest.as_bytes().first()?;
    if marker != b'`' && marker != b'~' {
        return None;
    }
    let len = rest.bytes().take_while(|&b| b == marker).count();
    if len < 3 {
        return None;
    }
    // Backtick fences cannot carry backticks in their info string
    if marker == b'`' && rest[len..].contains('`') {
        return None;
    }
    Some((marker, len))
}

fn closes_fence(line: &str, marker: u8, len: usize) -> bool {
    let indent = leading_spaces(line);
    if indent > 3 {
        return false;
    }
    let rest = line[indent..].trim_end();
    let run = rest.bytes().take_while(|&b| b == marker).count();
    run >= len && run == rest.len()
}

struct BlockMath {
    latex: String,
    source: String,
    indent: usize,
    /// First line after the block
    next_line: usize,
}

fn strip_newline(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}

/// Scan a `$$` block whose opening line `start` has `content` after its
/// container prefix. Later lines must continue the same containers; the
/// block ends unterminated where they stop doing so.
fn scan_block(
    lines: &[&str],
    start: usize,
    content: &str,
    containers: &[Container],
) -> Option<BlockMath> {
    let first = strip_newline(content);
    let indent = leading_spaces(first);
    if indent > 3 || !first[indent..].starts_with("$$") {
        return None;
    }

    let mut first_line = &first[indent + 2..];
    let mut last_line = "";
    let mut found = false;

    let trimmed = first_line.trim();
    if trimmed.ends_with("$$") {
        first_line = &trimmed[..trimmed.len() - 2];
        found = true;
    }

    let mut consumed: Vec<&str> = vec![&content[indent..]];
    let mut body: Vec<&str> = Vec::new();
    let mut next = start + 1;
    while !found && next < lines.len() {
        let Some(raw) = strip_continuation(lines[next], containers) else {
            break;
        };
        next += 1;
        consumed.push(raw);
        let line = strip_newline(raw);
        if line.trim().ends_with("$$") {
            let line_indent = leading_spaces(line);
            if let Some(last_pos) = line.rfind("$$") {
                last_line = line.get(line_indent..last_pos).unwrap_or("");
            }
            found = true;
        } else {
            body.push(raw);
        }
    }

    let mut latex = String::new();
    if !first_line.trim().is_empty() {
        latex.push_str(first_line);
        latex.push('\n');
    }
    for line in body {
        let strip = leading_spaces(line).min(indent);
        latex.push_str(&line[strip..]);
    }
    if !last_line.trim().is_empty() {
        latex.push_str(last_line);
    }

    Some(BlockMath {
        latex,
        source: strip_newline(&consumed.concat()).to_string(),
        indent,
        next_line: next,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Inline Scanning
// ─────────────────────────────────────────────────────────────────────────────

/// Copy `text[from..to]`, re-attaching the container prefix of every line
/// that starts inside the range.
fn copy_lines(out: &mut String, text: &str, from: usize, to: usize, prefixes: &[&str]) {
    let mut line = text[..from].matches('\n').count();
    for piece in text[from..to].split_inclusive('\n') {
        out.push_str(piece);
        if piece.ends_with('\n') {
            line += 1;
            out.push_str(prefixes.get(line).copied().unwrap_or(""));
        }
    }
}

/// Replace inline `$…$` spans in one leaf block.
///
/// `text` holds the block's lines without container prefixes; `prefixes[n]`
/// is written back in front of line `n`. A span covering a line break
/// drops the prefixes of the lines it swallows.
fn scan_inline(text: &str, prefixes: &[&str], spans: &mut Vec<MathSpan>) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    out.push_str(prefixes.first().copied().unwrap_or(""));
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                // Escaped punctuation is literal
                i += if bytes.get(i + 1).map_or(false, u8::is_ascii_punctuation) {
                    2
                } else {
                    1
                };
            }
            b'`' => {
                let run = bytes[i..].iter().take_while(|&&b| b == b'`').count();
                i = match find_backtick_run(bytes, i + run, run) {
                    Some(close) => close + run,
                    None => i + run,
                };
            }
            b'$' => {
                let Some(close) = find_inline_close(bytes, i) else {
                    i += 1;
                    continue;
                };
                copy_lines(&mut out, text, copied, i, prefixes);
                out.push(INLINE_OPEN);
                out.push_str(&spans.len().to_string());
                out.push(INLINE_CLOSE);
                spans.push(MathSpan {
                    latex: text[i + 1..close].to_string(),
                    display: false,
                    source: text[i..=close].to_string(),
                });
                i = close + 1;
                copied = i;
            }
            _ => i += 1,
        }
    }

    copy_lines(&mut out, text, copied, text.len(), prefixes);
    out
}

/// Scan each cell of a pipe table row on its own.
fn scan_table_row(row: &str, spans: &mut Vec<MathSpan>) -> String {
    let bytes = row.as_bytes();
    let mut out = String::with_capacity(row.len());
    let mut cell_start = 0;
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'|' && (i == 0 || bytes[i - 1] != b'\\') {
            out.push_str(&scan_inline(&row[cell_start..i], &[], spans));
            out.push('|');
            cell_start = i + 1;
        }
    }
    out.push_str(&scan_inline(&row[cell_start..], &[], spans));
    out
}

fn find_backtick_run(bytes: &[u8], from: usize, run: usize) -> Option<usize> {
    let mut j = from;
    while j < bytes.len() {
        if bytes[j] == b'`' {
            let len = bytes[j..].iter().take_while(|&&b| b == b'`').count();
            if len == run {
                return Some(j);
            }
            j += len;
        } else {
            j += 1;
        }
    }
    None
}

/// Index of the `$` closing an inline span opened at `open`.
fn find_inline_close(bytes: &[u8], open: usize) -> Option<usize> {
    let is_blank = |b: Option<&u8>| matches!(b, Some(b' ') | Some(b'\t'));

    if is_blank(bytes.get(open + 1)) {
        return None;
    }

    let start = open + 1;
    let mut search = start;
    let close = loop {
        let offset = bytes.get(search..)?.iter().position(|&b| b == b'$')?;
        let candidate = search + offset;
        let backslashes = bytes[..candidate]
            .iter()
            .rev()
            .take_while(|&&b| b == b'\\')
            .count();
        if backslashes % 2 == 0 {
            break candidate;
        }
        search = candidate + 1;
    };

    if close == start {
        return None;
    }
    if is_blank(bytes.get(close - 1)) || bytes.get(close + 1).map_or(false, u8::is_ascii_digit) {
        return None;
    }
    Some(close)
}

// ─────────────────────────────────────────────────────────────────────────────
// Rendering
// ─────────────────────────────────────────────────────────────────────────────

/// Render one formula into its wrapper element.
///
/// Inline formulas become `<span class="inline-equation">`, block formulas
/// `<div class="block-equation">`. When conversion fails the escaped TeX is
/// shown instead, unless `strict` is set.
pub fn render_formula(latex: &str, display: bool, strict: bool) -> Result<String> {
    let latex = latex.trim();
    let style = if display {
        DisplayStyle::Block
    } else {
        DisplayStyle::Inline
    };

    let body = match latex_to_mathml(latex, style) {
        Ok(mathml) => mathml,
        Err(e) if strict => {
            return Err(Error::Math {
                latex: latex.to_string(),
                message: e.to_string(),
            })
        }
        Err(e) => {
            debug!("Math rendering failed for '{}': {}", latex, e);
            escape_html(latex)
        }
    };

    Ok(if display {
        format!("<div class=\"block-equation\">{}</div>", body)
    } else {
        format!("<span class=\"inline-equation\">{}</span>", body)
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn latex_of(source: &str) -> Vec<(String, bool)> {
        extract(source)
            .spans
            .into_iter()
            .map(|s| (s.latex, s.display))
            .collect()
    }

    #[test]
    fn test_inline_math() {
        assert_eq!(latex_of("Energy $E=mc^2$ here"), vec![("E=mc^2".to_string(), false)]);
    }

    #[test]
    fn test_inline_requires_tight_delimiters() {
        assert!(latex_of("costs $ 5 and $ 6").is_empty());
        assert!(latex_of("from $a $ to").is_empty());
    }

    #[test]
    fn test_closing_dollar_before_digit() {
        assert!(latex_of("pay $5 or $6 today").is_empty());
    }

    #[test]
    fn test_empty_inline_stays_literal() {
        let extraction = extract("price $$ x");
        assert!(extraction.spans.is_empty());
        assert_eq!(extraction.source, "price $$ x");
    }

    #[test]
    fn test_escaped_dollar() {
        assert!(latex_of("a \\$5 and $x\\$ end").is_empty());
        assert_eq!(latex_of("$a\\\\$"), vec![("a\\\\".to_string(), false)]);
    }

    #[test]
    fn test_inline_does_not_cross_paragraphs() {
        assert!(latex_of("first $x\n\nsecond y$").is_empty());
        assert_eq!(latex_of("first $x\nsecond$"), vec![("x\nsecond".to_string(), false)]);
    }

    #[test]
    fn test_single_line_block() {
        let extraction = extract("$$x^2$$\n");
        assert_eq!(extraction.spans.len(), 1);
        assert_eq!(extraction.spans[0].latex, "x^2\n");
        assert!(extraction.spans[0].display);
        assert_eq!(extraction.spans[0].source, "$$x^2$$");
        assert!(extraction.source.starts_with(BLOCK_OPEN));
    }

    #[test]
    fn test_multi_line_block() {
        let extraction = extract("before\n$$\na+b\n= c$$\nafter\n");
        assert_eq!(extraction.spans.len(), 1);
        assert_eq!(extraction.spans[0].latex, "a+b\n= c");
        assert!(extraction.source.starts_with("before\n\n"));
        assert!(extraction.source.ends_with("\n\nafter\n"));
    }

    #[test]
    fn test_block_inside_blockquote() {
        let extraction = extract("> $$\n> x^2\n> $$\n");
        assert_eq!(extraction.spans.len(), 1);
        assert_eq!(extraction.spans[0].latex, "x^2\n");
        assert!(extraction.spans[0].display);
        assert_eq!(extraction.source, format!("> {}0{}\n", BLOCK_OPEN, BLOCK_CLOSE));
    }

    #[test]
    fn test_block_inside_blockquote_between_paragraphs() {
        let extraction = extract("> before\n> $$\n> a\n> $$\n> after\n");
        assert_eq!(extraction.spans[0].latex, "a\n");
        assert_eq!(
            extraction.source,
            format!("> before\n>\n> {}0{}\n>\n> after\n", BLOCK_OPEN, BLOCK_CLOSE)
        );
    }

    #[test]
    fn test_block_ends_where_blockquote_ends() {
        let extraction = extract("> $$\n> a\nplain\n");
        assert_eq!(extraction.spans[0].latex, "a\n");
        assert_eq!(extraction.source, format!("> {}0{}\n\nplain\n", BLOCK_OPEN, BLOCK_CLOSE));
    }

    #[test]
    fn test_block_in_list_item() {
        let extraction = extract("- $$x$$\n- next\n");
        assert_eq!(extraction.spans.len(), 1);
        assert!(extraction.spans[0].display);
        assert_eq!(extraction.spans[0].latex, "x\n");
        assert_eq!(extraction.source, format!("- {}0{}\n- next\n", BLOCK_OPEN, BLOCK_CLOSE));
    }

    #[test]
    fn test_multi_line_block_in_list_item() {
        let extraction = extract("1. $$\n   a+b\n   $$\n");
        assert_eq!(extraction.spans[0].latex, "a+b\n");
    }

    #[test]
    fn test_inline_does_not_cross_list_items() {
        let source = "- a $x\n- b$\n";
        let extraction = extract(source);
        assert!(extraction.spans.is_empty());
        assert_eq!(extraction.source, source);
    }

    #[test]
    fn test_inline_in_blockquote_keeps_prefixes() {
        let extraction = extract("> see $a\n> b$ here\n> next\n");
        assert_eq!(extraction.spans[0].latex, "a\nb");
        assert_eq!(
            extraction.source,
            format!("> see {}0{} here\n> next\n", INLINE_OPEN, INLINE_CLOSE)
        );
    }

    #[test]
    fn test_inline_does_not_cross_table_cells() {
        assert!(latex_of("| $a | b$ |\n| --- | --- |\n").is_empty());
        assert_eq!(
            latex_of("| $a$ | b |\n"),
            vec![("a".to_string(), false)]
        );
    }

    #[test]
    fn test_unterminated_block_runs_to_end() {
        let extraction = extract("$$\na\nb\n");
        assert_eq!(extraction.spans.len(), 1);
        assert_eq!(extraction.spans[0].latex, "a\nb\n");
    }

    #[test]
    fn test_code_is_skipped() {
        assert!(latex_of("```\n$x$\n```\n").is_empty());
        assert!(latex_of("run `echo $a$` now").is_empty());
        assert!(latex_of("    $$\n    x\n").is_empty());
    }

    #[test]
    fn test_sentinels_disable_extraction() {
        let source = "weird \u{E000}0\u{E001} $x$";
        let extraction = extract(source);
        assert!(extraction.spans.is_empty());
        assert_eq!(extraction.source, source);
    }

    #[test]
    fn test_restore() {
        let extraction = extract("see $a_1$ and $b$");
        let restored = extraction.restore(&extraction.source);
        assert_eq!(restored, "see $a_1$ and $b$");
    }

    #[test]
    fn test_find_placeholders() {
        let extraction = extract("$x$ and\n\n$$\ny\n$$\n");
        let inline = extraction.find_placeholders(&extraction.source);
        assert_eq!(inline.len(), 2);
        assert!(!inline[0].display);
        assert!(inline[1].display);
    }

    #[test]
    fn test_render_inline_formula() {
        let html = render_formula("x^2", false, false).unwrap();
        assert!(html.starts_with("<span class=\"inline-equation\">"));
        assert!(html.contains("<math"));
    }

    #[test]
    fn test_render_block_formula() {
        let html = render_formula("\\frac{a}{b}", true, false).unwrap();
        assert!(html.starts_with("<div class=\"block-equation\">"));
        assert!(html.contains("<math"));
    }
}
