//! Export rewrite steps
//!
//! After the theme has been inlined, the fragment is pushed through a fixed,
//! ordered list of DOM rewrites that work around what the publishing
//! platform's editor strips or mangles on paste. Order matters: custom
//! properties must be resolved before anchor styles are migrated, and the
//! footnote steps rely on the generic anchor step having skipped them.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use kuchiki::traits::*;
use kuchiki::{ElementData, NodeDataRef, NodeRef};
use log::{debug, trace};
use regex::Regex;

use super::css::{serialize_declarations, set_declaration, Declaration};
use super::dom::{has_class, new_span, set_style, style_of, within_class, wrap_children};
use super::options::ExportOptions;

/// Nesting limit for `var()` substitution; deeper chains are treated as cycles.
const MAX_VAR_DEPTH: usize = 32;

/// Shared state handed to every step.
pub struct RewriteContext<'a> {
    pub options: &'a ExportOptions,
    /// Custom properties declared in the stylesheet, seeding `var()` lookups
    pub custom_properties: Vec<(String, String)>,
}

/// A single export rewrite over the root container.
pub type RewriteStep = fn(&NodeRef, &RewriteContext<'_>);

/// The export steps, in the order they run.
pub const EXPORT_STEPS: [(&str, RewriteStep); 10] = [
    ("protect-code-whitespace", protect_code_whitespace),
    ("top-to-translate", top_to_translate),
    ("resolve-custom-properties", resolve_custom_properties),
    ("checkbox-glyphs", replace_checkboxes),
    ("migrate-anchor-styles", migrate_anchor_styles),
    ("neutralize-footnote-anchors", neutralize_footnote_anchors),
    ("migrate-footnote-word-styles", migrate_footnote_words),
    ("harden-code-blocks", harden_code_blocks),
    ("tag-top-level-blocks", tag_top_level_blocks),
    ("finalize-root", finalize_root),
];

/// Run every export step over `root` in order.
pub fn run_export_steps(root: &NodeRef, ctx: &RewriteContext<'_>) {
    for (name, step) in EXPORT_STEPS {
        trace!("Export step: {}", name);
        step(root, ctx);
    }
}

fn select_all(root: &NodeRef, selector: &str) -> Vec<NodeDataRef<ElementData>> {
    match root.select(selector) {
        Ok(matches) => matches.collect(),
        Err(()) => {
            debug!("Invalid selector '{}'", selector);
            Vec::new()
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// 1. Code whitespace
// ─────────────────────────────────────────────────────────────────────────────

/// Tabs become spaces and spaces become non-breaking spaces inside
/// highlighted code, so indentation survives the paste.
pub fn protect_code_whitespace(root: &NodeRef, ctx: &RewriteContext<'_>) {
    let tab = " ".repeat(ctx.options.tab_width);
    for code in select_all(root, "code") {
        if !has_class(&code, "hljs") {
            continue;
        }
        for text in code.as_node().descendants().text_nodes() {
            let mut contents = text.borrow_mut();
            let protected = contents.replace('\t', &tab).replace(' ', "\u{a0}");
            *contents = protected;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// 2. Vertical offsets
// ─────────────────────────────────────────────────────────────────────────────

fn em_offset_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^-?(?:\d+(?:\.\d*)?|\.\d+)em$").expect("valid regex"))
}

/// `top: <n>em` is dropped by the platform; express it as a transform.
pub fn top_to_translate(root: &NodeRef, _ctx: &RewriteContext<'_>) {
    for element in root.inclusive_descendants().elements() {
        let mut declarations = style_of(&element);
        let mut changed = false;
        for decl in declarations.iter_mut() {
            if decl.name == "top" && em_offset_regex().is_match(&decl.value) {
                decl.name = "transform".to_string();
                decl.value = format!("translateY({})", decl.value);
                changed = true;
            }
        }
        if changed {
            set_style(&element, &declarations);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// 3. Custom properties
// ─────────────────────────────────────────────────────────────────────────────

/// Index of the `)` closing the group that starts right before `from`.
fn closing_paren(input: &str, from: usize) -> Option<usize> {
    let mut depth = 1usize;
    for (i, c) in input[from..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(from + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split `var()` arguments into the property name and optional fallback.
fn split_var_args(args: &str) -> (&str, Option<&str>) {
    let mut depth = 0usize;
    for (i, c) in args.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => return (args[..i].trim(), Some(args[i + 1..].trim())),
            _ => {}
        }
    }
    (args.trim(), None)
}

/// Replace every `var()` in `value`. `None` when a reference cannot be
/// resolved and has no usable fallback.
fn substitute_vars(value: &str, scope: &BTreeMap<String, String>, depth: usize) -> Option<String> {
    if depth > MAX_VAR_DEPTH {
        return None;
    }

    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find("var(") {
        out.push_str(&rest[..start]);
        let args_start = start + "var(".len();
        let close = closing_paren(rest, args_start)?;
        let (name, fallback) = split_var_args(&rest[args_start..close]);

        let from_scope = scope
            .get(name)
            .and_then(|v| substitute_vars(v, scope, depth + 1));
        let replacement = match from_scope {
            Some(v) => v,
            None => substitute_vars(fallback?, scope, depth + 1)?,
        };
        out.push_str(&replacement);
        rest = &rest[close + 1..];
    }
    out.push_str(rest);
    Some(out)
}

fn resolve_in_scope(node: &NodeRef, inherited: &BTreeMap<String, String>) {
    let local_scope;
    let scope = match node.as_element() {
        Some(element) => {
            let declarations = style_of(element);
            let needs_work = declarations
                .iter()
                .any(|d| d.is_custom() || d.value.contains("var("));
            if needs_work {
                let mut scope = inherited.clone();
                for decl in declarations.iter().filter(|d| d.is_custom()) {
                    scope.insert(decl.name.clone(), decl.value.clone());
                }

                let resolved: Vec<Declaration> = declarations
                    .into_iter()
                    .filter(|d| !d.is_custom())
                    .filter_map(|mut d| {
                        if d.value.contains("var(") {
                            match substitute_vars(&d.value, &scope, 0) {
                                Some(value) => d.value = value,
                                None => {
                                    debug!("Dropping unresolved declaration '{}'", d.name);
                                    return None;
                                }
                            }
                        }
                        Some(d)
                    })
                    .collect();
                set_style(element, &resolved);

                local_scope = scope;
                &local_scope
            } else {
                inherited
            }
        }
        None => inherited,
    };

    for child in node.children() {
        resolve_in_scope(&child, scope);
    }
}

/// Substitute `var()` references with concrete values and drop all custom
/// property declarations, which the platform discards.
///
/// Lookups see stylesheet-level properties, then those declared on any
/// ancestor, with nearer declarations winning.
pub fn resolve_custom_properties(root: &NodeRef, ctx: &RewriteContext<'_>) {
    let seed: BTreeMap<String, String> = ctx.custom_properties.iter().cloned().collect();
    resolve_in_scope(root, &seed);
}

// ─────────────────────────────────────────────────────────────────────────────
// 4. Checkboxes
// ─────────────────────────────────────────────────────────────────────────────

/// Replace checkbox inputs with ☑ / ☐ glyphs.
pub fn replace_checkboxes(root: &NodeRef, _ctx: &RewriteContext<'_>) {
    for input in select_all(root, "input") {
        let checked = {
            let attributes = input.attributes.borrow();
            let is_checkbox = attributes
                .get("type")
                .map_or(false, |t| t.eq_ignore_ascii_case("checkbox"));
            if !is_checkbox {
                continue;
            }
            attributes.contains("checked")
        };
        let glyph = if checked { "☑" } else { "☐" };
        let node = input.as_node();
        node.insert_before(NodeRef::new_text(glyph));
        node.detach();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// 5-7. Anchors
// ─────────────────────────────────────────────────────────────────────────────

fn is_moved_to_span(name: &str) -> bool {
    name == "color"
        || name == "font-weight"
        || name.starts_with("background")
        || name.starts_with("padding")
        || name.starts_with("margin")
}

fn is_decoration(name: &str) -> bool {
    name.starts_with("border-bottom") || name.starts_with("text-decoration")
}

/// Move the visible styling of a link onto a span around its contents and
/// force an underline there; the platform rewrites styles on `<a>` itself.
fn migrate_to_span(anchor: &NodeDataRef<ElementData>, line_style: &str) {
    let (moved, kept): (Vec<Declaration>, Vec<Declaration>) = style_of(anchor)
        .into_iter()
        .filter(|d| !is_decoration(&d.name))
        .partition(|d| is_moved_to_span(&d.name));
    set_style(anchor, &kept);

    let mut span_style = vec![
        Declaration::new("text-decoration", "underline"),
        Declaration::new("text-decoration-style", line_style),
    ];
    span_style.extend(moved);
    wrap_children(anchor.as_node(), new_span(serialize_declarations(&span_style)));
}

/// Ordinary links get a solid underline span.
pub fn migrate_anchor_styles(root: &NodeRef, _ctx: &RewriteContext<'_>) {
    for anchor in select_all(root, "a") {
        if has_class(&anchor, "footnote-word") || within_class(anchor.as_node(), "footnote-item") {
            continue;
        }
        migrate_to_span(&anchor, "solid");
    }
}

fn is_footnote_decoration(name: &str) -> bool {
    name == "color"
        || name == "font-weight"
        || name.starts_with("text-decoration")
        || name.starts_with("border")
        || name.starts_with("background")
}

/// Links inside footnote items render as plain text.
pub fn neutralize_footnote_anchors(root: &NodeRef, _ctx: &RewriteContext<'_>) {
    for anchor in select_all(root, "a") {
        if !within_class(anchor.as_node(), "footnote-item") {
            continue;
        }
        let mut declarations: Vec<Declaration> = style_of(&anchor)
            .into_iter()
            .filter(|d| !is_footnote_decoration(&d.name))
            .collect();
        declarations.extend([
            Declaration::new("color", "inherit"),
            Declaration::new("text-decoration", "none"),
            Declaration::new("border", "none"),
            Declaration::new("background", "none"),
            Declaration::new("font-weight", "inherit"),
        ]);
        set_style(&anchor, &declarations);
    }
}

/// Footnote reference markers get a dashed underline span.
pub fn migrate_footnote_words(root: &NodeRef, _ctx: &RewriteContext<'_>) {
    for word in select_all(root, ".footnote-word") {
        migrate_to_span(&word, "dashed");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// 8. Code blocks
// ─────────────────────────────────────────────────────────────────────────────

/// Horizontal scrolling on `<pre>` and no wrapping or justification inside
/// its `<code>`.
pub fn harden_code_blocks(root: &NodeRef, _ctx: &RewriteContext<'_>) {
    for pre in select_all(root, "pre") {
        let mut declarations = style_of(&pre);
        set_declaration(&mut declarations, "overflow-x", "auto");
        set_declaration(&mut declarations, "-webkit-overflow-scrolling", "touch");
        set_style(&pre, &declarations);
    }

    for code in select_all(root, "pre code") {
        let mut declarations = style_of(&code);
        set_declaration(&mut declarations, "white-space", "pre");
        set_declaration(&mut declarations, "text-align", "left");
        set_declaration(&mut declarations, "letter-spacing", "0");
        set_declaration(&mut declarations, "word-spacing", "0");
        set_style(&code, &declarations);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// 9-10. Root
// ─────────────────────────────────────────────────────────────────────────────

/// Add the provenance attribute to direct element children of the root.
pub fn tag_top_level_blocks(root: &NodeRef, ctx: &RewriteContext<'_>) {
    for child in root.children().elements() {
        let mut attributes = child.attributes.borrow_mut();
        if !attributes.contains("data-tool") {
            attributes.insert("data-tool", ctx.options.data_tool.clone());
        }
    }
}

/// Make the root background transparent and drop `<style>` elements.
pub fn finalize_root(root: &NodeRef, _ctx: &RewriteContext<'_>) {
    if let Some(element) = root.as_element() {
        let mut declarations: Vec<Declaration> = style_of(element)
            .into_iter()
            .filter(|d| !d.name.starts_with("background"))
            .collect();
        declarations.push(Declaration::new("background", "transparent"));
        set_style(element, &declarations);
    }

    for style in select_all(root, "style") {
        style.as_node().detach();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
