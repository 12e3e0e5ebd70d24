//! CSS inliner
//!
//! Applies a stylesheet to a parsed DOM by writing the winning declarations
//! of every matching rule into each element's `style` attribute, the way
//! mail and WeChat tooling "juices" HTML. Cascade order per property:
//! `!important` first, then existing inline style, then selector
//! specificity, then source order.

use kuchiki::traits::*;
use kuchiki::{NodeRef, Selector, Selectors, Specificity};
use log::debug;

use super::css::{parse_stylesheet, Declaration};
use super::dom::{set_style, style_of};

/// Cascade key; larger wins. Inline declarations carry no specificity.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Priority {
    important: bool,
    inline: bool,
    specificity: Option<Specificity>,
    order: usize,
}

struct CompiledRule {
    selector: Selector,
    order: usize,
    declarations: Vec<Declaration>,
}

/// A stylesheet prepared for matching.
pub struct Inliner {
    rules: Vec<CompiledRule>,
    custom_properties: Vec<(String, String)>,
}

impl Inliner {
    /// Compile the style rules of `css`. Selectors the matcher does not
    /// support (pseudo-elements, for instance) are skipped.
    pub fn new(css: &str) -> Self {
        let mut rules = Vec::new();
        let mut custom_properties = Vec::new();
        for (order, rule) in parse_stylesheet(css).into_iter().enumerate() {
            custom_properties.extend(
                rule.declarations
                    .iter()
                    .filter(|d| d.is_custom())
                    .map(|d| (d.name.clone(), d.value.clone())),
            );
            for selector in &rule.selectors {
                match Selectors::compile(selector) {
                    Ok(Selectors(compiled)) => {
                        rules.extend(compiled.into_iter().map(|selector| CompiledRule {
                            selector,
                            order,
                            declarations: rule.declarations.clone(),
                        }))
                    }
                    Err(()) => debug!("Skipping unsupported selector '{}'", selector),
                }
            }
        }
        Self {
            rules,
            custom_properties,
        }
    }

    /// Custom properties declared anywhere in the stylesheet, in source order.
    pub fn custom_properties(&self) -> Vec<(String, String)> {
        self.custom_properties.clone()
    }

    /// Inline the stylesheet into `root` and all elements below it.
    pub fn inline(&self, root: &NodeRef) {
        for element in root.inclusive_descendants().elements() {
            let mut candidates: Vec<(Priority, Declaration)> = Vec::new();

            for rule in &self.rules {
                if !rule.selector.matches(&element) {
                    continue;
                }
                for decl in &rule.declarations {
                    candidates.push((
                        Priority {
                            important: decl.important,
                            inline: false,
                            specificity: Some(rule.selector.specificity()),
                            order: rule.order,
                        },
                        decl.clone(),
                    ));
                }
            }
            if candidates.is_empty() {
                continue;
            }

            for (position, decl) in style_of(&element).into_iter().enumerate() {
                candidates.push((
                    Priority {
                        important: decl.important,
                        inline: true,
                        specificity: None,
                        order: position,
                    },
                    decl,
                ));
            }

            // Stable sort keeps declaration order inside one rule
            candidates.sort_by_key(|(priority, _)| *priority);

            let mut resolved: Vec<Declaration> = Vec::new();
            for (_, decl) in candidates {
                resolved.retain(|d| d.name != decl.name);
                resolved.push(decl);
            }
            set_style(&element, &resolved);
        }
    }
}

/// Inline `css` into the subtree rooted at `root`.
pub fn inline_css(root: &NodeRef, css: &str) {
    Inliner::new(css).inline(root);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::dom::{parse_fragment, serialize};

    fn inline(html: &str, css: &str) -> String {
        let doc = parse_fragment(&format!("<section id=\"wemd\">{}</section>", html));
        let root = doc.select_first("#wemd").unwrap();
        inline_css(root.as_node(), css);
        serialize(root.as_node())
    }

    fn specificity(selector: &str) -> Specificity {
        Selectors::compile(selector).unwrap().0[0].specificity()
    }

    #[test]
    fn test_specificity_order() {
        assert!(specificity("#wemd p") > specificity(".x p"));
        assert!(specificity(".x p") > specificity("p"));
        assert!(specificity("p a") > specificity("a"));
        assert!(specificity(".a .b") > specificity("p:not(.x)"));
    }

    #[test]
    fn test_negation_counts_its_argument() {
        let out = inline(
            "<div class=\"a\"><p class=\"b\">x</p></div>",
            "p:not(.x) { color: red } .a .b { color: blue }",
        );
        assert!(out.contains("<p class=\"b\" style=\"color:blue;\">"));
    }

    #[test]
    fn test_string_with_brace_does_not_swallow_rules() {
        let out = inline(
            "<h2><span class=\"prefix\"></span></h2><p>x</p>",
            "h2 .prefix { content: \"{\" } p { color: red }",
        );
        assert!(out.contains("<span class=\"prefix\" style=\"content:&quot;{&quot;;\">"));
        assert!(out.contains("<p style=\"color:red;\">"));
    }

    #[test]
    fn test_inlines_matching_rules() {
        let out = inline("<p>x</p>", "#wemd p { color: red; margin: 0 }");
        assert_eq!(out, "<section id=\"wemd\"><p style=\"color:red;margin:0;\">x</p></section>");
    }

    #[test]
    fn test_specificity_wins_over_order() {
        let out = inline("<p>x</p>", "#wemd p { color: red } p { color: blue }");
        assert!(out.contains("<p style=\"color:red;\">"));
    }

    #[test]
    fn test_later_rule_wins_at_equal_specificity() {
        let out = inline("<p>x</p>", "p { color: red } p { color: blue }");
        assert!(out.contains("<p style=\"color:blue;\">"));
    }

    #[test]
    fn test_inline_style_beats_rules_but_not_important() {
        let out = inline(
            "<p style=\"color: green; margin: 1px\">x</p>",
            "p { color: red; margin: 0 !important }",
        );
        assert!(out.contains("color:green;"));
        assert!(out.contains("margin:0 !important;"));
    }

    #[test]
    fn test_unsupported_selectors_are_skipped() {
        let out = inline("<h2>t</h2>", "h2::before { content: 'x' } h2 { color: red }");
        assert!(out.contains("<h2 style=\"color:red;\">"));
    }

    #[test]
    fn test_root_is_styled() {
        let out = inline("<p>x</p>", "#wemd { font-size: 16px; --accent: red }");
        assert!(out.starts_with("<section "));
        assert!(out.contains("style=\"font-size:16px;--accent:red;\""));
    }

    #[test]
    fn test_custom_properties() {
        let inliner = Inliner::new(":root { --a: 1px } #wemd { --b: var(--a); color: red }");
        assert_eq!(
            inliner.custom_properties(),
            vec![
                ("--a".to_string(), "1px".to_string()),
                ("--b".to_string(), "var(--a)".to_string())
            ]
        );
    }
}
