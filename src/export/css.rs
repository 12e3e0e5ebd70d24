//! CSS parsing for inlining
//!
//! Only what the inliner needs: style rules (selector list + declarations)
//! and declaration lists as found in `style` attributes, tokenized with
//! cssparser. At-rules such as `@media` or `@font-face` cannot be inlined
//! and are skipped.

use cssparser::{
    parse_important, AtRuleParser, AtRuleType, BasicParseErrorKind, CowRcStr, DeclarationListParser,
    DeclarationParser, Delimiter, ParseError, Parser, ParserInput, QualifiedRuleParser,
    RuleListParser, SourceLocation,
};
use log::trace;
use std::fmt::Write as _;

// ─────────────────────────────────────────────────────────────────────────────
// Declarations
// ─────────────────────────────────────────────────────────────────────────────

/// One `name: value` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// Property name; lowercased unless it is a custom property
    pub name: String,
    pub value: String,
    pub important: bool,
}

impl Declaration {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            important: false,
        }
    }

    /// Whether this is a custom property (`--name`).
    pub fn is_custom(&self) -> bool {
        self.name.starts_with("--")
    }
}

/// Collects `name: value` pairs from a declaration list.
struct DeclarationCollector;

impl<'i> DeclarationParser<'i> for DeclarationCollector {
    type Declaration = Declaration;
    type Error = ();

    fn parse_value<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Declaration, ParseError<'i, Self::Error>> {
        let value = input.parse_until_before(Delimiter::Bang, |i| {
            let start = i.position();
            while i.next().is_ok() {}
            Ok::<_, ParseError<'i, ()>>(i.slice_from(start).trim().to_string())
        })?;
        let important = input.try_parse(parse_important).is_ok();
        input.expect_exhausted()?;

        if value.is_empty() {
            return Err(input.new_custom_error(()));
        }

        let name = if name.starts_with("--") {
            name.to_string()
        } else {
            name.to_ascii_lowercase()
        };
        Ok(Declaration {
            name,
            value,
            important,
        })
    }
}

impl<'i> AtRuleParser<'i> for DeclarationCollector {
    type PreludeNoBlock = ();
    type PreludeBlock = ();
    type AtRule = Declaration;
    type Error = ();
}

fn collect_declarations<'i, 't>(input: &mut Parser<'i, 't>) -> Vec<Declaration> {
    DeclarationListParser::new(input, DeclarationCollector)
        .filter_map(|result| match result {
            Ok(decl) => Some(decl),
            Err((_, source)) => {
                trace!("Dropping malformed declaration '{}'", source.trim());
                None
            }
        })
        .collect()
}

/// Parse a declaration block body or a `style` attribute value.
///
/// Malformed entries (no colon, empty name or value) are dropped.
pub fn parse_declarations(input: &str) -> Vec<Declaration> {
    let mut input = ParserInput::new(input);
    let mut parser = Parser::new(&mut input);
    collect_declarations(&mut parser)
}

/// Serialize declarations compactly as `name:value;…`.
pub fn serialize_declarations(declarations: &[Declaration]) -> String {
    let mut out = String::new();
    for decl in declarations {
        let _ = write!(out, "{}:{}", decl.name, decl.value);
        if decl.important {
            out.push_str(" !important");
        }
        out.push(';');
    }
    out
}

/// Set `name` to `value`, replacing an existing declaration in place.
pub fn set_declaration(declarations: &mut Vec<Declaration>, name: &str, value: &str) {
    match declarations.iter_mut().find(|d| d.name == name) {
        Some(existing) => {
            existing.value = value.to_string();
            existing.important = false;
        }
        None => declarations.push(Declaration::new(name, value)),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stylesheets
// ─────────────────────────────────────────────────────────────────────────────

/// A style rule: selector list plus its declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRule {
    /// Individual selectors of the rule's comma-separated list
    pub selectors: Vec<String>,
    pub declarations: Vec<Declaration>,
}

/// Collects style rules; at-rules are rejected and skipped whole.
struct RuleCollector;

impl<'i> QualifiedRuleParser<'i> for RuleCollector {
    type Prelude = Vec<String>;
    type QualifiedRule = StyleRule;
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        input.parse_comma_separated(|i| {
            let start = i.position();
            while i.next().is_ok() {}
            Ok(i.slice_from(start).trim().to_string())
        })
    }

    fn parse_block<'t>(
        &mut self,
        prelude: Self::Prelude,
        _location: SourceLocation,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::QualifiedRule, ParseError<'i, Self::Error>> {
        Ok(StyleRule {
            selectors: prelude.into_iter().filter(|s| !s.is_empty()).collect(),
            declarations: collect_declarations(input),
        })
    }
}

impl<'i> AtRuleParser<'i> for RuleCollector {
    type PreludeNoBlock = ();
    type PreludeBlock = ();
    type AtRule = StyleRule;
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<AtRuleType<Self::PreludeNoBlock, Self::PreludeBlock>, ParseError<'i, Self::Error>>
    {
        // @media, @font-face and friends cannot be inlined
        trace!("Skipping @{} rule", name);
        while input.next().is_ok() {}
        Err(input.new_error(BasicParseErrorKind::AtRuleInvalid(name)))
    }
}

/// Parse the style rules of a stylesheet, in source order.
pub fn parse_stylesheet(css: &str) -> Vec<StyleRule> {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    RuleListParser::new_for_stylesheet(&mut parser, RuleCollector)
        .filter_map(Result::ok)
        .filter(|rule| !rule.selectors.is_empty())
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_declarations() {
        let decls = parse_declarations("Color: red; margin:0 auto ;; bogus; --Accent: #fff");
        assert_eq!(
            decls,
            vec![
                Declaration::new("color", "red"),
                Declaration::new("margin", "0 auto"),
                Declaration::new("--Accent", "#fff"),
            ]
        );
    }

    #[test]
    fn test_parse_declarations_keeps_semicolons_in_urls() {
        let decls = parse_declarations("background: url(\"a;b.png\"); color: blue");
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0].value, "url(\"a;b.png\")");
    }

    #[test]
    fn test_important() {
        let decls = parse_declarations("color: red !important");
        assert!(decls[0].important);
        assert_eq!(decls[0].value, "red");
        assert_eq!(serialize_declarations(&decls), "color:red !important;");
    }

    #[test]
    fn test_serialize_declarations() {
        let decls = vec![Declaration::new("color", "red"), Declaration::new("margin", "0")];
        assert_eq!(serialize_declarations(&decls), "color:red;margin:0;");
    }

    #[test]
    fn test_set_declaration() {
        let mut decls = vec![Declaration::new("color", "red")];
        set_declaration(&mut decls, "color", "blue");
        set_declaration(&mut decls, "margin", "0");
        assert_eq!(serialize_declarations(&decls), "color:blue;margin:0;");
    }

    #[test]
    fn test_selector_list_split_on_top_level_commas() {
        let rules = parse_stylesheet("h1, #wemd p ,:is(a, b) span { color: red }");
        assert_eq!(rules[0].selectors, vec!["h1", "#wemd p", ":is(a, b) span"]);
    }

    #[test]
    fn test_braces_and_comments_inside_strings() {
        let rules = parse_stylesheet(
            "h2 .prefix { content: \"{\" } p { background: url(\"a/*b.png\"); color: red }",
        );
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].declarations[0].value, "\"{\"");
        assert_eq!(rules[1].selectors, vec!["p"]);
        assert_eq!(rules[1].declarations[0].value, "url(\"a/*b.png\")");
        assert_eq!(rules[1].declarations[1], Declaration::new("color", "red"));
    }

    #[test]
    fn test_comments_between_rules() {
        let rules = parse_stylesheet("/* a { } */ p { /* x */ color: red; }");
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].declarations, vec![Declaration::new("color", "red")]);
    }

    #[test]
    fn test_parse_stylesheet() {
        let css = r#"
/* theme */
@import url("x.css");
#wemd { color: #333; --accent: red; }
@media (max-width: 600px) { #wemd p { margin: 0; } }
#wemd h2, #wemd h3 { font-weight: bold }
@font-face { font-family: x; }
a{color:var(--accent)}
"#;
        let rules = parse_stylesheet(css);
        assert_eq!(rules.len(), 3);
        assert_eq!(rules[0].selectors, vec!["#wemd"]);
        assert_eq!(rules[0].declarations.len(), 2);
        assert_eq!(rules[1].selectors, vec!["#wemd h2", "#wemd h3"]);
        assert_eq!(rules[2].declarations[0].value, "var(--accent)");
    }

    #[test]
    fn test_unterminated_comment_and_rule() {
        assert!(parse_stylesheet("p { color: red; } /* open").len() == 1);
        assert_eq!(parse_stylesheet("p { color: red;").len(), 1);
    }
}
