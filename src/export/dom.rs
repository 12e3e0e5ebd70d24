//! Small helpers over kuchiki nodes used by the inliner and rewrite steps

use kuchiki::traits::*;
use kuchiki::{Attribute, ElementData, ExpandedName, NodeRef};
use markup5ever::{namespace_url, ns, LocalName, QualName};

use super::css::{parse_declarations, serialize_declarations, Declaration};

/// Parse an HTML fragment into a document whose body holds it.
pub fn parse_fragment(html: &str) -> NodeRef {
    kuchiki::parse_html().one(format!("<html><head></head><body>{}</body></html>", html))
}

/// Serialize a node including its own tag.
pub fn serialize(node: &NodeRef) -> String {
    let mut out = Vec::new();
    if let Err(e) = node.serialize(&mut out) {
        log::warn!("Failed to serialize HTML: {}", e);
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Whether the element's class list contains `class`.
pub fn has_class(element: &ElementData, class: &str) -> bool {
    element
        .attributes
        .borrow()
        .get("class")
        .map_or(false, |classes| classes.split_whitespace().any(|c| c == class))
}

/// Whether `node` or any ancestor element carries `class`.
pub fn within_class(node: &NodeRef, class: &str) -> bool {
    node.inclusive_ancestors()
        .any(|n| n.as_element().map_or(false, |e| has_class(e, class)))
}

/// Declarations of the element's `style` attribute.
pub fn style_of(element: &ElementData) -> Vec<Declaration> {
    element
        .attributes
        .borrow()
        .get("style")
        .map(parse_declarations)
        .unwrap_or_default()
}

/// Replace the element's `style` attribute; an empty list removes it.
pub fn set_style(element: &ElementData, declarations: &[Declaration]) {
    let mut attributes = element.attributes.borrow_mut();
    if declarations.is_empty() {
        attributes.remove("style");
    } else {
        attributes.insert("style", serialize_declarations(declarations));
    }
}

/// Create an HTML element with the given attributes.
pub fn new_element(name: &str, attributes: &[(&str, &str)]) -> NodeRef {
    NodeRef::new_element(
        QualName::new(None, ns!(html), LocalName::from(name)),
        attributes.iter().map(|(attr, value)| {
            (
                ExpandedName::new("", *attr),
                Attribute {
                    prefix: None,
                    value: value.to_string(),
                },
            )
        }),
    )
}

/// Create a `<span style="…">` element.
pub fn new_span(style: String) -> NodeRef {
    new_element("span", &[("style", &style)])
}

/// Move all children of `node` into `wrapper`, then append `wrapper` to `node`.
pub fn wrap_children(node: &NodeRef, wrapper: NodeRef) {
    let children: Vec<NodeRef> = node.children().collect();
    for child in children {
        wrapper.append(child);
    }
    node.append(wrapper);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_serialize_fragment() {
        let doc = parse_fragment("<p class=\"a b\">x</p>");
        let p = doc.select_first("p").unwrap();
        assert!(has_class(&p, "b"));
        assert!(!has_class(&p, "c"));
        assert_eq!(serialize(p.as_node()), "<p class=\"a b\">x</p>");
    }

    #[test]
    fn test_style_roundtrip() {
        let doc = parse_fragment("<p style=\"color: red; margin: 0\">x</p>");
        let p = doc.select_first("p").unwrap();
        let mut style = style_of(&p);
        style.retain(|d| d.name != "margin");
        set_style(&p, &style);
        assert_eq!(serialize(p.as_node()), "<p style=\"color:red;\">x</p>");

        set_style(&p, &[]);
        assert_eq!(serialize(p.as_node()), "<p>x</p>");
    }

    #[test]
    fn test_within_class() {
        let doc = parse_fragment("<li class=\"footnote-item\"><p><a>x</a></p></li><a>y</a>");
        let anchors: Vec<_> = doc.select("a").unwrap().collect();
        assert!(within_class(anchors[0].as_node(), "footnote-item"));
        assert!(!within_class(anchors[1].as_node(), "footnote-item"));
    }

    #[test]
    fn test_new_element() {
        let section = new_element("section", &[("id", "wemd")]);
        section.append(NodeRef::new_text("x"));
        assert_eq!(serialize(&section), "<section id=\"wemd\">x</section>");
    }

    #[test]
    fn test_wrap_children() {
        let doc = parse_fragment("<a>one <b>two</b></a>");
        let a = doc.select_first("a").unwrap();
        wrap_children(a.as_node(), new_span("color:red;".to_string()));
        assert_eq!(
            serialize(a.as_node()),
            "<a><span style=\"color:red;\">one <b>two</b></span></a>"
        );
    }
}
