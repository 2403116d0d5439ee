//! Budget-aware DOM partitioning: walk the parsed tree and emit fragments
//! that fit the token budget, each wrapped in its ancestor markup.
//!
//! The walk is pre-order, depth-first, left-to-right, so fragments come out
//! in document order. A node whose full serialization fits under the budget
//! is consumed as one fragment; an over-budget node is never emitted itself
//! — instead its tag and attributes are pushed onto the ancestor path and
//! its element children are visited, so every descendant fragment can be
//! re-wrapped into valid standalone markup. The path is a stack local to
//! one traversal: pushed on descent, popped on return, snapshot-cloned into
//! each emitted fragment.
//!
//! Fragment parsing synthesizes a single wrapper element around the whole
//! document. That wrapper is a pseudo-node: it is never measured, emitted,
//! or pushed onto the path — the walk starts directly at its children.
//!
//! The budget is soft in exactly one case: a leaf with no element children
//! that is already over budget is emitted whole, since nothing below node
//! granularity can be split.

use crate::token::TokenCounter;
use scraper::{ElementRef, Html};
use serde::Serialize;

/// One ancestor in a fragment's reconstruction path: tag plus an ordered
/// snapshot of its attributes at emission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathSegment {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
}

/// A partitioner output unit.
///
/// `content` is the self-contained reconstruction: opening tags for every
/// path segment (outermost first), the node's own serialization, then the
/// matching closing tags in reverse. `tag`/`attrs`/`path` describe where
/// the fragment came from; only `content` feeds the merge stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fragment {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub content: String,
    pub path: Vec<PathSegment>,
}

/// Partition a parsed document into budget-sized fragments, in document
/// order. A node fits when its serialized token count is strictly under
/// `budget`.
pub fn partition(doc: &Html, counter: &TokenCounter, budget: usize) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    let mut path = Vec::new();
    for child in element_children(doc.root_element()) {
        visit(child, counter, budget, &mut path, &mut fragments);
    }
    fragments
}

fn visit(
    el: ElementRef<'_>,
    counter: &TokenCounter,
    budget: usize,
    path: &mut Vec<PathSegment>,
    out: &mut Vec<Fragment>,
) {
    let serialized = el.html();
    let children = element_children(el);

    // Unsplittable over-budget leaves are emitted whole: the budget is a
    // target, not a ceiling, below node granularity.
    if counter.count(&serialized) < budget || children.is_empty() {
        out.push(Fragment {
            tag: el.value().name().to_string(),
            attrs: attrs_of(el),
            content: reconstruct(path, &serialized),
            path: path.clone(),
        });
        return;
    }

    path.push(PathSegment {
        tag: el.value().name().to_string(),
        attrs: attrs_of(el),
    });
    for child in children {
        visit(child, counter, budget, path, out);
    }
    path.pop();
}

/// Element children only — bare text between elements cannot carry the
/// ancestor wrapping and is skipped at split levels.
fn element_children(el: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    el.children().filter_map(ElementRef::wrap).collect()
}

fn attrs_of(el: ElementRef<'_>) -> Vec<(String, String)> {
    el.value()
        .attrs()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

/// Wrap a node's serialization in its ancestor chain.
fn reconstruct(path: &[PathSegment], node_html: &str) -> String {
    if path.is_empty() {
        return node_html.to_string();
    }
    let mut out = String::new();
    for seg in path {
        out.push('<');
        out.push_str(&seg.tag);
        for (name, value) in &seg.attrs {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape_attr(value));
            out.push('"');
        }
        out.push('>');
    }
    out.push_str(node_html);
    for seg in path.iter().rev() {
        out.push_str("</");
        out.push_str(&seg.tag);
        out.push('>');
    }
    out
}

/// Escape an attribute value the way the HTML serializer does, so rebuilt
/// opening tags re-parse to the same attribute map as the original markup.
fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter() -> TokenCounter {
        TokenCounter::cl100k().unwrap()
    }

    #[test]
    fn small_document_is_one_fragment_with_empty_path() {
        let counter = counter();
        let doc = Html::parse_fragment("<p>tiny</p>");
        let frags = partition(&doc, &counter, 1000);
        assert_eq!(frags.len(), 1);
        assert_eq!(frags[0].content, "<p>tiny</p>");
        assert_eq!(frags[0].tag, "p");
        assert!(frags[0].path.is_empty());
    }

    #[test]
    fn top_level_siblings_emit_separately() {
        let counter = counter();
        let doc = Html::parse_fragment("<p>a</p><p>b</p>");
        let frags = partition(&doc, &counter, 1000);
        assert_eq!(frags.len(), 2);
        assert_eq!(frags[0].content, "<p>a</p>");
        assert_eq!(frags[1].content, "<p>b</p>");
    }

    #[test]
    fn over_budget_parent_splits_into_wrapped_children() {
        let counter = counter();
        let html = "<div><p>A</p><p>B</p></div>";
        // The whole <div> measures exactly the budget, failing the strict
        // fit test; each <p> is far smaller and fits.
        let budget = counter.count(html);
        let doc = Html::parse_fragment(html);
        let frags = partition(&doc, &counter, budget);
        assert_eq!(frags.len(), 2);
        assert_eq!(frags[0].content, "<div><p>A</p></div>");
        assert_eq!(frags[1].content, "<div><p>B</p></div>");
        assert_eq!(
            frags[0].path,
            vec![PathSegment {
                tag: "div".to_string(),
                attrs: vec![],
            }]
        );
    }

    #[test]
    fn emission_order_is_document_order() {
        let counter = counter();
        let html = "<div><p>one</p><p>two</p><p>three</p></div>";
        let budget = counter.count(html);
        let doc = Html::parse_fragment(html);
        let frags = partition(&doc, &counter, budget);
        let order: Vec<&str> = frags.iter().map(|f| f.content.as_str()).collect();
        assert_eq!(
            order,
            vec![
                "<div><p>one</p></div>",
                "<div><p>two</p></div>",
                "<div><p>three</p></div>",
            ]
        );
    }

    #[test]
    fn ancestor_attributes_survive_rewrapping() {
        let counter = counter();
        let html = r#"<div class="wrap" data-k="v"><p>A</p><p>B</p></div>"#;
        let budget = counter.count(html);
        let doc = Html::parse_fragment(html);
        let frags = partition(&doc, &counter, budget);
        assert_eq!(frags.len(), 2);
        assert_eq!(frags[0].content, r#"<div class="wrap" data-k="v"><p>A</p></div>"#);
    }

    #[test]
    fn over_budget_leaf_is_emitted_whole() {
        let counter = counter();
        let html = "<p>this text is certainly longer than a one token budget</p>";
        let doc = Html::parse_fragment(html);
        let frags = partition(&doc, &counter, 1);
        assert_eq!(frags.len(), 1);
        assert_eq!(frags[0].content, html);
    }

    #[test]
    fn over_budget_leaf_still_gets_its_ancestor_wrapping() {
        let counter = counter();
        let doc = Html::parse_fragment("<div><p>unsplittable</p></div>");
        let frags = partition(&doc, &counter, 1);
        assert_eq!(frags.len(), 1);
        assert_eq!(frags[0].content, "<div><p>unsplittable</p></div>");
        assert_eq!(frags[0].path.len(), 1);
    }

    #[test]
    fn empty_document_emits_nothing() {
        let counter = counter();
        let doc = Html::parse_fragment("");
        assert!(partition(&doc, &counter, 100).is_empty());
    }

    #[test]
    fn escaped_attribute_values_round_trip() {
        let counter = counter();
        let html = r#"<div title="a &quot;b&quot; &amp; c"><p>A</p><p>B</p></div>"#;
        let budget = counter.count(html);
        let doc = Html::parse_fragment(html);
        let frags = partition(&doc, &counter, budget);
        assert_eq!(frags.len(), 2);
        // The rebuilt opening tag re-parses to the same attribute value.
        let reparsed = Html::parse_fragment(&frags[0].content);
        let div = reparsed
            .root_element()
            .children()
            .find_map(ElementRef::wrap)
            .unwrap();
        assert_eq!(div.value().attr("title"), Some(r#"a "b" & c"#));
    }
}
