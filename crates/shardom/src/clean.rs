//! Hidden-content cleaning: the pre-pass that runs before partitioning.
//!
//! Strips content that costs tokens without carrying visible meaning:
//!
//! 1. Elements matched by authored stylesheet rules that set `display:none`
//!    or `visibility:hidden`. Selectors using pseudo-elements (`::…`) or the
//!    `:before`/`:after` pseudo-classes are exempt — such rules hide
//!    generated boxes, not the matched element itself.
//! 2. `<script>` and `<style>` elements.
//! 3. Elements with an inline `style` that sets `display:none` or
//!    `visibility:hidden`.
//! 4. Elements marked `aria-hidden="true"` or `tabindex="-1"`.
//!
//! Long values of URL-bearing attributes (`href`, `src`, `d`, `url`,
//! `data-url`, `data-src`, `data-src-hq`) are truncated to a configurable
//! character cutoff with a trailing `...`; a cutoff of `0` disables
//! truncation. The text of every removed element is collected, in removal
//! order, so callers can surface what was dropped.

use ego_tree::NodeId;
use scraper::{ElementRef, Html, Node, Selector};
use serde::Serialize;
use tracing::debug;

/// Output of [`clean_html`]: the cleaned document plus everything removed.
#[derive(Debug, Clone, Serialize)]
pub struct CleanedHtml {
    /// The cleaned document, serialized.
    pub html: String,
    /// Newline-joined text content of all removed elements.
    pub removed_text: String,
}

/// Attributes whose values are truncated when they exceed the cutoff.
const TRUNCATED_ATTRS: [&str; 7] = ["href", "src", "d", "url", "data-url", "data-src", "data-src-hq"];

/// Inline `style` substrings that mark an element as hidden.
const HIDDEN_STYLE_MARKERS: [&str; 4] = [
    "display:none",
    "display: none",
    "visibility:hidden",
    "visibility: hidden",
];

/// Clean a document: drop hidden/irrelevant content and truncate long
/// URL-ish attribute values. Never fails — unparsable markup degrades to
/// whatever tree the parser recovers.
pub fn clean_html(html: &str, attr_max_len: usize) -> CleanedHtml {
    let mut doc = Html::parse_fragment(html);
    let mut removed = Vec::new();

    remove_stylesheet_hidden(&mut doc, &mut removed);
    remove_by_tag(&mut doc, &["script", "style"], &mut removed);
    remove_inline_hidden(&mut doc, &mut removed);
    if attr_max_len > 0 {
        truncate_long_attrs(&mut doc, attr_max_len);
    }
    remove_by_attr(&mut doc, "aria-hidden", "true", &mut removed);
    remove_by_attr(&mut doc, "tabindex", "-1", &mut removed);

    CleanedHtml {
        html: doc.root_element().inner_html(),
        removed_text: removed.join("\n"),
    }
}

/// Apply `display:none` / `visibility:hidden` rules from `<style>` sheets.
fn remove_stylesheet_hidden(doc: &mut Html, removed: &mut Vec<String>) {
    let sheets: Vec<String> = elements_of(doc)
        .iter()
        .filter_map(|&id| element_at(doc, id))
        .filter(|el| el.value().name() == "style")
        .map(|el| el.text().collect())
        .collect();

    for sheet in &sheets {
        for (selector_text, declarations) in style_rules(sheet) {
            if selector_text.contains("::")
                || selector_text.contains(":before")
                || selector_text.contains(":after")
            {
                continue;
            }
            if !declarations_hide(&declarations) {
                continue;
            }
            let selector = match Selector::parse(&selector_text) {
                Ok(s) => s,
                Err(e) => {
                    debug!("skipping unparsable selector {selector_text:?}: {e}");
                    continue;
                }
            };
            let ids: Vec<NodeId> = doc.select(&selector).map(|el| el.id()).collect();
            detach_all(doc, &ids, removed);
        }
    }
}

/// Remove every element with one of the given tag names.
fn remove_by_tag(doc: &mut Html, tags: &[&str], removed: &mut Vec<String>) {
    for tag in tags {
        let ids: Vec<NodeId> = elements_of(doc)
            .into_iter()
            .filter(|&id| element_at(doc, id).is_some_and(|el| el.value().name() == *tag))
            .collect();
        detach_all(doc, &ids, removed);
    }
}

/// Remove elements whose inline `style` hides them.
fn remove_inline_hidden(doc: &mut Html, removed: &mut Vec<String>) {
    let ids: Vec<NodeId> = elements_of(doc)
        .into_iter()
        .filter(|&id| {
            element_at(doc, id)
                .and_then(|el| el.value().attr("style"))
                .is_some_and(|style| HIDDEN_STYLE_MARKERS.iter().any(|m| style.contains(m)))
        })
        .collect();
    detach_all(doc, &ids, removed);
}

/// Remove elements carrying `attr="value"` exactly.
fn remove_by_attr(doc: &mut Html, attr: &str, value: &str, removed: &mut Vec<String>) {
    let ids: Vec<NodeId> = elements_of(doc)
        .into_iter()
        .filter(|&id| element_at(doc, id).is_some_and(|el| el.value().attr(attr) == Some(value)))
        .collect();
    detach_all(doc, &ids, removed);
}

/// Truncate over-long values of URL-bearing attributes to `max_len` chars
/// plus a `...` marker.
fn truncate_long_attrs(doc: &mut Html, max_len: usize) {
    for id in elements_of(doc) {
        let Some(mut node) = doc.tree.get_mut(id) else {
            continue;
        };
        let Node::Element(element) = node.value() else {
            continue;
        };
        for (name, value) in element.attrs.iter_mut() {
            let local: &str = &name.local;
            if !TRUNCATED_ATTRS.contains(&local) {
                continue;
            }
            if value.chars().count() > max_len {
                let mut cut: String = value.chars().take(max_len).collect();
                cut.push_str("...");
                *value = cut.as_str().into();
            }
        }
    }
}

/// Ids of all elements reachable from the root, in document order.
///
/// Traversal starts at the root rather than walking the arena, so nodes
/// detached by an earlier pass are never revisited.
fn elements_of(doc: &Html) -> Vec<NodeId> {
    doc.root_element()
        .descendants()
        .filter(|node| node.value().is_element())
        .map(|node| node.id())
        .collect()
}

fn element_at(doc: &Html, id: NodeId) -> Option<ElementRef<'_>> {
    doc.tree.get(id).and_then(ElementRef::wrap)
}

/// Detach each node, recording its text content first.
///
/// An id whose node was already pulled out by an earlier id in the same
/// batch (a hidden descendant of a hidden ancestor) is skipped, so its
/// text is recorded exactly once. A rule can also match the fragment root
/// itself (`html { display: none }`, a bare `*` rule); the root must stay
/// in the tree, so that case detaches its children instead and the
/// document degrades to empty.
fn detach_all(doc: &mut Html, ids: &[NodeId], removed: &mut Vec<String>) {
    let root = doc.root_element().id();
    for &id in ids {
        if !still_attached(doc, id, root) {
            continue;
        }
        if let Some(el) = element_at(doc, id) {
            removed.push(el.text().collect());
        }
        if id == root {
            let children: Vec<NodeId> = doc
                .tree
                .get(root)
                .map(|node| node.children().map(|child| child.id()).collect())
                .unwrap_or_default();
            for child in children {
                if let Some(mut node) = doc.tree.get_mut(child) {
                    node.detach();
                }
            }
            continue;
        }
        if let Some(mut node) = doc.tree.get_mut(id) {
            node.detach();
        }
    }
}

/// True while `id` is the root or still reachable from it.
fn still_attached(doc: &Html, id: NodeId, root: NodeId) -> bool {
    id == root
        || doc
            .tree
            .get(id)
            .is_some_and(|node| node.ancestors().any(|ancestor| ancestor.id() == root))
}

/// True when the declaration block sets `display:none` or `visibility:hidden`.
fn declarations_hide(declarations: &str) -> bool {
    declarations.split(';').any(|decl| {
        let Some((name, value)) = decl.split_once(':') else {
            return false;
        };
        match name.trim() {
            "display" => value.contains("none"),
            "visibility" => value.contains("hidden"),
            _ => false,
        }
    })
}

/// Split a stylesheet into `(selector, declarations)` pairs.
///
/// A brace scanner, not a CSS parser: comments are stripped, at-rules are
/// skipped whole (their nested blocks tracked by depth), and everything
/// else becomes one pair per top-level block. The declarations are only
/// ever substring-checked, and selectors go through [`Selector::parse`],
/// which rejects anything malformed.
fn style_rules(css: &str) -> Vec<(String, String)> {
    let css = strip_css_comments(css);
    let mut rules = Vec::new();
    let mut selector = String::new();
    let mut block = String::new();
    let mut depth = 0usize;

    for ch in css.chars() {
        match ch {
            '{' => {
                depth += 1;
                if depth > 1 {
                    block.push(ch);
                }
            }
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    let sel = selector.trim().to_string();
                    if !sel.is_empty() && !sel.starts_with('@') {
                        rules.push((sel, block.clone()));
                    }
                    selector.clear();
                    block.clear();
                } else {
                    block.push(ch);
                }
            }
            _ => {
                if depth == 0 {
                    selector.push(ch);
                } else {
                    block.push(ch);
                }
            }
        }
    }
    rules
}

fn strip_css_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut chars = css.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '/' && chars.peek() == Some(&'*') {
            chars.next();
            let mut prev = ' ';
            for c in chars.by_ref() {
                if prev == '*' && c == '/' {
                    break;
                }
                prev = c;
            }
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripts_and_styles_are_removed() {
        let cleaned = clean_html("<div><script>var x = 1;</script><p>keep</p></div>", 0);
        assert!(!cleaned.html.contains("script"));
        assert!(cleaned.html.contains("<p>keep</p>"));
        assert!(cleaned.removed_text.contains("var x = 1;"));
    }

    #[test]
    fn inline_display_none_is_removed() {
        let cleaned = clean_html(r#"<div style="display:none">secret</div><p>visible</p>"#, 0);
        assert!(!cleaned.html.contains("secret"));
        assert!(cleaned.html.contains("visible"));
        assert_eq!(cleaned.removed_text, "secret");
    }

    #[test]
    fn all_inline_hidden_spellings_are_removed() {
        for style in [
            "display:none",
            "display: none",
            "visibility:hidden",
            "visibility: hidden",
        ] {
            let html = format!(r#"<span style="{style}">gone</span><p>here</p>"#);
            let cleaned = clean_html(&html, 0);
            assert!(!cleaned.html.contains("gone"), "style {style:?} survived");
            assert!(cleaned.html.contains("here"));
        }
    }

    #[test]
    fn stylesheet_display_none_rule_removes_matches() {
        let html = r#"<style>.hide { display: none; }</style><div class="hide">gone</div><p>stay</p>"#;
        let cleaned = clean_html(html, 0);
        assert!(!cleaned.html.contains("gone"));
        assert!(!cleaned.html.contains("style"));
        assert!(cleaned.html.contains("<p>stay</p>"));
        assert!(cleaned.removed_text.contains("gone"));
    }

    #[test]
    fn stylesheet_visibility_hidden_rule_removes_matches() {
        let html = r#"<style>#x { visibility: hidden; }</style><div id="x">gone</div><p>stay</p>"#;
        let cleaned = clean_html(html, 0);
        assert!(!cleaned.html.contains("gone"));
        assert!(cleaned.html.contains("<p>stay</p>"));
    }

    #[test]
    fn pseudo_selectors_are_exempt() {
        let html = r#"<style>.x:before { display: none; } .y::after { display: none; }</style><div class="x">kept</div><div class="y">also kept</div>"#;
        let cleaned = clean_html(html, 0);
        assert!(cleaned.html.contains("kept"));
        assert!(cleaned.html.contains("also kept"));
    }

    #[test]
    fn rule_hiding_the_document_root_empties_the_document() {
        let cleaned = clean_html(r#"<style>html { display: none; }</style><p>hi</p>"#, 0);
        assert!(cleaned.html.is_empty());
        assert!(cleaned.removed_text.contains("hi"));
    }

    #[test]
    fn universal_hide_rule_empties_the_document() {
        let cleaned = clean_html(r#"<style>* { display: none; }</style><div><p>x</p></div>"#, 0);
        assert!(cleaned.html.is_empty());
    }

    #[test]
    fn nested_hidden_elements_record_their_text_once() {
        let html =
            r#"<div aria-hidden="true"><span aria-hidden="true">gone</span></div><p>kept</p>"#;
        let cleaned = clean_html(html, 0);
        assert_eq!(cleaned.removed_text, "gone");
        assert!(cleaned.html.contains("<p>kept</p>"));
    }

    #[test]
    fn aria_hidden_and_negative_tabindex_are_removed() {
        let html = r#"<div aria-hidden="true">a</div><div tabindex="-1">b</div><p>c</p>"#;
        let cleaned = clean_html(html, 0);
        assert!(!cleaned.html.contains(">a<"));
        assert!(!cleaned.html.contains(">b<"));
        assert!(cleaned.html.contains("<p>c</p>"));
        assert_eq!(cleaned.removed_text, "a\nb");
    }

    #[test]
    fn long_href_is_truncated_to_cutoff_plus_ellipsis() {
        let long: String = "h".repeat(60);
        let html = format!(r#"<a href="{long}">link</a>"#);
        let cleaned = clean_html(&html, 40);
        let expected = format!("{}...", "h".repeat(40));
        assert!(cleaned.html.contains(&expected));
        assert!(!cleaned.html.contains(&long));
    }

    #[test]
    fn zero_cutoff_disables_truncation() {
        let long: String = "h".repeat(60);
        let html = format!(r#"<a href="{long}">link</a>"#);
        let cleaned = clean_html(&html, 0);
        assert!(cleaned.html.contains(&long));
    }

    #[test]
    fn short_attrs_and_other_attrs_are_untouched() {
        let html = r#"<a href="short" title="a very long title that is not a url attribute at all">t</a>"#;
        let cleaned = clean_html(html, 10);
        assert!(cleaned.html.contains(r#"href="short""#));
        assert!(cleaned.html.contains("a very long title"));
    }

    #[test]
    fn visible_content_is_preserved_verbatim() {
        let html = "<div><p>one</p><p>two</p></div>";
        let cleaned = clean_html(html, 40);
        assert_eq!(cleaned.html, html);
        assert!(cleaned.removed_text.is_empty());
    }
}
