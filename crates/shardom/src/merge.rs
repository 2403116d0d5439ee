//! Greedy fragment merging: recombine adjacent fragments whose structural
//! union still fits the token budget.
//!
//! The merger works from serialized HTML alone — it re-parses each fragment
//! and re-derives the shared ancestor chain by structural comparison instead
//! of reusing any partitioner bookkeeping, so the two stages stay
//! independently testable over plain strings.
//!
//! The chain walk descends the two trees in lock-step, following the first
//! element child on each side only (fragments are wrapper chains by
//! construction, so the shared prefix is a single chain). A pair of nodes
//! joins the chain when their tag names match, their attribute maps match,
//! and both sides have at least one element child. The last condition is
//! what separates wrappers from content: a childless-of-elements pair such
//! as two `<p>` nodes with different text is where the fragments *diverge*,
//! not a level to merge through — so `<div><p>A</p></div>` plus
//! `<div><p>B</p></div>` attaches at the `<div>` and becomes
//! `<div><p>A</p><p>B</p></div>` rather than fusing the paragraphs.
//!
//! The synthetic root wrapper that fragment parsing adds always matches
//! itself, so two fragments with nothing in common attach at the roots and
//! the second fragment's content is appended as a sibling of the first's.
//!
//! Children appended at the attachment point are deduplicated by structural
//! signature (serialized markup for elements, text for text nodes), so
//! content present on both sides is never doubled.

use crate::token::TokenCounter;
use ego_tree::{NodeId, NodeRef, Tree};
use scraper::{ElementRef, Html, Node};
use std::collections::BTreeMap;
use tracing::debug;

/// Greedily coalesce an ordered fragment list into the fewest chunks that
/// still fit `budget` tokens each.
///
/// Left-to-right: each fragment is structurally merged into the current
/// accumulator; if the union exceeds the budget the accumulator is flushed
/// and the fragment starts a new one. Errors on an empty input slice.
pub fn merge_fragments(
    fragments: &[String],
    counter: &TokenCounter,
    budget: usize,
) -> Result<Vec<String>, String> {
    let (first, rest) = fragments
        .split_first()
        .ok_or_else(|| "cannot merge an empty fragment list".to_string())?;

    let mut chunks = Vec::new();
    let mut current = first.clone();
    for next in rest {
        let candidate = merge_pair(&current, next);
        if counter.count(&candidate) <= budget {
            current = candidate;
        } else {
            chunks.push(std::mem::replace(&mut current, next.clone()));
        }
    }
    chunks.push(current);

    debug!(
        fragments = fragments.len(),
        chunks = chunks.len(),
        "merged fragments"
    );
    Ok(chunks)
}

/// Structurally merge two fragments: graft `b`'s content onto `a` at their
/// deepest common ancestor.
fn merge_pair(a: &str, b: &str) -> String {
    let mut doc_a = Html::parse_fragment(a);
    let doc_b = Html::parse_fragment(b);

    let (attach_a, attach_b) = attachment_points(&doc_a, &doc_b);

    let existing: Vec<String> = match doc_a.tree.get(attach_a) {
        Some(node) => node.children().filter_map(signature).collect(),
        None => Vec::new(),
    };

    if let Some(source) = doc_b.tree.get(attach_b) {
        for child in source.children() {
            if let Some(sig) = signature(child) {
                if existing.contains(&sig) {
                    continue;
                }
            }
            copy_subtree(&mut doc_a.tree, attach_a, child);
        }
    }

    doc_a.root_element().inner_html()
}

/// Walk both trees in lock-step down their first-element-child chains and
/// return the deepest matching wrapper pair. Defaults to the two roots.
fn attachment_points(doc_a: &Html, doc_b: &Html) -> (NodeId, NodeId) {
    let mut node_a = doc_a.root_element();
    let mut node_b = doc_b.root_element();
    let mut attach = (node_a.id(), node_b.id());

    loop {
        let (Some(child_a), Some(child_b)) =
            (first_element_child(node_a), first_element_child(node_b))
        else {
            break;
        };
        let matched = child_a.value().name() == child_b.value().name()
            && attr_map(child_a) == attr_map(child_b)
            && first_element_child(child_a).is_some()
            && first_element_child(child_b).is_some();
        if !matched {
            break;
        }
        attach = (child_a.id(), child_b.id());
        node_a = child_a;
        node_b = child_b;
    }
    attach
}

fn first_element_child(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    el.children().find_map(ElementRef::wrap)
}

/// Attribute map for order-insensitive comparison.
fn attr_map(el: ElementRef<'_>) -> BTreeMap<&str, &str> {
    el.value().attrs().collect()
}

/// Structural identity of a child node: serialized markup for elements,
/// content for text and comments. Used to skip content already present at
/// the attachment point.
fn signature(node: NodeRef<'_, Node>) -> Option<String> {
    match node.value() {
        Node::Element(_) => ElementRef::wrap(node).map(|el| el.html()),
        Node::Text(text) => {
            let text: &str = text;
            Some(text.to_string())
        }
        Node::Comment(comment) => {
            let comment: &str = comment;
            Some(format!("<!--{comment}-->"))
        }
        _ => None,
    }
}

/// Deep-copy a node and its subtree from another tree under `parent`.
fn copy_subtree(tree: &mut Tree<Node>, parent: NodeId, source: NodeRef<'_, Node>) {
    let Some(mut parent_node) = tree.get_mut(parent) else {
        return;
    };
    let child_id = parent_node.append(source.value().clone()).id();
    for grandchild in source.children() {
        copy_subtree(tree, child_id, grandchild);
    }
}
