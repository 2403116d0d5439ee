//! Token-budget-aware HTML chunking.
//!
//! `shardom` splits an HTML document into a sequence of self-contained
//! chunks, each bounded by a tokenizer budget, for feeding large documents
//! to LLMs piece by piece. Every chunk re-parses and renders on its own:
//! when a subtree is split, each piece is re-wrapped in the ancestor tags
//! it needs to stay valid nested markup.
//!
//! The pipeline has three stages:
//!
//! 1. **Clean** ([`clean_html`]) — drop hidden and irrelevant content
//!    (`display:none` / `visibility:hidden` elements, scripts, stylesheets,
//!    `aria-hidden` and `tabindex="-1"` elements) and truncate long
//!    URL-bearing attribute values. Optional, on by default.
//! 2. **Partition** ([`partition`]) — recursive budget-aware descent over
//!    the DOM. A node whose serialization fits the budget becomes one
//!    [`Fragment`], wrapped in its recorded ancestor path; an over-budget
//!    node pushes itself onto the path and recurses into its children.
//! 3. **Merge** ([`merge_fragments`]) — greedy left-to-right recombination
//!    of adjacent fragments whose structural union still fits the budget,
//!    re-deriving the shared ancestor chain from the serialized HTML alone.
//!
//! Token counts come from the `cl100k_base` encoding via [`TokenCounter`].
//! The budget is honored for every chunk except a single unsplittable leaf
//! that already exceeds it, which is emitted whole.
//!
//! # Getting started
//!
//! ```
//! use shardom::{ChunkerConfig, HtmlChunker};
//!
//! let chunker = HtmlChunker::new(ChunkerConfig::new(1000)).unwrap();
//! let chunks = chunker.chunk("<div><p>hello</p></div>").unwrap();
//! assert_eq!(chunks.len(), 1);
//! ```
//!
//! Or in one call, mirroring the classic chunking entry point:
//!
//! ```
//! let chunks = shardom::get_html_chunks("<p>hi</p>", 1000, true, 40).unwrap();
//! assert_eq!(chunks, vec!["<p>hi</p>".to_string()]);
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`pipeline`] | [`HtmlChunker`] + [`ChunkerConfig`], the clean → partition → merge sequence |
//! | [`partition`] | Budget-aware DOM descent producing path-wrapped [`Fragment`]s |
//! | [`merge`] | Greedy structural recombination of serialized fragments |
//! | [`clean`] | Hidden-content removal and attribute truncation |
//! | [`token`] | [`TokenCounter`], the `cl100k_base` size oracle |

pub mod clean;
pub mod merge;
pub mod partition;
pub mod pipeline;
pub mod token;

pub use clean::{CleanedHtml, clean_html};
pub use merge::merge_fragments;
pub use partition::{Fragment, PathSegment, partition};
pub use pipeline::{ChunkerConfig, HtmlChunker, get_html_chunks};
pub use token::TokenCounter;
