//! The chunking pipeline: clean → partition → merge.
//!
//! [`HtmlChunker`] owns the tokenizer and a [`ChunkerConfig`] and runs the
//! full sequence; [`get_html_chunks`] is the one-call convenience wrapper.
//! Each run parses its own tree and produces independent output — chunkers
//! share nothing mutable, so concurrent runs over different documents need
//! no coordination.

use crate::clean::clean_html;
use crate::merge::merge_fragments;
use crate::partition::partition;
use crate::token::TokenCounter;
use scraper::Html;
use serde::Serialize;
use tracing::info;

/// Pipeline configuration.
///
/// # Example
///
/// ```
/// use shardom::ChunkerConfig;
///
/// let config = ChunkerConfig::new(1000)
///     .with_cleaning(true)
///     .with_attr_cutoff(40);
/// assert_eq!(config.max_tokens, 1000);
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ChunkerConfig {
    /// Maximum tokens per chunk. Soft only for single unsplittable leaves
    /// that already exceed it.
    pub max_tokens: usize,
    /// Run the hidden-content cleaning pre-pass (default true).
    pub clean: bool,
    /// Character cutoff for URL-ish attribute truncation during cleaning;
    /// `0` disables truncation (default 40).
    pub attr_cutoff_len: usize,
}

impl ChunkerConfig {
    /// Config with the given token budget and default cleaning behavior.
    pub fn new(max_tokens: usize) -> Self {
        Self {
            max_tokens,
            clean: true,
            attr_cutoff_len: 40,
        }
    }

    /// Enable or disable the cleaning pre-pass.
    pub fn with_cleaning(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }

    /// Set the attribute-truncation cutoff (`0` disables).
    pub fn with_attr_cutoff(mut self, len: usize) -> Self {
        self.attr_cutoff_len = len;
        self
    }
}

/// Splits HTML documents into token-budgeted, self-contained chunks.
pub struct HtmlChunker {
    counter: TokenCounter,
    config: ChunkerConfig,
}

impl HtmlChunker {
    /// Build a chunker, loading the tokenizer. Errors on a zero budget or a
    /// tokenizer that fails to load.
    pub fn new(config: ChunkerConfig) -> Result<Self, String> {
        if config.max_tokens == 0 {
            return Err("max_tokens must be positive".to_string());
        }
        Ok(Self {
            counter: TokenCounter::cl100k()?,
            config,
        })
    }

    /// The token counter used for all budget decisions.
    pub fn counter(&self) -> &TokenCounter {
        &self.counter
    }

    /// Chunk a document. Returns self-contained HTML strings in document
    /// order, each within the budget except for unsplittable leaves.
    pub fn chunk(&self, html: &str) -> Result<Vec<String>, String> {
        let input = if self.config.clean {
            clean_html(html, self.config.attr_cutoff_len).html
        } else {
            html.to_string()
        };

        let doc = Html::parse_fragment(&input);
        let fragments = partition(&doc, &self.counter, self.config.max_tokens);
        if fragments.is_empty() {
            // Nothing to merge: empty or whitespace-only document.
            return Ok(Vec::new());
        }

        let contents: Vec<String> = fragments.into_iter().map(|f| f.content).collect();
        let chunks = merge_fragments(&contents, &self.counter, self.config.max_tokens)?;
        info!(
            fragments = contents.len(),
            chunks = chunks.len(),
            max_tokens = self.config.max_tokens,
            "chunked document"
        );
        Ok(chunks)
    }
}

/// Chunk `html` in one call: optionally clean, then partition and merge
/// under a `max_tokens` budget.
pub fn get_html_chunks(
    html: &str,
    max_tokens: usize,
    is_clean_html: bool,
    attr_cutoff_len: usize,
) -> Result<Vec<String>, String> {
    let config = ChunkerConfig::new(max_tokens)
        .with_cleaning(is_clean_html)
        .with_attr_cutoff(attr_cutoff_len);
    HtmlChunker::new(config)?.chunk(html)
}
