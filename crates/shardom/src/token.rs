//! Token counting: the size oracle every budget decision is measured against.
//!
//! Both the partitioner and the merger are token-count-dominated — every
//! candidate fragment and every candidate merge gets measured — so the
//! encoder is loaded once per [`TokenCounter`] and reused for the whole
//! pipeline run rather than per call.

use tiktoken_rs::{CoreBPE, cl100k_base};

/// Counts tokens under the `cl100k_base` encoding (the GPT-3.5/4 tokenizer).
///
/// Construction loads the BPE ranks and can fail; counting afterwards is
/// infallible and deterministic. The counter is `Send + Sync`, so one
/// instance can serve concurrent pipelines over different documents.
pub struct TokenCounter {
    bpe: CoreBPE,
}

impl TokenCounter {
    /// Load the `cl100k_base` encoder.
    pub fn cl100k() -> Result<Self, String> {
        let bpe = cl100k_base().map_err(|e| format!("failed to load cl100k_base tokenizer: {e}"))?;
        Ok(Self { bpe })
    }

    /// Number of tokens in `text`. Special-token markup is counted as plain
    /// text (`encode_ordinary`), matching how documents are actually sent.
    pub fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}
