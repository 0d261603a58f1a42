//! Semantic cache-key derivation
//!
//! Two requests that differ only in phrasing noise (case, punctuation, filler
//! phrases, concrete figures) should share a cache entry. Normalization
//! case-folds, strips fillers and punctuation, generalizes numeric and
//! currency literals to placeholder tokens, and collapses whitespace.
//!
//! The context half of the key buckets selected numeric fields into coarse
//! bands, so raw business figures never appear in a key.

use regex::Regex;
use sha2::{Digest, Sha256};

use crate::config::BucketRule;
use crate::types::Context;

/// Filler phrases stripped during normalization. Multi-word phrases first so
/// they match before their single-word tails.
const FILLER_PHRASES: &[&str] = &[
    "could you please",
    "can you please",
    "i would like to know",
    "i would like to",
    "i'd like to",
    "i want to know",
    "i want to",
    "could you",
    "can you",
    "would you",
    "help me",
    "please",
    "kindly",
];

pub struct MessageNormalizer {
    currency: Regex,
    number: Regex,
    filler: Regex,
    punctuation: Regex,
    whitespace: Regex,
}

impl MessageNormalizer {
    pub fn new() -> Self {
        let filler_pattern = format!(
            r"\b(?:{})\b",
            FILLER_PHRASES
                .iter()
                .map(|p| regex::escape(p))
                .collect::<Vec<_>>()
                .join("|")
        );

        Self {
            // The patterns are fixed at compile time; construction cannot fail.
            currency: Regex::new(r"[$€£]\s?\d[\d,]*(?:\.\d+)?[km]?").unwrap(),
            number: Regex::new(r"\b\d[\d,]*(?:\.\d+)?%?").unwrap(),
            filler: Regex::new(&filler_pattern).unwrap(),
            punctuation: Regex::new(r"[^\w\s<>]").unwrap(),
            whitespace: Regex::new(r"\s+").unwrap(),
        }
    }

    /// Normalize a message into its semantic form. Idempotent.
    pub fn normalize(&self, message: &str) -> String {
        let folded = message.to_lowercase();
        let no_currency = self.currency.replace_all(&folded, "<amount>");
        let no_numbers = self.number.replace_all(&no_currency, "<num>");
        let no_filler = self.filler.replace_all(&no_numbers, " ");
        let no_punct = self.punctuation.replace_all(&no_filler, "");
        let collapsed = self.whitespace.replace_all(&no_punct, " ");
        collapsed.trim().to_string()
    }
}

impl Default for MessageNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the coarse context fingerprint from the configured bucket rules.
///
/// Only named numeric fields contribute, as banded labels; everything else in
/// the context is ignored so sensitive raw values never reach the key.
pub fn context_fingerprint(rules: &[BucketRule], context: &Context) -> String {
    let mut parts = Vec::new();
    for rule in rules {
        if let Some(value) = context.get(&rule.field).and_then(|v| v.as_f64()) {
            parts.push(format!("{}={}", rule.field, rule.bucket(value)));
        }
    }
    parts.join(";")
}

/// Hash the key components into a fixed-length hex key.
pub fn cache_key(normalized: &str, fingerprint: &str, provider_id: &str, strategy: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hasher.update(b"|");
    hasher.update(fingerprint.as_bytes());
    hasher.update(b"|");
    hasher.update(provider_id.as_bytes());
    hasher.update(b"|");
    hasher.update(strategy.as_bytes());
    hex::encode(hasher.finalize())
}
