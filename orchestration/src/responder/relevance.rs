//! Pluggable relevance scoring
//!
//! Self-assessment is deliberately a deterministic, externally supplied
//! heuristic: the keyword model here can be swapped for a statistical
//! classifier later without touching the router or the responder contract.

use crate::types::Request;

/// Deterministic relevance scoring strategy behind the `assess` contract.
pub trait RelevanceModel: Send + Sync {
    /// Score a request's relevance in [0, 1].
    fn score(&self, request: &Request) -> f64;
}

/// Keyword-hit relevance: a base score plus a fixed increment per distinct
/// keyword found in the message, clamped to [0, 1].
#[derive(Debug, Clone)]
pub struct KeywordRelevance {
    keywords: Vec<String>,
    base: f64,
    per_hit: f64,
}

impl KeywordRelevance {
    pub fn new(keywords: &[&str]) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            base: 0.2,
            per_hit: 0.3,
        }
    }

    pub fn with_weights(mut self, base: f64, per_hit: f64) -> Self {
        self.base = base;
        self.per_hit = per_hit;
        self
    }

    /// Distinct keywords present in the (lowercased) message.
    fn hits(&self, lowercased: &str) -> usize {
        self.keywords
            .iter()
            .filter(|k| lowercased.contains(k.as_str()))
            .count()
    }
}

impl RelevanceModel for KeywordRelevance {
    fn score(&self, request: &Request) -> f64 {
        let lowercased = request.message.to_lowercase();
        let hits = self.hits(&lowercased);
        if hits == 0 {
            return 0.0;
        }
        (self.base + self.per_hit * hits as f64).clamp(0.0, 1.0)
    }
}

/// Fixed-score relevance, useful for tests and for always-on responders.
#[derive(Debug, Clone)]
pub struct FixedRelevance(pub f64);

impl RelevanceModel for FixedRelevance {
    fn score(&self, _request: &Request) -> f64 {
        self.0.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Context;

    fn req(message: &str) -> Request {
        Request::new(message, Context::new())
    }

    #[test]
    fn test_no_hits_scores_zero() {
        let model = KeywordRelevance::new(&["revenue", "profit"]);
        assert_eq!(model.score(&req("hello there")), 0.0);
    }

    #[test]
    fn test_hits_accumulate_and_clamp() {
        let model = KeywordRelevance::new(&["revenue", "profit", "cash", "margin"]);

        let one = model.score(&req("How is my revenue?"));
        let two = model.score(&req("How do revenue and profit relate?"));
        assert!(two > one);

        // Enough hits saturate at 1.0
        let all = model.score(&req("revenue profit cash margin"));
        assert_eq!(all, 1.0);
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let model = KeywordRelevance::new(&["Revenue"]);
        assert!(model.score(&req("REVENUE is up")) > 0.0);
    }

    #[test]
    fn test_fixed_relevance_clamps() {
        assert_eq!(FixedRelevance(1.4).score(&req("anything")), 1.0);
        assert_eq!(FixedRelevance(0.8).score(&req("anything")), 0.8);
    }
}
