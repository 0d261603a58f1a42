//! Collaboration decider
//!
//! Chooses single- vs multi-responder handling for a routed request. Rules
//! apply in order: candidate count, topic-table lookup, generic
//! high-confidence multi-domain, then single top candidate.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{CollaborationConfig, TopicRule};
use crate::types::CandidateScore;

/// Tag applied when collaboration triggers without a named topic.
pub const MULTI_DOMAIN_TOPIC: &str = "multi_domain";

/// Minimum keyword hits for a topic-table match.
const TOPIC_KEYWORD_HITS: usize = 2;

/// Outcome of the collaboration decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CollaborationDecision {
    /// One responder answers alone.
    Single { candidate: CandidateScore },

    /// Multiple responders answer jointly under a topic tag.
    Collaborate {
        candidates: Vec<CandidateScore>,
        topic: String,
    },
}

impl CollaborationDecision {
    /// The candidates that will actually execute, best first.
    pub fn selected(&self) -> Vec<CandidateScore> {
        match self {
            Self::Single { candidate } => vec![candidate.clone()],
            Self::Collaborate { candidates, .. } => candidates.clone(),
        }
    }

    pub fn topic(&self) -> Option<&str> {
        match self {
            Self::Single { .. } => None,
            Self::Collaborate { topic, .. } => Some(topic),
        }
    }

    pub fn is_collaboration(&self) -> bool {
        matches!(self, Self::Collaborate { .. })
    }
}

pub struct CollaborationDecider {
    high_confidence: f64,
    topics: Vec<TopicRule>,
}

impl CollaborationDecider {
    pub fn new(config: &CollaborationConfig) -> Self {
        Self {
            high_confidence: config.high_confidence,
            topics: config.topics.clone(),
        }
    }

    /// Decide how a request should be handled.
    ///
    /// `candidates` must be the router's output: non-empty, best first.
    pub fn decide(&self, message: &str, candidates: &[CandidateScore]) -> CollaborationDecision {
        debug_assert!(!candidates.is_empty(), "decider requires routed candidates");

        // Rule 1: a lone candidate answers alone.
        if candidates.len() < 2 {
            return CollaborationDecision::Single {
                candidate: candidates[0].clone(),
            };
        }

        let lowercased = message.to_lowercase();

        // Rule 2: topic-table lookup. First topic in table order wins.
        for topic in &self.topics {
            let hits = topic
                .keywords
                .iter()
                .filter(|k| lowercased.contains(k.as_str()))
                .count();
            let required_present = candidates
                .iter()
                .any(|c| c.domain == topic.required_domain);

            if hits >= TOPIC_KEYWORD_HITS && required_present {
                debug!(topic = %topic.name, hits, "Topic collaboration triggered");
                return CollaborationDecision::Collaborate {
                    candidates: candidates.to_vec(),
                    topic: topic.name.clone(),
                };
            }
        }

        // Rule 3: two or more high-confidence candidates collaborate even
        // without a recognized topic.
        let high = candidates
            .iter()
            .filter(|c| c.confidence > self.high_confidence)
            .count();
        if high >= 2 {
            debug!(high_confidence_candidates = high, "Multi-domain collaboration triggered");
            return CollaborationDecision::Collaborate {
                candidates: candidates.to_vec(),
                topic: MULTI_DOMAIN_TOPIC.to_string(),
            };
        }

        // Rule 4: top candidate answers alone.
        CollaborationDecision::Single {
            candidate: candidates[0].clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decider() -> CollaborationDecider {
        CollaborationDecider::new(&CollaborationConfig::default())
    }

    fn candidate(domain: &str, confidence: f64) -> CandidateScore {
        CandidateScore::new(domain, domain, confidence)
    }

    #[test]
    fn test_single_candidate_never_collaborates() {
        let decision = decider().decide(
            "increase revenue with better marketing",
            &[candidate("financial", 0.95)],
        );
        assert!(!decision.is_collaboration());
        assert_eq!(decision.selected().len(), 1);
    }

    #[test]
    fn test_topic_match_triggers_collaboration() {
        // "increase", "revenue", "marketing" all hit growth_strategy, and the
        // required financial domain is among the candidates.
        let decision = decider().decide(
            "How can I increase my revenue and improve marketing?",
            &[candidate("financial", 0.8), candidate("marketing", 0.8)],
        );

        assert!(decision.is_collaboration());
        assert_eq!(decision.topic(), Some("growth_strategy"));
        assert_eq!(decision.selected().len(), 2);
    }

    #[test]
    fn test_topic_requires_its_domain_present() {
        // Keywords hit, but no financial candidate: topic rule passes over,
        // and both being above 0.75 triggers the multi-domain rule instead.
        let decision = decider().decide(
            "How can I increase my revenue and improve marketing?",
            &[candidate("marketing", 0.8), candidate("operations", 0.8)],
        );

        assert!(decision.is_collaboration());
        assert_eq!(decision.topic(), Some(MULTI_DOMAIN_TOPIC));
    }

    #[test]
    fn test_one_keyword_hit_is_not_a_topic_match() {
        let decision = decider().decide(
            "thoughts on our budget?",
            &[candidate("financial", 0.7), candidate("operations", 0.6)],
        );
        assert!(!decision.is_collaboration());
    }

    #[test]
    fn test_high_confidence_pair_collaborates_as_multi_domain() {
        let decision = decider().decide(
            "general direction for the company",
            &[candidate("strategy", 0.9), candidate("operations", 0.8)],
        );

        assert!(decision.is_collaboration());
        assert_eq!(decision.topic(), Some(MULTI_DOMAIN_TOPIC));
    }

    #[test]
    fn test_moderate_pair_falls_back_to_top_candidate() {
        let decision = decider().decide(
            "general direction for the company",
            &[candidate("strategy", 0.7), candidate("operations", 0.6)],
        );

        match decision {
            CollaborationDecision::Single { candidate } => {
                assert_eq!(candidate.domain, "strategy");
            }
            CollaborationDecision::Collaborate { .. } => panic!("expected single"),
        }
    }

    #[test]
    fn test_exactly_at_high_confidence_threshold_does_not_trigger() {
        // Rule 3 requires strictly above the threshold.
        let decision = decider().decide(
            "general direction for the company",
            &[candidate("strategy", 0.75), candidate("operations", 0.75)],
        );
        assert!(!decision.is_collaboration());
    }
}
