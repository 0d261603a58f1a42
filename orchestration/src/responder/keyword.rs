//! Deterministic keyword-driven responder
//!
//! The built-in responder used for demos, cache warming, and tests. Its
//! relevance comes from a pluggable [`RelevanceModel`] and its answer is a
//! deterministic template over the configured recommendation set, so repeated
//! requests produce identical content.

use async_trait::async_trait;

use super::{InteractionLog, InteractionRecord, RelevanceModel, Responder, ResponderStatus};
use crate::error::{AssessmentError, ResponderResult};
use crate::types::{CandidateScore, Request, ResponderAnswer};

/// Longest message prefix retained in interaction-log previews.
const PREVIEW_LEN: usize = 80;

pub struct KeywordResponder {
    id: String,
    domain: String,
    relevance: Box<dyn RelevanceModel>,
    recommendations: Vec<String>,
    action_items: Vec<String>,
    log: InteractionLog,
}

impl KeywordResponder {
    pub fn new(id: &str, domain: &str, relevance: Box<dyn RelevanceModel>) -> Self {
        Self {
            id: id.to_string(),
            domain: domain.to_string(),
            relevance,
            recommendations: Vec::new(),
            action_items: Vec::new(),
            log: InteractionLog::default(),
        }
    }

    pub fn with_recommendations(mut self, recommendations: &[&str]) -> Self {
        self.recommendations = recommendations.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn with_action_items(mut self, action_items: &[&str]) -> Self {
        self.action_items = action_items.iter().map(|a| a.to_string()).collect();
        self
    }

    fn preview(message: &str) -> String {
        if message.len() > PREVIEW_LEN {
            let mut end = PREVIEW_LEN;
            while !message.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...", &message[..end])
        } else {
            message.to_string()
        }
    }
}

#[async_trait]
impl Responder for KeywordResponder {
    fn id(&self) -> &str {
        &self.id
    }

    fn domain(&self) -> &str {
        &self.domain
    }

    async fn assess(&self, request: &Request) -> Result<CandidateScore, AssessmentError> {
        let confidence = self.relevance.score(request);
        Ok(CandidateScore::new(&self.id, &self.domain, confidence))
    }

    async fn respond(&self, request: &Request) -> ResponderResult<ResponderAnswer> {
        let confidence = self.relevance.score(request);

        self.log.record(InteractionRecord {
            request_id: request.id.clone(),
            message_preview: Self::preview(&request.message),
            confidence,
            at: chrono::Utc::now(),
        });

        let text = format!(
            "From a {} standpoint: based on your request, the {} priorities below apply.",
            self.domain,
            self.recommendations.len().max(1)
        );

        Ok(ResponderAnswer::new(&self.id, &self.domain, text, confidence)
            .with_recommendations(self.recommendations.clone())
            .with_action_items(self.action_items.clone())
            .with_metadata("source", serde_json::json!("keyword_heuristic")))
    }

    fn status(&self) -> ResponderStatus {
        ResponderStatus {
            id: self.id.clone(),
            domain: self.domain.clone(),
            available: true,
            interactions_logged: self.log.len(),
            last_active: self.log.last_active(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::responder::KeywordRelevance;
    use crate::types::Context;

    fn financial() -> KeywordResponder {
        KeywordResponder::new(
            "financial",
            "financial",
            Box::new(KeywordRelevance::new(&["revenue", "cost", "profit"])),
        )
        .with_recommendations(&["Review pricing tiers", "Cut discretionary spend"])
        .with_action_items(&["Pull last quarter's P&L"])
    }

    #[tokio::test]
    async fn test_assess_scores_by_keywords() {
        let responder = financial();
        let relevant = Request::new("How do I grow revenue?", Context::new());
        let irrelevant = Request::new("hi", Context::new());

        let hit = responder.assess(&relevant).await.unwrap();
        let miss = responder.assess(&irrelevant).await.unwrap();
        assert!(hit.confidence > 0.0);
        assert_eq!(miss.confidence, 0.0);
        assert_eq!(hit.domain, "financial");
    }

    #[tokio::test]
    async fn test_respond_is_deterministic_and_logs() {
        let responder = financial();
        let request = Request::new("Help with revenue and cost", Context::new());

        let first = responder.respond(&request).await.unwrap();
        let second = responder.respond(&request).await.unwrap();

        assert_eq!(first.text, second.text);
        assert_eq!(first.recommendations, second.recommendations);
        assert_eq!(responder.status().interactions_logged, 2);
        assert!(responder.status().last_active.is_some());
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let long = "é".repeat(100);
        let preview = KeywordResponder::preview(&long);
        assert!(preview.ends_with("..."));
        assert!(preview.len() <= PREVIEW_LEN + 3);
    }
}
