//! Relevance router
//!
//! Queries every registered responder's self-assessment concurrently, drops
//! scores below the minimum threshold, and sorts candidates descending by
//! confidence with ties broken by registration order. A responder whose
//! assessment errors is excluded and logged; router failure is always
//! partial, never total.

use futures::future::join_all;
use tracing::{debug, warn};

use crate::config::RouterConfig;
use crate::responder::ResponderRegistry;
use crate::types::{CandidateScore, Request};

pub struct RelevanceRouter {
    min_confidence: f64,
}

impl RelevanceRouter {
    pub fn new(config: &RouterConfig) -> Self {
        Self {
            min_confidence: config.min_confidence,
        }
    }

    /// Assess every registered responder and return the qualifying
    /// candidates, best first.
    pub async fn route(&self, registry: &ResponderRegistry, request: &Request) -> Vec<CandidateScore> {
        let assessments = join_all(registry.iter().map(|responder| {
            let responder = responder.clone();
            async move {
                let id = responder.id().to_string();
                (id, responder.assess(request).await)
            }
        }))
        .await;

        // join_all preserves input order, so equal-confidence candidates
        // keep registration order through the stable sort below.
        let mut candidates: Vec<CandidateScore> = assessments
            .into_iter()
            .filter_map(|(id, result)| match result {
                Ok(score) => Some(score),
                Err(e) => {
                    warn!(responder = %id, error = %e, "Assessment failed, excluding responder");
                    None
                }
            })
            .filter(|score| score.confidence >= self.min_confidence)
            .collect();

        candidates.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        debug!(
            request_id = %request.id,
            candidates = candidates.len(),
            registered = registry.len(),
            "Routing complete"
        );

        candidates
    }
}
