//! Response aggregator
//!
//! Merges the surviving responder answers into one coordinated response:
//! highest-confidence answer becomes the primary, recommendations are merged
//! first-seen with case-insensitive dedup, and the collaboration score is a
//! clamped weighted-additive heuristic over the merged set.
//!
//! Ordering is derived from confidence and first-seen position, never from
//! completion order.

use std::collections::HashSet;

use chrono::Utc;
use tracing::debug;

use crate::config::{AggregationConfig, ScoreWeights};
use crate::types::{CoordinatedResponse, ResponderAnswer};

pub struct ResponseAggregator {
    weights: ScoreWeights,
    recommendation_cap: usize,
}

impl ResponseAggregator {
    pub fn new(aggregation: &AggregationConfig, weights: &ScoreWeights) -> Self {
        Self {
            weights: weights.clone(),
            recommendation_cap: aggregation.recommendation_cap,
        }
    }

    /// Merge the surviving answers into one coordinated response, or `None`
    /// when there is nothing to merge.
    ///
    /// The coordinator normally guarantees a non-empty set by signalling
    /// "all failed" before aggregation is reached.
    pub fn aggregate(
        &self,
        mut answers: Vec<ResponderAnswer>,
        topic: Option<String>,
    ) -> Option<CoordinatedResponse> {
        if answers.is_empty() {
            return None;
        }

        // Stable sort keeps selection order for equal confidences.
        answers.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let recommendations = self.merge_recommendations(&answers);
        let confidence =
            answers.iter().map(|a| a.confidence).sum::<f64>() / answers.len() as f64;
        let collaboration_score =
            self.collaboration_score(&answers, topic.is_some(), recommendations.len());
        let narrative = self.narrative(&answers, topic.as_deref());

        let mut iter = answers.into_iter();
        let primary = iter.next()?;
        let secondary: Vec<ResponderAnswer> = iter.collect();

        debug!(
            primary = %primary.responder_id,
            secondary = secondary.len(),
            recommendations = recommendations.len(),
            collaboration_score,
            "Aggregation complete"
        );

        Some(CoordinatedResponse {
            primary,
            secondary,
            recommendations,
            narrative,
            confidence,
            collaboration_score,
            topic,
            fallback: false,
            cache: None,
            produced_at: Utc::now(),
        })
    }

    /// First-seen merge across answers in confidence order, case-insensitive
    /// dedup, capped.
    fn merge_recommendations(&self, answers: &[ResponderAnswer]) -> Vec<String> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut merged = Vec::new();

        'outer: for answer in answers {
            for rec in &answer.recommendations {
                let folded = rec.to_lowercase();
                if seen.insert(folded) {
                    merged.push(rec.clone());
                    if merged.len() == self.recommendation_cap {
                        break 'outer;
                    }
                }
            }
        }

        merged
    }

    /// clamp(base + bonus·count(high confidence) + bonus·[topic] + bonus·[breadth])
    fn collaboration_score(
        &self,
        answers: &[ResponderAnswer],
        topic_recognized: bool,
        merged_count: usize,
    ) -> f64 {
        let w = &self.weights;
        let high = answers
            .iter()
            .filter(|a| a.confidence > w.high_confidence_threshold)
            .count();

        let mut score = w.base + w.high_confidence_bonus * high as f64;
        if topic_recognized {
            score += w.topic_bonus;
        }
        if merged_count >= w.breadth_threshold {
            score += w.breadth_bonus;
        }
        score.clamp(0.0, 1.0)
    }

    /// Deterministic narrative naming the contributing responders.
    fn narrative(&self, answers: &[ResponderAnswer], topic: Option<&str>) -> String {
        let contributors: Vec<&str> = answers.iter().map(|a| a.domain.as_str()).collect();
        let joined = contributors.join(", ");

        match topic {
            Some("multi_domain") => format!(
                "Several areas of your business are involved here; the {} specialists weighed in together.",
                joined
            ),
            Some(name) => format!(
                "Your question touches on {}, so the {} specialists coordinated their answer.",
                name.replace('_', " "),
                joined
            ),
            None => format!("The {} specialist handled this request.", joined),
        }
    }
}
