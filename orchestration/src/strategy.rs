//! Execution strategy selection
//!
//! Deterministic choice of execution mode from the shape of the message
//! alone. `Adaptive` is the public default and simply applies these rules, so
//! callers never need to reason about modes themselves.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::StrategyConfig;

/// How the chosen responders are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStrategy {
    /// One responder call at a time
    Sequential,
    /// Bounded-concurrent calls
    Parallel,
    /// Staged execution: analyze → route → process → coordinate
    Pipeline,
    /// Resolve to one of the above from message shape
    Adaptive,
}

impl ExecutionStrategy {
    /// Stable name used in cache keys and metrics labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Parallel => "parallel",
            Self::Pipeline => "pipeline",
            Self::Adaptive => "adaptive",
        }
    }

    /// All concrete (non-adaptive) strategies.
    pub fn concrete() -> &'static [ExecutionStrategy] {
        &[Self::Sequential, Self::Parallel, Self::Pipeline]
    }
}

impl std::fmt::Display for ExecutionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub struct StrategySelector {
    config: StrategyConfig,
}

impl StrategySelector {
    pub fn new(config: &StrategyConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Resolve a strategy for a message. Explicit non-adaptive requests pass
    /// through untouched.
    pub fn resolve(&self, requested: ExecutionStrategy, message: &str) -> ExecutionStrategy {
        match requested {
            ExecutionStrategy::Adaptive => self.select(message),
            explicit => explicit,
        }
    }

    /// Apply the message-shape rules, in order.
    pub fn select(&self, message: &str) -> ExecutionStrategy {
        let words = message.split_whitespace().count();
        let compound = message.contains('?') && message.contains(',');

        let chosen = if words > self.config.pipeline_word_count || compound {
            ExecutionStrategy::Pipeline
        } else if self.detected_domains(message) >= 2 {
            ExecutionStrategy::Parallel
        } else if words < self.config.sequential_word_count {
            ExecutionStrategy::Sequential
        } else {
            ExecutionStrategy::Parallel
        };

        debug!(words, compound, strategy = %chosen, "Strategy selected");
        chosen
    }

    /// Number of configured domains the message mentions.
    pub fn detected_domains(&self, message: &str) -> usize {
        let lowercased = message.to_lowercase();
        self.config
            .domains
            .iter()
            .filter(|d| d.matches(&lowercased))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selector() -> StrategySelector {
        StrategySelector::new(&StrategyConfig::default())
    }

    #[test]
    fn test_short_message_is_sequential() {
        assert_eq!(selector().select("hi"), ExecutionStrategy::Sequential);
    }

    #[test]
    fn test_long_message_is_pipeline() {
        let long = "word ".repeat(35);
        assert_eq!(selector().select(&long), ExecutionStrategy::Pipeline);
    }

    #[test]
    fn test_compound_question_is_pipeline() {
        // Short, but has both "?" and "," so the pipeline rule fires first.
        assert_eq!(
            selector().select("Given costs, what next?"),
            ExecutionStrategy::Pipeline
        );
    }

    #[test]
    fn test_two_domains_is_parallel() {
        assert_eq!(
            selector().select("improve revenue through better marketing"),
            ExecutionStrategy::Parallel
        );
    }

    #[test]
    fn test_medium_single_domain_is_parallel() {
        assert_eq!(
            selector().select("we should make everything a little nicer around here soon"),
            ExecutionStrategy::Parallel
        );
    }

    #[test]
    fn test_explicit_strategy_passes_through() {
        let s = selector();
        assert_eq!(
            s.resolve(ExecutionStrategy::Sequential, "a very long message that would pipeline"),
            ExecutionStrategy::Sequential
        );
        assert_eq!(s.resolve(ExecutionStrategy::Adaptive, "hi"), ExecutionStrategy::Sequential);
    }

    #[test]
    fn test_strategy_names_are_stable() {
        assert_eq!(ExecutionStrategy::Pipeline.as_str(), "pipeline");
        assert_eq!(ExecutionStrategy::Adaptive.to_string(), "adaptive");
    }
}
