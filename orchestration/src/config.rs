//! Orchestrator configuration
//!
//! Every tuning constant in the pipeline lives here: thresholds, budgets,
//! timeouts, topic tables, domain lexicons, and cache policy. The weighted
//! scoring constants (0.7 base, +0.1 bonuses) are tuning choices rather than
//! invariants, so they are plain config fields with the documented defaults.
//!
//! A config can be loaded from a TOML file; every section defaults
//! independently, so partial files only override what they name.

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// A named topic for collaboration detection.
///
/// A request matching at least two of a topic's keywords while the required
/// domain is among the candidates triggers joint handling tagged with the
/// topic name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicRule {
    pub name: String,
    pub keywords: Vec<String>,
    pub required_domain: String,
}

impl TopicRule {
    pub fn new(name: &str, keywords: &[&str], required_domain: &str) -> Self {
        Self {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            required_domain: required_domain.to_string(),
        }
    }
}

/// Keyword lexicon for detecting a domain inside a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainLexicon {
    pub name: String,
    pub keywords: Vec<String>,
}

impl DomainLexicon {
    pub fn new(name: &str, keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// Whether the (lowercased) message mentions this domain.
    pub fn matches(&self, lowercased: &str) -> bool {
        self.keywords.iter().any(|k| lowercased.contains(k.as_str()))
    }
}

/// Coarse banding for one numeric context field.
///
/// The value falls into `labels[i]` for the first `thresholds[i]` it is
/// strictly below, or the final label otherwise. `labels` has exactly one
/// more entry than `thresholds`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketRule {
    pub field: String,
    pub thresholds: Vec<f64>,
    pub labels: Vec<String>,
}

impl BucketRule {
    pub fn new(field: &str, thresholds: &[f64], labels: &[&str]) -> Self {
        debug_assert_eq!(labels.len(), thresholds.len() + 1);
        Self {
            field: field.to_string(),
            thresholds: thresholds.to_vec(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
        }
    }

    /// Band a raw value into its label.
    pub fn bucket(&self, value: f64) -> &str {
        for (i, t) in self.thresholds.iter().enumerate() {
            if value < *t {
                return &self.labels[i];
            }
        }
        self.labels.last().map(String::as_str).unwrap_or("unknown")
    }
}

/// How eagerly responses are written to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheMode {
    /// Only high-confidence answers
    Conservative,
    /// Anything above a moderate confidence bar
    Balanced,
    /// Everything, including fallback/degraded answers
    Aggressive,
}

impl CacheMode {
    /// Minimum confidence an answer needs before it is cached.
    pub fn min_write_confidence(&self) -> f64 {
        match self {
            CacheMode::Conservative => 0.8,
            CacheMode::Balanced => 0.6,
            CacheMode::Aggressive => 0.0,
        }
    }

    /// Whether fallback/degraded answers may be cached.
    pub fn caches_fallbacks(&self) -> bool {
        matches!(self, CacheMode::Aggressive)
    }
}

/// Relevance routing thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Candidates scoring below this are dropped
    pub min_confidence: f64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
        }
    }
}

/// Collaboration decision thresholds and topic table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollaborationConfig {
    /// Two or more candidates above this trigger multi-domain collaboration
    pub high_confidence: f64,

    /// Named topics checked before the generic multi-domain rule
    pub topics: Vec<TopicRule>,
}

impl Default for CollaborationConfig {
    fn default() -> Self {
        Self {
            high_confidence: 0.75,
            topics: vec![
                TopicRule::new(
                    "growth_strategy",
                    &[
                        "revenue", "grow", "growth", "increase", "sales", "marketing", "promote",
                    ],
                    "financial",
                ),
                TopicRule::new(
                    "cost_efficiency",
                    &[
                        "cost", "costs", "spend", "spending", "budget", "overhead", "reduce",
                        "efficiency",
                    ],
                    "financial",
                ),
                TopicRule::new(
                    "market_expansion",
                    &[
                        "market", "expansion", "expand", "launch", "competition", "audience",
                        "customers",
                    ],
                    "marketing",
                ),
                TopicRule::new(
                    "team_scaling",
                    &["hire", "hiring", "team", "headcount", "staff", "onboarding"],
                    "operations",
                ),
            ],
        }
    }
}

/// Weights for the additive collaboration score.
///
/// score = clamp(base + high_confidence_bonus·count(conf > high_confidence_threshold)
///               + topic_bonus·[topic recognized]
///               + breadth_bonus·[merged recommendations ≥ breadth_threshold], 0, 1)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub base: f64,
    pub high_confidence_bonus: f64,
    pub high_confidence_threshold: f64,
    pub topic_bonus: f64,
    pub breadth_bonus: f64,
    pub breadth_threshold: usize,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            base: 0.7,
            high_confidence_bonus: 0.1,
            high_confidence_threshold: 0.8,
            topic_bonus: 0.1,
            breadth_bonus: 0.1,
            breadth_threshold: 6,
        }
    }
}

/// Execution budgets shared across all in-flight requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Maximum responders executed for one request (K)
    pub max_collaborators: usize,

    /// Process-wide bound on concurrently running responder calls (W)
    pub concurrency_budget: usize,

    /// Per-call timeout in milliseconds
    pub call_timeout_ms: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_collaborators: 3,
            concurrency_budget: 10,
            call_timeout_ms: 5_000,
        }
    }
}

impl ExecutionConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

/// Identity and confidence of the deterministic fallback answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub responder_id: String,
    pub domain: String,
    pub confidence: f64,
    pub text: String,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            responder_id: "general_advisor".to_string(),
            domain: "general".to_string(),
            confidence: 0.5,
            text: "I could not match your request to a specialist. Could you share more detail \
                   about the business area you need help with?"
                .to_string(),
        }
    }
}

/// Aggregation limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Cap on merged recommendations
    pub recommendation_cap: usize,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            recommendation_cap: 8,
        }
    }
}

/// Message-shape thresholds for strategy selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Messages longer than this go to the staged pipeline
    pub pipeline_word_count: usize,

    /// Messages shorter than this run sequentially
    pub sequential_word_count: usize,

    /// Lexicons for counting detected domains in a message
    pub domains: Vec<DomainLexicon>,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            pipeline_word_count: 30,
            sequential_word_count: 10,
            domains: vec![
                DomainLexicon::new(
                    "financial",
                    &[
                        "revenue", "cost", "profit", "margin", "cash", "budget", "finance",
                        "pricing", "funding",
                    ],
                ),
                DomainLexicon::new(
                    "marketing",
                    &[
                        "marketing", "brand", "campaign", "advertis", "social media", "audience",
                        "promotion",
                    ],
                ),
                DomainLexicon::new(
                    "operations",
                    &[
                        "operations", "process", "workflow", "hiring", "logistics", "staffing",
                        "supply",
                    ],
                ),
                DomainLexicon::new(
                    "strategy",
                    &[
                        "strategy", "roadmap", "vision", "long-term", "expansion", "competition",
                        "pivot",
                    ],
                ),
            ],
        }
    }
}

/// Cache key derivation and read/write policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CachePolicy {
    pub enabled: bool,

    /// Capacity of the in-process store (oldest-first eviction)
    pub capacity: usize,

    pub mode: CacheMode,

    /// Base TTL; scaled up with confidence
    pub base_ttl_secs: u64,

    /// Hard TTL cap regardless of confidence
    pub max_ttl_secs: u64,

    /// TTL clamp for freshness-sensitive messages
    pub fresh_ttl_secs: u64,

    /// Identity of the answering responder pool, included in the key
    pub provider_id: String,

    /// Banding rules for numeric context fields
    pub buckets: Vec<BucketRule>,

    /// Phrases marking a message as freshness-sensitive
    pub freshness_markers: Vec<String>,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 256,
            mode: CacheMode::Balanced,
            base_ttl_secs: 300,
            max_ttl_secs: 3_600,
            fresh_ttl_secs: 60,
            provider_id: "specialist-pool".to_string(),
            buckets: vec![
                BucketRule::new(
                    "revenue",
                    &[10_000.0, 100_000.0, 1_000_000.0],
                    &["low", "medium", "high", "very_high"],
                ),
                BucketRule::new(
                    "employees",
                    &[10.0, 50.0, 250.0],
                    &["micro", "small", "medium", "large"],
                ),
                BucketRule::new(
                    "growth_rate",
                    &[0.0, 0.1, 0.3],
                    &["negative", "flat", "steady", "rapid"],
                ),
            ],
            freshness_markers: vec![
                "today".to_string(),
                "right now".to_string(),
                "current".to_string(),
                "currently".to_string(),
                "latest".to_string(),
                "this week".to_string(),
                "this month".to_string(),
            ],
        }
    }
}

impl CachePolicy {
    /// TTL for an entry: scales with confidence, capped, and clamped for
    /// freshness-sensitive requests regardless of confidence.
    pub fn ttl_for(&self, confidence: f64, freshness_sensitive: bool) -> Duration {
        let scaled = (self.base_ttl_secs as f64 * (1.0 + confidence.clamp(0.0, 1.0))) as u64;
        let mut ttl = scaled.min(self.max_ttl_secs);
        if freshness_sensitive {
            ttl = ttl.min(self.fresh_ttl_secs);
        }
        Duration::from_secs(ttl)
    }

    /// Whether the (lowercased) message should get the shortened TTL.
    pub fn is_freshness_sensitive(&self, lowercased: &str) -> bool {
        self.freshness_markers
            .iter()
            .any(|m| lowercased.contains(m.as_str()))
    }
}

/// Top-level orchestrator configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub router: RouterConfig,
    pub collaboration: CollaborationConfig,
    pub score: ScoreWeights,
    pub execution: ExecutionConfig,
    pub fallback: FallbackConfig,
    pub aggregation: AggregationConfig,
    pub strategy: StrategyConfig,
    pub cache: CachePolicy,
}

impl OrchestratorConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.router.min_confidence, 0.5);
        assert_eq!(config.collaboration.high_confidence, 0.75);
        assert_eq!(config.execution.max_collaborators, 3);
        assert_eq!(config.execution.concurrency_budget, 10);
        assert_eq!(config.execution.call_timeout_ms, 5_000);
        assert_eq!(config.fallback.confidence, 0.5);
        assert_eq!(config.aggregation.recommendation_cap, 8);
        assert_eq!(config.score.base, 0.7);
    }

    #[test]
    fn test_bucket_rule_banding() {
        let rule = BucketRule::new(
            "revenue",
            &[10_000.0, 100_000.0, 1_000_000.0],
            &["low", "medium", "high", "very_high"],
        );
        assert_eq!(rule.bucket(500.0), "low");
        assert_eq!(rule.bucket(10_000.0), "medium");
        assert_eq!(rule.bucket(99_999.0), "medium");
        assert_eq!(rule.bucket(2_000_000.0), "very_high");
    }

    #[test]
    fn test_cache_mode_thresholds() {
        assert!(CacheMode::Conservative.min_write_confidence() > CacheMode::Balanced.min_write_confidence());
        assert_eq!(CacheMode::Aggressive.min_write_confidence(), 0.0);
        assert!(CacheMode::Aggressive.caches_fallbacks());
        assert!(!CacheMode::Balanced.caches_fallbacks());
    }

    #[test]
    fn test_ttl_scales_with_confidence_and_caps() {
        let policy = CachePolicy::default();
        let low = policy.ttl_for(0.2, false);
        let high = policy.ttl_for(1.0, false);
        assert!(high > low);
        assert!(high.as_secs() <= policy.max_ttl_secs);

        // Freshness clamp wins over confidence
        let fresh = policy.ttl_for(1.0, true);
        assert_eq!(fresh.as_secs(), policy.fresh_ttl_secs);
    }

    #[test]
    fn test_partial_toml_overrides_one_section() {
        let raw = r#"
            [execution]
            concurrency_budget = 4
        "#;
        let config: OrchestratorConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.execution.concurrency_budget, 4);
        // Untouched sections keep their defaults
        assert_eq!(config.execution.max_collaborators, 3);
        assert_eq!(config.router.min_confidence, 0.5);
    }
}
