//! Core types flowing through the orchestration pipeline
//!
//! Requests and responder answers are transient: they are discarded once a
//! coordinated response has been assembled. Confidence values are always
//! clamped to [0, 1] at construction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Arbitrary key→value business context attached to a request.
pub type Context = HashMap<String, serde_json::Value>;

/// A free-text business request routed through the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Unique request identifier
    pub id: String,

    /// The free-text message
    pub message: String,

    /// Business context supplied by the caller
    pub context: Context,

    /// Optional session this request belongs to
    pub session_id: Option<String>,

    /// When the request entered the pipeline
    pub received_at: DateTime<Utc>,
}

impl Request {
    /// Create a new request with a fresh id
    pub fn new(message: impl Into<String>, context: Context) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            message: message.into(),
            context,
            session_id: None,
            received_at: Utc::now(),
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Number of whitespace-separated words in the message
    pub fn word_count(&self) -> usize {
        self.message.split_whitespace().count()
    }
}

/// A responder paired with its self-assessed relevance for one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateScore {
    /// Identifier of the assessed responder
    pub responder_id: String,

    /// Domain the responder covers (e.g. "financial", "marketing")
    pub domain: String,

    /// Self-assessed relevance, clamped to [0, 1]
    pub confidence: f64,
}

impl CandidateScore {
    pub fn new(responder_id: impl Into<String>, domain: impl Into<String>, confidence: f64) -> Self {
        Self {
            responder_id: responder_id.into(),
            domain: domain.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// A single responder's structured answer. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponderAnswer {
    /// Identifier of the producing responder
    pub responder_id: String,

    /// Domain tag of the producing responder
    pub domain: String,

    /// Natural-language answer text
    pub text: String,

    /// Concrete recommendations, in the responder's preference order
    pub recommendations: Vec<String>,

    /// Follow-up action items
    pub action_items: Vec<String>,

    /// Responder's confidence in this answer, clamped to [0, 1]
    pub confidence: f64,

    /// Free-form metadata (never interpreted by the core)
    pub metadata: HashMap<String, serde_json::Value>,

    /// When the answer was produced
    pub produced_at: DateTime<Utc>,
}

impl ResponderAnswer {
    pub fn new(
        responder_id: impl Into<String>,
        domain: impl Into<String>,
        text: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            responder_id: responder_id.into(),
            domain: domain.into(),
            text: text.into(),
            recommendations: Vec::new(),
            action_items: Vec::new(),
            confidence: confidence.clamp(0.0, 1.0),
            metadata: HashMap::new(),
            produced_at: Utc::now(),
        }
    }

    pub fn with_recommendations(mut self, recommendations: Vec<String>) -> Self {
        self.recommendations = recommendations;
        self
    }

    pub fn with_action_items(mut self, action_items: Vec<String>) -> Self {
        self.action_items = action_items;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Cache annotation attached to a response served from the cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheInfo {
    /// Whether this response was served from the cache
    pub hit: bool,

    /// Hit count of the entry after this read
    pub hit_count: u64,

    /// When the entry was originally written
    pub written_at: DateTime<Utc>,
}

/// The coordinated answer returned to the caller.
///
/// Always structurally valid: exactly one primary answer, substituting a
/// deterministic fallback when no candidate qualifies or every call fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatedResponse {
    /// Highest-confidence surviving answer
    pub primary: ResponderAnswer,

    /// Remaining surviving answers, descending by confidence
    pub secondary: Vec<ResponderAnswer>,

    /// Merged recommendations: first-seen order, case-insensitively deduped,
    /// capped by configuration
    pub recommendations: Vec<String>,

    /// Deterministic narrative naming the contributing responders
    pub narrative: String,

    /// Mean confidence of the answers actually merged
    pub confidence: f64,

    /// Weighted-additive collaboration score, clamped to [0, 1]
    pub collaboration_score: f64,

    /// Recognized topic, if the collaboration decider matched one
    pub topic: Option<String>,

    /// True when this is a degraded/fallback response
    pub fallback: bool,

    /// Cache metadata, present only on cache hits
    pub cache: Option<CacheInfo>,

    /// When the response was assembled
    pub produced_at: DateTime<Utc>,
}

impl CoordinatedResponse {
    /// Build a single-answer response around one primary.
    pub fn from_primary(primary: ResponderAnswer) -> Self {
        let confidence = primary.confidence;
        let recommendations = primary.recommendations.clone();
        Self {
            primary,
            secondary: Vec::new(),
            recommendations,
            narrative: String::new(),
            confidence,
            collaboration_score: 0.0,
            topic: None,
            fallback: false,
            cache: None,
            produced_at: Utc::now(),
        }
    }

    /// Total number of answers merged into this response.
    pub fn merged_count(&self) -> usize {
        1 + self.secondary.len()
    }
}

/// Lifecycle phase of a request inside the orchestrator.
///
/// Used for structured logging; a request always terminates in `Responded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestPhase {
    Received,
    CacheCheck,
    Routing,
    CollabDecision,
    Executing,
    Aggregating,
    Fallback,
    Responded,
}

impl std::fmt::Display for RequestPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Received => "received",
            Self::CacheCheck => "cache_check",
            Self::Routing => "routing",
            Self::CollabDecision => "collab_decision",
            Self::Executing => "executing",
            Self::Aggregating => "aggregating",
            Self::Fallback => "fallback",
            Self::Responded => "responded",
        };
        write!(f, "{}", s)
    }
}

/// Terminal outcome of one responder call within a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    Completed,
    TimedOut,
    Failed,
}
