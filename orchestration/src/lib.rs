//! Specialized-Responder Orchestration Library
//!
//! Routes free-text business requests to a pool of domain specialists and
//! coordinates their answers into one response:
//! - Relevance routing over responder self-assessments
//! - Collaboration decisions via a topic table and confidence rules
//! - Budgeted execution: at most K responders per request under one
//!   process-wide concurrency budget, with a fixed per-call timeout
//! - Aggregation into a single coordinated response with merged, deduped
//!   recommendations and a collaboration score
//! - A semantic response cache keyed on the normalized message plus a
//!   coarse context fingerprint, with confidence-scaled TTLs
//! - Order-preserving concurrent batch handling
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use orchestration::{
//!     Context, KeywordRelevance, KeywordResponder, Orchestrator, OrchestratorConfig,
//! };
//!
//! # async fn demo() {
//! let mut orchestrator = Orchestrator::new(OrchestratorConfig::default());
//! orchestrator.register(Arc::new(KeywordResponder::new(
//!     "financial_advisor",
//!     "financial",
//!     Box::new(KeywordRelevance::new(&["revenue", "cost", "pricing"])),
//! )));
//!
//! let response = orchestrator
//!     .orchestrate("How can I increase revenue?", Context::new(), None)
//!     .await;
//! assert!(!response.primary.text.is_empty());
//! # }
//! ```
//!
//! The top-level entry point never returns an error: every failure path
//! degrades to a deterministic fallback response.

pub mod aggregator;
pub mod batch;
pub mod cache;
pub mod collaboration;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod responder;
pub mod router;
pub mod strategy;
pub mod types;

// Re-export the orchestrator surface
pub use orchestrator::Orchestrator;

// Re-export the responder contract and bundled implementations
pub use responder::{
    KeywordRelevance, KeywordResponder, RelevanceModel, Responder, ResponderRegistry,
    ResponderStatus,
};

// Re-export configuration and core data types
pub use config::{CacheMode, OrchestratorConfig};
pub use strategy::ExecutionStrategy;
pub use types::{CandidateScore, Context, CoordinatedResponse, Request, ResponderAnswer};

// Re-export batch and metrics surfaces
pub use batch::{BatchItem, BatchOutcome, BatchRequest};
pub use metrics::ExecutionMetrics;

// Re-export errors for callers implementing their own responders
pub use error::{AssessmentError, OrchestrationError, ResponderError, ResponderResult};

use std::sync::Arc;

/// Shared orchestrator handle for concurrent callers.
pub type SharedOrchestrator = Arc<Orchestrator>;
