//! Error taxonomy for the orchestration pipeline
//!
//! Responder-level failures (`AssessmentError`, `ResponderError`) are
//! contained at the router/coordinator boundary: they exclude the offending
//! responder and never propagate. Cache failures degrade to a miss. The
//! public entry point converts anything that still escapes into a fallback
//! response, so callers never see an error.

use thiserror::Error;

/// A responder's self-assessment failed.
///
/// Assessments are contractually cheap and non-raising; this error exists so
/// the router can defensively exclude a responder whose implementation still
/// misbehaves.
#[derive(Debug, Error)]
#[error("assessment failed for responder '{responder_id}': {reason}")]
pub struct AssessmentError {
    pub responder_id: String,
    pub reason: String,
}

impl AssessmentError {
    pub fn new(responder_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            responder_id: responder_id.into(),
            reason: reason.into(),
        }
    }
}

/// A responder call failed to produce an answer.
#[derive(Debug, Error)]
pub enum ResponderError {
    #[error("responder '{0}' exceeded its per-call timeout")]
    Timeout(String),

    #[error("responder '{responder_id}' failed: {reason}")]
    Failed {
        responder_id: String,
        reason: String,
    },
}

/// Result type for responder calls
pub type ResponderResult<T> = Result<T, ResponderError>;

/// Error type for the execution coordinator
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("no candidate responders selected for execution")]
    NoCandidates,

    #[error("all {attempted} selected responder calls failed or timed out")]
    AllResponsesFailed { attempted: usize },
}

/// Result type for coordinator operations
pub type CoordinatorResult<T> = Result<T, CoordinatorError>;

/// Error type for cache backing-store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backing store unavailable: {0}")]
    Unavailable(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[cfg(feature = "durable-cache")]
    #[error("rocksdb error: {0}")]
    RocksDb(#[from] rocksdb::Error),
}

/// Result type for cache store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Umbrella error caught at the public orchestrator boundary.
#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),

    #[error("internal defect: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_responder() {
        let err = ResponderError::Timeout("financial".to_string());
        assert!(err.to_string().contains("financial"));

        let err = AssessmentError::new("marketing", "lexicon missing");
        assert!(err.to_string().contains("marketing"));
        assert!(err.to_string().contains("lexicon missing"));
    }

    #[test]
    fn test_coordinator_error_converts_to_umbrella() {
        let err: OrchestrationError = CoordinatorError::AllResponsesFailed { attempted: 3 }.into();
        assert!(err.to_string().contains('3'));
    }
}
