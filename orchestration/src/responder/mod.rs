//! Responder contract
//!
//! A responder is a capability-scoped unit that self-assesses its relevance
//! for a request and, when chosen, produces a structured answer. The router
//! and coordinator are generic over this trait and never over concrete types.
//!
//! `assess` must be cheap and should not fail: implementations are expected
//! to swallow internal defects into a zero-confidence score. `respond` runs
//! under an externally enforced per-call timeout.

mod keyword;
mod registry;
mod relevance;

pub use keyword::KeywordResponder;
pub use registry::ResponderRegistry;
pub use relevance::{FixedRelevance, KeywordRelevance, RelevanceModel};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::{AssessmentError, ResponderResult};
use crate::types::{CandidateScore, Request, ResponderAnswer};

/// Default capacity of a responder's private interaction log.
pub const DEFAULT_LOG_CAPACITY: usize = 64;

/// A domain-expert unit capable of self-assessing relevance and answering.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Stable identifier, unique within a registry.
    fn id(&self) -> &str;

    /// Domain tag (e.g. "financial", "marketing").
    fn domain(&self) -> &str;

    /// Cheap self-assessment of relevance for a request.
    ///
    /// Errors are excluded by the router, never propagated.
    async fn assess(&self, request: &Request) -> Result<CandidateScore, AssessmentError>;

    /// Produce a structured answer. Bounded by the coordinator's per-call
    /// timeout; may append to the responder's own interaction log.
    async fn respond(&self, request: &Request) -> ResponderResult<ResponderAnswer>;

    /// Current status snapshot.
    fn status(&self) -> ResponderStatus;
}

/// Point-in-time status of one responder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponderStatus {
    pub id: String,
    pub domain: String,
    /// Whether the responder considers itself able to answer
    pub available: bool,
    /// Interactions currently retained in the private log
    pub interactions_logged: usize,
    /// Last time the responder produced an answer
    pub last_active: Option<DateTime<Utc>>,
}

/// One record in a responder's private interaction log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub request_id: String,
    pub message_preview: String,
    pub confidence: f64,
    pub at: DateTime<Utc>,
}

/// Bounded, drop-oldest interaction log, private to one responder instance.
///
/// Not shared across responders; interior mutability lets `respond(&self)`
/// append without a mutable receiver.
#[derive(Debug)]
pub struct InteractionLog {
    records: Mutex<VecDeque<InteractionRecord>>,
    capacity: usize,
}

impl InteractionLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_LOG_CAPACITY))),
            capacity: capacity.max(1),
        }
    }

    /// Append a record, dropping the oldest when full.
    pub fn record(&self, record: InteractionRecord) {
        let mut records = match self.records.lock() {
            Ok(guard) => guard,
            // A poisoned log is a test-only condition; drop the record.
            Err(_) => return,
        };
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(record);
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `n` most recent records, newest last.
    pub fn recent(&self, n: usize) -> Vec<InteractionRecord> {
        match self.records.lock() {
            Ok(records) => records.iter().rev().take(n).rev().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Timestamp of the newest record.
    pub fn last_active(&self) -> Option<DateTime<Utc>> {
        self.records
            .lock()
            .ok()
            .and_then(|r| r.back().map(|rec| rec.at))
    }
}

impl Default for InteractionLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str) -> InteractionRecord {
        InteractionRecord {
            request_id: id.to_string(),
            message_preview: "preview".to_string(),
            confidence: 0.5,
            at: Utc::now(),
        }
    }

    #[test]
    fn test_log_drops_oldest_when_full() {
        let log = InteractionLog::new(3);
        for i in 0..5 {
            log.record(rec(&format!("req-{}", i)));
        }

        assert_eq!(log.len(), 3);
        let recent = log.recent(3);
        assert_eq!(recent[0].request_id, "req-2");
        assert_eq!(recent[2].request_id, "req-4");
    }

    #[test]
    fn test_recent_returns_newest_last() {
        let log = InteractionLog::new(10);
        log.record(rec("a"));
        log.record(rec("b"));

        let recent = log.recent(1);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].request_id, "b");
    }

    #[test]
    fn test_empty_log() {
        let log = InteractionLog::default();
        assert!(log.is_empty());
        assert!(log.last_active().is_none());
    }
}
