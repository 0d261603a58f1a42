//! Batch coordination
//!
//! Fans a batch of independent requests out concurrently and returns the
//! results in input order, regardless of completion order. Individual
//! requests already degrade to the fallback internally, so a batch item only
//! errors when its task itself is lost.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use crate::orchestrator::Orchestrator;
use crate::strategy::ExecutionStrategy;
use crate::types::{Context, CoordinatedResponse};

/// One request in a batch.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub message: String,
    pub context: Context,
}

impl BatchRequest {
    pub fn new(message: impl Into<String>, context: Context) -> Self {
        Self {
            message: message.into(),
            context,
        }
    }
}

/// Result for one batch position.
#[derive(Debug, Clone, Serialize)]
pub struct BatchItem {
    /// Position in the input batch
    pub index: usize,

    pub elapsed_ms: u64,

    /// The coordinated response; absent only when the task was lost
    pub response: Option<CoordinatedResponse>,

    /// Task-level failure (panic or cancellation)
    pub error: Option<String>,
}

/// Order-preserving results for a whole batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub items: Vec<BatchItem>,

    /// Wall-clock time for the whole batch
    pub elapsed_ms: u64,
}

impl BatchOutcome {
    pub fn completed(&self) -> usize {
        self.items.iter().filter(|i| i.response.is_some()).count()
    }
}

pub struct BatchCoordinator;

impl BatchCoordinator {
    /// Run every request concurrently through the orchestrator.
    ///
    /// Per-responder concurrency is still bounded by the orchestrator's
    /// process-wide budget; the batch adds no budget of its own.
    pub async fn run(
        orchestrator: Arc<Orchestrator>,
        requests: Vec<BatchRequest>,
        strategy: Option<ExecutionStrategy>,
    ) -> BatchOutcome {
        let start = Instant::now();
        let total = requests.len();

        let handles: Vec<_> = requests
            .into_iter()
            .enumerate()
            .map(|(index, request)| {
                let orchestrator = orchestrator.clone();
                tokio::spawn(async move {
                    let item_start = Instant::now();
                    let response = orchestrator
                        .orchestrate(&request.message, request.context, strategy)
                        .await;
                    (index, item_start.elapsed().as_millis() as u64, response)
                })
            })
            .collect();

        // join_all yields results in spawn order, which is input order.
        let items: Vec<BatchItem> = join_all(handles)
            .await
            .into_iter()
            .enumerate()
            .map(|(index, joined)| match joined {
                Ok((index, elapsed_ms, response)) => BatchItem {
                    index,
                    elapsed_ms,
                    response: Some(response),
                    error: None,
                },
                Err(e) => {
                    warn!(index, error = %e, "Batch item task lost");
                    BatchItem {
                        index,
                        elapsed_ms: 0,
                        response: None,
                        error: Some(e.to_string()),
                    }
                }
            })
            .collect();

        let outcome = BatchOutcome {
            items,
            elapsed_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            total,
            completed = outcome.completed(),
            elapsed_ms = outcome.elapsed_ms,
            "Batch complete"
        );
        outcome
    }
}
