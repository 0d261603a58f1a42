//! Execution coordinator
//!
//! Runs the chosen responders under one process-wide concurrency budget with
//! a fixed per-call timeout. Responder-level failures are fully contained
//! here: a timed-out or failed call yields no entry and never aborts its
//! siblings. Only the "everything failed" case surfaces, as the trigger for
//! the deterministic fallback.
//!
//! A call that exceeds its timeout is abandoned: its future is dropped at
//! the deadline, so a late completion can never mutate a response that has
//! already been returned. Every call runs in its own task, sequential mode
//! included, so a panicking responder is contained like any other failure.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::ExecutionConfig;
use crate::error::{CoordinatorError, CoordinatorResult};
use crate::metrics::MetricsRecorder;
use crate::responder::Responder;
use crate::strategy::ExecutionStrategy;
use crate::types::{CallOutcome, Request, ResponderAnswer};

/// Tracks current and peak in-flight responder calls.
#[derive(Debug, Default)]
struct ConcurrencyGauge {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ConcurrencyGauge {
    /// Mark a call as running; the returned guard decrements on drop, so the
    /// gauge stays accurate even when the call unwinds.
    fn enter(&self) -> GaugeGuard<'_> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        GaugeGuard(self)
    }
}

struct GaugeGuard<'a>(&'a ConcurrencyGauge);

impl Drop for GaugeGuard<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct ExecutionCoordinator {
    /// Process-wide permit pool shared across all in-flight requests (W)
    permits: Arc<Semaphore>,
    call_timeout: Duration,
    max_collaborators: usize,
    gauge: Arc<ConcurrencyGauge>,
    metrics: Arc<MetricsRecorder>,
}

impl ExecutionCoordinator {
    pub fn new(config: &ExecutionConfig, metrics: Arc<MetricsRecorder>) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(config.concurrency_budget)),
            call_timeout: config.call_timeout(),
            max_collaborators: config.max_collaborators,
            gauge: Arc::new(ConcurrencyGauge::default()),
            metrics,
        }
    }

    /// Responder calls currently running.
    pub fn in_flight(&self) -> usize {
        self.gauge.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously running calls observed.
    pub fn peak_concurrency(&self) -> usize {
        self.gauge.peak.load(Ordering::SeqCst)
    }

    /// Execute the selected responders under the shared budget.
    ///
    /// Returns the surviving answers in selection order. Errs only when no
    /// call produced an answer.
    pub async fn execute(
        &self,
        responders: Vec<Arc<dyn Responder>>,
        request: &Request,
        strategy: ExecutionStrategy,
    ) -> CoordinatorResult<Vec<ResponderAnswer>> {
        if responders.is_empty() {
            return Err(CoordinatorError::NoCandidates);
        }

        let selected: Vec<Arc<dyn Responder>> = responders
            .into_iter()
            .take(self.max_collaborators)
            .collect();
        let attempted = selected.len();
        let request = Arc::new(request.clone());

        let answers: Vec<Option<ResponderAnswer>> = match strategy {
            // Sequential mode still spawns each call so a panicking responder
            // is contained instead of unwinding through the caller.
            ExecutionStrategy::Sequential => {
                let mut answers = Vec::with_capacity(attempted);
                for responder in selected {
                    let task = {
                        let coordinator = self.clone_handles();
                        let request = request.clone();
                        tokio::spawn(async move { coordinator.run_one(responder, request).await })
                    };
                    answers.push(match task.await {
                        Ok(answer) => answer,
                        Err(e) => {
                            warn!(request_id = %request.id, error = %e, "Responder task aborted");
                            None
                        }
                    });
                }
                answers
            }
            _ => {
                let handles: Vec<_> = selected
                    .into_iter()
                    .map(|responder| {
                        let coordinator = self.clone_handles();
                        let request = request.clone();
                        tokio::spawn(async move { coordinator.run_one(responder, request).await })
                    })
                    .collect();

                join_all(handles)
                    .await
                    .into_iter()
                    .map(|joined| match joined {
                        Ok(answer) => answer,
                        Err(e) => {
                            warn!(request_id = %request.id, error = %e, "Responder task aborted");
                            None
                        }
                    })
                    .collect()
            }
        };

        let answers: Vec<ResponderAnswer> = answers.into_iter().flatten().collect();
        if answers.is_empty() {
            return Err(CoordinatorError::AllResponsesFailed { attempted });
        }

        debug!(
            request_id = %request.id,
            attempted,
            survived = answers.len(),
            strategy = %strategy,
            "Execution complete"
        );
        Ok(answers)
    }

    /// Cheap clone of the shared handles for spawned tasks.
    fn clone_handles(&self) -> Self {
        Self {
            permits: self.permits.clone(),
            call_timeout: self.call_timeout,
            max_collaborators: self.max_collaborators,
            gauge: self.gauge.clone(),
            metrics: self.metrics.clone(),
        }
    }

    /// Run one responder call: permit, timeout, outcome.
    async fn run_one(
        &self,
        responder: Arc<dyn Responder>,
        request: Arc<Request>,
    ) -> Option<ResponderAnswer> {
        // A closed semaphore only happens at teardown; treat as a failed call.
        let _permit = match self.permits.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                warn!(responder = responder.id(), "Permit pool closed");
                return None;
            }
        };

        let running = self.gauge.enter();
        let result = timeout(self.call_timeout, responder.respond(&request)).await;
        drop(running);

        let (outcome, answer) = match result {
            Ok(Ok(answer)) => (CallOutcome::Completed, Some(answer)),
            Ok(Err(e)) => {
                warn!(responder = responder.id(), error = %e, "Responder call failed");
                (CallOutcome::Failed, None)
            }
            Err(_) => {
                warn!(
                    responder = responder.id(),
                    timeout_ms = self.call_timeout.as_millis() as u64,
                    "Responder call timed out, abandoning"
                );
                (CallOutcome::TimedOut, None)
            }
        };

        self.metrics.record_call_outcome(outcome);
        debug!(
            request_id = %request.id,
            responder = responder.id(),
            outcome = ?outcome,
            "Responder call finished"
        );
        answer
    }
}
