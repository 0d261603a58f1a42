//! Execution metrics
//!
//! Cheap process-local counters updated on the request path and read out as
//! a point-in-time [`ExecutionMetrics`] snapshot. Counters are monotonic;
//! latency is averaged over a rolling window so long-running processes do
//! not drift toward ancient history.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;
use tracing::warn;

use crate::strategy::ExecutionStrategy;
use crate::types::CallOutcome;

/// Rolling latency window length.
const LATENCY_WINDOW: usize = 256;

/// Point-in-time metrics snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionMetrics {
    pub total_requests: u64,

    /// Requests by resolved (concrete) strategy
    pub requests_by_strategy: HashMap<String, u64>,

    pub cache_hits: u64,
    pub cache_misses: u64,

    /// Responder calls that returned an error
    pub responder_failures: u64,

    /// Responder calls abandoned at the deadline
    pub responder_timeouts: u64,

    /// Requests answered by the deterministic fallback
    pub fallbacks: u64,

    /// Unexpected pipeline errors converted into fallbacks
    pub internal_errors: u64,

    /// Mean end-to-end latency over the rolling window, in milliseconds
    pub avg_latency_ms: f64,

    /// Responder calls currently running
    pub in_flight: usize,

    /// Highest concurrent responder-call count observed
    pub peak_concurrency: usize,
}

/// Shared recorder updated from the request path.
#[derive(Default)]
pub struct MetricsRecorder {
    total_requests: AtomicU64,
    sequential: AtomicU64,
    parallel: AtomicU64,
    pipeline: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    responder_failures: AtomicU64,
    responder_timeouts: AtomicU64,
    fallbacks: AtomicU64,
    internal_errors: AtomicU64,
    latencies_ms: Mutex<VecDeque<u64>>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a request under its resolved strategy.
    pub fn record_request(&self, strategy: ExecutionStrategy) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        match strategy {
            ExecutionStrategy::Sequential => self.sequential.fetch_add(1, Ordering::Relaxed),
            ExecutionStrategy::Parallel => self.parallel.fetch_add(1, Ordering::Relaxed),
            ExecutionStrategy::Pipeline => self.pipeline.fetch_add(1, Ordering::Relaxed),
            // Adaptive is resolved before execution; only the total moves.
            ExecutionStrategy::Adaptive => 0,
        };
    }

    pub fn record_cache(&self, hit: bool) {
        if hit {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.cache_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_call_outcome(&self, outcome: CallOutcome) {
        match outcome {
            CallOutcome::Completed => {}
            CallOutcome::Failed => {
                self.responder_failures.fetch_add(1, Ordering::Relaxed);
            }
            CallOutcome::TimedOut => {
                self.responder_timeouts.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn record_fallback(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_internal_error(&self) {
        self.internal_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_latency(&self, elapsed: Duration) {
        match self.latencies_ms.lock() {
            Ok(mut window) => {
                if window.len() == LATENCY_WINDOW {
                    window.pop_front();
                }
                window.push_back(elapsed.as_millis() as u64);
            }
            Err(_) => warn!("Latency window lock poisoned; sample dropped"),
        }
    }

    /// Snapshot the counters along with the coordinator's concurrency gauge.
    pub fn snapshot(&self, in_flight: usize, peak_concurrency: usize) -> ExecutionMetrics {
        let mut requests_by_strategy = HashMap::new();
        requests_by_strategy.insert(
            ExecutionStrategy::Sequential.as_str().to_string(),
            self.sequential.load(Ordering::Relaxed),
        );
        requests_by_strategy.insert(
            ExecutionStrategy::Parallel.as_str().to_string(),
            self.parallel.load(Ordering::Relaxed),
        );
        requests_by_strategy.insert(
            ExecutionStrategy::Pipeline.as_str().to_string(),
            self.pipeline.load(Ordering::Relaxed),
        );

        let avg_latency_ms = match self.latencies_ms.lock() {
            Ok(window) if !window.is_empty() => {
                window.iter().sum::<u64>() as f64 / window.len() as f64
            }
            _ => 0.0,
        };

        ExecutionMetrics {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            requests_by_strategy,
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            responder_failures: self.responder_failures.load(Ordering::Relaxed),
            responder_timeouts: self.responder_timeouts.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
            internal_errors: self.internal_errors.load(Ordering::Relaxed),
            avg_latency_ms,
            in_flight,
            peak_concurrency,
        }
    }
}
