//! Top-level orchestrator
//!
//! Owns the full pipeline: cache check, relevance routing, collaboration
//! decision, budgeted execution, aggregation, and the deterministic
//! fallback. The public entry point never returns an error; any internal
//! failure degrades to the fallback response so callers always receive a
//! structurally valid answer.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::aggregator::ResponseAggregator;
use crate::batch::{BatchCoordinator, BatchOutcome, BatchRequest};
use crate::cache::ResponseCache;
use crate::collaboration::CollaborationDecider;
use crate::config::OrchestratorConfig;
use crate::coordinator::ExecutionCoordinator;
use crate::error::{CoordinatorError, OrchestrationError};
use crate::metrics::{ExecutionMetrics, MetricsRecorder};
use crate::responder::{Responder, ResponderRegistry, ResponderStatus};
use crate::router::RelevanceRouter;
use crate::strategy::{ExecutionStrategy, StrategySelector};
use crate::types::{
    Context, CoordinatedResponse, Request, RequestPhase, ResponderAnswer,
};

pub struct Orchestrator {
    config: OrchestratorConfig,
    registry: ResponderRegistry,
    router: RelevanceRouter,
    decider: CollaborationDecider,
    selector: StrategySelector,
    coordinator: ExecutionCoordinator,
    aggregator: ResponseAggregator,
    cache: ResponseCache,
    metrics: Arc<MetricsRecorder>,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig) -> Self {
        let metrics = Arc::new(MetricsRecorder::new());
        let router = RelevanceRouter::new(&config.router);
        let decider = CollaborationDecider::new(&config.collaboration);
        let selector = StrategySelector::new(&config.strategy);
        let coordinator = ExecutionCoordinator::new(&config.execution, metrics.clone());
        let aggregator = ResponseAggregator::new(&config.aggregation, &config.score);
        let cache = ResponseCache::new(&config.cache);

        Self {
            config,
            registry: ResponderRegistry::new(),
            router,
            decider,
            selector,
            coordinator,
            aggregator,
            cache,
            metrics,
        }
    }

    /// Register a responder. Re-registering an id replaces the previous
    /// responder in place.
    pub fn register(&mut self, responder: Arc<dyn Responder>) {
        info!(responder = responder.id(), domain = responder.domain(), "Responder registered");
        self.registry.register(responder);
    }

    pub fn responder_statuses(&self) -> Vec<ResponderStatus> {
        self.registry.statuses()
    }

    /// Handle one request end to end. Never returns an error: every failure
    /// path degrades to the deterministic fallback response.
    pub async fn orchestrate(
        &self,
        message: &str,
        context: Context,
        strategy: Option<ExecutionStrategy>,
    ) -> CoordinatedResponse {
        self.orchestrate_request(Request::new(message, context), strategy)
            .await
    }

    /// [`orchestrate`](Self::orchestrate) over a caller-built request, for
    /// callers that attach a session id.
    pub async fn orchestrate_request(
        &self,
        request: Request,
        strategy: Option<ExecutionStrategy>,
    ) -> CoordinatedResponse {
        let start = Instant::now();
        let resolved = self
            .selector
            .resolve(strategy.unwrap_or(ExecutionStrategy::Adaptive), &request.message);

        info!(
            request_id = %request.id,
            phase = %RequestPhase::Received,
            strategy = %resolved,
            words = request.word_count(),
            "Request received"
        );
        self.metrics.record_request(resolved);

        debug!(request_id = %request.id, phase = %RequestPhase::CacheCheck, "Checking cache");
        if let Some(hit) = self
            .cache
            .lookup(&request.message, &request.context, resolved.as_str())
            .await
        {
            self.metrics.record_cache(true);
            self.metrics.record_latency(start.elapsed());
            info!(
                request_id = %request.id,
                phase = %RequestPhase::Responded,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Served from cache"
            );
            return hit;
        }
        self.metrics.record_cache(false);

        let response = match self.run(&request, resolved).await {
            Ok(response) => response,
            Err(OrchestrationError::Coordinator(CoordinatorError::NoCandidates)) => {
                debug!(request_id = %request.id, phase = %RequestPhase::Fallback, "No qualifying responder");
                self.fallback_response()
            }
            Err(OrchestrationError::Coordinator(CoordinatorError::AllResponsesFailed {
                attempted,
            })) => {
                warn!(
                    request_id = %request.id,
                    phase = %RequestPhase::Fallback,
                    attempted,
                    "Every responder call failed"
                );
                self.fallback_response()
            }
            Err(e) => {
                error!(request_id = %request.id, error = %e, "Pipeline error, degrading to fallback");
                self.metrics.record_internal_error();
                self.fallback_response()
            }
        };

        if response.fallback {
            self.metrics.record_fallback();
        }
        self.cache
            .record(&request.message, &request.context, resolved.as_str(), &response)
            .await;
        self.metrics.record_latency(start.elapsed());

        info!(
            request_id = %request.id,
            phase = %RequestPhase::Responded,
            primary = %response.primary.responder_id,
            merged = response.merged_count(),
            fallback = response.fallback,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Request complete"
        );
        response
    }

    /// Handle a batch of requests concurrently; results come back in input
    /// order regardless of completion order.
    pub async fn orchestrate_batch(
        self: &Arc<Self>,
        requests: Vec<BatchRequest>,
        strategy: Option<ExecutionStrategy>,
    ) -> BatchOutcome {
        BatchCoordinator::run(self.clone(), requests, strategy).await
    }

    /// Point-in-time metrics snapshot.
    pub fn metrics(&self) -> ExecutionMetrics {
        self.metrics
            .snapshot(self.coordinator.in_flight(), self.coordinator.peak_concurrency())
    }

    /// Remove cached responses whose normalized message contains the
    /// pattern, or all of them when `None`. Returns the number removed.
    pub async fn clear_cache(&self, pattern: Option<&str>) -> usize {
        self.cache.clear(pattern).await
    }

    /// Pre-populate the cache by running the seed requests through the full
    /// pipeline. Returns how many seeds are cached afterwards.
    pub async fn warm_cache(&self, seeds: Vec<BatchRequest>) -> usize {
        let mut warmed = 0;
        for seed in seeds {
            self.orchestrate(&seed.message, seed.context.clone(), None).await;

            let resolved = self.selector.select(&seed.message);
            if self
                .cache
                .lookup(&seed.message, &seed.context, resolved.as_str())
                .await
                .is_some()
            {
                warmed += 1;
            }
        }
        debug!(warmed, "Cache warm-up complete");
        warmed
    }

    /// Route, decide, execute, aggregate.
    async fn run(
        &self,
        request: &Request,
        strategy: ExecutionStrategy,
    ) -> Result<CoordinatedResponse, OrchestrationError> {
        match strategy {
            ExecutionStrategy::Pipeline => self.run_pipeline(request).await,
            _ => self.run_stages(request, strategy, false).await,
        }
    }

    /// Staged pipeline execution: same stages, with per-stage timing logged
    /// for the long analytical requests routed here.
    async fn run_pipeline(&self, request: &Request) -> Result<CoordinatedResponse, OrchestrationError> {
        let stage = Instant::now();
        let domains = self.selector.detected_domains(&request.message);
        debug!(
            request_id = %request.id,
            stage = "analyze",
            words = request.word_count(),
            detected_domains = domains,
            elapsed_us = stage.elapsed().as_micros() as u64,
            "Pipeline stage complete"
        );

        self.run_stages(request, ExecutionStrategy::Pipeline, true).await
    }

    async fn run_stages(
        &self,
        request: &Request,
        strategy: ExecutionStrategy,
        staged: bool,
    ) -> Result<CoordinatedResponse, OrchestrationError> {
        let stage = Instant::now();
        debug!(request_id = %request.id, phase = %RequestPhase::Routing, "Routing");
        let candidates = self.router.route(&self.registry, request).await;
        if staged {
            debug!(
                request_id = %request.id,
                stage = "route",
                candidates = candidates.len(),
                elapsed_us = stage.elapsed().as_micros() as u64,
                "Pipeline stage complete"
            );
        }
        if candidates.is_empty() {
            return Err(CoordinatorError::NoCandidates.into());
        }

        let stage = Instant::now();
        debug!(request_id = %request.id, phase = %RequestPhase::CollabDecision, "Deciding collaboration");
        let decision = self.decider.decide(&request.message, &candidates);
        let topic = decision.topic().map(str::to_string);
        if staged {
            debug!(
                request_id = %request.id,
                stage = "process",
                collaboration = decision.is_collaboration(),
                elapsed_us = stage.elapsed().as_micros() as u64,
                "Pipeline stage complete"
            );
        }

        let selected: Vec<Arc<dyn Responder>> = decision
            .selected()
            .iter()
            .filter_map(|candidate| {
                let found = self.registry.get(&candidate.responder_id);
                if found.is_none() {
                    // Registration changed between routing and execution.
                    warn!(responder = %candidate.responder_id, "Selected responder no longer registered");
                }
                found
            })
            .collect();

        let stage = Instant::now();
        debug!(request_id = %request.id, phase = %RequestPhase::Executing, "Executing");
        let answers = self.coordinator.execute(selected, request, strategy).await?;
        if staged {
            debug!(
                request_id = %request.id,
                stage = "coordinate",
                survived = answers.len(),
                elapsed_us = stage.elapsed().as_micros() as u64,
                "Pipeline stage complete"
            );
        }

        debug!(request_id = %request.id, phase = %RequestPhase::Aggregating, "Aggregating");
        let response = self
            .aggregator
            .aggregate(answers, topic)
            .ok_or_else(|| OrchestrationError::Internal("no answers to aggregate".to_string()))?;

        // Answers are consumed here; only the coordinated response survives.
        Ok(response)
    }

    /// The deterministic degraded response.
    fn fallback_response(&self) -> CoordinatedResponse {
        let f = &self.config.fallback;
        let answer = ResponderAnswer::new(&f.responder_id, &f.domain, &f.text, f.confidence);
        let mut response = CoordinatedResponse::from_primary(answer);
        response.fallback = true;
        response.narrative =
            "No specialist matched this request; general guidance applies.".to_string();
        response
    }
}
