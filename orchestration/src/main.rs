use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use orchestration::{
    Context, KeywordRelevance, KeywordResponder, Orchestrator, OrchestratorConfig,
};

fn advisor(id: &str, domain: &str, keywords: &[&str], recs: &[&str]) -> Arc<KeywordResponder> {
    Arc::new(
        KeywordResponder::new(id, domain, Box::new(KeywordRelevance::new(keywords)))
            .with_recommendations(recs),
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => OrchestratorConfig::load(&path)?,
        None => OrchestratorConfig::default(),
    };

    let mut orchestrator = Orchestrator::new(config);
    orchestrator.register(advisor(
        "financial_advisor",
        "financial",
        &["revenue", "cost", "pricing", "profit", "cash", "budget"],
        &["Review pricing tiers", "Cut discretionary spend"],
    ));
    orchestrator.register(advisor(
        "marketing_advisor",
        "marketing",
        &["marketing", "brand", "campaign", "audience", "promotion"],
        &["Launch a referral campaign", "Refresh the brand messaging"],
    ));
    orchestrator.register(advisor(
        "operations_advisor",
        "operations",
        &["hiring", "process", "workflow", "staffing", "logistics"],
        &["Document the onboarding process"],
    ));
    orchestrator.register(advisor(
        "strategy_advisor",
        "strategy",
        &["strategy", "roadmap", "expansion", "competition", "pivot"],
        &["Write down a twelve-month roadmap"],
    ));

    let demo_requests = [
        "How can I increase my revenue and improve my marketing?",
        "What should our hiring workflow look like?",
        "How can I increase my revenue and improve my marketing?",
        "hi",
    ];
    for message in demo_requests {
        let response = orchestrator.orchestrate(message, Context::new(), None).await;
        println!("{}", serde_json::to_string_pretty(&response)?);
    }

    let metrics = orchestrator.metrics();
    info!(
        total = metrics.total_requests,
        cache_hits = metrics.cache_hits,
        fallbacks = metrics.fallbacks,
        "Demo complete"
    );
    Ok(())
}
