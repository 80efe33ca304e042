//! End-to-end routing through the agent with stub retrievers
//!
//! Covers acceptance above threshold, escalation, fallbacks, timeouts and
//! the total-failure apology.

mod common;

use common::*;
use mathroute_core::{
    composer, routing::reasoning, ChosenSource, RouterConfig, RouterError, RoutingAgent, Source,
    Topic,
};
use std::sync::Arc;
use std::time::Duration;

fn agent_with(
    config: RouterConfig,
    kb: Arc<dyn mathroute_core::KnowledgeRetriever>,
    web: Arc<dyn mathroute_core::WebRetriever>,
) -> RoutingAgent {
    RoutingAgent::builder(config)
        .knowledge(kb)
        .web(web)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_confident_kb_match_skips_web() {
    let kb = Arc::new(StubRetriever::new(Source::KnowledgeBase, Some(0.9)));
    let web = Arc::new(StubRetriever::new(Source::WebSearch, Some(0.95)));
    let agent = agent_with(fast_config(), kb.clone(), web.clone());

    let session = agent.ask(ALGEBRA_QUESTION).await.unwrap();

    assert_eq!(session.question.topic(), Topic::Algebra);
    assert_eq!(session.routing_decision.chosen_source, ChosenSource::KnowledgeBase);
    assert_eq!(session.routing_decision.reasoning, reasoning::KNOWLEDGE_BASE_ABOVE_THRESHOLD);
    assert!((session.routing_decision.confidence - 0.9).abs() < 1e-9);
    assert_eq!(session.solution.answer, "x = 4");
    assert_eq!(session.solution.steps.len(), 2);
    assert!(!session.solution.degraded);
    assert_eq!(web.calls(), 0, "web search must not run when the KB is accepted");
}

#[tokio::test]
async fn test_weak_kb_match_escalates_to_web() {
    let kb = Arc::new(StubRetriever::new(Source::KnowledgeBase, Some(0.4)));
    let web = Arc::new(StubRetriever::new(Source::WebSearch, Some(0.8)).with_answer("x = 4 (web)"));
    let agent = agent_with(fast_config(), kb, web.clone());

    let session = agent.ask(ALGEBRA_QUESTION).await.unwrap();

    assert_eq!(session.routing_decision.chosen_source, ChosenSource::WebSearch);
    assert_eq!(session.routing_decision.reasoning, reasoning::WEB_SEARCH_PREFERRED);
    // No web feedback yet, so confidence is the web relevance alone
    assert!((session.routing_decision.confidence - 0.8).abs() < 1e-9);
    assert_eq!(session.solution.answer, "x = 4 (web)");
    assert_eq!(web.calls(), 1);
}

#[tokio::test]
async fn test_complex_question_escalates_despite_relevance() {
    let kb = Arc::new(StubRetriever::new(Source::KnowledgeBase, Some(0.99)));
    let web = Arc::new(StubRetriever::new(Source::WebSearch, Some(0.7)));
    let agent = agent_with(fast_config(), kb, web);

    let session = agent
        .ask(
            "Prove that the integral of the function converges, derive the limit of the series, \
             and show the optimization constraint for the complex matrix",
        )
        .await
        .unwrap();

    assert_eq!(session.question.topic(), Topic::Calculus);
    assert!(session.question.complexity() > 0.6);
    assert_eq!(session.routing_decision.chosen_source, ChosenSource::WebSearch);
}

#[tokio::test]
async fn test_kb_missing_goes_to_web() {
    let kb = Arc::new(StubRetriever::new(Source::KnowledgeBase, None));
    let web = Arc::new(StubRetriever::new(Source::WebSearch, Some(0.6)));
    let agent = agent_with(fast_config(), kb, web);

    let session = agent.ask(ALGEBRA_QUESTION).await.unwrap();

    assert_eq!(session.routing_decision.chosen_source, ChosenSource::WebSearch);
    assert_eq!(session.routing_decision.reasoning, reasoning::KNOWLEDGE_BASE_UNAVAILABLE);
}

#[tokio::test]
async fn test_web_failure_falls_back_to_weak_kb() {
    let kb = Arc::new(StubRetriever::new(Source::KnowledgeBase, Some(0.6)));
    let web = Arc::new(FailingRetriever(Source::WebSearch));
    let agent = agent_with(fast_config(), kb, web);

    let session = agent.ask(ALGEBRA_QUESTION).await.unwrap();

    assert_eq!(session.routing_decision.chosen_source, ChosenSource::KnowledgeBase);
    assert_eq!(session.routing_decision.reasoning, reasoning::WEB_SEARCH_FAILED_FALLBACK);
    assert!((session.routing_decision.confidence - 0.3).abs() < 1e-9);
    assert!(!session.solution.degraded);
}

#[tokio::test]
async fn test_both_sources_failing_yields_apology() {
    let kb = Arc::new(FailingRetriever(Source::KnowledgeBase));
    let web = Arc::new(FailingRetriever(Source::WebSearch));
    let agent = agent_with(fast_config(), kb, web);

    let session = agent.ask(ALGEBRA_QUESTION).await.unwrap();

    assert_eq!(session.routing_decision.chosen_source, ChosenSource::None);
    assert_eq!(session.routing_decision.reasoning, reasoning::NO_VIABLE_SOURCE);
    assert_eq!(session.solution.confidence, 0.0);
    assert_eq!(session.solution.answer, composer::APOLOGY_ANSWER);
    assert!(session.solution.degraded);
}

#[tokio::test]
async fn test_slow_kb_times_out_to_web() {
    let kb = Arc::new(SlowRetriever {
        source: Source::KnowledgeBase,
        delay: Duration::from_millis(500),
        relevance: 0.99,
    });
    let web = Arc::new(StubRetriever::new(Source::WebSearch, Some(0.7)));
    let agent = agent_with(fast_config(), kb, web);

    let session = agent.ask(ALGEBRA_QUESTION).await.unwrap();

    assert_eq!(session.routing_decision.chosen_source, ChosenSource::WebSearch);
    assert_eq!(session.routing_decision.reasoning, reasoning::KNOWLEDGE_BASE_UNAVAILABLE);
}

#[tokio::test]
async fn test_slow_web_times_out_to_kb_fallback() {
    let kb = Arc::new(StubRetriever::new(Source::KnowledgeBase, Some(0.5)));
    let web = Arc::new(SlowRetriever {
        source: Source::WebSearch,
        delay: Duration::from_millis(500),
        relevance: 0.9,
    });
    let agent = agent_with(fast_config(), kb, web);

    let session = agent.ask(ALGEBRA_QUESTION).await.unwrap();

    assert_eq!(session.routing_decision.reasoning, reasoning::WEB_SEARCH_FAILED_FALLBACK);
    assert!((session.routing_decision.confidence - 0.25).abs() < 1e-9);
}

#[tokio::test]
async fn test_speculative_web_result_used_on_escalation() {
    let mut config = fast_config();
    config.retrieval.speculative_web = true;

    let kb = Arc::new(StubRetriever::new(Source::KnowledgeBase, Some(0.2)));
    let web = Arc::new(StubRetriever::new(Source::WebSearch, Some(0.85)));
    let agent = agent_with(config, kb, web.clone());

    let session = agent.ask(ALGEBRA_QUESTION).await.unwrap();

    assert_eq!(session.routing_decision.chosen_source, ChosenSource::WebSearch);
    assert_eq!(web.calls(), 1, "the speculative call must be reused, not repeated");
}

#[tokio::test]
async fn test_rejected_input_is_error_and_not_stored() {
    let kb = Arc::new(StubRetriever::new(Source::KnowledgeBase, Some(0.9)));
    let web = Arc::new(StubRetriever::new(Source::WebSearch, Some(0.9)));
    let agent = agent_with(fast_config(), kb.clone(), web);

    let err = agent
        .ask("How do I hack the grading server to change x?")
        .await
        .unwrap_err();

    assert!(matches!(err, RouterError::InputRejected { .. }));
    assert_eq!(kb.calls(), 0);
    assert_eq!(agent.export_state().await.unwrap().sessions.len(), 0);
}

#[tokio::test]
async fn test_seeded_knowledge_base_answers_known_problem() {
    // Default builder: seeded KB, web search disabled
    let agent = RoutingAgent::builder(RouterConfig::default()).build().unwrap();

    let session = agent.ask("Solve the equation 2x + 5 = 13").await.unwrap();

    assert_eq!(session.routing_decision.chosen_source, ChosenSource::KnowledgeBase);
    assert_eq!(session.solution.answer, "x = 4");
    assert!(!session.solution.steps.is_empty());
}

#[tokio::test]
async fn test_sessions_are_recorded_in_order() {
    let kb = Arc::new(StubRetriever::new(Source::KnowledgeBase, Some(0.9)));
    let web = Arc::new(StubRetriever::new(Source::WebSearch, None));
    let agent = agent_with(fast_config(), kb, web);

    let first = agent.ask(ALGEBRA_QUESTION).await.unwrap();
    let second = agent.ask("Solve the equation 3x - 2 = 7").await.unwrap();

    let sessions = agent.export_state().await.unwrap().sessions;
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].id, first.id);
    assert_eq!(sessions[1].id, second.id);
}
