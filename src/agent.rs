//! Routing agent: the core's public surface.
//!
//! Wires the analyzer, retrievers, routing engine, composer, guardrails,
//! session store and feedback learner together behind three operations:
//! [`RoutingAgent::ask`], [`RoutingAgent::submit_feedback`] and
//! [`RoutingAgent::get_insights`].

use crate::analysis::QueryAnalyzer;
use crate::composer;
use crate::config::RouterConfig;
use crate::error::{Result, RouterError};
use crate::guardrails::{GuardrailValidator, RuleGuardrails};
use crate::insights::{InsightsAggregator, LearningInsights};
use crate::learning::{FeedbackLearner, FeedbackOutcome, HeuristicTagger, ImprovementTagger};
use crate::performance::{InMemoryPerformanceStore, PerformanceSnapshot, PerformanceStore};
use crate::retrieval::{
    DisabledWebRetriever, HttpWebRetriever, InMemoryKnowledgeBase, KnowledgeRetriever,
    WebRetriever,
};
use crate::routing::{KbAssessment, RoutingDecisionEngine};
use crate::session::{InMemorySessionStore, SessionStore};
use crate::state::{StateFile, STATE_VERSION};
use crate::types::{
    ChosenSource, Feedback, RetrievalCandidate, Session, SessionId, Solution, Source,
};
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Routing agent
pub struct RoutingAgent {
    config: RouterConfig,
    analyzer: QueryAnalyzer,
    engine: RoutingDecisionEngine,
    knowledge: Arc<dyn KnowledgeRetriever>,
    web: Arc<dyn WebRetriever>,
    guardrails: Arc<dyn GuardrailValidator>,
    performance: Arc<dyn PerformanceStore>,
    sessions: Arc<dyn SessionStore>,
    learner: FeedbackLearner,
    insights: InsightsAggregator,
}

/// Builder for [`RoutingAgent`]
///
/// Unset collaborators fall back to in-memory stores, the rule guardrails,
/// the seeded (or configured) knowledge base and the configured web endpoint.
pub struct RoutingAgentBuilder {
    config: RouterConfig,
    knowledge: Option<Arc<dyn KnowledgeRetriever>>,
    web: Option<Arc<dyn WebRetriever>>,
    guardrails: Option<Arc<dyn GuardrailValidator>>,
    performance: Option<Arc<dyn PerformanceStore>>,
    sessions: Option<Arc<dyn SessionStore>>,
    tagger: Option<Arc<dyn ImprovementTagger>>,
    feedback_log: Vec<Feedback>,
}

impl RoutingAgentBuilder {
    pub fn knowledge(mut self, knowledge: Arc<dyn KnowledgeRetriever>) -> Self {
        self.knowledge = Some(knowledge);
        self
    }

    pub fn web(mut self, web: Arc<dyn WebRetriever>) -> Self {
        self.web = Some(web);
        self
    }

    pub fn guardrails(mut self, guardrails: Arc<dyn GuardrailValidator>) -> Self {
        self.guardrails = Some(guardrails);
        self
    }

    pub fn performance(mut self, performance: Arc<dyn PerformanceStore>) -> Self {
        self.performance = Some(performance);
        self
    }

    pub fn sessions(mut self, sessions: Arc<dyn SessionStore>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    pub fn tagger(mut self, tagger: Arc<dyn ImprovementTagger>) -> Self {
        self.tagger = Some(tagger);
        self
    }

    /// Restore sessions, feedback and performance from a state file
    pub fn restore(mut self, state: StateFile) -> Self {
        self.performance = Some(Arc::new(InMemoryPerformanceStore::from_snapshot(
            state.performance,
        )));
        self.sessions = Some(Arc::new(InMemorySessionStore::from_sessions(state.sessions)));
        self.feedback_log = state.feedback;
        self
    }

    pub fn build(self) -> Result<RoutingAgent> {
        let config = self.config;
        config.validate()?;

        let analyzer = QueryAnalyzer::new(&config.analysis.topic_rules)?;
        let engine = RoutingDecisionEngine::new(config.routing.clone());

        let knowledge = match self.knowledge {
            Some(knowledge) => knowledge,
            None => {
                let min_relevance = config.knowledge_base.min_relevance;
                let kb = match &config.knowledge_base.dataset_path {
                    Some(path) => InMemoryKnowledgeBase::from_file(path, min_relevance)?,
                    None => InMemoryKnowledgeBase::seeded(min_relevance),
                };
                Arc::new(kb) as Arc<dyn KnowledgeRetriever>
            }
        };

        let web = match self.web {
            Some(web) => web,
            None => match &config.retrieval.web_endpoint {
                Some(endpoint) => {
                    Arc::new(HttpWebRetriever::new(endpoint.clone(), &config.retrieval)?)
                        as Arc<dyn WebRetriever>
                }
                None => Arc::new(DisabledWebRetriever) as Arc<dyn WebRetriever>,
            },
        };

        let guardrails: Arc<dyn GuardrailValidator> = match self.guardrails {
            Some(guardrails) => guardrails,
            None => Arc::new(RuleGuardrails::new(&config.guardrails)),
        };
        let performance: Arc<dyn PerformanceStore> = match self.performance {
            Some(performance) => performance,
            None => Arc::new(InMemoryPerformanceStore::new()),
        };
        let sessions: Arc<dyn SessionStore> = match self.sessions {
            Some(sessions) => sessions,
            None => Arc::new(InMemorySessionStore::new()),
        };
        let tagger = self
            .tagger
            .unwrap_or_else(|| Arc::new(HeuristicTagger) as Arc<dyn ImprovementTagger>);

        let learner = FeedbackLearner::new(
            config.learning.clone(),
            config.routing.clone(),
            Arc::clone(&performance),
            Arc::clone(&sessions),
            tagger,
        )
        .with_log(self.feedback_log);

        Ok(RoutingAgent {
            config,
            analyzer,
            engine,
            knowledge,
            web,
            guardrails,
            performance,
            sessions,
            learner,
            insights: InsightsAggregator::default(),
        })
    }
}

impl RoutingAgent {
    pub fn builder(config: RouterConfig) -> RoutingAgentBuilder {
        RoutingAgentBuilder {
            config,
            knowledge: None,
            web: None,
            guardrails: None,
            performance: None,
            sessions: None,
            tagger: None,
            feedback_log: Vec::new(),
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Answer a question
    ///
    /// Only an input guardrail veto is an error for the caller; retrieval
    /// failures degrade into a fallback or an apology solution.
    pub async fn ask(&self, text: &str) -> Result<Session> {
        let validation = self.guardrails.validate_input(text);
        if !validation.accepted {
            warn!("Question rejected: {}", validation.warnings.join("; "));
            return Err(RouterError::InputRejected {
                warnings: validation.warnings,
            });
        }

        let question = self.analyzer.analyze(&validation.sanitized);
        let snapshot = self
            .performance
            .snapshot()
            .await
            .map_err(|e| self.internal("performance snapshot", e))?;

        let speculative = self
            .config
            .retrieval
            .speculative_web
            .then(|| self.spawn_web(&question));

        let kb = retrieve(
            Source::KnowledgeBase,
            self.config.retrieval.knowledge_base_timeout,
            self.knowledge.search(&question),
        )
        .await;

        let (decision, web) = match self.engine.assess_knowledge_base(&question, kb.as_ref(), &snapshot) {
            KbAssessment::Accept(decision) => {
                if let Some(handle) = speculative {
                    handle.abort();
                }
                (decision, None)
            }
            KbAssessment::Escalate(reason) => {
                debug!("Knowledge base insufficient: {}", reason);
                let web = match speculative {
                    Some(handle) => handle.await.unwrap_or_else(|e| {
                        warn!("Speculative web search task failed: {}", e);
                        None
                    }),
                    None => {
                        retrieve(
                            Source::WebSearch,
                            self.config.retrieval.web_search_timeout,
                            self.web.search(&question),
                        )
                        .await
                    }
                };
                let decision = self
                    .engine
                    .decide(&question, kb.as_ref(), web.as_ref(), &snapshot);
                (decision, web)
            }
        };

        let candidate = match decision.chosen_source {
            ChosenSource::KnowledgeBase => kb.as_ref(),
            ChosenSource::WebSearch => web.as_ref(),
            ChosenSource::None => None,
        };

        let solution = match candidate {
            Some(candidate) => self.checked(composer::compose(&decision, candidate), &decision),
            None if decision.chosen_source == ChosenSource::None => {
                warn!("No viable source for {} question", question.topic());
                composer::degraded(&decision)
            }
            None => {
                return Err(self.internal(
                    "compose",
                    RouterError::Internal(format!(
                        "decision chose {} without a candidate",
                        decision.chosen_source
                    )),
                ))
            }
        };

        let session = Session {
            id: SessionId::new(),
            question,
            routing_decision: decision,
            solution,
            input_warnings: validation.warnings,
            created_at: Utc::now(),
            feedback_received_at: None,
        };

        self.sessions
            .append(session.clone())
            .await
            .map_err(|e| self.internal("session append", e))?;

        info!(
            "Session {}: {} via {} (confidence {:.2}, {})",
            session.id,
            session.question.topic(),
            session.routing_decision.chosen_source,
            session.solution.confidence,
            session.routing_decision.reasoning
        );

        Ok(session)
    }

    /// Rate a session; returns the updated performance snapshot
    pub async fn submit_feedback(
        &self,
        session_id: SessionId,
        rating: u8,
        comments: Option<String>,
    ) -> Result<PerformanceSnapshot> {
        Ok(self
            .record_feedback(Feedback::new(session_id, rating, comments))
            .await?
            .snapshot)
    }

    /// Record fully specified feedback (structured evaluation, caller tags)
    pub async fn record_feedback(&self, feedback: Feedback) -> Result<FeedbackOutcome> {
        self.learner
            .record(feedback)
            .await
            .map_err(|e| self.client_or_internal("record feedback", e))
    }

    pub async fn get_insights(&self) -> Result<LearningInsights> {
        let history = self
            .sessions
            .list()
            .await
            .map_err(|e| self.internal("list sessions", e))?;
        let feedback = self.learner.feedback_log().await;
        let snapshot = self
            .performance
            .snapshot()
            .await
            .map_err(|e| self.internal("performance snapshot", e))?;

        Ok(self.insights.summarize(&history, &feedback, &snapshot))
    }

    /// Everything needed to restore this agent later
    pub async fn export_state(&self) -> Result<StateFile> {
        Ok(StateFile {
            version: STATE_VERSION,
            sessions: self.sessions.list().await?,
            feedback: self.learner.feedback_log().await,
            performance: self.performance.snapshot().await?,
        })
    }

    fn spawn_web(&self, question: &crate::types::Question) -> JoinHandle<Option<RetrievalCandidate>> {
        let web = Arc::clone(&self.web);
        let question = question.clone();
        let deadline = self.config.retrieval.web_search_timeout;

        tokio::spawn(async move { retrieve(Source::WebSearch, deadline, web.search(&question)).await })
    }

    /// Run output guardrails over a composed solution
    fn checked(&self, solution: Solution, decision: &crate::types::RoutingDecision) -> Solution {
        let validation = self.guardrails.validate_output(&solution);
        if !validation.accepted {
            warn!("Solution rejected: {}", validation.warnings.join("; "));
            return composer::output_rejected(decision, validation.warnings);
        }
        composer::with_output_warnings(
            solution,
            validation.warnings,
            self.config.guardrails.warning_penalty,
        )
    }

    fn client_or_internal(&self, operation: &str, err: RouterError) -> RouterError {
        if err.is_client_error() {
            err
        } else {
            self.internal(operation, err)
        }
    }

    fn internal(&self, operation: &str, err: RouterError) -> RouterError {
        error!("{} failed: {}", operation, err);
        RouterError::Internal(format!("{} failed", operation))
    }
}

/// Await one retrieval under a deadline; failures and timeouts become `None`
async fn retrieve<F>(source: Source, deadline: Duration, search: F) -> Option<RetrievalCandidate>
where
    F: Future<Output = Result<Option<RetrievalCandidate>>>,
{
    match tokio::time::timeout(deadline, search).await {
        Ok(Ok(candidate)) => candidate,
        Ok(Err(e)) => {
            warn!("{} retrieval failed: {}", source, e);
            None
        }
        Err(_) => {
            warn!("{} retrieval timed out after {:?}", source, deadline);
            None
        }
    }
}
