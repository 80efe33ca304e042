//! Core data types for the mathroute routing core
//!
//! Questions, retrieval candidates, routing decisions, solutions, sessions and
//! feedback. These types flow between the analyzer, the routing engine, the
//! composer and the feedback learner.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for ask sessions
///
/// Wraps a UUID so session IDs cannot be mixed up with other identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Create a new random session ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a session ID from a string
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coarse mathematical category used for rules and performance buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Algebra,
    Calculus,
    Geometry,
    Trigonometry,
    Statistics,
    LinearAlgebra,
    Other,
}

impl Topic {
    /// All topics in declaration order
    pub const ALL: [Topic; 7] = [
        Topic::Algebra,
        Topic::Calculus,
        Topic::Geometry,
        Topic::Trigonometry,
        Topic::Statistics,
        Topic::LinearAlgebra,
        Topic::Other,
    ];
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Topic::Algebra => write!(f, "algebra"),
            Topic::Calculus => write!(f, "calculus"),
            Topic::Geometry => write!(f, "geometry"),
            Topic::Trigonometry => write!(f, "trigonometry"),
            Topic::Statistics => write!(f, "statistics"),
            Topic::LinearAlgebra => write!(f, "linear_algebra"),
            Topic::Other => write!(f, "other"),
        }
    }
}

impl std::str::FromStr for Topic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "algebra" => Ok(Topic::Algebra),
            "calculus" => Ok(Topic::Calculus),
            "geometry" => Ok(Topic::Geometry),
            "trigonometry" => Ok(Topic::Trigonometry),
            "statistics" => Ok(Topic::Statistics),
            "linear_algebra" => Ok(Topic::LinearAlgebra),
            "other" => Ok(Topic::Other),
            _ => Err(format!("Unknown topic: {}", s)),
        }
    }
}

/// A retrieval source that can answer a question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    KnowledgeBase,
    WebSearch,
}

impl Source {
    /// The other retrieval source
    pub fn other(self) -> Source {
        match self {
            Source::KnowledgeBase => Source::WebSearch,
            Source::WebSearch => Source::KnowledgeBase,
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::KnowledgeBase => write!(f, "knowledge_base"),
            Source::WebSearch => write!(f, "web_search"),
        }
    }
}

/// Source chosen by a routing decision
///
/// `None` means neither retriever produced a usable candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChosenSource {
    KnowledgeBase,
    WebSearch,
    None,
}

impl ChosenSource {
    /// The retrieval source, if any
    pub fn source(self) -> Option<Source> {
        match self {
            ChosenSource::KnowledgeBase => Some(Source::KnowledgeBase),
            ChosenSource::WebSearch => Some(Source::WebSearch),
            ChosenSource::None => None,
        }
    }
}

impl From<Source> for ChosenSource {
    fn from(source: Source) -> Self {
        match source {
            Source::KnowledgeBase => ChosenSource::KnowledgeBase,
            Source::WebSearch => ChosenSource::WebSearch,
        }
    }
}

impl std::fmt::Display for ChosenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChosenSource::KnowledgeBase => write!(f, "knowledge_base"),
            ChosenSource::WebSearch => write!(f, "web_search"),
            ChosenSource::None => write!(f, "none"),
        }
    }
}

/// An analyzed question
///
/// Immutable once built: fields are only readable through accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    text: String,
    topic: Topic,
    complexity: f64,
}

impl Question {
    /// Build an analyzed question; complexity is clamped to [0, 1]
    pub fn new(text: impl Into<String>, topic: Topic, complexity: f64) -> Self {
        Self {
            text: text.into(),
            topic,
            complexity: complexity.clamp(0.0, 1.0),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    pub fn complexity(&self) -> f64 {
        self.complexity
    }
}

/// Opaque solution content produced by a retriever
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidatePayload {
    pub answer: String,

    /// Worked steps in pedagogical order
    #[serde(default)]
    pub steps: Option<Vec<String>>,

    pub explanation: String,

    /// Where the content came from (URLs, dataset entry IDs)
    #[serde(default)]
    pub references: Vec<String>,
}

/// Best match returned by a retriever
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalCandidate {
    pub source: Source,

    /// Retriever-reported relevance in [0, 1]
    pub relevance: f64,

    pub payload: CandidatePayload,
}

impl RetrievalCandidate {
    pub fn new(source: Source, relevance: f64, payload: CandidatePayload) -> Self {
        Self {
            source,
            relevance: relevance.clamp(0.0, 1.0),
            payload,
        }
    }
}

/// The routing engine's choice for one question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub chosen_source: ChosenSource,

    /// Trust estimate in [0, 1]
    pub confidence: f64,

    /// Short machine-readable rationale (e.g. "knowledge_base_unavailable")
    pub reasoning: String,

    pub topic: Topic,

    /// Effective knowledge-base threshold used for this decision
    pub effective_threshold: f64,

    pub decided_at: DateTime<Utc>,
}

/// Canonical step-by-step solution delivered to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub answer: String,

    /// Ordered steps, empty when none were available
    pub steps: Vec<String>,

    pub explanation: String,

    pub confidence: f64,

    pub source: ChosenSource,

    /// True for apology or safe-fallback payloads
    #[serde(default)]
    pub degraded: bool,

    /// Guardrail warnings attached to the delivered solution
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// One ask/answer interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub question: Question,
    pub routing_decision: RoutingDecision,
    pub solution: Solution,

    #[serde(default)]
    pub input_warnings: Vec<String>,

    pub created_at: DateTime<Utc>,

    /// Set once when feedback for this session is accepted
    #[serde(default)]
    pub feedback_received_at: Option<DateTime<Utc>>,
}

/// Optional structured evaluation of a delivered solution, scores in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub accuracy: f64,
    pub clarity: f64,
    pub completeness: f64,
}

impl Evaluation {
    pub fn overall(&self) -> f64 {
        (self.accuracy + self.clarity + self.completeness) / 3.0
    }

    /// Name of the first score that is not a finite value in [0, 1]
    pub fn invalid_score(&self) -> Option<&'static str> {
        [
            ("accuracy", self.accuracy),
            ("clarity", self.clarity),
            ("completeness", self.completeness),
        ]
        .into_iter()
        .find(|(_, score)| !(score.is_finite() && (0.0..=1.0).contains(score)))
        .map(|(name, _)| name)
    }
}

/// A human rating of one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub session_id: SessionId,

    /// 1 (poor) to 5 (excellent)
    pub rating: u8,

    #[serde(default)]
    pub comments: Option<String>,

    #[serde(default)]
    pub evaluation: Option<Evaluation>,

    /// Improvement tags assigned by the tagging collaborator
    #[serde(default)]
    pub tags: Vec<String>,

    pub created_at: DateTime<Utc>,
}

impl Feedback {
    pub fn new(session_id: SessionId, rating: u8, comments: Option<String>) -> Self {
        Self {
            session_id,
            rating,
            comments,
            evaluation: None,
            tags: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_evaluation(mut self, evaluation: Evaluation) -> Self {
        self.evaluation = Some(evaluation);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_roundtrip_names() {
        for topic in Topic::ALL {
            let parsed: Topic = topic.to_string().parse().unwrap();
            assert_eq!(parsed, topic);
        }
        assert!("numerology".parse::<Topic>().is_err());
    }

    #[test]
    fn test_topic_serializes_snake_case() {
        let json = serde_json::to_string(&Topic::LinearAlgebra).unwrap();
        assert_eq!(json, "\"linear_algebra\"");
    }

    #[test]
    fn test_question_complexity_clamped() {
        let q = Question::new("x", Topic::Algebra, 1.7);
        assert_eq!(q.complexity(), 1.0);
        let q = Question::new("x", Topic::Algebra, -0.2);
        assert_eq!(q.complexity(), 0.0);
    }

    #[test]
    fn test_candidate_relevance_clamped() {
        let c = RetrievalCandidate::new(Source::WebSearch, 1.3, CandidatePayload::default());
        assert_eq!(c.relevance, 1.0);
    }

    #[test]
    fn test_chosen_source_mapping() {
        assert_eq!(ChosenSource::from(Source::WebSearch), ChosenSource::WebSearch);
        assert_eq!(ChosenSource::KnowledgeBase.source(), Some(Source::KnowledgeBase));
        assert_eq!(ChosenSource::None.source(), None);
        assert_eq!(Source::KnowledgeBase.other(), Source::WebSearch);
    }

    #[test]
    fn test_evaluation_score_bounds() {
        let ok = Evaluation {
            accuracy: 1.0,
            clarity: 0.0,
            completeness: 0.5,
        };
        assert_eq!(ok.invalid_score(), None);

        let nan = Evaluation {
            clarity: f64::NAN,
            ..ok
        };
        assert_eq!(nan.invalid_score(), Some("clarity"));

        let high = Evaluation {
            accuracy: 7.5,
            ..ok
        };
        assert_eq!(high.invalid_score(), Some("accuracy"));
    }

    #[test]
    fn test_session_id_parse() {
        let id = SessionId::new();
        let parsed = SessionId::from_string(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
        assert!(SessionId::from_string("not-a-uuid").is_err());
    }
}
