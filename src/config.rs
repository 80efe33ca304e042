// Router Configuration
//
// Thresholds, learning rates, retrieval timeouts and guardrail limits for the
// routing core. Loaded from TOML, optionally layered with MATHROUTE__*
// environment overrides.

use crate::analysis::topic_rules::{default_topic_rules, TopicRule};
use crate::types::{Source, Topic};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable prefix for layered overrides
pub const ENV_PREFIX: &str = "MATHROUTE";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to layer config sources: {0}")]
    LayerError(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main router configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RouterConfig {
    pub routing: RoutingConfig,
    pub learning: LearningConfig,
    pub retrieval: RetrievalConfig,
    pub guardrails: GuardrailConfig,
    pub analysis: AnalysisConfig,
    pub knowledge_base: KnowledgeBaseConfig,
}

/// Per-topic routing policy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TopicPolicy {
    /// Base relevance the knowledge base must reach (before feedback adjustment)
    pub base_threshold: f64,

    /// Highest complexity the knowledge base may answer on its own
    pub max_complexity: f64,
}

/// Override of the default policy for one topic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicOverride {
    pub topic: Topic,
    #[serde(flatten)]
    pub policy: TopicPolicy,
}

/// Linear relevance calibration applied before cross-source comparison
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub scale: f64,
    pub offset: f64,
}

impl Calibration {
    pub fn apply(&self, relevance: f64) -> f64 {
        (relevance * self.scale + self.offset).clamp(0.0, 1.0)
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset: 0.0,
        }
    }
}

/// Routing decision configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Lower bound of the effective threshold
    pub min_threshold: f64,

    /// Upper bound of the effective threshold
    pub max_threshold: f64,

    /// Relevance band inside which historical ratings break the tie
    pub tie_epsilon: f64,

    /// Confidence multiplier when the knowledge base is used as a fallback
    pub degradation_factor: f64,

    /// Weight of raw web relevance vs. historical rating in web confidence
    pub web_relevance_weight: f64,

    /// Policy for topics without an override
    pub default_policy: TopicPolicy,

    pub topics: Vec<TopicOverride>,

    pub knowledge_base_calibration: Calibration,

    pub web_search_calibration: Calibration,
}

impl RoutingConfig {
    /// Policy for a topic, falling back to the default policy
    pub fn policy(&self, topic: Topic) -> TopicPolicy {
        self.topics
            .iter()
            .find(|o| o.topic == topic)
            .map(|o| o.policy)
            .unwrap_or(self.default_policy)
    }

    pub fn calibration(&self, source: Source) -> Calibration {
        match source {
            Source::KnowledgeBase => self.knowledge_base_calibration,
            Source::WebSearch => self.web_search_calibration,
        }
    }

    /// Range an adjustment may take so that base + adjustment stays in bounds
    pub fn adjustment_bounds(&self, topic: Topic) -> (f64, f64) {
        let base = self.policy(topic).base_threshold;
        (self.min_threshold - base, self.max_threshold - base)
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            min_threshold: 0.5,
            max_threshold: 0.95,
            tie_epsilon: 0.05,
            degradation_factor: 0.5,
            web_relevance_weight: 0.7,
            default_policy: TopicPolicy {
                base_threshold: 0.75,
                max_complexity: 0.6,
            },
            topics: vec![
                TopicOverride {
                    topic: Topic::Algebra,
                    policy: TopicPolicy {
                        base_threshold: 0.75,
                        max_complexity: 0.7,
                    },
                },
                TopicOverride {
                    topic: Topic::Geometry,
                    policy: TopicPolicy {
                        base_threshold: 0.75,
                        max_complexity: 0.7,
                    },
                },
                TopicOverride {
                    topic: Topic::Other,
                    policy: TopicPolicy {
                        base_threshold: 0.8,
                        max_complexity: 0.5,
                    },
                },
            ],
            knowledge_base_calibration: Calibration::default(),
            web_search_calibration: Calibration::default(),
        }
    }
}

/// Feedback learning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// EMA decay for avg_rating / avg_confidence, in (0, 1)
    pub ema_alpha: f64,

    /// Rating gap between sources that triggers a threshold move
    pub rating_gap: f64,

    /// Threshold move per feedback event
    pub adjustment_step: f64,

    /// Attempts at the compare-and-update before giving up
    pub max_update_retries: u32,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            ema_alpha: 0.2,
            rating_gap: 0.5,
            adjustment_step: 0.02,
            max_update_retries: 8,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Per-call timeout for the knowledge base (in milliseconds)
    #[serde(with = "serde_millis")]
    pub knowledge_base_timeout: Duration,

    /// Per-call timeout for web search (in milliseconds)
    #[serde(with = "serde_millis")]
    pub web_search_timeout: Duration,

    /// Issue the web call in parallel with the knowledge-base call
    pub speculative_web: bool,

    /// Search endpoint base URL; web search is disabled when unset
    pub web_endpoint: Option<String>,

    pub web_max_results: usize,

    /// Domains web results must come from (empty = any)
    pub allowed_domains: Vec<String>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            knowledge_base_timeout: Duration::from_millis(2_000),
            web_search_timeout: Duration::from_millis(10_000),
            speculative_web: false,
            web_endpoint: None,
            web_max_results: 3,
            allowed_domains: vec![
                "khanacademy.org".to_string(),
                "mathworld.wolfram.com".to_string(),
                "brilliant.org".to_string(),
                "math.stackexchange.com".to_string(),
                "purplemath.com".to_string(),
                "mathsisfun.com".to_string(),
            ],
        }
    }
}

/// Guardrail configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardrailConfig {
    pub max_input_length: usize,
    pub max_output_length: usize,

    /// Confidence lost per output warning
    pub warning_penalty: f64,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            max_input_length: 1000,
            max_output_length: 2000,
            warning_penalty: 0.05,
        }
    }
}

/// Query analysis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Ordered topic rules; the first matching rule wins
    pub topic_rules: Vec<TopicRule>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            topic_rules: default_topic_rules(),
        }
    }
}

/// Knowledge base configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeBaseConfig {
    /// JSON dataset replacing the built-in problems
    pub dataset_path: Option<PathBuf>,

    /// Matches below this relevance are not returned
    pub min_relevance: f64,
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            dataset_path: None,
            min_relevance: 0.1,
        }
    }
}

// Custom serde module for Duration (serialize/deserialize as milliseconds)
mod serde_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

impl RouterConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: RouterConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Load defaults, then an optional TOML file, then MATHROUTE__* env overrides
    ///
    /// Nested keys use a double underscore, e.g. `MATHROUTE__LEARNING__EMA_ALPHA=0.3`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&RouterConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path.to_path_buf()).format(config::FileFormat::Toml),
            );
        }

        let config: RouterConfig = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let routing = &self.routing;

        if !(0.0..=1.0).contains(&routing.min_threshold)
            || !(0.0..=1.0).contains(&routing.max_threshold)
            || routing.min_threshold > routing.max_threshold
        {
            return Err(ConfigError::ValidationError(format!(
                "routing: thresholds must satisfy 0 <= min ({}) <= max ({}) <= 1",
                routing.min_threshold, routing.max_threshold
            )));
        }

        Self::validate_unit("routing.tie_epsilon", routing.tie_epsilon)?;
        Self::validate_unit("routing.degradation_factor", routing.degradation_factor)?;
        Self::validate_unit("routing.web_relevance_weight", routing.web_relevance_weight)?;

        self.validate_policy("default", &routing.default_policy)?;
        for o in &routing.topics {
            self.validate_policy(&o.topic.to_string(), &o.policy)?;
        }

        let learning = &self.learning;
        if !(learning.ema_alpha > 0.0 && learning.ema_alpha < 1.0) {
            return Err(ConfigError::ValidationError(format!(
                "learning.ema_alpha must be in (0, 1), got {}",
                learning.ema_alpha
            )));
        }
        if learning.adjustment_step <= 0.0 || learning.rating_gap < 0.0 {
            return Err(ConfigError::ValidationError(
                "learning: adjustment_step must be positive and rating_gap non-negative"
                    .to_string(),
            ));
        }
        if learning.max_update_retries == 0 {
            return Err(ConfigError::ValidationError(
                "learning.max_update_retries must be at least 1".to_string(),
            ));
        }

        if self.retrieval.knowledge_base_timeout.is_zero()
            || self.retrieval.web_search_timeout.is_zero()
        {
            return Err(ConfigError::ValidationError(
                "retrieval: timeouts must be greater than zero".to_string(),
            ));
        }

        Self::validate_unit("guardrails.warning_penalty", self.guardrails.warning_penalty)?;
        Self::validate_unit("knowledge_base.min_relevance", self.knowledge_base.min_relevance)?;

        for rule in &self.analysis.topic_rules {
            rule.compile().map_err(|e| {
                ConfigError::ValidationError(format!(
                    "analysis.topic_rules ({}): {}",
                    rule.topic, e
                ))
            })?;
        }

        Ok(())
    }

    fn validate_policy(&self, name: &str, policy: &TopicPolicy) -> Result<(), ConfigError> {
        Self::validate_unit(&format!("{}: base_threshold", name), policy.base_threshold)?;
        Self::validate_unit(&format!("{}: max_complexity", name), policy.max_complexity)
    }

    fn validate_unit(name: &str, value: f64) -> Result<(), ConfigError> {
        if (0.0..=1.0).contains(&value) {
            Ok(())
        } else {
            Err(ConfigError::ValidationError(format!(
                "{} must be in [0, 1], got {}",
                name, value
            )))
        }
    }
}
