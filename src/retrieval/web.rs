//! Web search retriever
//!
//! Talks to a search endpoint that accepts `POST {base}/search` with
//! `{query, max_results, include_domains}` and answers
//! `{results: [{title, url, content, score}]}`. Results are filtered to
//! mathematical content from allowed domains, then synthesized into one
//! candidate: steps, answer and explanation are pulled out of the combined
//! text with pattern extraction.

use super::WebRetriever;
use crate::config::RetrievalConfig;
use crate::error::{Result, RouterError};
use crate::types::{CandidatePayload, Question, RetrievalCandidate, Source};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Maximum steps kept from web content
const MAX_STEPS: usize = 10;

/// Maximum explanation sentences kept from web content
const MAX_EXPLANATION_SENTENCES: usize = 3;

const QUERY_KEYWORDS: &[&str] = &[
    "mathematics",
    "math",
    "algebra",
    "calculus",
    "geometry",
    "trigonometry",
    "statistics",
    "step by step",
    "solution",
];

const MATH_INDICATORS: &[&str] = &[
    "equation",
    "formula",
    "solve",
    "calculate",
    "derivative",
    "integral",
    "algebra",
    "geometry",
    "trigonometry",
    "statistics",
    "step",
    "solution",
    "answer",
    "mathematical",
    "math",
];

pub const GENERIC_ANSWER: &str = "Answer not explicitly stated in the sources";
pub const GENERIC_EXPLANATION: &str =
    "This solution is based on mathematical principles and step-by-step reasoning.";

static STEP_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)step \d+[:\-]\s*([^.]*\.)",
        r"(?im)^\s*\d+[.)]\s+([^.]*\.)",
        r"(?i)\bfirst[:\-,]\s*([^.]*\.)",
        r"(?i)\bnext[:\-,]\s*([^.]*\.)",
        r"(?i)\bfinally[:\-,]\s*([^.]*\.)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static step pattern"))
    .collect()
});

static ANSWER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\banswer\s*(?:is|[:\-])\s*([^.]*\.)",
        r"(?i)\bresult\s*(?:is|[:\-])\s*([^.]*\.)",
        r"(?i)\btherefore[,\s]+([^.]*\.)",
        r"(?i)\bthus[,\s]+([^.]*\.)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static answer pattern"))
    .collect()
});

static EXPLANATION_SENTENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[^.]*\b(because|since|therefore|thus|we have|we get|we obtain)\b[^.]*\.")
        .expect("static explanation pattern")
});

/// Request body sent to the search endpoint
#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: String,
    max_results: usize,
    include_domains: &'a [String],
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

/// One search hit
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub score: f64,
}

/// HTTP web search retriever
pub struct HttpWebRetriever {
    client: Client,
    base_url: String,
    max_results: usize,
    allowed_domains: Vec<String>,
}

impl HttpWebRetriever {
    /// Create a retriever for `base_url`
    ///
    /// The per-call deadline is enforced by the caller; the client timeout is
    /// set to the same value so abandoned requests are not left running.
    pub fn new(base_url: impl Into<String>, config: &RetrievalConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.web_search_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_results: config.web_max_results,
            allowed_domains: config.allowed_domains.clone(),
        })
    }

    async fn call_api(&self, query: String) -> Result<Vec<SearchResult>> {
        debug!("Calling web search: {}", query);

        let request = SearchRequest {
            query,
            max_results: self.max_results,
            include_domains: &self.allowed_domains,
        };

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        let status = response.status();
        match status {
            StatusCode::OK => {
                let body = response.json::<SearchResponse>().await?;
                debug!("Web search returned {} results", body.results.len());
                Ok(body.results)
            }
            StatusCode::TOO_MANY_REQUESTS => Err(unavailable("rate limit exceeded".to_string())),
            _ => {
                let text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                Err(unavailable(format!("status {}: {}", status, text)))
            }
        }
    }
}

fn unavailable(reason: String) -> RouterError {
    RouterError::RetrievalUnavailable {
        source_name: Source::WebSearch.to_string(),
        reason,
    }
}

#[async_trait]
impl WebRetriever for HttpWebRetriever {
    async fn search(&self, question: &Question) -> Result<Option<RetrievalCandidate>> {
        let results = self.call_api(enhance_query(question.text())).await?;
        let kept = filter_results(results, &self.allowed_domains);

        if kept.is_empty() {
            warn!("Web search produced no usable results");
            return Ok(None);
        }

        Ok(Some(synthesize(&kept)))
    }
}

/// Web retriever used when no endpoint is configured
pub struct DisabledWebRetriever;

#[async_trait]
impl WebRetriever for DisabledWebRetriever {
    async fn search(&self, _question: &Question) -> Result<Option<RetrievalCandidate>> {
        debug!("Web search disabled");
        Ok(None)
    }
}

/// Append search hints when the query has no mathematical keyword
pub fn enhance_query(query: &str) -> String {
    let lower = query.to_lowercase();
    if QUERY_KEYWORDS.iter().any(|k| lower.contains(k)) {
        query.to_string()
    } else {
        format!("{} mathematics step by step solution", query)
    }
}

pub fn is_math_related(content: &str) -> bool {
    let lower = content.to_lowercase();
    MATH_INDICATORS.iter().any(|i| lower.contains(i))
}

/// Whether `url`'s host is one of `allowed` or a subdomain of one
pub fn domain_allowed(url: &str, allowed: &[String]) -> bool {
    if allowed.is_empty() {
        return true;
    }
    let Ok(parsed) = reqwest::Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    allowed
        .iter()
        .any(|d| host == d || host.ends_with(&format!(".{}", d)))
}

pub fn filter_results(results: Vec<SearchResult>, allowed: &[String]) -> Vec<SearchResult> {
    results
        .into_iter()
        .filter(|r| is_math_related(&r.content) && domain_allowed(&r.url, allowed))
        .collect()
}

/// Build one candidate from filtered results
pub fn synthesize(results: &[SearchResult]) -> RetrievalCandidate {
    let combined = results
        .iter()
        .map(|r| r.content.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let relevance = results.iter().map(|r| r.score).fold(0.0, f64::max);

    let steps = extract_steps(&combined);
    let payload = CandidatePayload {
        answer: extract_answer(&combined).unwrap_or_else(|| GENERIC_ANSWER.to_string()),
        steps: (!steps.is_empty()).then_some(steps),
        explanation: extract_explanation(&combined)
            .unwrap_or_else(|| GENERIC_EXPLANATION.to_string()),
        references: results.iter().map(|r| r.url.clone()).collect(),
    };

    RetrievalCandidate::new(Source::WebSearch, relevance, payload)
}

/// Numbered or sequenced steps, in text order, at most ten
pub fn extract_steps(text: &str) -> Vec<String> {
    let mut found: Vec<(usize, String)> = STEP_PATTERNS
        .iter()
        .flat_map(|re| {
            re.captures_iter(text).filter_map(|c| {
                c.get(1)
                    .map(|m| (m.start(), m.as_str().trim().to_string()))
            })
        })
        .filter(|(_, s)| !s.is_empty())
        .collect();

    found.sort_by_key(|(pos, _)| *pos);
    found.dedup_by(|a, b| a.1 == b.1);
    found.into_iter().map(|(_, s)| s).take(MAX_STEPS).collect()
}

pub fn extract_answer(text: &str) -> Option<String> {
    ANSWER_PATTERNS.iter().find_map(|re| {
        re.captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

pub fn extract_explanation(text: &str) -> Option<String> {
    let sentences: Vec<&str> = EXPLANATION_SENTENCE
        .find_iter(text)
        .map(|m| m.as_str().trim())
        .take(MAX_EXPLANATION_SENTENCES)
        .collect();

    (!sentences.is_empty()).then(|| sentences.join(" "))
}
