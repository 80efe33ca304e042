//! In-memory knowledge base of worked math problems.
//!
//! Relevance is lexical: cosine similarity of term counts between the
//! question and each entry, with a small bonus when the analyzed topic
//! matches the entry's topic. It stands in for an embedding backend and keeps
//! scores in [0, 1].

use super::KnowledgeRetriever;
use crate::error::Result;
use crate::types::{CandidatePayload, Question, RetrievalCandidate, Source, Topic};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

const LEXICAL_WEIGHT: f64 = 0.85;
const TOPIC_BONUS: f64 = 0.15;

const STOPWORDS: &[&str] = &[
    "a", "an", "the", "of", "for", "to", "and", "is", "what", "find", "if", "in", "on", "with",
    "by", "how", "do", "i", "me", "please", "this", "that", "at", "be", "are",
];

/// One worked problem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub id: String,
    pub question: String,
    pub topic: Topic,
    pub difficulty: String,
    pub solution_steps: Vec<String>,
    pub final_answer: String,
    pub explanation: String,
    #[serde(default)]
    pub related_concepts: Vec<String>,
}

impl KnowledgeEntry {
    fn payload(&self) -> CandidatePayload {
        CandidatePayload {
            answer: self.final_answer.clone(),
            steps: Some(self.solution_steps.clone()),
            explanation: self.explanation.clone(),
            references: vec![format!("kb:{}", self.id)],
        }
    }

    fn index_text(&self) -> String {
        format!("{} {}", self.question, self.related_concepts.join(" "))
    }
}

/// Scored knowledge base hit
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredEntry {
    pub entry: KnowledgeEntry,
    pub score: f64,
}

/// Knowledge base held entirely in memory
pub struct InMemoryKnowledgeBase {
    entries: Vec<(KnowledgeEntry, HashMap<String, f64>)>,
    min_relevance: f64,
}

impl InMemoryKnowledgeBase {
    /// Create a knowledge base from entries
    pub fn new(entries: Vec<KnowledgeEntry>, min_relevance: f64) -> Self {
        let entries = entries
            .into_iter()
            .map(|e| {
                let terms = term_counts(&e.index_text());
                (e, terms)
            })
            .collect();

        Self {
            entries,
            min_relevance,
        }
    }

    /// Knowledge base with the built-in problem set
    pub fn seeded(min_relevance: f64) -> Self {
        Self::new(seed_entries(), min_relevance)
    }

    /// Load entries from a JSON array file
    pub fn from_file(path: &Path, min_relevance: f64) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let entries: Vec<KnowledgeEntry> = serde_json::from_str(&contents)?;
        info!(
            "Loaded {} knowledge base entries from {}",
            entries.len(),
            path.display()
        );
        Ok(Self::new(entries, min_relevance))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &KnowledgeEntry> {
        self.entries.iter().map(|(e, _)| e)
    }

    /// Top `limit` entries at or above the minimum relevance, best first
    pub fn search_ranked(&self, text: &str, topic: Option<Topic>, limit: usize) -> Vec<ScoredEntry> {
        let query = term_counts(text);

        let mut scored: Vec<ScoredEntry> = self
            .entries
            .iter()
            .map(|(entry, terms)| {
                let lexical = cosine(&query, terms);
                let bonus = if topic == Some(entry.topic) { TOPIC_BONUS } else { 0.0 };
                ScoredEntry {
                    entry: entry.clone(),
                    score: (LEXICAL_WEIGHT * lexical + bonus).clamp(0.0, 1.0),
                }
            })
            .filter(|s| s.score >= self.min_relevance)
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.entry.id.cmp(&b.entry.id))
        });
        scored.truncate(limit);
        scored
    }
}

#[async_trait]
impl KnowledgeRetriever for InMemoryKnowledgeBase {
    async fn search(&self, question: &Question) -> Result<Option<RetrievalCandidate>> {
        let best = self
            .search_ranked(question.text(), Some(question.topic()), 1)
            .into_iter()
            .next();

        match &best {
            Some(hit) => debug!(
                "Knowledge base match {} (score {:.3})",
                hit.entry.id, hit.score
            ),
            None => debug!("No knowledge base match above {:.2}", self.min_relevance),
        }

        Ok(best.map(|hit| {
            RetrievalCandidate::new(Source::KnowledgeBase, hit.score, hit.entry.payload())
        }))
    }
}

fn term_counts(text: &str) -> HashMap<String, f64> {
    let mut counts = HashMap::new();
    for token in text
        .split(|c: char| !(c.is_alphanumeric() || "^+-*/=∫√π".contains(c)))
        .map(|t| t.to_lowercase())
        .filter(|t| !t.is_empty() && !STOPWORDS.contains(&t.as_str()))
    {
        *counts.entry(token).or_insert(0.0) += 1.0;
    }
    counts
}

fn cosine(a: &HashMap<String, f64>, b: &HashMap<String, f64>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let dot: f64 = a
        .iter()
        .filter_map(|(term, x)| b.get(term).map(|y| x * y))
        .sum();
    let norm_a = a.values().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.values().map(|x| x * x).sum::<f64>().sqrt();
    (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
}

/// One built-in problem, kept as static text until the KB is seeded
struct SeedProblem {
    id: &'static str,
    question: &'static str,
    topic: Topic,
    difficulty: &'static str,
    steps: &'static [&'static str],
    answer: &'static str,
    explanation: &'static str,
    concepts: &'static [&'static str],
}

impl From<&SeedProblem> for KnowledgeEntry {
    fn from(seed: &SeedProblem) -> Self {
        KnowledgeEntry {
            id: seed.id.to_string(),
            question: seed.question.to_string(),
            topic: seed.topic,
            difficulty: seed.difficulty.to_string(),
            solution_steps: seed.steps.iter().map(|s| s.to_string()).collect(),
            final_answer: seed.answer.to_string(),
            explanation: seed.explanation.to_string(),
            related_concepts: seed.concepts.iter().map(|s| s.to_string()).collect(),
        }
    }
}

const SEED_PROBLEMS: &[SeedProblem] = &[
    SeedProblem {
        id: "alg_001",
        question: "Solve the equation 2x + 5 = 13",
        topic: Topic::Algebra,
        difficulty: "beginner",
        steps: &[
            "Start with the equation: 2x + 5 = 13",
            "Subtract 5 from both sides: 2x = 8",
            "Divide both sides by 2: x = 4",
        ],
        answer: "x = 4",
        explanation: "A linear equation is solved by isolating the variable with inverse operations.",
        concepts: &["linear equations", "inverse operations"],
    },
    SeedProblem {
        id: "alg_002",
        question: "Solve the quadratic equation x^2 - 5x + 6 = 0",
        topic: Topic::Algebra,
        difficulty: "intermediate",
        steps: &[
            "Look for two numbers with product 6 and sum -5: -2 and -3",
            "Factor: (x - 2)(x - 3) = 0",
            "Set each factor to zero: x = 2 or x = 3",
        ],
        answer: "x = 2 or x = 3",
        explanation: "Factoring works because a product is zero exactly when one of its factors is zero.",
        concepts: &["quadratic equations", "factoring", "zero product property"],
    },
    SeedProblem {
        id: "calc_001",
        question: "Find the derivative of f(x) = x^2 + 3x + 2",
        topic: Topic::Calculus,
        difficulty: "intermediate",
        steps: &[
            "Apply the power rule to x^2: 2x",
            "Differentiate 3x: 3",
            "The derivative of the constant 2 is 0",
            "Combine: f'(x) = 2x + 3",
        ],
        answer: "f'(x) = 2x + 3",
        explanation: "The power rule d/dx(x^n) = n x^(n-1) is applied term by term since differentiation is linear.",
        concepts: &["derivatives", "power rule", "polynomials"],
    },
    SeedProblem {
        id: "calc_002",
        question: "Evaluate the integral of 2x from 0 to 3",
        topic: Topic::Calculus,
        difficulty: "intermediate",
        steps: &[
            "Find an antiderivative of 2x: x^2",
            "Evaluate at the bounds: 3^2 - 0^2",
            "Compute: 9 - 0 = 9",
        ],
        answer: "9",
        explanation: "By the fundamental theorem of calculus a definite integral is the antiderivative's change between the bounds.",
        concepts: &["definite integrals", "antiderivatives", "fundamental theorem of calculus"],
    },
    SeedProblem {
        id: "geo_001",
        question: "Find the area of a circle with radius 5",
        topic: Topic::Geometry,
        difficulty: "beginner",
        steps: &[
            "Recall the formula A = πr^2",
            "Substitute r = 5: A = π · 25",
            "A = 25π ≈ 78.54",
        ],
        answer: "25π ≈ 78.54",
        explanation: "The area of a circle grows with the square of its radius, so doubling r quadruples A.",
        concepts: &["area", "circle", "pi"],
    },
    SeedProblem {
        id: "geo_002",
        question: "Find the hypotenuse of a right triangle with legs 3 and 4",
        topic: Topic::Geometry,
        difficulty: "beginner",
        steps: &[
            "Apply the Pythagorean theorem: c^2 = a^2 + b^2",
            "Substitute: c^2 = 9 + 16 = 25",
            "Take the square root: c = 5",
        ],
        answer: "5",
        explanation: "Because the triangle is right-angled, the square of the hypotenuse equals the sum of the squares of the legs.",
        concepts: &["pythagorean theorem", "right triangle", "hypotenuse"],
    },
    SeedProblem {
        id: "trig_001",
        question: "What is sin(30°)?",
        topic: Topic::Trigonometry,
        difficulty: "beginner",
        steps: &[
            "Use the 30-60-90 special triangle",
            "The side opposite 30° is half the hypotenuse",
            "sin(30°) = opposite / hypotenuse = 1/2",
        ],
        answer: "1/2",
        explanation: "Special right triangles give exact values since their side ratios are fixed.",
        concepts: &["sine", "special angles", "unit circle"],
    },
    SeedProblem {
        id: "stats_001",
        question: "Find the mean of 4, 8, 15, 16, 23, 42",
        topic: Topic::Statistics,
        difficulty: "beginner",
        steps: &[
            "Add the values: 4 + 8 + 15 + 16 + 23 + 42 = 108",
            "Count the values: 6",
            "Divide: 108 / 6 = 18",
        ],
        answer: "18",
        explanation: "The arithmetic mean is the sum of the values divided by how many there are.",
        concepts: &["mean", "average", "descriptive statistics"],
    },
    SeedProblem {
        id: "la_001",
        question: "Find the determinant of the matrix [[2, 1], [3, 4]]",
        topic: Topic::LinearAlgebra,
        difficulty: "intermediate",
        steps: &[
            "For a 2x2 matrix [[a, b], [c, d]] the determinant is ad - bc",
            "Substitute: 2·4 - 1·3",
            "Compute: 8 - 3 = 5",
        ],
        answer: "5",
        explanation: "The determinant is computed by the ad - bc rule and measures how the matrix scales area.",
        concepts: &["determinant", "matrix", "2x2"],
    },
];

/// Built-in problem set
pub fn seed_entries() -> Vec<KnowledgeEntry> {
    SEED_PROBLEMS.iter().map(KnowledgeEntry::from).collect()
}
