//! Similarity Scoring — pluggable, trait-based relevance between the job
//! description vector and one candidate vector.
//!
//! Default: `CosineScorer` over TF-IDF weights.
//! Simplified: `KeywordOverlapScorer`, the share of job-description tokens that
//! also occur in the candidate.
//!
//! `AppState` holds an `Arc<dyn SimilarityScorer>`, chosen at startup via config.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::screening::vectorizer::TermVector;

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// Scores one candidate against the job description. Implementations are
/// pure: no side effects, no state shared between calls, result in `[0, 1]`.
pub trait SimilarityScorer: Send + Sync {
    fn score(&self, jd_vector: &TermVector, candidate_vector: &TermVector) -> f64;

    /// Backend label, reported alongside results for transparency.
    fn name(&self) -> &'static str;
}

// ────────────────────────────────────────────────────────────────────────────
// CosineScorer — default
// ────────────────────────────────────────────────────────────────────────────

/// Cosine similarity of the TF-IDF weights.
///
/// A zero-norm vector on either side scores 0. Weights are non-negative, so
/// the raw cosine already lies in `[0, 1]`; the clamp only absorbs rounding.
#[derive(Debug, Clone, Copy, Default)]
pub struct CosineScorer;

impl SimilarityScorer for CosineScorer {
    fn score(&self, jd_vector: &TermVector, candidate_vector: &TermVector) -> f64 {
        let jd_sq = jd_vector.squared_norm();
        let candidate_sq = candidate_vector.squared_norm();
        if jd_sq == 0.0 || candidate_sq == 0.0 {
            return 0.0;
        }

        // Iterate the sparser side.
        let (small, large) = if jd_vector.nnz() <= candidate_vector.nnz() {
            (jd_vector, candidate_vector)
        } else {
            (candidate_vector, jd_vector)
        };
        let dot: f64 = small
            .weights()
            .map(|(index, weight)| weight * large.weight(index))
            .sum();

        (dot / (jd_sq * candidate_sq).sqrt()).clamp(0.0, 1.0)
    }

    fn name(&self) -> &'static str {
        "cosine"
    }
}

// ────────────────────────────────────────────────────────────────────────────
// KeywordOverlapScorer — simplified strategy
// ────────────────────────────────────────────────────────────────────────────

/// Counts job-description tokens whose term also appears in the candidate,
/// divided by the job-description token count.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordOverlapScorer;

impl SimilarityScorer for KeywordOverlapScorer {
    fn score(&self, jd_vector: &TermVector, candidate_vector: &TermVector) -> f64 {
        let total = jd_vector.token_count();
        if total == 0 {
            return 0.0;
        }
        let matched: u64 = jd_vector
            .counts()
            .filter(|&(index, _)| candidate_vector.count(index) > 0)
            .map(|(_, count)| count as u64)
            .sum();

        (matched as f64 / total as f64).clamp(0.0, 1.0)
    }

    fn name(&self) -> &'static str {
        "keyword_overlap"
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Strategy selection
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringStrategy {
    #[default]
    Cosine,
    KeywordOverlap,
}

impl ScoringStrategy {
    pub fn scorer(self) -> Arc<dyn SimilarityScorer> {
        match self {
            ScoringStrategy::Cosine => Arc::new(CosineScorer),
            ScoringStrategy::KeywordOverlap => Arc::new(KeywordOverlapScorer),
        }
    }
}

impl FromStr for ScoringStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cosine" | "tfidf" | "tf_idf" => Ok(ScoringStrategy::Cosine),
            "keyword_overlap" | "keyword" | "overlap" => Ok(ScoringStrategy::KeywordOverlap),
            other => Err(format!(
                "unknown scoring strategy '{other}' (expected cosine|keyword_overlap)"
            )),
        }
    }
}

impl fmt::Display for ScoringStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoringStrategy::Cosine => f.write_str("cosine"),
            ScoringStrategy::KeywordOverlap => f.write_str("keyword_overlap"),
        }
    }
}
