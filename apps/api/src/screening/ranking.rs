//! Ranking — deterministic ordering of scored candidates and shortlist views.
//!
//! `rank` sorts descending by score and breaks ties by insertion order
//! (upload order). Shortlists are read-only views over a `RankedResult`, so any
//! number of them can be derived from one run without re-scoring.

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::ExtractionFailure;

/// Shortlist sizes offered to users. The engine itself accepts any positive `n`.
pub const ALLOWED_SHORTLIST_SIZES: [usize; 6] = [5, 10, 15, 20, 50, 100];

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// Score of one candidate against the job description. Read-only once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub candidate_id: Uuid,
    pub display_name: String,
    pub score: f64, // 0.0 – 1.0
    pub insertion_order: usize,
    /// Set when the candidate contributed no text (score is then 0).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub flag: Option<ExtractionFailure>,
}

/// Score records sorted descending by score, ties by insertion order ascending.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RankedResult {
    records: Vec<ScoreRecord>,
}

impl RankedResult {
    #[cfg(test)]
    pub fn records(&self) -> &[ScoreRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Export rows for the full ranking.
    pub fn rows(&self) -> Vec<ShortlistRow> {
        to_rows(self.records.iter())
    }
}

/// How to cut a shortlist from a ranking.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortlistMode {
    TopN(NonZeroUsize),
    Threshold(f64),
}

/// A prefix or filtered subsequence of a `RankedResult`, borrowed from it.
#[derive(Debug, Clone, PartialEq)]
pub struct Shortlist<'a> {
    records: Vec<&'a ScoreRecord>,
}

impl<'a> Shortlist<'a> {
    #[cfg(test)]
    pub fn records(&self) -> &[&'a ScoreRecord] {
        &self.records
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn rows(&self) -> Vec<ShortlistRow> {
        to_rows(self.records.iter().copied())
    }
}

/// Output record consumed by presentation and export collaborators.
/// Field order is part of the contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortlistRow {
    pub rank: usize, // 1-based
    pub candidate_name: String,
    pub score: f64,
}

fn to_rows<'a>(records: impl Iterator<Item = &'a ScoreRecord>) -> Vec<ShortlistRow> {
    records
        .enumerate()
        .map(|(i, record)| ShortlistRow {
            rank: i + 1,
            candidate_name: record.display_name.clone(),
            score: record.score,
        })
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Operations
// ────────────────────────────────────────────────────────────────────────────

/// Sorts records descending by score. Equal scores keep insertion order.
pub fn rank(scores: Vec<ScoreRecord>) -> RankedResult {
    let mut records = scores;
    records.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.insertion_order.cmp(&b.insertion_order))
    });
    RankedResult { records }
}

/// First `min(n, len)` records.
pub fn select_top_n(ranked: &RankedResult, n: NonZeroUsize) -> Shortlist<'_> {
    Shortlist {
        records: ranked.records.iter().take(n.get()).collect(),
    }
}

/// All records with `score >= cutoff`, in ranked order. May be empty.
pub fn select_by_threshold(ranked: &RankedResult, cutoff: f64) -> Shortlist<'_> {
    Shortlist {
        records: ranked
            .records
            .iter()
            .filter(|record| record.score >= cutoff)
            .collect(),
    }
}

/// Applies a shortlist mode, rejecting cutoffs outside the `[0, 1]` score scale.
pub fn shortlist(ranked: &RankedResult, mode: ShortlistMode) -> Result<Shortlist<'_>, AppError> {
    match mode {
        ShortlistMode::TopN(n) => Ok(select_top_n(ranked, n)),
        ShortlistMode::Threshold(cutoff) => {
            if !cutoff.is_finite() || !(0.0..=1.0).contains(&cutoff) {
                return Err(AppError::Validation(format!(
                    "threshold must be between 0 and 1, got {cutoff}"
                )));
            }
            Ok(select_by_threshold(ranked, cutoff))
        }
    }
}
