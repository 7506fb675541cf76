//! Vectorizer — shared vocabulary and TF-IDF term vectors over one corpus.
//!
//! The corpus is always the job description followed by every candidate in
//! upload order. The vocabulary is built once from the whole corpus before
//! any weights are computed; IDF depends on the complete set, so there is
//! no incremental update path. A changed corpus means a fresh `build`.
//!
//! Weighting:
//! - `tf(t, d)`: raw count, or count / token length (`TermFrequency::Normalized`),
//!   the same variant for every document of the corpus.
//! - `idf(t) = ln((1 + N) / (1 + df(t))) + 1` (smoothed, always ≥ 1).

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::NormalizedDocument;

// ────────────────────────────────────────────────────────────────────────────
// Term frequency variant
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermFrequency {
    #[default]
    Raw,
    Normalized,
}

impl FromStr for TermFrequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "raw" => Ok(TermFrequency::Raw),
            "normalized" => Ok(TermFrequency::Normalized),
            other => Err(format!("unknown term frequency '{other}' (expected raw|normalized)")),
        }
    }
}

impl fmt::Display for TermFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TermFrequency::Raw => f.write_str("raw"),
            TermFrequency::Normalized => f.write_str("normalized"),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Vocabulary
// ────────────────────────────────────────────────────────────────────────────

/// Term → stable index, assigned in first-seen order across the corpus.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vocabulary {
    index: HashMap<String, usize>,
    terms: Vec<String>,
}

impl Vocabulary {
    fn from_corpus(corpus: &[NormalizedDocument]) -> Self {
        let mut vocabulary = Vocabulary::default();
        for token in corpus.iter().flat_map(|doc| doc.tokens.iter()) {
            if !vocabulary.index.contains_key(token) {
                vocabulary.index.insert(token.clone(), vocabulary.terms.len());
                vocabulary.terms.push(token.clone());
            }
        }
        vocabulary
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn index_of(&self, term: &str) -> Option<usize> {
        self.index.get(term).copied()
    }

    #[cfg(test)]
    pub fn term(&self, index: usize) -> Option<&str> {
        self.terms.get(index).map(String::as_str)
    }

    /// Terms in index order.
    #[cfg(test)]
    pub fn terms(&self) -> &[String] {
        &self.terms
    }
}

// ────────────────────────────────────────────────────────────────────────────
// TermVector
// ────────────────────────────────────────────────────────────────────────────

/// Sparse term-weight vector for one document. Absent indices weigh 0.
///
/// Keeps raw counts next to the weights so count-based strategies can share
/// the same input as the TF-IDF cosine scorer. `BTreeMap` keeps iteration
/// order fixed, which keeps float sums bit-identical across runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermVector {
    weights: BTreeMap<usize, f64>,
    counts: BTreeMap<usize, u32>,
    token_count: usize,
}

impl TermVector {
    pub fn weight(&self, index: usize) -> f64 {
        self.weights.get(&index).copied().unwrap_or(0.0)
    }

    pub fn count(&self, index: usize) -> u32 {
        self.counts.get(&index).copied().unwrap_or(0)
    }

    /// Non-zero `(index, weight)` pairs in ascending index order.
    pub fn weights(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.weights.iter().map(|(&i, &w)| (i, w))
    }

    /// Non-zero `(index, count)` pairs in ascending index order.
    pub fn counts(&self) -> impl Iterator<Item = (usize, u32)> + '_ {
        self.counts.iter().map(|(&i, &c)| (i, c))
    }

    /// Number of tokens in the source document.
    pub fn token_count(&self) -> usize {
        self.token_count
    }

    pub fn squared_norm(&self) -> f64 {
        self.weights.values().map(|w| w * w).sum()
    }

    #[cfg(test)]
    pub fn norm(&self) -> f64 {
        self.squared_norm().sqrt()
    }

    #[cfg(test)]
    pub fn is_zero(&self) -> bool {
        self.weights.values().all(|&w| w == 0.0)
    }

    /// Number of distinct terms with non-zero weight.
    pub fn nnz(&self) -> usize {
        self.weights.len()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Vectorizer
// ────────────────────────────────────────────────────────────────────────────

/// Smoothed inverse document frequency. Positive for every `df` in `0..=n`.
pub fn smoothed_idf(corpus_size: usize, document_frequency: usize) -> f64 {
    ((1.0 + corpus_size as f64) / (1.0 + document_frequency as f64)).ln() + 1.0
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Vectorizer {
    pub term_frequency: TermFrequency,
}

impl Vectorizer {
    pub fn new(term_frequency: TermFrequency) -> Self {
        Self { term_frequency }
    }

    /// Builds the vocabulary and one vector per corpus document, in corpus order.
    pub fn build(&self, corpus: &[NormalizedDocument]) -> (Vocabulary, Vec<TermVector>) {
        let vocabulary = Vocabulary::from_corpus(corpus);

        let counts: Vec<BTreeMap<usize, u32>> = corpus
            .iter()
            .map(|doc| count_terms(&vocabulary, &doc.tokens))
            .collect();

        let mut document_frequency = vec![0usize; vocabulary.len()];
        for doc_counts in &counts {
            for &index in doc_counts.keys() {
                document_frequency[index] += 1;
            }
        }

        let idf: Vec<f64> = document_frequency
            .iter()
            .map(|&df| smoothed_idf(corpus.len(), df))
            .collect();

        let vectors = corpus
            .iter()
            .zip(counts)
            .map(|(doc, doc_counts)| {
                let token_count = doc.tokens.len();
                let weights = doc_counts
                    .iter()
                    .map(|(&index, &count)| {
                        let tf = match self.term_frequency {
                            TermFrequency::Raw => count as f64,
                            TermFrequency::Normalized => count as f64 / token_count as f64,
                        };
                        (index, tf * idf[index])
                    })
                    .collect();
                TermVector {
                    weights,
                    counts: doc_counts,
                    token_count,
                }
            })
            .collect();

        (vocabulary, vectors)
    }
}

fn count_terms(vocabulary: &Vocabulary, tokens: &[String]) -> BTreeMap<usize, u32> {
    let mut counts = BTreeMap::new();
    for token in tokens {
        if let Some(index) = vocabulary.index_of(token) {
            *counts.entry(index).or_insert(0) += 1;
        }
    }
    counts
}
