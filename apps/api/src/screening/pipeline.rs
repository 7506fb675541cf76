//! Screening pipeline — one stateless run from request to ranked result.
//!
//! Stages (`RunStage`): Empty → CorpusBuilt → Vectorized → Scored → Ranked.
//! Each stage is a value consumed by the next, so a stage cannot run before
//! its predecessor. Validation happens before any vectorization work.
//! Per-candidate problems become flags on the score records.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Document, ExtractionFailure, NormalizedDocument};
use crate::screening::normalizer::{normalize, normalize_document};
use crate::screening::ranking::{rank, RankedResult, ScoreRecord};
use crate::screening::similarity::SimilarityScorer;
use crate::screening::vectorizer::{TermVector, Vectorizer, Vocabulary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    Empty,
    CorpusBuilt,
    Vectorized,
    Scored,
    Ranked,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunStage::Empty => "empty",
            RunStage::CorpusBuilt => "corpus_built",
            RunStage::Vectorized => "vectorized",
            RunStage::Scored => "scored",
            RunStage::Ranked => "ranked",
        };
        f.write_str(label)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Request / result
// ────────────────────────────────────────────────────────────────────────────

/// Everything one run needs. Replaces any cross-step session state.
#[derive(Debug, Clone)]
pub struct ScreeningRequest {
    pub job_description: NormalizedDocument,
    /// Upload order is insertion order.
    pub candidates: Vec<Document>,
    /// Extraction failures reported upstream, keyed by candidate id.
    pub extraction_flags: HashMap<Uuid, ExtractionFailure>,
}

impl ScreeningRequest {
    pub fn new(job_description: NormalizedDocument, candidates: Vec<Document>) -> Self {
        Self {
            job_description,
            candidates,
            extraction_flags: HashMap::new(),
        }
    }

    pub fn with_flags(mut self, flags: HashMap<Uuid, ExtractionFailure>) -> Self {
        self.extraction_flags = flags;
        self
    }
}

/// A candidate that contributed no text, surfaced for caller visibility.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlaggedCandidate {
    pub candidate_id: Uuid,
    pub display_name: String,
    pub reason: ExtractionFailure,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScreeningResult {
    pub run_id: Uuid,
    pub scorer_backend: String, // "cosine" | "keyword_overlap"
    pub ranked: RankedResult,
    pub flagged: Vec<FlaggedCandidate>,
    pub vocabulary_size: usize,
    pub screened_at: DateTime<Utc>,
}

// ────────────────────────────────────────────────────────────────────────────
// Entry points
// ────────────────────────────────────────────────────────────────────────────

/// Normalizes a job description, rejecting text with no usable tokens.
pub fn submit_job_description(text: &str) -> Result<NormalizedDocument, AppError> {
    let tokens = normalize(text);
    if tokens.is_empty() {
        return Err(AppError::Validation(
            "job description has no usable terms".to_string(),
        ));
    }
    Ok(NormalizedDocument {
        id: Uuid::new_v4(),
        tokens,
    })
}

/// Runs a full screening: corpus → vectors → scores → ranking.
pub fn screen(
    request: ScreeningRequest,
    vectorizer: &Vectorizer,
    scorer: &dyn SimilarityScorer,
) -> Result<ScreeningResult, AppError> {
    let run_id = Uuid::new_v4();
    debug!(%run_id, stage = %RunStage::Empty, "Screening run started");

    let corpus = Corpus::build(request)?;
    debug!(
        %run_id,
        stage = %RunStage::CorpusBuilt,
        documents = corpus.document_count(),
        "Corpus built"
    );

    let vectorized = corpus.vectorize(vectorizer);
    let vocabulary_size = vectorized.vocabulary.len();
    debug!(%run_id, stage = %RunStage::Vectorized, vocabulary_size, "Corpus vectorized");

    let scored = vectorized.score(scorer);
    debug!(%run_id, stage = %RunStage::Scored, candidates = scored.len(), "Candidates scored");

    let flagged: Vec<FlaggedCandidate> = scored
        .iter()
        .filter_map(|record| {
            record.flag.clone().map(|reason| FlaggedCandidate {
                candidate_id: record.candidate_id,
                display_name: record.display_name.clone(),
                reason,
            })
        })
        .collect();

    let ranked = rank(scored);
    info!(
        %run_id,
        stage = %RunStage::Ranked,
        candidates = ranked.len(),
        flagged = flagged.len(),
        vocabulary_size,
        scorer = scorer.name(),
        "Screening run complete"
    );

    Ok(ScreeningResult {
        run_id,
        scorer_backend: scorer.name().to_string(),
        ranked,
        flagged,
        vocabulary_size,
        screened_at: Utc::now(),
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Stages
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct CorpusCandidate {
    id: Uuid,
    display_name: String,
    normalized: NormalizedDocument,
    flag: Option<ExtractionFailure>,
}

/// CorpusBuilt: the job description plus every normalized candidate.
#[derive(Debug, Clone)]
pub struct Corpus {
    job_description: NormalizedDocument,
    candidates: Vec<CorpusCandidate>,
}

impl Corpus {
    /// Validates the request and normalizes every candidate.
    pub fn build(request: ScreeningRequest) -> Result<Self, AppError> {
        let ScreeningRequest {
            job_description,
            candidates,
            mut extraction_flags,
        } = request;

        if job_description.is_empty() {
            return Err(AppError::Validation(
                "job description has no usable terms".to_string(),
            ));
        }
        if candidates.is_empty() {
            return Err(AppError::Validation(
                "at least one candidate document is required".to_string(),
            ));
        }

        let candidates = candidates
            .iter()
            .map(|document| {
                let normalized = normalize_document(document);
                let flag = extraction_flags
                    .remove(&document.id)
                    .or_else(|| normalized.is_empty().then_some(ExtractionFailure::Empty));
                CorpusCandidate {
                    id: document.id,
                    display_name: document.display_name.clone(),
                    normalized,
                    flag,
                }
            })
            .collect();

        Ok(Self {
            job_description,
            candidates,
        })
    }

    /// Documents in the corpus, job description included.
    pub fn document_count(&self) -> usize {
        self.candidates.len() + 1
    }

    /// Builds the vocabulary over the whole corpus, job description first.
    pub fn vectorize(self, vectorizer: &Vectorizer) -> VectorizedCorpus {
        let documents: Vec<NormalizedDocument> = std::iter::once(self.job_description)
            .chain(self.candidates.iter().map(|c| c.normalized.clone()))
            .collect();

        let (vocabulary, mut vectors) = vectorizer.build(&documents);
        let candidate_vectors = vectors.split_off(1);
        let jd_vector = vectors.pop().unwrap_or_default();

        VectorizedCorpus {
            vocabulary,
            jd_vector,
            candidates: self.candidates.into_iter().zip(candidate_vectors).collect(),
        }
    }
}

/// Vectorized: vocabulary frozen, one vector per document.
#[derive(Debug, Clone)]
pub struct VectorizedCorpus {
    vocabulary: Vocabulary,
    jd_vector: TermVector,
    candidates: Vec<(CorpusCandidate, TermVector)>,
}

impl VectorizedCorpus {
    #[cfg(test)]
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    #[cfg(test)]
    pub fn jd_vector(&self) -> &TermVector {
        &self.jd_vector
    }

    /// Scores every candidate. Flagged candidates score exactly 0.
    pub fn score(self, scorer: &dyn SimilarityScorer) -> Vec<ScoreRecord> {
        let jd_vector = self.jd_vector;
        self.candidates
            .into_iter()
            .enumerate()
            .map(|(insertion_order, (candidate, vector))| {
                let score = if candidate.flag.is_some() {
                    0.0
                } else {
                    scorer.score(&jd_vector, &vector)
                };
                ScoreRecord {
                    candidate_id: candidate.id,
                    display_name: candidate.display_name,
                    score,
                    insertion_order,
                    flag: candidate.flag,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screening::similarity::{CosineScorer, KeywordOverlapScorer};

    fn run(jd: &str, candidates: Vec<Document>) -> Result<ScreeningResult, AppError> {
        let jd = submit_job_description(jd)?;
        screen(
            ScreeningRequest::new(jd, candidates),
            &Vectorizer::default(),
            &CosineScorer,
        )
    }

    fn score_of(result: &ScreeningResult, name: &str) -> f64 {
        result
            .ranked
            .records()
            .iter()
            .find(|r| r.display_name == name)
            .map(|r| r.score)
            .unwrap()
    }

    #[test]
    fn test_empty_job_description_rejected() {
        assert!(matches!(
            submit_job_description(""),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            submit_job_description("the and of 123"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_empty_candidate_list_rejected() {
        assert!(matches!(run("python sql", vec![]), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_empty_normalized_jd_rejected_by_screen() {
        let jd = NormalizedDocument {
            id: Uuid::new_v4(),
            tokens: vec![],
        };
        let result = screen(
            ScreeningRequest::new(jd, vec![Document::new("A", "python")]),
            &Vectorizer::default(),
            &CosineScorer,
        );
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_relevant_candidate_outranks_irrelevant() {
        let result = run(
            "Python SQL Leadership",
            vec![
                Document::new("B", "Pastry chef with a love of sourdough and croissants."),
                Document::new(
                    "A",
                    "Python developer. Python, SQL and more SQL. Leadership of teams; leadership coaching.",
                ),
            ],
        )
        .unwrap();

        assert!(score_of(&result, "A") > 0.0);
        assert_eq!(score_of(&result, "B"), 0.0);
        assert_eq!(result.ranked.records()[0].display_name, "A");
    }

    #[test]
    fn test_identical_text_scores_maximum() {
        let text = "Rust engineer building distributed storage systems";
        let result = run(text, vec![Document::new("Twin", text)]).unwrap();
        assert!((score_of(&result, "Twin") - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_identical_candidates_tie_and_first_upload_wins() {
        let text = "Java SQL communication";
        let result = run(
            "java sql teamwork",
            vec![
                Document::new("Other", "gardening"),
                Document::new("First", text),
                Document::new("Second", text),
            ],
        )
        .unwrap();

        let records = result.ranked.records();
        assert_eq!(records[0].display_name, "First");
        assert_eq!(records[1].display_name, "Second");
        assert_eq!(records[0].score, records[1].score);
        assert!(records[0].insertion_order < records[1].insertion_order);
    }

    #[test]
    fn test_screen_is_deterministic() {
        let jd = submit_job_description("python sql leadership machine learning").unwrap();
        let candidates = vec![
            Document::new("A", "python python sql"),
            Document::new("B", "leadership and machine learning"),
            Document::new("C", "sql sql sql"),
            Document::new("D", ""),
        ];
        let first = screen(
            ScreeningRequest::new(jd.clone(), candidates.clone()),
            &Vectorizer::default(),
            &CosineScorer,
        )
        .unwrap();
        let second = screen(
            ScreeningRequest::new(jd, candidates),
            &Vectorizer::default(),
            &CosineScorer,
        )
        .unwrap();

        assert_eq!(first.ranked, second.ranked);
        for (a, b) in first.ranked.records().iter().zip(second.ranked.records()) {
            assert_eq!(a.score.to_bits(), b.score.to_bits());
        }
    }

    #[test]
    fn test_empty_candidate_flagged_not_fatal() {
        let result = run(
            "python sql",
            vec![Document::new("Blank", "   "), Document::new("Good", "python")],
        )
        .unwrap();

        assert_eq!(result.ranked.len(), 2);
        assert_eq!(score_of(&result, "Blank"), 0.0);
        assert_eq!(result.flagged.len(), 1);
        assert_eq!(result.flagged[0].display_name, "Blank");
        assert_eq!(result.flagged[0].reason, ExtractionFailure::Empty);
    }

    #[test]
    fn test_upstream_extraction_flag_forces_zero_score() {
        let jd = submit_job_description("python").unwrap();
        let doc = Document::new("Partial", "python python");
        let flags = HashMap::from([(doc.id, ExtractionFailure::TimedOut)]);
        let result = screen(
            ScreeningRequest::new(jd, vec![doc]).with_flags(flags),
            &Vectorizer::default(),
            &CosineScorer,
        )
        .unwrap();

        let record = &result.ranked.records()[0];
        assert_eq!(record.score, 0.0);
        assert_eq!(record.flag, Some(ExtractionFailure::TimedOut));
    }

    #[test]
    fn test_keyword_overlap_strategy_through_pipeline() {
        let jd = submit_job_description("python sql rust leadership").unwrap();
        let result = screen(
            ScreeningRequest::new(
                jd,
                vec![
                    Document::new("Half", "python and sql"),
                    Document::new("All", "rust python leadership sql"),
                ],
            ),
            &Vectorizer::default(),
            &KeywordOverlapScorer,
        )
        .unwrap();

        assert_eq!(result.scorer_backend, "keyword_overlap");
        assert_eq!(result.ranked.records()[0].display_name, "All");
        assert!((score_of(&result, "All") - 1.0).abs() < 1e-12);
        assert!((score_of(&result, "Half") - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_stages_expose_vocabulary_built_jd_first() {
        let jd = submit_job_description("rust python").unwrap();
        let corpus = Corpus::build(ScreeningRequest::new(
            jd,
            vec![Document::new("A", "go rust")],
        ))
        .unwrap();
        assert_eq!(corpus.document_count(), 2);

        let vectorized = corpus.vectorize(&Vectorizer::default());
        assert_eq!(vectorized.vocabulary().terms(), &["rust", "python", "go"]);
        assert!(!vectorized.jd_vector().is_zero());
    }
}
