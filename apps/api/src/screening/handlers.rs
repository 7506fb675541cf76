//! Axum route handlers for the Screening API.

use std::collections::HashMap;
use std::num::NonZeroUsize;

use axum::{
    extract::{rejection::QueryRejection, Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::extraction::{candidate_name, extract_all, ExtractionSummary, Upload};
use crate::models::Document;
use crate::screening::pipeline::{
    screen, submit_job_description, FlaggedCandidate, ScreeningRequest, ScreeningResult,
};
use crate::screening::ranking::{shortlist, ShortlistMode, ShortlistRow, ALLOWED_SHORTLIST_SIZES};
use crate::screening::token_set::{skill_catalog, SkillCatalog, TokenSet};
use crate::sessions::SessionSummary;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SkillsResponse {
    pub catalog: SkillCatalog,
    pub shortlist_sizes: [usize; 6],
}

/// Job description as free text, or as selected skill labels.
#[derive(Debug, Default, Deserialize)]
pub struct JobDescriptionInput {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct JobDescriptionResponse {
    pub tokens: Vec<String>,
    pub token_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct CandidateInput {
    pub display_name: Option<String>,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct ScreenRequest {
    #[serde(flatten)]
    pub job_description: JobDescriptionInput,
    pub candidates: Vec<CandidateInput>,
    pub shortlist: Option<ShortlistMode>,
}

#[derive(Debug, Serialize)]
pub struct ScreenResponse {
    pub run_id: Uuid,
    pub scorer_backend: String,
    pub vocabulary_size: usize,
    pub screened_at: DateTime<Utc>,
    pub results: Vec<ShortlistRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shortlist: Option<Vec<ShortlistRow>>,
    pub flagged: Vec<FlaggedCandidate>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub candidates: Vec<ExtractionSummary>,
    pub flagged: usize,
}

#[derive(Debug, Deserialize)]
pub struct ShortlistQuery {
    pub top_n: Option<usize>,
    pub threshold: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct ShortlistResponse {
    pub run_id: Uuid,
    pub mode: ShortlistMode,
    pub total_candidates: usize,
    pub rows: Vec<ShortlistRow>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/skills
///
/// Skill labels for building a job description, plus the offered shortlist sizes.
pub async fn handle_skills() -> Json<SkillsResponse> {
    Json(SkillsResponse {
        catalog: skill_catalog(),
        shortlist_sizes: ALLOWED_SHORTLIST_SIZES,
    })
}

/// POST /api/v1/screen
///
/// Stateless one-shot screening of already-extracted candidate texts.
pub async fn handle_screen(
    State(state): State<AppState>,
    Json(request): Json<ScreenRequest>,
) -> Result<Json<ScreenResponse>, AppError> {
    let job_description = submit_job_description(&request.job_description.resolve()?)?;

    let candidates: Vec<Document> = request
        .candidates
        .into_iter()
        .enumerate()
        .map(|(i, candidate)| {
            let fallback = format!("Candidate {}", i + 1);
            let display_name = candidate
                .display_name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| candidate_name(&candidate.text, &fallback));
            Document::new(display_name, candidate.text)
        })
        .collect();

    let result = run_screening(&state, ScreeningRequest::new(job_description, candidates)).await?;
    let response = screen_response(&result, request.shortlist)?;
    Ok(Json(response))
}

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<SessionSummary>) {
    let summary = state.sessions.create().await;
    info!(session_id = %summary.session_id, "Session created");
    (StatusCode::CREATED, Json(summary))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSummary>, AppError> {
    Ok(Json(state.sessions.get(id).await?.summary()))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.sessions.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/sessions/:id/job-description
///
/// Replaces the session's job description. Any previous result is discarded.
pub async fn handle_set_job_description(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<JobDescriptionInput>,
) -> Result<Json<JobDescriptionResponse>, AppError> {
    let job_description = submit_job_description(&input.resolve()?)?;
    let response = JobDescriptionResponse {
        token_count: job_description.tokens.len(),
        tokens: job_description.tokens.clone(),
    };

    state
        .sessions
        .update(id, |session| session.set_job_description(job_description))
        .await?;

    Ok(Json(response))
}

/// POST /api/v1/sessions/:id/candidates
///
/// Multipart upload of candidate files. Replaces the session's candidate set.
/// Files that cannot be read are kept, flagged, and screened as empty.
pub async fn handle_upload_candidates(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    // Fail fast on unknown sessions before reading the body.
    state.sessions.get(id).await?;

    let mut uploads = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let file_name = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("upload-{}", uploads.len() + 1));
        let data: Bytes = field.bytes().await.map_err(multipart_error)?;
        uploads.push(Upload { file_name, data });
    }

    if uploads.is_empty() {
        return Err(AppError::Validation("no files were uploaded".to_string()));
    }

    let extracted = extract_all(uploads, state.config.extraction_timeout).await;
    let candidates: Vec<ExtractionSummary> = extracted.iter().map(ExtractionSummary::from).collect();
    let flagged = candidates.iter().filter(|c| c.flag.is_some()).count();

    state
        .sessions
        .update(id, |session| session.set_candidates(extracted))
        .await?;

    info!(session_id = %id, files = candidates.len(), flagged, "Candidates uploaded");
    Ok(Json(UploadResponse {
        candidates,
        flagged,
    }))
}

/// POST /api/v1/sessions/:id/screen
///
/// Screens the session's candidates against its job description and stores the
/// result so shortlists can be cut from it repeatedly. If the inputs change
/// while the run is in flight the result is discarded with 409.
pub async fn handle_screen_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ScreenResponse>, AppError> {
    let session = state.sessions.get(id).await?;
    let revision = session.revision;

    let job_description = session.job_description.ok_or_else(|| {
        AppError::Validation("set a job description before screening".to_string())
    })?;

    let flags: HashMap<Uuid, _> = session
        .candidates
        .iter()
        .filter_map(|c| c.flag.clone().map(|flag| (c.document.id, flag)))
        .collect();
    let candidates: Vec<Document> = session.candidates.into_iter().map(|c| c.document).collect();

    let request = ScreeningRequest::new(job_description, candidates).with_flags(flags);
    let result = run_screening(&state, request).await?;
    let response = screen_response(&result, None)?;

    state
        .sessions
        .update(id, |session| session.set_result(revision, result))
        .await??;

    Ok(Json(response))
}

/// GET /api/v1/sessions/:id/shortlist?top_n=N | ?threshold=C
///
/// Cuts a shortlist from the stored result without re-running the pipeline.
pub async fn handle_shortlist(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    query: Result<Query<ShortlistQuery>, QueryRejection>,
) -> Result<Json<ShortlistResponse>, AppError> {
    let Query(query) =
        query.map_err(|e| AppError::Validation(format!("invalid shortlist query: {}", e.body_text())))?;
    let mode = query.mode()?;
    let session = state.sessions.get(id).await?;
    let result = session.result.ok_or_else(|| {
        AppError::UnprocessableEntity("session has not been screened yet".to_string())
    })?;

    let rows = shortlist(&result.ranked, mode)?.rows();

    Ok(Json(ShortlistResponse {
        run_id: result.run_id,
        mode,
        total_candidates: result.ranked.len(),
        rows,
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

impl JobDescriptionInput {
    /// Selected skills win over free text; one of the two is required.
    fn resolve(&self) -> Result<String, AppError> {
        if !self.skills.is_empty() {
            let set: TokenSet = self.skills.iter().collect();
            return Ok(set.to_text());
        }
        match self.text.as_deref() {
            Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
            _ => Err(AppError::Validation(
                "job description text or at least one skill is required".to_string(),
            )),
        }
    }
}

impl ShortlistQuery {
    fn mode(&self) -> Result<ShortlistMode, AppError> {
        match (self.top_n, self.threshold) {
            (Some(n), None) => NonZeroUsize::new(n)
                .map(ShortlistMode::TopN)
                .ok_or_else(|| AppError::Validation("top_n must be at least 1".to_string())),
            (None, Some(cutoff)) => Ok(ShortlistMode::Threshold(cutoff)),
            _ => Err(AppError::Validation(
                "provide exactly one of top_n or threshold".to_string(),
            )),
        }
    }
}

/// Runs the CPU-bound pipeline off the async executor.
async fn run_screening(
    state: &AppState,
    request: ScreeningRequest,
) -> Result<ScreeningResult, AppError> {
    let vectorizer = state.vectorizer;
    let scorer = state.scorer.clone();
    tokio::task::spawn_blocking(move || screen(request, &vectorizer, scorer.as_ref()))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in screening: {e}")))?
}

fn screen_response(
    result: &ScreeningResult,
    mode: Option<ShortlistMode>,
) -> Result<ScreenResponse, AppError> {
    let shortlist = mode
        .map(|mode| shortlist(&result.ranked, mode).map(|s| s.rows()))
        .transpose()?;

    Ok(ScreenResponse {
        run_id: result.run_id,
        scorer_backend: result.scorer_backend.clone(),
        vocabulary_size: result.vocabulary_size,
        screened_at: result.screened_at,
        results: result.ranked.rows(),
        shortlist,
        flagged: result.flagged.clone(),
    })
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::Validation(format!("invalid multipart upload: {}", e.body_text()))
    }
}
