//! In-memory session store for the interactive flow:
//! job description → candidate upload → screening → shortlists.
//!
//! Owned by the HTTP layer; the engine never sees it. Changing the job
//! description or the candidate set drops the previous result and bumps the
//! session revision; a result computed against an older revision is refused.
//! Sessions idle for longer than the configured TTL are purged lazily.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;
use crate::extraction::ExtractedDocument;
use crate::models::NormalizedDocument;
use crate::screening::pipeline::ScreeningResult;

#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub job_description: Option<NormalizedDocument>,
    pub candidates: Vec<ExtractedDocument>,
    pub result: Option<ScreeningResult>,
    /// Bumped whenever the screening inputs change.
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            job_description: None,
            candidates: Vec::new(),
            result: None,
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_job_description(&mut self, job_description: NormalizedDocument) {
        self.job_description = Some(job_description);
        self.inputs_changed();
    }

    pub fn set_candidates(&mut self, candidates: Vec<ExtractedDocument>) {
        self.candidates = candidates;
        self.inputs_changed();
    }

    /// Stores a result computed from the inputs at `revision`.
    pub fn set_result(&mut self, revision: u64, result: ScreeningResult) -> Result<(), AppError> {
        if revision != self.revision {
            return Err(AppError::Conflict(format!(
                "session {} changed while screening (revision {revision} -> {}); screen again",
                self.id, self.revision
            )));
        }
        self.result = Some(result);
        self.updated_at = Utc::now();
        Ok(())
    }

    fn inputs_changed(&mut self) {
        self.result = None;
        self.revision += 1;
        self.updated_at = Utc::now();
    }

    fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        (now - self.updated_at)
            .to_std()
            .map(|idle| idle > ttl)
            .unwrap_or(false)
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.id,
            has_job_description: self.job_description.is_some(),
            candidate_count: self.candidates.len(),
            screened: self.result.is_some(),
            revision: self.revision,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub has_job_description: bool,
    pub candidate_count: usize,
    pub screened: bool,
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, Session>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::default(),
            ttl,
        }
    }

    /// Creates a session, dropping any that have gone idle.
    pub async fn create(&self) -> SessionSummary {
        let session = Session::new();
        let summary = session.summary();

        let mut sessions = self.inner.write().await;
        let now = Utc::now();
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(self.ttl, now));
        let purged = before - sessions.len();
        if purged > 0 {
            debug!(purged, "Expired sessions purged");
        }
        sessions.insert(session.id, session);
        summary
    }

    /// Returns a snapshot of the session.
    pub async fn get(&self, id: Uuid) -> Result<Session, AppError> {
        self.inner
            .read()
            .await
            .get(&id)
            .filter(|s| !s.is_expired(self.ttl, Utc::now()))
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    /// Applies `f` to the session under the write lock.
    pub async fn update<F, T>(&self, id: Uuid, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut Session) -> T,
    {
        let mut sessions = self.inner.write().await;
        let session = sessions
            .get_mut(&id)
            .filter(|s| !s.is_expired(self.ttl, Utc::now()))
            .ok_or_else(|| not_found(id))?;
        Ok(f(session))
    }

    pub async fn remove(&self, id: Uuid) -> Result<(), AppError> {
        self.inner
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| not_found(id))
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Session {id} not found"))
}
