use std::sync::Arc;

use crate::config::Config;
use crate::screening::similarity::SimilarityScorer;
use crate::screening::vectorizer::Vectorizer;
use crate::sessions::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub vectorizer: Vectorizer,
    /// Pluggable similarity scorer. Default: CosineScorer. Swap via SCORING_STRATEGY env.
    pub scorer: Arc<dyn SimilarityScorer>,
    /// Interactive sessions. Screening runs themselves are stateless.
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            vectorizer: Vectorizer::new(config.term_frequency),
            scorer: config.scoring_strategy.scorer(),
            sessions: SessionStore::new(config.session_ttl),
            config,
        }
    }
}
