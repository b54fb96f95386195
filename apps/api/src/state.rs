use sqlx::PgPool;

use crate::config::Config;
use crate::matching::extraction::SkillExtractor;
use crate::matching::fit::Matchers;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    /// Heuristic matcher always; remote matcher only when an AI key is configured.
    pub matchers: Matchers,
    pub extractor: SkillExtractor,
}
