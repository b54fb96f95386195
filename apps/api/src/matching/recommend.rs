//! Database-backed matching flows: recommendations and match history.
//!
//! Both load their rows first and score afterwards. No connection is held
//! while a matcher runs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::applications::jobs_applied_by;
use crate::jobs::board::{list_jobs, JobFilter};
use crate::matching::fit::{CandidateProfile, JobMatch, JobMatcher, JobProfile};
use crate::matching::ranker::{rank_jobs, Recommendation};
use crate::pagination::{paginate, Pagination, PageParams};
use crate::users::profiles::get_user;

#[derive(Debug, Serialize)]
pub struct RecommendationPage {
    pub recommendations: Vec<Recommendation>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct MatchHistoryEntry {
    pub job_id: Uuid,
    pub title: String,
    pub company: String,
    pub applied_at: DateTime<Utc>,
    pub job_match: JobMatch,
}

#[derive(Debug, Serialize)]
pub struct MatchHistoryPage {
    pub match_history: Vec<MatchHistoryEntry>,
    pub pagination: Pagination,
}

/// Takes one page of active jobs (newest first, filtered), ranks it for the
/// user and keeps the best `limit`.
pub async fn recommend_jobs(
    pool: &PgPool,
    matcher: &dyn JobMatcher,
    user_id: Uuid,
    filter: &JobFilter,
    params: PageParams,
    limit: usize,
) -> Result<RecommendationPage, AppError> {
    let candidate = CandidateProfile::from(&get_user(pool, user_id).await?);
    let page = list_jobs(pool, filter, params).await?;
    let recommendations = rank_jobs(matcher, &candidate, page.items, limit).await;
    info!(
        "Recommended {} jobs to user {user_id} (page {})",
        recommendations.len(),
        page.pagination.current_page
    );
    Ok(RecommendationPage {
        recommendations,
        pagination: page.pagination,
    })
}

/// Scores every job the user applied to, one page at a time, most recent
/// application first.
pub async fn match_history(
    pool: &PgPool,
    matcher: &dyn JobMatcher,
    user_id: Uuid,
    params: PageParams,
) -> Result<MatchHistoryPage, AppError> {
    let candidate = CandidateProfile::from(&get_user(pool, user_id).await?);
    let page = paginate(jobs_applied_by(pool, user_id).await?, params);

    let mut match_history = Vec::with_capacity(page.items.len());
    for applied in page.items {
        match matcher.score(&JobProfile::from(&applied.job), &candidate).await {
            Ok(job_match) => match_history.push(MatchHistoryEntry {
                job_id: applied.job.id,
                title: applied.job.title,
                company: applied.job.company,
                applied_at: applied.application.applied_at,
                job_match,
            }),
            Err(e) => warn!("Skipping job {} in match history: {e}", applied.job.id),
        }
    }

    Ok(MatchHistoryPage {
        match_history,
        pagination: page.pagination,
    })
}
