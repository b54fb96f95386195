use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::jobs::board::{get_job, JobFilter};
use crate::matching::analysis::{
    analyze_job_description, application_suggestions, ApplicationSuggestions, JobAnalysis,
};
use crate::matching::extraction::{Extraction, MAX_BATCH};
use crate::matching::fit::{CandidateProfile, JobMatch, JobProfile, MatcherKind};
use crate::matching::recommend::{
    match_history, recommend_jobs, MatchHistoryPage, RecommendationPage,
};
use crate::models::job::JobType;
use crate::pagination::PageParams;
use crate::state::AppState;
use crate::users::profiles::get_user;

#[derive(Deserialize)]
pub struct ExtractSkillsRequest {
    pub content: String,
}

/// A batch entry is either plain text or `{"text": "..."}`.
#[derive(Deserialize)]
#[serde(untagged)]
pub enum BatchItem {
    Text(String),
    Object { text: String },
}

impl BatchItem {
    fn into_text(self) -> String {
        match self {
            BatchItem::Text(text) | BatchItem::Object { text } => text,
        }
    }
}

#[derive(Deserialize)]
pub struct BatchExtractRequest {
    pub contents: Vec<BatchItem>,
}

#[derive(Serialize)]
pub struct BatchExtractItem {
    pub content: String,
    #[serde(flatten)]
    pub extraction: Extraction,
}

#[derive(Serialize)]
pub struct BatchExtractResponse {
    pub results: Vec<BatchExtractItem>,
    pub total_processed: usize,
}

#[derive(Deserialize)]
pub struct JobMatchRequest {
    pub job_id: Uuid,
    #[serde(default)]
    pub model: MatcherKind,
}

#[derive(Serialize)]
pub struct JobSummary {
    pub id: Uuid,
    pub title: String,
    pub company: String,
    pub skills: Vec<String>,
}

#[derive(Serialize)]
pub struct CandidateSummary {
    pub id: Uuid,
    pub name: String,
    pub skills: Vec<String>,
}

#[derive(Serialize)]
pub struct JobMatchResponse {
    pub job_match: JobMatch,
    pub model: MatcherKind,
    pub job: JobSummary,
    pub candidate: CandidateSummary,
}

#[derive(Deserialize)]
pub struct RecommendationsQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub location: Option<String>,
    pub job_type: Option<JobType>,
    #[serde(default)]
    pub model: MatcherKind,
}

#[derive(Deserialize)]
pub struct AnalyzeJobRequest {
    pub job_description: String,
}

#[derive(Deserialize)]
pub struct SuggestionsRequest {
    pub job_id: Uuid,
}

#[derive(Serialize)]
pub struct SuggestionsResponse {
    pub suggestions: ApplicationSuggestions,
    pub job: JobSummary,
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    #[serde(default)]
    pub model: MatcherKind,
}

/// POST /api/v1/ai/extract-skills
pub async fn handle_extract_skills(
    State(state): State<AppState>,
    Json(req): Json<ExtractSkillsRequest>,
) -> Result<Json<Extraction>, AppError> {
    if req.content.trim().is_empty() {
        return Err(AppError::validation("Content is required"));
    }
    Ok(Json(state.extractor.extract(&req.content)))
}

/// POST /api/v1/ai/batch-skill-extraction
pub async fn handle_batch_extract(
    State(state): State<AppState>,
    Json(req): Json<BatchExtractRequest>,
) -> Result<Json<BatchExtractResponse>, AppError> {
    if req.contents.len() > MAX_BATCH {
        return Err(AppError::validation(format!(
            "Maximum {MAX_BATCH} content pieces allowed per request"
        )));
    }
    let results: Vec<BatchExtractItem> = req
        .contents
        .into_iter()
        .map(BatchItem::into_text)
        .map(|content| BatchExtractItem {
            extraction: state.extractor.extract(&content),
            content,
        })
        .collect();
    Ok(Json(BatchExtractResponse {
        total_processed: results.len(),
        results,
    }))
}

/// POST /api/v1/ai/job-match
pub async fn handle_job_match(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<JobMatchRequest>,
) -> Result<Json<JobMatchResponse>, AppError> {
    let job = get_job(&state.db, req.job_id).await?;
    let user = get_user(&state.db, user.id).await?;

    info!("Matching user {} against job {} ({:?})", user.id, job.id, req.model);
    let job_match = state
        .matchers
        .select(req.model)
        .score(&JobProfile::from(&job), &CandidateProfile::from(&user))
        .await?;

    Ok(Json(JobMatchResponse {
        job_match,
        model: req.model,
        job: JobSummary {
            id: job.id,
            title: job.title,
            company: job.company,
            skills: job.skills,
        },
        candidate: CandidateSummary {
            id: user.id,
            name: user.name,
            skills: user.skills,
        },
    }))
}

/// GET /api/v1/ai/job-recommendations
pub async fn handle_job_recommendations(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<RecommendationsQuery>,
) -> Result<Json<RecommendationPage>, AppError> {
    let limit = query
        .limit
        .unwrap_or(state.config.recommendation_limit)
        .max(1);
    let filter = JobFilter {
        location: query.location,
        job_type: query.job_type,
        ..Default::default()
    };
    let params = PageParams {
        page: query.page,
        limit: Some(limit),
    };
    let matcher = state.matchers.select(query.model);
    let page = recommend_jobs(
        &state.db,
        matcher.as_ref(),
        user.id,
        &filter,
        params,
        limit,
    )
    .await?;
    Ok(Json(page))
}

/// POST /api/v1/ai/analyze-job
pub async fn handle_analyze_job(
    Json(req): Json<AnalyzeJobRequest>,
) -> Result<Json<JobAnalysis>, AppError> {
    if req.job_description.trim().is_empty() {
        return Err(AppError::validation("Job description is required"));
    }
    Ok(Json(analyze_job_description(&req.job_description)))
}

/// POST /api/v1/ai/application-suggestions
pub async fn handle_application_suggestions(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<SuggestionsRequest>,
) -> Result<Json<SuggestionsResponse>, AppError> {
    let job = get_job(&state.db, req.job_id).await?;
    let user = get_user(&state.db, user.id).await?;

    Ok(Json(SuggestionsResponse {
        suggestions: application_suggestions(&CandidateProfile::from(&user)),
        job: JobSummary {
            id: job.id,
            title: job.title,
            company: job.company,
            skills: job.skills,
        },
    }))
}

/// GET /api/v1/ai/match-history
pub async fn handle_match_history(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<MatchHistoryPage>, AppError> {
    let params = PageParams {
        page: query.page,
        limit: query.limit,
    };
    let matcher = state.matchers.select(query.model);
    Ok(Json(
        match_history(&state.db, matcher.as_ref(), user.id, params).await?,
    ))
}
