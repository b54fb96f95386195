use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::jobs::applications::{
    applications_for_employer, apply, cancel_application, jobs_applied_by, jobs_posted_by,
    set_application_status, AppliedJob, EmployerApplications,
};
use crate::jobs::board::{
    create_job, delete_job, get_job, list_jobs, update_job, JobFilter, JobUpdate, NewJob,
};
use crate::models::job::{Application, ApplicationStatus, Job, JobType};
use crate::pagination::{Page, PageParams};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct JobListQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub search: Option<String>,
    /// Comma-separated skill names.
    pub skills: Option<String>,
    pub location: Option<String>,
    pub job_type: Option<JobType>,
    pub min_salary: Option<f64>,
    pub max_salary: Option<f64>,
}

impl JobListQuery {
    fn split(self) -> (JobFilter, PageParams) {
        let skills = self
            .skills
            .map(|s| {
                s.split(',')
                    .map(|part| part.trim().to_string())
                    .filter(|part| !part.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        (
            JobFilter {
                search: self.search,
                skills,
                location: self.location,
                job_type: self.job_type,
                min_salary: self.min_salary,
                max_salary: self.max_salary,
            },
            PageParams {
                page: self.page,
                limit: self.limit,
            },
        )
    }
}

#[derive(Deserialize)]
pub struct ApplyRequest {
    pub cover_letter: String,
}

#[derive(Deserialize)]
pub struct ApplicationStatusRequest {
    pub status: ApplicationStatus,
}

/// GET /api/v1/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobListQuery>,
) -> Result<Json<Page<Job>>, AppError> {
    let (filter, params) = query.split();
    Ok(Json(list_jobs(&state.db, &filter, params).await?))
}

/// POST /api/v1/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<NewJob>,
) -> Result<(StatusCode, Json<Job>), AppError> {
    let job = create_job(&state.db, user.id, req).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /api/v1/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Job>, AppError> {
    Ok(Json(get_job(&state.db, id).await?))
}

/// PUT /api/v1/jobs/:id
pub async fn handle_update_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(update): Json<JobUpdate>,
) -> Result<Json<Job>, AppError> {
    Ok(Json(update_job(&state.db, id, user.id, update).await?))
}

/// DELETE /api/v1/jobs/:id
pub async fn handle_delete_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    delete_job(&state.db, id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/jobs/:id/apply
pub async fn handle_apply(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<ApplyRequest>,
) -> Result<(StatusCode, Json<Application>), AppError> {
    let application = apply(&state.db, id, user.id, &req.cover_letter).await?;
    Ok((StatusCode::CREATED, Json(application)))
}

/// DELETE /api/v1/jobs/:id/apply
pub async fn handle_cancel_application(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    cancel_application(&state.db, id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/jobs/:id/applications/:app_id
pub async fn handle_set_application_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, app_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<ApplicationStatusRequest>,
) -> Result<Json<Application>, AppError> {
    let application = set_application_status(&state.db, id, app_id, user.id, req.status).await?;
    Ok(Json(application))
}

/// GET /api/v1/jobs/mine
pub async fn handle_my_jobs(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<Job>>, AppError> {
    Ok(Json(jobs_posted_by(&state.db, user.id).await?))
}

/// GET /api/v1/jobs/applied
pub async fn handle_applied_jobs(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<AppliedJob>>, AppError> {
    Ok(Json(jobs_applied_by(&state.db, user.id).await?))
}

/// GET /api/v1/jobs/mine/applications
pub async fn handle_my_applications(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<EmployerApplications>, AppError> {
    Ok(Json(applications_for_employer(&state.db, user.id).await?))
}
