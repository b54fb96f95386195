use chrono::Utc;
use serde::Serialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::board::{lock_job, save_job};
use crate::models::job::{Application, ApplicationStatus, Job, JobRow};

/// A job together with the caller's own application to it.
#[derive(Debug, Clone, Serialize)]
pub struct AppliedJob {
    pub job: Job,
    pub application: Application,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobApplications {
    pub job_id: Uuid,
    pub title: String,
    pub is_active: bool,
    pub applications: Vec<Application>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmployerApplications {
    pub jobs: Vec<JobApplications>,
    pub total_jobs: usize,
    pub total_applications: usize,
}

pub async fn apply(
    pool: &PgPool,
    job_id: Uuid,
    applicant: Uuid,
    cover_letter: &str,
) -> Result<Application, AppError> {
    let mut tx = pool.begin().await?;
    let mut job = lock_job(&mut tx, job_id).await?;
    let application = job.apply(applicant, cover_letter)?.clone();
    job.updated_at = Utc::now();
    save_job(&mut tx, &job).await?;
    tx.commit().await?;

    info!("User {applicant} applied to job {job_id}");
    Ok(application)
}

pub async fn cancel_application(
    pool: &PgPool,
    job_id: Uuid,
    applicant: Uuid,
) -> Result<Application, AppError> {
    let mut tx = pool.begin().await?;
    let mut job = lock_job(&mut tx, job_id).await?;
    let removed = job.cancel_application(applicant)?;
    job.updated_at = Utc::now();
    save_job(&mut tx, &job).await?;
    tx.commit().await?;

    info!("User {applicant} withdrew from job {job_id}");
    Ok(removed)
}

/// Jobs the employer posted, newest first.
pub async fn jobs_posted_by(pool: &PgPool, employer: Uuid) -> Result<Vec<Job>, AppError> {
    let rows = sqlx::query_as::<_, JobRow>(
        "SELECT * FROM jobs WHERE employer = $1 ORDER BY created_at DESC, id DESC",
    )
    .bind(employer)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Job::from).collect())
}

/// Jobs the applicant applied to, most recent application first.
pub async fn jobs_applied_by(pool: &PgPool, applicant: Uuid) -> Result<Vec<AppliedJob>, AppError> {
    let rows = sqlx::query_as::<_, JobRow>(
        r#"
        SELECT * FROM jobs
        WHERE applications @> jsonb_build_array(jsonb_build_object('applicant', $1::text))
        "#,
    )
    .bind(applicant.to_string())
    .fetch_all(pool)
    .await?;

    let mut applied: Vec<AppliedJob> = rows
        .into_iter()
        .map(Job::from)
        .filter_map(|job| {
            job.application_of(applicant)
                .cloned()
                .map(|application| AppliedJob { application, job })
        })
        .collect();
    applied.sort_by(|a, b| {
        b.application
            .applied_at
            .cmp(&a.application.applied_at)
            .then_with(|| b.job.id.cmp(&a.job.id))
    });
    Ok(applied)
}

/// Every application received across the employer's jobs.
pub async fn applications_for_employer(
    pool: &PgPool,
    employer: Uuid,
) -> Result<EmployerApplications, AppError> {
    let jobs: Vec<JobApplications> = jobs_posted_by(pool, employer)
        .await?
        .into_iter()
        .map(|job| JobApplications {
            job_id: job.id,
            title: job.title,
            is_active: job.is_active,
            applications: job.applications,
        })
        .collect();
    Ok(EmployerApplications {
        total_jobs: jobs.len(),
        total_applications: jobs.iter().map(|j| j.applications.len()).sum(),
        jobs,
    })
}

pub async fn set_application_status(
    pool: &PgPool,
    job_id: Uuid,
    application_id: Uuid,
    owner: Uuid,
    status: ApplicationStatus,
) -> Result<Application, AppError> {
    let mut tx = pool.begin().await?;
    let mut job = lock_job(&mut tx, job_id).await?;
    if !job.is_owned_by(owner) {
        return Err(AppError::forbidden(
            "Only the employer can review applications",
        ));
    }
    let application = job.set_application_status(application_id, status)?.clone();
    job.updated_at = Utc::now();
    save_job(&mut tx, &job).await?;
    tx.commit().await?;

    info!("Application {application_id} on job {job_id} set to {status:?}");
    Ok(application)
}
