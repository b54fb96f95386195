use chrono::Utc;
use serde::Deserialize;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::db::like_pattern;
use crate::errors::AppError;
use crate::models::job::{Budget, Job, JobPayment, JobRow, JobType};
use crate::pagination::{Page, PageParams};

const DEFAULT_LOCATION: &str = "Remote";

/// Shared by the page and count queries of [`list_jobs`].
const ACTIVE_JOB_FILTER: &str = r#"
    is_active
    AND ($1::text IS NULL
         OR title ILIKE $1 OR description ILIKE $1 OR company ILIKE $1
         OR EXISTS (SELECT 1 FROM unnest(skills) AS s(skill) WHERE s.skill ILIKE $1))
    AND (cardinality($2::text[]) = 0 OR skills && $2::text[])
    AND ($3::text IS NULL OR location ILIKE $3)
    AND ($4::job_type IS NULL OR job_type = $4)
    AND ($5::float8 IS NULL OR (budget->>'min')::float8 >= $5)
    AND ($6::float8 IS NULL OR (budget->>'max')::float8 <= $6)
"#;

/// Listing filters. Every field is optional and they combine with AND.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobFilter {
    /// Case-insensitive text over title, description, company and skills.
    pub search: Option<String>,
    /// Any-of, exact skill names.
    #[serde(default)]
    pub skills: Vec<String>,
    pub location: Option<String>,
    pub job_type: Option<JobType>,
    pub min_salary: Option<f64>,
    pub max_salary: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct NewJob {
    pub title: String,
    pub description: String,
    pub company: String,
    pub location: Option<String>,
    #[serde(default)]
    pub job_type: JobType,
    #[serde(default)]
    pub skills: Vec<String>,
    pub budget: Budget,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub payment: JobPayment,
}

#[derive(Debug, Default, Deserialize)]
pub struct JobUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub job_type: Option<JobType>,
    pub skills: Option<Vec<String>>,
    pub budget: Option<Budget>,
    pub tags: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

impl JobUpdate {
    /// Checks every field first and only then writes, so a rejected update
    /// leaves `job` exactly as it was.
    pub fn apply(self, job: &mut Job) -> Result<(), AppError> {
        let title = self.title.as_deref().map(|t| require("Title", t)).transpose()?;
        let description = self
            .description
            .as_deref()
            .map(|d| require("Description", d))
            .transpose()?;
        let company = self
            .company
            .as_deref()
            .map(|c| require("Company", c))
            .transpose()?;

        if let Some(title) = title {
            job.title = title;
        }
        if let Some(description) = description {
            job.description = description;
        }
        if let Some(company) = company {
            job.company = company;
        }
        if let Some(location) = self.location {
            job.location = location.trim().to_string();
        }
        if let Some(job_type) = self.job_type {
            job.job_type = job_type;
        }
        if let Some(skills) = self.skills {
            job.skills = clean_list(skills);
        }
        if let Some(budget) = self.budget {
            job.budget = budget;
        }
        if let Some(tags) = self.tags {
            job.tags = clean_list(tags);
        }
        if let Some(is_active) = self.is_active {
            job.is_active = is_active;
        }
        job.updated_at = Utc::now();
        Ok(())
    }
}

fn require(field: &str, value: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Active jobs matching `filter`, newest first, one page.
pub async fn list_jobs(
    pool: &PgPool,
    filter: &JobFilter,
    params: PageParams,
) -> Result<Page<Job>, AppError> {
    let search = filter.search.as_deref().and_then(like_pattern);
    let location = filter.location.as_deref().and_then(like_pattern);

    let total: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM jobs WHERE {ACTIVE_JOB_FILTER}"
    ))
    .bind(&search)
    .bind(&filter.skills)
    .bind(&location)
    .bind(filter.job_type)
    .bind(filter.min_salary)
    .bind(filter.max_salary)
    .fetch_one(pool)
    .await?;

    let rows = sqlx::query_as::<_, JobRow>(&format!(
        "SELECT * FROM jobs WHERE {ACTIVE_JOB_FILTER} \
         ORDER BY created_at DESC, id DESC LIMIT $7 OFFSET $8"
    ))
    .bind(&search)
    .bind(&filter.skills)
    .bind(&location)
    .bind(filter.job_type)
    .bind(filter.min_salary)
    .bind(filter.max_salary)
    .bind(params.sql_limit())
    .bind(params.sql_offset())
    .fetch_all(pool)
    .await?;

    Ok(Page::from_rows(
        rows.into_iter().map(Job::from).collect(),
        params,
        total,
    ))
}

pub async fn get_job(pool: &PgPool, job_id: Uuid) -> Result<Job, AppError> {
    sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1")
        .bind(job_id)
        .fetch_optional(pool)
        .await?
        .map(Job::from)
        .ok_or_else(|| AppError::not_found("Job"))
}

/// Loads a job and holds its row lock until the surrounding transaction ends.
pub(crate) async fn lock_job(conn: &mut PgConnection, job_id: Uuid) -> Result<Job, AppError> {
    sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1 FOR UPDATE")
        .bind(job_id)
        .fetch_optional(&mut *conn)
        .await?
        .map(Job::from)
        .ok_or_else(|| AppError::not_found("Job"))
}

pub(crate) async fn insert_job(pool: &PgPool, job: &Job) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO jobs
            (id, title, description, company, location, job_type, skills, budget, tags,
             employer, applications, payment_verified, payment_tx_hash, payment_amount,
             wallet_address, blockchain_job_id, is_active, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17, $18, $19)
        "#,
    )
    .bind(job.id)
    .bind(&job.title)
    .bind(&job.description)
    .bind(&job.company)
    .bind(&job.location)
    .bind(job.job_type)
    .bind(&job.skills)
    .bind(Json(&job.budget))
    .bind(&job.tags)
    .bind(job.employer)
    .bind(Json(&job.applications))
    .bind(job.payment.payment_verified)
    .bind(&job.payment.payment_tx_hash)
    .bind(job.payment.payment_amount)
    .bind(&job.payment.wallet_address)
    .bind(job.payment.blockchain_job_id)
    .bind(job.is_active)
    .bind(job.created_at)
    .bind(job.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Writes back every mutable column, including the embedded applications.
pub(crate) async fn save_job(conn: &mut PgConnection, job: &Job) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE jobs
        SET title = $2, description = $3, company = $4, location = $5, job_type = $6,
            skills = $7, budget = $8, tags = $9, applications = $10, is_active = $11,
            updated_at = $12
        WHERE id = $1
        "#,
    )
    .bind(job.id)
    .bind(&job.title)
    .bind(&job.description)
    .bind(&job.company)
    .bind(&job.location)
    .bind(job.job_type)
    .bind(&job.skills)
    .bind(Json(&job.budget))
    .bind(&job.tags)
    .bind(Json(&job.applications))
    .bind(job.is_active)
    .bind(job.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Posts a job. The posting must be paid for.
pub async fn create_job(pool: &PgPool, employer: Uuid, req: NewJob) -> Result<Job, AppError> {
    let title = require("Title", &req.title)?;
    let description = require("Description", &req.description)?;
    let company = require("Company", &req.company)?;
    if !req.payment.satisfies_posting_gate() {
        return Err(AppError::validation(
            "Payment is required to post a job: provide a verified payment or a transaction hash",
        ));
    }

    let now = Utc::now();
    let job = Job {
        id: Uuid::new_v4(),
        title,
        description,
        company,
        location: req
            .location
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
        job_type: req.job_type,
        skills: clean_list(req.skills),
        budget: req.budget,
        tags: clean_list(req.tags),
        employer,
        applications: vec![],
        payment: req.payment,
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    insert_job(pool, &job).await?;
    info!("Job {} posted by {employer}", job.id);
    Ok(job)
}

pub async fn update_job(
    pool: &PgPool,
    job_id: Uuid,
    user_id: Uuid,
    update: JobUpdate,
) -> Result<Job, AppError> {
    let mut tx = pool.begin().await?;
    let mut job = lock_job(&mut tx, job_id).await?;
    if !job.is_owned_by(user_id) {
        return Err(AppError::forbidden("Only the employer can update this job"));
    }

    update.apply(&mut job)?;
    save_job(&mut tx, &job).await?;
    tx.commit().await?;

    info!("Job {job_id} updated");
    Ok(job)
}

pub async fn delete_job(pool: &PgPool, job_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
    let employer: Uuid = sqlx::query_scalar("SELECT employer FROM jobs WHERE id = $1")
        .bind(job_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Job"))?;
    if employer != user_id {
        return Err(AppError::forbidden("Only the employer can delete this job"));
    }

    sqlx::query("DELETE FROM jobs WHERE id = $1")
        .bind(job_id)
        .execute(pool)
        .await?;
    info!("Job {job_id} deleted");
    Ok(())
}
