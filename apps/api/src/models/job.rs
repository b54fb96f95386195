use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(type_name = "job_type", rename_all = "kebab-case")]
pub enum JobType {
    #[default]
    FullTime,
    PartTime,
    Contract,
    Internship,
    Freelance,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    #[default]
    Pending,
    Reviewed,
    Accepted,
    Rejected,
}

fn default_currency() -> String {
    "USD".to_string()
}

/// Salary range. `min < max` is expected but not enforced here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub min: f64,
    pub max: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: Uuid,
    pub applicant: Uuid,
    pub cover_letter: String,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
}

/// Payment details the employer supplied when posting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobPayment {
    #[serde(default)]
    pub payment_verified: bool,
    #[serde(default)]
    pub payment_tx_hash: String,
    #[serde(default)]
    pub payment_amount: f64,
    #[serde(default)]
    pub wallet_address: String,
    #[serde(default)]
    pub blockchain_job_id: Option<i64>,
}

impl JobPayment {
    /// A posting is allowed once the payment is verified or a transaction hash is on file.
    pub fn satisfies_posting_gate(&self) -> bool {
        self.payment_verified || !self.payment_tx_hash.trim().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub company: String,
    pub location: String,
    pub job_type: JobType,
    pub skills: Vec<String>,
    pub budget: Budget,
    pub tags: Vec<String>,
    pub employer: Uuid,
    pub applications: Vec<Application>,
    #[serde(flatten)]
    pub payment: JobPayment,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A `jobs` row. Budget and applications are JSONB.
#[derive(Debug, FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub company: String,
    pub location: String,
    pub job_type: JobType,
    pub skills: Vec<String>,
    pub budget: Json<Budget>,
    pub tags: Vec<String>,
    pub employer: Uuid,
    pub applications: Json<Vec<Application>>,
    pub payment_verified: bool,
    pub payment_tx_hash: String,
    pub payment_amount: f64,
    pub wallet_address: String,
    pub blockchain_job_id: Option<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<JobRow> for Job {
    fn from(row: JobRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            company: row.company,
            location: row.location,
            job_type: row.job_type,
            skills: row.skills,
            budget: row.budget.0,
            tags: row.tags,
            employer: row.employer,
            applications: row.applications.0,
            payment: JobPayment {
                payment_verified: row.payment_verified,
                payment_tx_hash: row.payment_tx_hash,
                payment_amount: row.payment_amount,
                wallet_address: row.wallet_address,
                blockchain_job_id: row.blockchain_job_id,
            },
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl Job {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.employer == user_id
    }

    pub fn application_of(&self, applicant: Uuid) -> Option<&Application> {
        self.applications.iter().find(|a| a.applicant == applicant)
    }

    /// Appends an application, enforcing one per applicant and an active posting.
    pub fn apply(&mut self, applicant: Uuid, cover_letter: &str) -> Result<&Application, AppError> {
        if !self.is_active {
            return Err(AppError::validation("This job is no longer active"));
        }
        if self.application_of(applicant).is_some() {
            return Err(AppError::validation("You have already applied for this job"));
        }
        let cover_letter = cover_letter.trim();
        if cover_letter.is_empty() {
            return Err(AppError::validation("Cover letter is required"));
        }

        self.applications.push(Application {
            id: Uuid::new_v4(),
            applicant,
            cover_letter: cover_letter.to_string(),
            status: ApplicationStatus::Pending,
            applied_at: Utc::now(),
        });
        let last = self.applications.len() - 1;
        Ok(&self.applications[last])
    }

    /// Removes the applicant's application.
    pub fn cancel_application(&mut self, applicant: Uuid) -> Result<Application, AppError> {
        let index = self
            .applications
            .iter()
            .position(|a| a.applicant == applicant)
            .ok_or_else(|| AppError::validation("You have not applied for this job"))?;
        Ok(self.applications.remove(index))
    }

    pub fn set_application_status(
        &mut self,
        application_id: Uuid,
        status: ApplicationStatus,
    ) -> Result<&Application, AppError> {
        let application = self
            .applications
            .iter_mut()
            .find(|a| a.id == application_id)
            .ok_or_else(|| AppError::not_found("Application"))?;
        application.status = status;
        Ok(application)
    }
}
