use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::models::job::{Job, JobType};
use crate::services::store::JobPage;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateJobPayload {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 200))]
    pub company: String,
    #[validate(length(min = 1, max = 200))]
    pub location: String,
    pub salary: Option<String>,
    #[validate(length(min = 1))]
    pub description: String,
    #[serde(default)]
    pub skills: Vec<String>,
    pub job_type: Option<JobType>,
    pub is_open: Option<bool>,
    /// Owner of the posting. Required when an admin creates a job, ignored
    /// for recruiters.
    pub recruiter_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateJobPayload {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub company: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub location: Option<String>,
    pub salary: Option<String>,
    #[validate(length(min = 1))]
    pub description: Option<String>,
    pub skills: Option<Vec<String>>,
    pub job_type: Option<JobType>,
    pub is_open: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, IntoParams)]
#[serde(default)]
#[into_params(parameter_in = Query)]
pub struct JobListQuery {
    /// Matches title, company or location.
    pub search: Option<String>,
    pub company: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JobResponse {
    pub id: Uuid,
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary: Option<String>,
    pub description: String,
    pub skills: Vec<String>,
    pub job_type: JobType,
    pub recruiter_id: Uuid,
    pub is_open: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JobListResponse {
    pub items: Vec<JobResponse>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RemoveJobResponse {
    pub id: Uuid,
    pub cancelled_applications: u64,
}

impl From<Job> for JobResponse {
    fn from(value: Job) -> Self {
        Self {
            id: value.id,
            title: value.title,
            company: value.company,
            location: value.location,
            salary: value.salary,
            description: value.description,
            skills: value.skills,
            job_type: value.job_type,
            recruiter_id: value.recruiter_id,
            is_open: value.is_open,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

impl From<JobPage> for JobListResponse {
    fn from(value: JobPage) -> Self {
        Self {
            items: value.items.into_iter().map(Into::into).collect(),
            total: value.total,
            page: value.page,
            per_page: value.per_page,
            total_pages: value.total_pages,
        }
    }
}
