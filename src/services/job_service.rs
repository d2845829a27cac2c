use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::dto::job_dto::{CreateJobPayload, JobListQuery, UpdateJobPayload};
use crate::error::{Error, Result};
use crate::models::job::Job;
use crate::models::user::Role;
use crate::services::access::{can_manage_job, ensure, Actor};
use crate::services::store::{JobFilter, JobPage, Store};
use crate::utils::validation::{clean_tags, require_text};

const DEFAULT_PER_PAGE: i64 = 20;
const MAX_PER_PAGE: i64 = 100;

#[derive(Clone)]
pub struct JobService {
    store: Arc<dyn Store>,
}

impl JobService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create(&self, actor: &Actor, payload: CreateJobPayload) -> Result<Job> {
        actor.require_role(&[Role::Recruiter, Role::Admin])?;

        let recruiter_id = match actor.role {
            Role::Admin => {
                let owner_id = payload.recruiter_id.ok_or_else(|| {
                    Error::InvalidInput("recruiter_id is required when an admin posts a job".into())
                })?;
                let owner = self
                    .store
                    .find_user(owner_id)
                    .await?
                    .ok_or_else(|| Error::NotFound("Recruiter not found".into()))?;
                if owner.role != Role::Recruiter {
                    return Err(Error::InvalidInput(
                        "Job owner must be a recruiter".into(),
                    ));
                }
                owner.id
            }
            _ => actor.id,
        };

        let now = Utc::now();
        let job = Job {
            id: Uuid::new_v4(),
            title: require_text("title", &payload.title)?,
            company: require_text("company", &payload.company)?,
            location: require_text("location", &payload.location)?,
            salary: payload.salary.filter(|s| !s.trim().is_empty()),
            description: require_text("description", &payload.description)?,
            skills: clean_tags(payload.skills),
            job_type: payload.job_type.unwrap_or_default(),
            recruiter_id,
            is_open: payload.is_open.unwrap_or(true),
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_job(&job).await?;

        tracing::info!(job_id = %job.id, recruiter_id = %job.recruiter_id, "job created");
        Ok(job)
    }

    pub async fn get(&self, id: Uuid) -> Result<Job> {
        self.store
            .find_job(id)
            .await?
            .ok_or_else(|| Error::NotFound("Job not found".into()))
    }

    pub async fn list(&self, query: JobListQuery) -> Result<JobPage> {
        let filter = JobFilter {
            search: query.search.filter(|s| !s.trim().is_empty()),
            company: query.company.filter(|s| !s.trim().is_empty()),
            recruiter_id: None,
            page: query.page.unwrap_or(1).max(1),
            per_page: query
                .per_page
                .unwrap_or(DEFAULT_PER_PAGE)
                .clamp(1, MAX_PER_PAGE),
        };
        self.store.list_jobs(&filter).await
    }

    pub async fn list_mine(&self, actor: &Actor, query: JobListQuery) -> Result<JobPage> {
        actor.require_role(&[Role::Recruiter])?;
        let filter = JobFilter {
            search: query.search.filter(|s| !s.trim().is_empty()),
            company: query.company.filter(|s| !s.trim().is_empty()),
            recruiter_id: Some(actor.id),
            page: query.page.unwrap_or(1).max(1),
            per_page: query
                .per_page
                .unwrap_or(DEFAULT_PER_PAGE)
                .clamp(1, MAX_PER_PAGE),
        };
        self.store.list_jobs(&filter).await
    }

    /// The owner never changes here, whatever the payload says.
    pub async fn update(&self, actor: &Actor, id: Uuid, payload: UpdateJobPayload) -> Result<Job> {
        let mut job = self.get(id).await?;
        ensure(
            can_manage_job(actor, &job),
            "Only the job owner or an admin can edit this job",
        )?;

        if let Some(title) = payload.title {
            job.title = require_text("title", &title)?;
        }
        if let Some(company) = payload.company {
            job.company = require_text("company", &company)?;
        }
        if let Some(location) = payload.location {
            job.location = require_text("location", &location)?;
        }
        if let Some(salary) = payload.salary {
            job.salary = Some(salary).filter(|s| !s.trim().is_empty());
        }
        if let Some(description) = payload.description {
            job.description = require_text("description", &description)?;
        }
        if let Some(skills) = payload.skills {
            job.skills = clean_tags(skills);
        }
        if let Some(job_type) = payload.job_type {
            job.job_type = job_type;
        }
        if let Some(is_open) = payload.is_open {
            job.is_open = is_open;
        }
        job.updated_at = Utc::now();

        self.store.update_job(&job).await
    }

    /// Soft-deletes the job and cancels every open application for it.
    pub async fn remove(&self, actor: &Actor, id: Uuid) -> Result<u64> {
        let job = self.get(id).await?;
        ensure(
            can_manage_job(actor, &job),
            "Only the job owner or an admin can remove this job",
        )?;

        let cancelled = self.store.remove_job(id, Utc::now()).await?;
        tracing::info!(job_id = %id, cancelled, "job removed");
        Ok(cancelled)
    }
}
