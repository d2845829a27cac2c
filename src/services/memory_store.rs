use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::application::{Application, ApplicationStatus};
use crate::models::interview::{Interview, InterviewStatus};
use crate::models::job::Job;
use crate::models::user::{normalize_email, User};
use crate::services::store::{
    ApplicationFilter, Cancellation, InterviewFilter, JobFilter, JobPage, Store,
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    jobs: HashMap<Uuid, Job>,
    applications: HashMap<Uuid, Application>,
    interviews: HashMap<Uuid, Interview>,
}

/// Single-mutex store. Every trait call holds the lock for its whole body,
/// which gives the same all-or-nothing behaviour as a transaction.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) async fn insert_interview_unlinked(&self, interview: Interview) {
        let mut tables = self.tables.lock().await;
        tables.interviews.insert(interview.id, interview);
    }

    #[cfg(test)]
    pub(crate) async fn drop_interview_row(&self, id: Uuid) {
        let mut tables = self.tables.lock().await;
        tables.interviews.remove(&id);
    }
}

fn newest_first<T, F>(items: &mut [T], created_at: F)
where
    F: Fn(&T) -> DateTime<Utc>,
{
    items.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let email = normalize_email(&user.email);
        if tables
            .users
            .values()
            .any(|u| normalize_email(&u.email) == email)
        {
            return Err(Error::Conflict("User already exists".into()));
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = normalize_email(email);
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .values()
            .find(|u| normalize_email(&u.email) == email)
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let mut users: Vec<User> = self.tables.lock().await.users.values().cloned().collect();
        newest_first(&mut users, |u| u.created_at);
        Ok(users)
    }

    async fn set_reset_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| Error::NotFound("User not found".into()))?;
        user.reset_token_hash = Some(token_hash.to_string());
        user.reset_expires_at = Some(expires_at);
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn find_user_by_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .values()
            .find(|u| {
                u.reset_token_hash.as_deref() == Some(token_hash)
                    && u.reset_expires_at.map_or(false, |exp| exp > now)
            })
            .cloned())
    }

    async fn update_password(&self, user_id: Uuid, password_hash: &str) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| Error::NotFound("User not found".into()))?;
        user.password_hash = password_hash.to_string();
        user.reset_token_hash = None;
        user.reset_expires_at = None;
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn insert_job(&self, job: &Job) -> Result<()> {
        self.tables.lock().await.jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn find_job(&self, id: Uuid) -> Result<Option<Job>> {
        let tables = self.tables.lock().await;
        Ok(tables.jobs.get(&id).filter(|j| !j.is_removed()).cloned())
    }

    async fn list_jobs(&self, filter: &JobFilter) -> Result<JobPage> {
        let tables = self.tables.lock().await;
        let mut matching: Vec<Job> = tables
            .jobs
            .values()
            .filter(|j| !j.is_removed())
            .filter(|j| filter.recruiter_id.map_or(true, |id| j.recruiter_id == id))
            .filter(|j| {
                filter
                    .company
                    .as_deref()
                    .map_or(true, |c| contains_ci(&j.company, c))
            })
            .filter(|j| {
                filter.search.as_deref().map_or(true, |s| {
                    contains_ci(&j.title, s) || contains_ci(&j.company, s) || contains_ci(&j.location, s)
                })
            })
            .cloned()
            .collect();
        newest_first(&mut matching, |j| j.created_at);

        let total = matching.len() as i64;
        let offset = usize::try_from(filter.offset()).unwrap_or(usize::MAX);
        let items = matching
            .into_iter()
            .skip(offset)
            .take(filter.per_page as usize)
            .collect();
        Ok(JobPage::new(items, total, filter.page, filter.per_page))
    }

    async fn update_job(&self, job: &Job) -> Result<Job> {
        let mut tables = self.tables.lock().await;
        let stored = tables
            .jobs
            .get_mut(&job.id)
            .filter(|j| !j.is_removed())
            .ok_or_else(|| Error::NotFound("Job not found".into()))?;
        let recruiter_id = stored.recruiter_id;
        *stored = job.clone();
        stored.recruiter_id = recruiter_id;
        Ok(stored.clone())
    }

    async fn remove_job(&self, id: Uuid, at: DateTime<Utc>) -> Result<u64> {
        let mut tables = self.tables.lock().await;
        let job = tables
            .jobs
            .get_mut(&id)
            .filter(|j| !j.is_removed())
            .ok_or_else(|| Error::NotFound("Job not found".into()))?;
        job.deleted_at = Some(at);
        job.is_open = false;
        job.updated_at = at;

        let Tables {
            applications,
            interviews,
            ..
        } = &mut *tables;
        let mut cancelled = 0;
        for app in applications
            .values_mut()
            .filter(|a| a.job_id == id && !a.status.is_terminal())
        {
            if let Some(iid) = app.interview_id {
                if let Some(interview) = interviews.get_mut(&iid) {
                    if interview.status.is_live() {
                        interview.status = InterviewStatus::Cancelled;
                        interview.updated_at = at;
                    }
                }
            }
            app.status = ApplicationStatus::Cancelled;
            app.job_removed = true;
            app.updated_at = at;
            cancelled += 1;
        }
        Ok(cancelled)
    }

    async fn insert_application(&self, application: &Application) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let duplicate = tables.applications.values().any(|a| {
            a.applicant_id == application.applicant_id
                && a.job_id == application.job_id
                && a.status != ApplicationStatus::Cancelled
        });
        if duplicate {
            return Err(Error::Conflict(
                "You already have an active application for this job".into(),
            ));
        }
        tables
            .applications
            .insert(application.id, application.clone());
        Ok(())
    }

    async fn find_application(&self, id: Uuid) -> Result<Option<Application>> {
        Ok(self.tables.lock().await.applications.get(&id).cloned())
    }

    async fn list_applications(&self, filter: &ApplicationFilter) -> Result<Vec<Application>> {
        let tables = self.tables.lock().await;
        let mut items: Vec<Application> = tables
            .applications
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        newest_first(&mut items, |a| a.created_at);
        Ok(items)
    }

    async fn transition_application(
        &self,
        id: Uuid,
        from: ApplicationStatus,
        to: ApplicationStatus,
        at: DateTime<Utc>,
    ) -> Result<Application> {
        let mut tables = self.tables.lock().await;
        let app = tables
            .applications
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound("Application not found".into()))?;
        if app.status != from {
            return Err(Error::Conflict(format!(
                "Application status changed to {} concurrently",
                app.status
            )));
        }
        app.status = to;
        app.updated_at = at;
        Ok(app.clone())
    }

    async fn cancel_application(
        &self,
        id: Uuid,
        from: ApplicationStatus,
        at: DateTime<Utc>,
    ) -> Result<Cancellation> {
        let mut tables = self.tables.lock().await;
        let Tables {
            applications,
            interviews,
            ..
        } = &mut *tables;
        let app = applications
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound("Application not found".into()))?;
        if app.status != from {
            return Err(Error::Conflict(format!(
                "Application status changed to {} concurrently",
                app.status
            )));
        }
        app.status = ApplicationStatus::Cancelled;
        app.updated_at = at;

        let mut cancelled_interview = None;
        if let Some(iid) = app.interview_id {
            if let Some(interview) = interviews.get_mut(&iid) {
                if interview.status.is_live() {
                    interview.status = InterviewStatus::Cancelled;
                    interview.updated_at = at;
                    cancelled_interview = Some(interview.clone());
                }
            }
        }
        Ok(Cancellation {
            application: app.clone(),
            interview: cancelled_interview,
        })
    }

    async fn repair_application(
        &self,
        id: Uuid,
        status: ApplicationStatus,
        interview_id: Option<Uuid>,
        at: DateTime<Utc>,
    ) -> Result<Application> {
        let mut tables = self.tables.lock().await;
        let app = tables
            .applications
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound("Application not found".into()))?;
        app.status = status;
        app.interview_id = interview_id;
        app.updated_at = at;
        Ok(app.clone())
    }

    async fn schedule_interview(
        &self,
        interview: &Interview,
        from: ApplicationStatus,
    ) -> Result<Application> {
        let mut tables = self.tables.lock().await;
        if tables
            .interviews
            .values()
            .any(|i| i.application_id == interview.application_id)
        {
            return Err(Error::Conflict(
                "An interview already exists for this application".into(),
            ));
        }
        let app = tables
            .applications
            .get_mut(&interview.application_id)
            .ok_or_else(|| Error::NotFound("Application not found".into()))?;
        if app.status != from || app.interview_id.is_some() {
            return Err(Error::Conflict(
                "Application changed while the interview was being scheduled".into(),
            ));
        }
        app.status = ApplicationStatus::InterviewScheduled;
        app.interview_id = Some(interview.id);
        app.updated_at = interview.created_at;
        let app = app.clone();
        tables.interviews.insert(interview.id, interview.clone());
        Ok(app)
    }

    async fn find_interview(&self, id: Uuid) -> Result<Option<Interview>> {
        Ok(self.tables.lock().await.interviews.get(&id).cloned())
    }

    async fn list_interviews(&self, filter: &InterviewFilter) -> Result<Vec<Interview>> {
        let tables = self.tables.lock().await;
        let mut items: Vec<Interview> = tables
            .interviews
            .values()
            .filter(|i| filter.matches(i))
            .cloned()
            .collect();
        items.sort_by(|a, b| a.scheduled_at.cmp(&b.scheduled_at));
        Ok(items)
    }

    async fn update_interview(&self, interview: &Interview) -> Result<Interview> {
        let mut tables = self.tables.lock().await;
        let stored = tables
            .interviews
            .get_mut(&interview.id)
            .ok_or_else(|| Error::NotFound("Interview not found".into()))?;
        stored.scheduled_at = interview.scheduled_at;
        stored.mode = interview.mode;
        stored.location = interview.location.clone();
        stored.notes = interview.notes.clone();
        stored.status = interview.status;
        stored.updated_at = interview.updated_at;
        Ok(stored.clone())
    }

    async fn remove_interview(&self, id: Uuid, at: DateTime<Utc>) -> Result<Option<Application>> {
        let mut tables = self.tables.lock().await;
        let interview = tables
            .interviews
            .remove(&id)
            .ok_or_else(|| Error::NotFound("Interview not found".into()))?;
        let Some(app) = tables.applications.get_mut(&interview.application_id) else {
            return Ok(None);
        };
        if app.interview_id != Some(id) {
            return Ok(None);
        }
        app.interview_id = None;
        if app.status == ApplicationStatus::InterviewScheduled {
            app.status = ApplicationStatus::Shortlisted;
        }
        app.updated_at = at;
        Ok(Some(app.clone()))
    }

    async fn dangling_applications(&self) -> Result<Vec<Application>> {
        let tables = self.tables.lock().await;
        let items = tables
            .applications
            .values()
            .filter(|a| match a.interview_id {
                None => a.status == ApplicationStatus::InterviewScheduled,
                Some(iid) => tables
                    .interviews
                    .get(&iid)
                    .map_or(true, |i| i.application_id != a.id),
            })
            .cloned()
            .collect();
        Ok(items)
    }

    async fn unlinked_interviews(&self) -> Result<Vec<Interview>> {
        let tables = self.tables.lock().await;
        let items = tables
            .interviews
            .values()
            .filter(|i| {
                !tables
                    .applications
                    .values()
                    .any(|a| a.interview_id == Some(i.id))
            })
            .cloned()
            .collect();
        Ok(items)
    }
}
