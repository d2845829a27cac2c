//! Persistence port shared by the Postgres and in-memory adapters.
//!
//! Every method that touches two records (an application and its interview,
//! or a job and its applications) must apply both writes or neither.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::application::{Application, ApplicationStatus};
use crate::models::interview::Interview;
use crate::models::job::Job;
use crate::models::user::User;

#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub search: Option<String>,
    pub company: Option<String>,
    pub recruiter_id: Option<Uuid>,
    pub page: i64,
    pub per_page: i64,
}

impl JobFilter {
    /// Rows skipped before this page. Saturates for absurd page numbers.
    pub fn offset(&self) -> i64 {
        (self.page.max(1) - 1).saturating_mul(self.per_page.max(1))
    }
}

pub struct JobPage {
    pub items: Vec<Job>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl JobPage {
    pub fn new(items: Vec<Job>, total: i64, page: i64, per_page: i64) -> Self {
        let total_pages = ((total as f64) / (per_page as f64)).ceil() as i64;
        Self {
            items,
            total,
            page,
            per_page,
            total_pages,
        }
    }
}

/// Query-level scope for application listings. Unset fields do not filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplicationFilter {
    pub applicant_id: Option<Uuid>,
    pub recruiter_id: Option<Uuid>,
    pub job_id: Option<Uuid>,
    pub status: Option<ApplicationStatus>,
}

impl ApplicationFilter {
    pub fn matches(&self, app: &Application) -> bool {
        self.applicant_id.map_or(true, |id| app.applicant_id == id)
            && self.recruiter_id.map_or(true, |id| app.recruiter_id == id)
            && self.job_id.map_or(true, |id| app.job_id == id)
            && self.status.map_or(true, |s| app.status == s)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterviewFilter {
    pub applicant_id: Option<Uuid>,
    pub recruiter_id: Option<Uuid>,
    pub application_id: Option<Uuid>,
}

impl InterviewFilter {
    pub fn matches(&self, interview: &Interview) -> bool {
        self.applicant_id.map_or(true, |id| interview.applicant_id == id)
            && self.recruiter_id.map_or(true, |id| interview.recruiter_id == id)
            && self.application_id.map_or(true, |id| interview.application_id == id)
    }
}

/// Result of cancelling an application: the interview is present only when
/// a live one was cancelled alongside it.
#[derive(Debug)]
pub struct Cancellation {
    pub application: Application,
    pub interview: Option<Interview>,
}

#[async_trait]
pub trait Store: Send + Sync {
    // Identities

    /// Fails with `Conflict` when the email (case-insensitive) is taken.
    async fn insert_user(&self, user: &User) -> Result<()>;
    async fn find_user(&self, id: Uuid) -> Result<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn list_users(&self) -> Result<Vec<User>>;
    async fn set_reset_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()>;
    /// Looks up a user whose reset token matches and has not expired at `now`.
    async fn find_user_by_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>>;
    /// Replaces the password hash and clears any pending reset token.
    async fn update_password(&self, user_id: Uuid, password_hash: &str) -> Result<()>;

    // Jobs

    async fn insert_job(&self, job: &Job) -> Result<()>;
    /// Removed jobs read as absent.
    async fn find_job(&self, id: Uuid) -> Result<Option<Job>>;
    async fn list_jobs(&self, filter: &JobFilter) -> Result<JobPage>;
    async fn update_job(&self, job: &Job) -> Result<Job>;
    /// Soft-deletes the job, cancels its non-terminal applications (flagging
    /// them `job_removed`) together with their live interviews. Returns the
    /// number of applications cancelled.
    async fn remove_job(&self, id: Uuid, at: DateTime<Utc>) -> Result<u64>;

    // Applications

    /// Fails with `Conflict` when a non-cancelled application already exists
    /// for the same (applicant, job).
    async fn insert_application(&self, application: &Application) -> Result<()>;
    async fn find_application(&self, id: Uuid) -> Result<Option<Application>>;
    async fn list_applications(&self, filter: &ApplicationFilter) -> Result<Vec<Application>>;
    /// Compare-and-set on status. `Conflict` if the stored status is no
    /// longer `from`.
    async fn transition_application(
        &self,
        id: Uuid,
        from: ApplicationStatus,
        to: ApplicationStatus,
        at: DateTime<Utc>,
    ) -> Result<Application>;
    /// Moves the application from `from` to `cancelled` and cancels its
    /// linked interview when live. The reference is kept.
    async fn cancel_application(
        &self,
        id: Uuid,
        from: ApplicationStatus,
        at: DateTime<Utc>,
    ) -> Result<Cancellation>;
    /// Unconditional overwrite of status and interview link, used by
    /// reconciliation only.
    async fn repair_application(
        &self,
        id: Uuid,
        status: ApplicationStatus,
        interview_id: Option<Uuid>,
        at: DateTime<Utc>,
    ) -> Result<Application>;

    // Interviews

    /// Inserts the interview and moves its application from `from` to
    /// `interview_scheduled` with the link set. `Conflict` when the
    /// application changed or already has an interview.
    async fn schedule_interview(
        &self,
        interview: &Interview,
        from: ApplicationStatus,
    ) -> Result<Application>;
    async fn find_interview(&self, id: Uuid) -> Result<Option<Interview>>;
    async fn list_interviews(&self, filter: &InterviewFilter) -> Result<Vec<Interview>>;
    async fn update_interview(&self, interview: &Interview) -> Result<Interview>;
    /// Deletes the interview, clears the application's reference to it and
    /// reverts `interview_scheduled` to `shortlisted`. Returns the
    /// application when it was touched.
    async fn remove_interview(&self, id: Uuid, at: DateTime<Utc>) -> Result<Option<Application>>;

    // Reconciliation

    /// Applications at `interview_scheduled` without an interview, or whose
    /// interview reference does not resolve back to them.
    async fn dangling_applications(&self) -> Result<Vec<Application>>;
    /// Interviews that no application references.
    async fn unlinked_interviews(&self) -> Result<Vec<Interview>>;
}
