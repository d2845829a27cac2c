use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::application::{Application, ApplicationStatus};
use crate::models::interview::Interview;
use crate::models::job::Job;
use crate::models::user::{normalize_email, User};
use crate::services::store::{
    ApplicationFilter, Cancellation, InterviewFilter, JobFilter, JobPage, Store,
};

const USER_COLUMNS: &str = "id, name, email, password_hash, role, reset_token_hash, reset_expires_at, created_at, updated_at";
const JOB_COLUMNS: &str = "id, title, company, location, salary, description, skills, job_type, recruiter_id, is_open, deleted_at, created_at, updated_at";
const APPLICATION_COLUMNS: &str = "id, job_id, applicant_id, recruiter_id, resume_url, full_name, contact_email, phone, qualifications, experience_years, skills, status, interview_id, job_removed, created_at, updated_at";
const INTERVIEW_COLUMNS: &str = "id, application_id, job_id, applicant_id, recruiter_id, scheduled_at, mode, location, notes, status, job_title, created_at, updated_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn concurrent_change(current: Option<ApplicationStatus>) -> Error {
    match current {
        Some(status) => Error::Conflict(format!(
            "Application status changed to {} concurrently",
            status
        )),
        None => Error::NotFound("Application not found".into()),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(normalize_email(&user.email))
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match Error::from(e) {
            Error::Conflict(_) => Error::Conflict("User already exists".into()),
            other => other,
        })?;
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE LOWER(email) = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let sql = format!("SELECT {} FROM users ORDER BY created_at DESC", USER_COLUMNS);
        let users = sqlx::query_as::<_, User>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn set_reset_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let res = sqlx::query(
            r#"UPDATE users SET reset_token_hash = $2, reset_expires_at = $3, updated_at = NOW() WHERE id = $1"#,
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        if res.rows_affected() == 0 {
            return Err(Error::NotFound("User not found".into()));
        }
        Ok(())
    }

    async fn find_user_by_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>> {
        let sql = format!(
            "SELECT {} FROM users WHERE reset_token_hash = $1 AND reset_expires_at > $2",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(token_hash)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn update_password(&self, user_id: Uuid, password_hash: &str) -> Result<()> {
        let res = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, reset_token_hash = NULL, reset_expires_at = NULL, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        if res.rows_affected() == 0 {
            return Err(Error::NotFound("User not found".into()));
        }
        Ok(())
    }

    async fn insert_job(&self, job: &Job) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO jobs (
                id, title, company, location, salary, description, skills,
                job_type, recruiter_id, is_open, created_at, updated_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)
            "#,
        )
        .bind(job.id)
        .bind(&job.title)
        .bind(&job.company)
        .bind(&job.location)
        .bind(&job.salary)
        .bind(&job.description)
        .bind(&job.skills)
        .bind(job.job_type.as_str())
        .bind(job.recruiter_id)
        .bind(job.is_open)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_job(&self, id: Uuid) -> Result<Option<Job>> {
        let sql = format!(
            "SELECT {} FROM jobs WHERE id = $1 AND deleted_at IS NULL",
            JOB_COLUMNS
        );
        let job = sqlx::query_as::<_, Job>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(job)
    }

    async fn list_jobs(&self, filter: &JobFilter) -> Result<JobPage> {
        let offset = filter.offset();

        let mut filters = vec!["deleted_at IS NULL".to_string()];
        let mut args: Vec<String> = Vec::new();

        if let Some(recruiter_id) = filter.recruiter_id {
            filters.push(format!("recruiter_id = ${}::uuid", args.len() + 1));
            args.push(recruiter_id.to_string());
        }
        if let Some(company) = &filter.company {
            filters.push(format!("company ILIKE ${}", args.len() + 1));
            args.push(format!("%{}%", company));
        }
        if let Some(search) = &filter.search {
            let n = args.len() + 1;
            filters.push(format!(
                "(title ILIKE ${n} OR company ILIKE ${n} OR location ILIKE ${n})"
            ));
            args.push(format!("%{}%", search));
        }

        let where_clause = format!("WHERE {}", filters.join(" AND "));

        let items_query = format!(
            "SELECT {} FROM jobs {} ORDER BY created_at DESC LIMIT ${} OFFSET ${}",
            JOB_COLUMNS,
            where_clause,
            args.len() + 1,
            args.len() + 2
        );
        let total_query = format!("SELECT COUNT(*) FROM jobs {}", where_clause);

        let mut items_statement = sqlx::query_as::<_, Job>(&items_query);
        for value in &args {
            items_statement = items_statement.bind(value);
        }
        let items = items_statement
            .bind(filter.per_page)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let mut total_statement = sqlx::query_scalar::<_, i64>(&total_query);
        for value in &args {
            total_statement = total_statement.bind(value);
        }
        let total = total_statement.fetch_one(&self.pool).await?;

        Ok(JobPage::new(items, total, filter.page, filter.per_page))
    }

    async fn update_job(&self, job: &Job) -> Result<Job> {
        let sql = format!(
            r#"
            UPDATE jobs
            SET title = $2, company = $3, location = $4, salary = $5, description = $6,
                skills = $7, job_type = $8, is_open = $9, updated_at = $10
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {}
            "#,
            JOB_COLUMNS
        );
        let updated = sqlx::query_as::<_, Job>(&sql)
            .bind(job.id)
            .bind(&job.title)
            .bind(&job.company)
            .bind(&job.location)
            .bind(&job.salary)
            .bind(&job.description)
            .bind(&job.skills)
            .bind(job.job_type.as_str())
            .bind(job.is_open)
            .bind(job.updated_at)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Job not found".into()))?;
        Ok(updated)
    }

    async fn remove_job(&self, id: Uuid, at: DateTime<Utc>) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        let res = sqlx::query(
            r#"UPDATE jobs SET deleted_at = $2, is_open = FALSE, updated_at = $2 WHERE id = $1 AND deleted_at IS NULL"#,
        )
        .bind(id)
        .bind(at)
        .execute(&mut *tx)
        .await?;
        if res.rows_affected() == 0 {
            return Err(Error::NotFound("Job not found".into()));
        }

        sqlx::query(
            r#"
            UPDATE interviews SET status = 'cancelled', updated_at = $2
            WHERE status IN ('scheduled', 'rescheduled')
              AND id IN (
                SELECT interview_id FROM applications
                WHERE job_id = $1
                  AND interview_id IS NOT NULL
                  AND status NOT IN ('hired', 'rejected', 'cancelled')
              )
            "#,
        )
        .bind(id)
        .bind(at)
        .execute(&mut *tx)
        .await?;

        let cancelled = sqlx::query(
            r#"
            UPDATE applications SET status = 'cancelled', job_removed = TRUE, updated_at = $2
            WHERE job_id = $1 AND status NOT IN ('hired', 'rejected', 'cancelled')
            "#,
        )
        .bind(id)
        .bind(at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;
        Ok(cancelled)
    }

    async fn insert_application(&self, application: &Application) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO applications (
                id, job_id, applicant_id, recruiter_id, resume_url, full_name, contact_email,
                phone, qualifications, experience_years, skills, status, created_at, updated_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14)
            "#,
        )
        .bind(application.id)
        .bind(application.job_id)
        .bind(application.applicant_id)
        .bind(application.recruiter_id)
        .bind(&application.resume_url)
        .bind(&application.full_name)
        .bind(&application.contact_email)
        .bind(&application.phone)
        .bind(&application.qualifications)
        .bind(application.experience_years)
        .bind(&application.skills)
        .bind(application.status.as_str())
        .bind(application.created_at)
        .bind(application.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match Error::from(e) {
            Error::Conflict(_) => Error::Conflict(
                "You already have an active application for this job".into(),
            ),
            other => other,
        })?;
        Ok(())
    }

    async fn find_application(&self, id: Uuid) -> Result<Option<Application>> {
        let sql = format!("SELECT {} FROM applications WHERE id = $1", APPLICATION_COLUMNS);
        let app = sqlx::query_as::<_, Application>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(app)
    }

    async fn list_applications(&self, filter: &ApplicationFilter) -> Result<Vec<Application>> {
        let sql = format!(
            r#"
            SELECT {} FROM applications
            WHERE ($1::uuid IS NULL OR applicant_id = $1)
              AND ($2::uuid IS NULL OR recruiter_id = $2)
              AND ($3::uuid IS NULL OR job_id = $3)
              AND ($4::text IS NULL OR status = $4)
            ORDER BY created_at DESC
            "#,
            APPLICATION_COLUMNS
        );
        let items = sqlx::query_as::<_, Application>(&sql)
            .bind(filter.applicant_id)
            .bind(filter.recruiter_id)
            .bind(filter.job_id)
            .bind(filter.status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    async fn transition_application(
        &self,
        id: Uuid,
        from: ApplicationStatus,
        to: ApplicationStatus,
        at: DateTime<Utc>,
    ) -> Result<Application> {
        let sql = format!(
            "UPDATE applications SET status = $3, updated_at = $4 WHERE id = $1 AND status = $2 RETURNING {}",
            APPLICATION_COLUMNS
        );
        let updated = sqlx::query_as::<_, Application>(&sql)
            .bind(id)
            .bind(from.as_str())
            .bind(to.as_str())
            .bind(at)
            .fetch_optional(&self.pool)
            .await?;
        match updated {
            Some(app) => Ok(app),
            None => {
                let current = self.find_application(id).await?.map(|a| a.status);
                Err(concurrent_change(current))
            }
        }
    }

    async fn cancel_application(
        &self,
        id: Uuid,
        from: ApplicationStatus,
        at: DateTime<Utc>,
    ) -> Result<Cancellation> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "UPDATE applications SET status = 'cancelled', updated_at = $3 WHERE id = $1 AND status = $2 RETURNING {}",
            APPLICATION_COLUMNS
        );
        let application = sqlx::query_as::<_, Application>(&sql)
            .bind(id)
            .bind(from.as_str())
            .bind(at)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(application) = application else {
            drop(tx);
            let current = self.find_application(id).await?.map(|a| a.status);
            return Err(concurrent_change(current));
        };

        let mut interview = None;
        if let Some(interview_id) = application.interview_id {
            let sql = format!(
                r#"
                UPDATE interviews SET status = 'cancelled', updated_at = $2
                WHERE id = $1 AND status IN ('scheduled', 'rescheduled')
                RETURNING {}
                "#,
                INTERVIEW_COLUMNS
            );
            interview = sqlx::query_as::<_, Interview>(&sql)
                .bind(interview_id)
                .bind(at)
                .fetch_optional(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(Cancellation {
            application,
            interview,
        })
    }

    async fn repair_application(
        &self,
        id: Uuid,
        status: ApplicationStatus,
        interview_id: Option<Uuid>,
        at: DateTime<Utc>,
    ) -> Result<Application> {
        let sql = format!(
            "UPDATE applications SET status = $2, interview_id = $3, updated_at = $4 WHERE id = $1 RETURNING {}",
            APPLICATION_COLUMNS
        );
        let app = sqlx::query_as::<_, Application>(&sql)
            .bind(id)
            .bind(status.as_str())
            .bind(interview_id)
            .bind(at)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Application not found".into()))?;
        Ok(app)
    }

    async fn schedule_interview(
        &self,
        interview: &Interview,
        from: ApplicationStatus,
    ) -> Result<Application> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO interviews (
                id, application_id, job_id, applicant_id, recruiter_id, scheduled_at,
                mode, location, notes, status, job_title, created_at, updated_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13)
            "#,
        )
        .bind(interview.id)
        .bind(interview.application_id)
        .bind(interview.job_id)
        .bind(interview.applicant_id)
        .bind(interview.recruiter_id)
        .bind(interview.scheduled_at)
        .bind(interview.mode.as_str())
        .bind(&interview.location)
        .bind(&interview.notes)
        .bind(interview.status.as_str())
        .bind(&interview.job_title)
        .bind(interview.created_at)
        .bind(interview.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match Error::from(e) {
            Error::Conflict(_) => {
                Error::Conflict("An interview already exists for this application".into())
            }
            other => other,
        })?;

        let sql = format!(
            r#"
            UPDATE applications
            SET status = 'interview_scheduled', interview_id = $2, updated_at = $4
            WHERE id = $1 AND status = $3 AND interview_id IS NULL
            RETURNING {}
            "#,
            APPLICATION_COLUMNS
        );
        let application = sqlx::query_as::<_, Application>(&sql)
            .bind(interview.application_id)
            .bind(interview.id)
            .bind(from.as_str())
            .bind(interview.created_at)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| {
                Error::Conflict("Application changed while the interview was being scheduled".into())
            })?;

        tx.commit().await?;
        Ok(application)
    }

    async fn find_interview(&self, id: Uuid) -> Result<Option<Interview>> {
        let sql = format!("SELECT {} FROM interviews WHERE id = $1", INTERVIEW_COLUMNS);
        let interview = sqlx::query_as::<_, Interview>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(interview)
    }

    async fn list_interviews(&self, filter: &InterviewFilter) -> Result<Vec<Interview>> {
        let sql = format!(
            r#"
            SELECT {} FROM interviews
            WHERE ($1::uuid IS NULL OR applicant_id = $1)
              AND ($2::uuid IS NULL OR recruiter_id = $2)
              AND ($3::uuid IS NULL OR application_id = $3)
            ORDER BY scheduled_at ASC
            "#,
            INTERVIEW_COLUMNS
        );
        let items = sqlx::query_as::<_, Interview>(&sql)
            .bind(filter.applicant_id)
            .bind(filter.recruiter_id)
            .bind(filter.application_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    async fn update_interview(&self, interview: &Interview) -> Result<Interview> {
        let sql = format!(
            r#"
            UPDATE interviews
            SET scheduled_at = $2, mode = $3, location = $4, notes = $5, status = $6, updated_at = $7
            WHERE id = $1
            RETURNING {}
            "#,
            INTERVIEW_COLUMNS
        );
        let updated = sqlx::query_as::<_, Interview>(&sql)
            .bind(interview.id)
            .bind(interview.scheduled_at)
            .bind(interview.mode.as_str())
            .bind(&interview.location)
            .bind(&interview.notes)
            .bind(interview.status.as_str())
            .bind(interview.updated_at)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Interview not found".into()))?;
        Ok(updated)
    }

    async fn remove_interview(&self, id: Uuid, at: DateTime<Utc>) -> Result<Option<Application>> {
        let mut tx = self.pool.begin().await?;

        let application_id: Option<Uuid> =
            sqlx::query_scalar("SELECT application_id FROM interviews WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(application_id) = application_id else {
            return Err(Error::NotFound("Interview not found".into()));
        };

        let sql = format!(
            r#"
            UPDATE applications
            SET status = CASE WHEN status = 'interview_scheduled' THEN 'shortlisted' ELSE status END,
                interview_id = NULL,
                updated_at = $3
            WHERE id = $1 AND interview_id = $2
            RETURNING {}
            "#,
            APPLICATION_COLUMNS
        );
        let application = sqlx::query_as::<_, Application>(&sql)
            .bind(application_id)
            .bind(id)
            .bind(at)
            .fetch_optional(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM interviews WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(application)
    }

    async fn dangling_applications(&self) -> Result<Vec<Application>> {
        let sql = format!(
            r#"
            SELECT {} FROM applications a
            WHERE (a.status = 'interview_scheduled' AND a.interview_id IS NULL)
               OR (a.interview_id IS NOT NULL AND NOT EXISTS (
                    SELECT 1 FROM interviews i
                    WHERE i.id = a.interview_id AND i.application_id = a.id
               ))
            "#,
            APPLICATION_COLUMNS
        );
        let items = sqlx::query_as::<_, Application>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    async fn unlinked_interviews(&self) -> Result<Vec<Interview>> {
        let sql = format!(
            r#"
            SELECT {} FROM interviews i
            WHERE NOT EXISTS (SELECT 1 FROM applications a WHERE a.interview_id = i.id)
            "#,
            INTERVIEW_COLUMNS
        );
        let items = sqlx::query_as::<_, Interview>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }
}
