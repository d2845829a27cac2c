//! Application lifecycle.
//!
//! Forward moves go through `advance`, withdrawals through `cancel`. Every
//! status write is a compare-and-set against the status read at the start
//! of the call, so two racing callers cannot both succeed. Mail goes out
//! after the write commits and can only ever add warnings.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::dto::interview_dto::InterviewDetails;
use crate::error::{Error, Result};
use crate::models::application::{ApplicantProfile, Application, ApplicationStatus};
use crate::models::interview::Interview;
use crate::models::job::Job;
use crate::models::user::Role;
use crate::services::access::{
    application_scope, can_access_application, can_manage_application, can_manage_job,
    can_withdraw_application, ensure, Actor,
};
use crate::services::interview_service::{InterviewService, Scheduled};
use crate::services::notification_service::{MailKind, NotificationService, Outcome};
use crate::services::store::{ApplicationFilter, Store};
use crate::services::upload_service::{validate_resume, ResumeFile, Uploader};
use crate::utils::validation::clean_tags;

#[derive(Debug)]
pub struct Advanced {
    pub application: Application,
    /// Set when the move booked an interview.
    pub interview: Option<Interview>,
}

#[derive(Debug)]
pub struct Withdrawn {
    pub application: Application,
    /// The live interview cancelled alongside, if there was one.
    pub interview: Option<Interview>,
}

impl From<Scheduled> for Advanced {
    fn from(value: Scheduled) -> Self {
        Self {
            application: value.application,
            interview: Some(value.interview),
        }
    }
}

#[derive(Clone)]
pub struct ApplicationService {
    store: Arc<dyn Store>,
    uploader: Arc<dyn Uploader>,
    notifications: NotificationService,
    interviews: InterviewService,
}

impl ApplicationService {
    pub fn new(
        store: Arc<dyn Store>,
        uploader: Arc<dyn Uploader>,
        notifications: NotificationService,
        interviews: InterviewService,
    ) -> Self {
        Self {
            store,
            uploader,
            notifications,
            interviews,
        }
    }

    /// Uploads the résumé, then submits. A failed upload aborts before any
    /// record is written.
    pub async fn apply(
        &self,
        actor: &Actor,
        job_id: Uuid,
        resume: Option<ResumeFile>,
        profile: ApplicantProfile,
    ) -> Result<Outcome<Application>> {
        actor.require_role(&[Role::Jobseeker])?;
        let resume =
            resume.ok_or_else(|| Error::InvalidInput("Resume file is required".into()))?;
        validate_resume(&resume)?;
        let profile = clean_profile(profile)?;

        // Fail fast on the cheap checks so nothing is uploaded for a
        // submission that cannot succeed.
        self.open_job(job_id).await?;
        self.ensure_no_live_application(actor.id, job_id).await?;

        let resume_url = self.uploader.upload(&resume).await.map_err(|e| match e {
            Error::InvalidInput(_) | Error::Upload(_) => e,
            other => Error::Upload(other.to_string()),
        })?;

        match self
            .submit(actor, job_id, Some(resume_url.clone()), profile)
            .await
        {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                // Lost a race after the upload; nothing references the file.
                if let Err(cleanup) = self.uploader.discard(&resume_url).await {
                    tracing::warn!(
                        resume_url,
                        error = %cleanup,
                        "failed to discard orphaned resume"
                    );
                }
                Err(e)
            }
        }
    }

    /// Records an application whose résumé is already stored at `resume_url`.
    pub async fn submit(
        &self,
        actor: &Actor,
        job_id: Uuid,
        resume_url: Option<String>,
        profile: ApplicantProfile,
    ) -> Result<Outcome<Application>> {
        actor.require_role(&[Role::Jobseeker])?;
        let resume_url = resume_url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .ok_or_else(|| Error::InvalidInput("Resume is required".into()))?;
        let profile = clean_profile(profile)?;

        let job = self.open_job(job_id).await?;
        self.ensure_no_live_application(actor.id, job_id).await?;

        let application =
            Application::new(job.id, actor.id, job.recruiter_id, resume_url, profile);
        self.store.insert_application(&application).await?;
        tracing::info!(
            application_id = %application.id,
            job_id = %job.id,
            applicant_id = %actor.id,
            "application submitted"
        );

        let mut outcome = Outcome::new(application);
        let mail = json!({
            "application_id": outcome.value.id,
            "job_id": job.id,
            "job_title": job.title,
            "company": job.company,
        });
        outcome.warn(
            self.notifications
                .notify_user(
                    self.store.as_ref(),
                    outcome.value.applicant_id,
                    MailKind::ApplicationSubmitted,
                    mail.clone(),
                )
                .await,
        );
        outcome.warn(
            self.notifications
                .notify_user(
                    self.store.as_ref(),
                    outcome.value.recruiter_id,
                    MailKind::ApplicationReceived,
                    mail,
                )
                .await,
        );
        Ok(outcome)
    }

    /// Moves the application forward. `interview_scheduled` books the
    /// interview described by `interview`. `cancelled` is only honoured for
    /// admins, as a cancellation.
    pub async fn advance(
        &self,
        actor: &Actor,
        id: Uuid,
        target: ApplicationStatus,
        interview: Option<InterviewDetails>,
    ) -> Result<Outcome<Advanced>> {
        let application = self.find(id).await?;
        ensure(
            can_manage_application(actor, &application),
            "Only the job's recruiter or an admin can change this application",
        )?;

        if target == ApplicationStatus::Cancelled {
            if !actor.is_admin() {
                return Err(Error::Forbidden(
                    "Only the applicant or an admin can cancel an application".into(),
                ));
            }
            let withdrawn = self.cancel(actor, id).await?;
            return Ok(Outcome {
                value: Advanced {
                    application: withdrawn.value.application,
                    interview: withdrawn.value.interview,
                },
                warnings: withdrawn.warnings,
            });
        }

        if application.status.is_terminal() {
            return Err(Error::Conflict(format!(
                "Application is already {}",
                application.status
            )));
        }
        if !application.status.can_advance_to(target) {
            return Err(Error::Conflict(format!(
                "Cannot move application from {} to {}",
                application.status, target
            )));
        }

        if target == ApplicationStatus::InterviewScheduled {
            let details = interview.ok_or_else(|| {
                Error::InvalidInput(
                    "Interview details are required to schedule an interview".into(),
                )
            })?;
            let scheduled = self.interviews.schedule(actor, id, details).await?;
            return Ok(Outcome {
                value: scheduled.value.into(),
                warnings: scheduled.warnings,
            });
        }

        let updated = self
            .store
            .transition_application(id, application.status, target, Utc::now())
            .await?;
        tracing::info!(
            application_id = %id,
            from = %application.status,
            to = %target,
            actor_id = %actor.id,
            "application advanced"
        );

        let mut outcome = Outcome::new(Advanced {
            application: updated,
            interview: None,
        });
        outcome.warn(
            self.notifications
                .notify_user(
                    self.store.as_ref(),
                    outcome.value.application.applicant_id,
                    MailKind::ApplicationStatusChanged,
                    json!({
                        "application_id": id,
                        "job_id": outcome.value.application.job_id,
                        "status": target,
                    }),
                )
                .await,
        );
        Ok(outcome)
    }

    /// Withdraws a non-terminal application. A live interview is cancelled
    /// with it and the application keeps pointing at that interview.
    pub async fn cancel(&self, actor: &Actor, id: Uuid) -> Result<Outcome<Withdrawn>> {
        let application = self.find(id).await?;
        ensure(
            can_withdraw_application(actor, &application),
            "Only the applicant or an admin can cancel this application",
        )?;
        if !application.status.can_cancel() {
            return Err(Error::Conflict(format!(
                "Application is already {}",
                application.status
            )));
        }

        let cancellation = self
            .store
            .cancel_application(id, application.status, Utc::now())
            .await?;
        tracing::info!(
            application_id = %id,
            from = %application.status,
            interview_cancelled = cancellation.interview.is_some(),
            actor_id = %actor.id,
            "application cancelled"
        );

        let mut outcome = Outcome::new(Withdrawn {
            application: cancellation.application,
            interview: cancellation.interview,
        });
        outcome.warn(
            self.notifications
                .notify_user(
                    self.store.as_ref(),
                    outcome.value.application.recruiter_id,
                    MailKind::ApplicationCancelled,
                    json!({
                        "application_id": id,
                        "job_id": outcome.value.application.job_id,
                    }),
                )
                .await,
        );
        if actor.id != outcome.value.application.applicant_id {
            outcome.warn(
                self.notifications
                    .notify_user(
                        self.store.as_ref(),
                        outcome.value.application.applicant_id,
                        MailKind::ApplicationStatusChanged,
                        json!({
                            "application_id": id,
                            "job_id": outcome.value.application.job_id,
                            "status": ApplicationStatus::Cancelled,
                        }),
                    )
                    .await,
            );
        }
        Ok(outcome)
    }

    pub async fn view(&self, actor: &Actor, id: Uuid) -> Result<Application> {
        let application = self.find(id).await?;
        ensure(
            can_access_application(actor, &application),
            "You do not have access to this application",
        )?;
        Ok(application)
    }

    pub async fn list_mine(
        &self,
        actor: &Actor,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<Application>> {
        actor.require_role(&[Role::Jobseeker])?;
        let filter = ApplicationFilter {
            applicant_id: Some(actor.id),
            status,
            ..Default::default()
        };
        self.store.list_applications(&filter).await
    }

    /// Everything addressed to the recruiter, or everything for an admin.
    pub async fn list_received(
        &self,
        actor: &Actor,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<Application>> {
        actor.require_role(&[Role::Recruiter, Role::Admin])?;
        let filter = ApplicationFilter {
            status,
            ..application_scope(actor)
        };
        self.store.list_applications(&filter).await
    }

    pub async fn list_for_job(
        &self,
        actor: &Actor,
        job_id: Uuid,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<Application>> {
        let job = self
            .store
            .find_job(job_id)
            .await?
            .ok_or_else(|| Error::NotFound("Job not found".into()))?;
        ensure(
            can_manage_job(actor, &job),
            "Only the job owner or an admin can list its applications",
        )?;
        let filter = ApplicationFilter {
            job_id: Some(job_id),
            status,
            ..application_scope(actor)
        };
        self.store.list_applications(&filter).await
    }

    async fn find(&self, id: Uuid) -> Result<Application> {
        self.store
            .find_application(id)
            .await?
            .ok_or_else(|| Error::NotFound("Application not found".into()))
    }

    async fn open_job(&self, job_id: Uuid) -> Result<Job> {
        let job = self
            .store
            .find_job(job_id)
            .await?
            .ok_or_else(|| Error::NotFound("Job not found".into()))?;
        if !job.is_open {
            return Err(Error::Conflict("This job is no longer accepting applications".into()));
        }
        Ok(job)
    }

    async fn ensure_no_live_application(&self, applicant_id: Uuid, job_id: Uuid) -> Result<()> {
        let existing = self
            .store
            .list_applications(&ApplicationFilter {
                applicant_id: Some(applicant_id),
                job_id: Some(job_id),
                ..Default::default()
            })
            .await?;
        if existing
            .iter()
            .any(|a| a.status != ApplicationStatus::Cancelled)
        {
            return Err(Error::Conflict(
                "You already have an active application for this job".into(),
            ));
        }
        Ok(())
    }
}

fn clean_profile(profile: ApplicantProfile) -> Result<ApplicantProfile> {
    fn text(value: Option<String>) -> Option<String> {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    if profile.experience_years.map_or(false, |y| !(0..=80).contains(&y)) {
        return Err(Error::InvalidInput(
            "experience_years must be between 0 and 80".into(),
        ));
    }
    Ok(ApplicantProfile {
        full_name: text(profile.full_name),
        contact_email: text(profile.contact_email),
        phone: text(profile.phone),
        qualifications: text(profile.qualifications),
        experience_years: profile.experience_years,
        skills: clean_tags(profile.skills),
    })
}
