use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::dto::interview_dto::{InterviewDetails, UpdateInterviewPayload};
use crate::error::{Error, Result};
use crate::models::application::Application;
use crate::models::interview::{Interview, InterviewStatus};
use crate::services::access::{
    can_access_interview, can_manage_application, can_manage_interview, ensure, interview_scope,
    Actor,
};
use crate::services::notification_service::{MailKind, NotificationService, Outcome};
use crate::services::store::Store;
use crate::utils::validation::require_text;

/// Requests a little behind the clock still count as "now".
const CLOCK_SKEW_SECS: i64 = 60;

#[derive(Debug)]
pub struct Scheduled {
    pub application: Application,
    pub interview: Interview,
}

#[derive(Debug)]
pub struct Unscheduled {
    pub interview_id: Uuid,
    /// The application whose link was cleared, if one still pointed here.
    pub application: Option<Application>,
}

#[derive(Clone)]
pub struct InterviewService {
    store: Arc<dyn Store>,
    notifications: NotificationService,
}

impl InterviewService {
    pub fn new(store: Arc<dyn Store>, notifications: NotificationService) -> Self {
        Self {
            store,
            notifications,
        }
    }

    /// Books the interview and moves the application to
    /// `interview_scheduled` in one step.
    pub async fn schedule(
        &self,
        actor: &Actor,
        application_id: Uuid,
        details: InterviewDetails,
    ) -> Result<Outcome<Scheduled>> {
        let application = self
            .store
            .find_application(application_id)
            .await?
            .ok_or_else(|| Error::NotFound("Application not found".into()))?;
        ensure(
            can_manage_application(actor, &application),
            "Only the job's recruiter or an admin can schedule interviews",
        )?;

        let location = require_text("location", &details.location)?;
        ensure_not_past(details.date)?;

        if !application.status.accepts_interview() {
            return Err(Error::Conflict(format!(
                "Cannot schedule an interview for an application that is {}",
                application.status
            )));
        }
        if application.interview_id.is_some() {
            return Err(Error::Conflict(
                "An interview already exists for this application".into(),
            ));
        }

        let job_title = self
            .store
            .find_job(application.job_id)
            .await?
            .map(|job| job.title);

        let now = Utc::now();
        let interview = Interview {
            id: Uuid::new_v4(),
            application_id: application.id,
            job_id: application.job_id,
            applicant_id: application.applicant_id,
            recruiter_id: application.recruiter_id,
            scheduled_at: details.date,
            mode: details.mode,
            location,
            notes: details.notes.unwrap_or_default().trim().to_string(),
            status: InterviewStatus::Scheduled,
            job_title,
            created_at: now,
            updated_at: now,
        };

        let application = self
            .store
            .schedule_interview(&interview, application.status)
            .await?;
        tracing::info!(
            interview_id = %interview.id,
            application_id = %application.id,
            scheduled_by = %actor.id,
            "interview scheduled"
        );

        let mut outcome = Outcome::new(Scheduled {
            application,
            interview,
        });
        let mail = interview_mail(&outcome.value.interview);
        outcome.warn(
            self.notifications
                .notify_user(
                    self.store.as_ref(),
                    outcome.value.interview.applicant_id,
                    MailKind::InterviewScheduled,
                    mail,
                )
                .await,
        );
        Ok(outcome)
    }

    /// Partial update. Moving the date of a live interview without naming a
    /// status marks it `rescheduled`. The application is never touched.
    pub async fn update(
        &self,
        actor: &Actor,
        id: Uuid,
        payload: UpdateInterviewPayload,
    ) -> Result<Outcome<Interview>> {
        let mut interview = self.find(id).await?;
        ensure(
            can_manage_interview(actor, &interview),
            "Only the interview's recruiter or an admin can change it",
        )?;
        if !interview.status.is_live() {
            return Err(Error::Conflict(format!(
                "Interview is already {}",
                interview.status
            )));
        }

        let mut date_moved = false;
        if let Some(date) = payload.date {
            if date != interview.scheduled_at {
                ensure_not_past(date)?;
                interview.scheduled_at = date;
                date_moved = true;
            }
        }
        if let Some(mode) = payload.mode {
            interview.mode = mode;
        }
        if let Some(location) = payload.location {
            interview.location = require_text("location", &location)?;
        }
        if let Some(notes) = payload.notes {
            interview.notes = notes.trim().to_string();
        }

        match payload.status {
            Some(status) if status != interview.status => {
                if !interview.status.can_transition_to(status) {
                    return Err(Error::Conflict(format!(
                        "Interview cannot move from {} to {}",
                        interview.status, status
                    )));
                }
                interview.status = status;
            }
            Some(_) => {}
            None if date_moved => interview.status = InterviewStatus::Rescheduled,
            None => {}
        }
        interview.updated_at = Utc::now();

        let interview = self.store.update_interview(&interview).await?;
        tracing::info!(interview_id = %interview.id, status = %interview.status, "interview updated");

        let mut outcome = Outcome::new(interview);
        let mail = interview_mail(&outcome.value);
        outcome.warn(
            self.notifications
                .notify_user(
                    self.store.as_ref(),
                    outcome.value.applicant_id,
                    MailKind::InterviewUpdated,
                    mail,
                )
                .await,
        );
        Ok(outcome)
    }

    /// Deletes the interview and releases the application: its link is
    /// cleared, and `interview_scheduled` falls back to `shortlisted`.
    pub async fn remove(&self, actor: &Actor, id: Uuid) -> Result<Outcome<Unscheduled>> {
        let interview = self.find(id).await?;
        ensure(
            can_manage_interview(actor, &interview),
            "Only the interview's recruiter or an admin can remove it",
        )?;

        let application = self.store.remove_interview(id, Utc::now()).await?;
        tracing::info!(
            interview_id = %id,
            application_status = ?application.as_ref().map(|a| a.status),
            "interview removed"
        );

        let mut outcome = Outcome::new(Unscheduled {
            interview_id: id,
            application,
        });
        outcome.warn(
            self.notifications
                .notify_user(
                    self.store.as_ref(),
                    interview.applicant_id,
                    MailKind::InterviewRemoved,
                    interview_mail(&interview),
                )
                .await,
        );
        Ok(outcome)
    }

    pub async fn view(&self, actor: &Actor, id: Uuid) -> Result<Interview> {
        let interview = self.find(id).await?;
        ensure(
            can_access_interview(actor, &interview),
            "You do not have access to this interview",
        )?;
        Ok(interview)
    }

    pub async fn list(&self, actor: &Actor) -> Result<Vec<Interview>> {
        self.store.list_interviews(&interview_scope(actor)).await
    }

    async fn find(&self, id: Uuid) -> Result<Interview> {
        self.store
            .find_interview(id)
            .await?
            .ok_or_else(|| Error::NotFound("Interview not found".into()))
    }
}

fn ensure_not_past(date: chrono::DateTime<Utc>) -> Result<()> {
    if date < Utc::now() - Duration::seconds(CLOCK_SKEW_SECS) {
        return Err(Error::InvalidInput(
            "Interview date must not be in the past".into(),
        ));
    }
    Ok(())
}

fn interview_mail(interview: &Interview) -> serde_json::Value {
    json!({
        "interview_id": interview.id,
        "application_id": interview.application_id,
        "job_title": interview.job_title,
        "date": interview.scheduled_at,
        "mode": interview.mode,
        "location": interview.location,
        "notes": interview.notes,
        "status": interview.status,
    })
}
