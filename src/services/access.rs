//! Authorization predicates shared by every read and write path.
//!
//! Handlers never decide access on their own: they resolve the record, then
//! ask one of the `can_*` predicates here. Listings use [`application_scope`]
//! and [`interview_scope`] to pre-filter at the query level, which must agree
//! with evaluating [`can_access_application`] per record.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::application::Application;
use crate::models::interview::Interview;
use crate::models::job::Job;
use crate::models::user::Role;
use crate::services::store::{ApplicationFilter, InterviewFilter};

/// The authenticated identity performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_role(&self, allowed: &[Role]) -> Result<()> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(Error::Forbidden(format!(
                "Role {} is not allowed to perform this action",
                self.role
            )))
        }
    }
}

pub fn can_access_application(actor: &Actor, app: &Application) -> bool {
    actor.is_admin() || actor.id == app.applicant_id || actor.id == app.recruiter_id
}

/// Status changes and interview scheduling.
pub fn can_manage_application(actor: &Actor, app: &Application) -> bool {
    actor.is_admin() || actor.id == app.recruiter_id
}

pub fn can_withdraw_application(actor: &Actor, app: &Application) -> bool {
    actor.is_admin() || actor.id == app.applicant_id
}

pub fn can_access_interview(actor: &Actor, interview: &Interview) -> bool {
    actor.is_admin() || actor.id == interview.applicant_id || actor.id == interview.recruiter_id
}

pub fn can_manage_interview(actor: &Actor, interview: &Interview) -> bool {
    actor.is_admin() || actor.id == interview.recruiter_id
}

pub fn can_manage_job(actor: &Actor, job: &Job) -> bool {
    actor.is_admin() || actor.id == job.recruiter_id
}

pub fn ensure(allowed: bool, message: &str) -> Result<()> {
    if allowed {
        Ok(())
    } else {
        Err(Error::Forbidden(message.to_string()))
    }
}

/// Narrowest listing filter that still returns every application the actor
/// may see.
pub fn application_scope(actor: &Actor) -> ApplicationFilter {
    match actor.role {
        Role::Admin => ApplicationFilter::default(),
        Role::Jobseeker => ApplicationFilter {
            applicant_id: Some(actor.id),
            ..Default::default()
        },
        Role::Recruiter => ApplicationFilter {
            recruiter_id: Some(actor.id),
            ..Default::default()
        },
    }
}

pub fn interview_scope(actor: &Actor) -> InterviewFilter {
    match actor.role {
        Role::Admin => InterviewFilter::default(),
        Role::Jobseeker => InterviewFilter {
            applicant_id: Some(actor.id),
            ..Default::default()
        },
        Role::Recruiter => InterviewFilter {
            recruiter_id: Some(actor.id),
            ..Default::default()
        },
    }
}
