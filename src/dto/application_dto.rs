use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::dto::interview_dto::{InterviewDetails, InterviewResponse};
use crate::models::application::{Application, ApplicationStatus};
use crate::services::application_service::{Advanced, Withdrawn};
use crate::services::interview_service::Unscheduled;
use crate::services::notification_service::Outcome;

/// Multipart body of an application submission. Only `resume` is required.
#[allow(dead_code)]
#[derive(ToSchema)]
pub struct ApplyForm {
    #[schema(value_type = String, format = Binary)]
    pub resume: Vec<u8>,
    pub full_name: Option<String>,
    pub contact_email: Option<String>,
    pub phone: Option<String>,
    pub qualifications: Option<String>,
    pub experience_years: Option<i32>,
    /// Comma separated.
    pub skills: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AdvancePayload {
    pub status: ApplicationStatus,
    /// Required when `status` is `interview_scheduled`.
    #[validate(nested)]
    pub interview: Option<InterviewDetails>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, IntoParams)]
#[serde(default)]
#[into_params(parameter_in = Query)]
pub struct ApplicationListQuery {
    pub status: Option<ApplicationStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApplicationResponse {
    pub id: Uuid,
    pub job_id: Uuid,
    pub applicant_id: Uuid,
    pub recruiter_id: Uuid,
    pub resume_url: String,
    pub full_name: Option<String>,
    pub contact_email: Option<String>,
    pub phone: Option<String>,
    pub qualifications: Option<String>,
    pub experience_years: Option<i32>,
    pub skills: Vec<String>,
    pub status: ApplicationStatus,
    pub interview_id: Option<Uuid>,
    pub job_removed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApplicationEnvelope {
    pub application: ApplicationResponse,
    pub interview: Option<InterviewResponse>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RemoveInterviewResponse {
    pub id: Uuid,
    pub application: Option<ApplicationResponse>,
    pub warnings: Vec<String>,
}

impl From<Application> for ApplicationResponse {
    fn from(value: Application) -> Self {
        Self {
            id: value.id,
            job_id: value.job_id,
            applicant_id: value.applicant_id,
            recruiter_id: value.recruiter_id,
            resume_url: value.resume_url,
            full_name: value.full_name,
            contact_email: value.contact_email,
            phone: value.phone,
            qualifications: value.qualifications,
            experience_years: value.experience_years,
            skills: value.skills,
            status: value.status,
            interview_id: value.interview_id,
            job_removed: value.job_removed,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

impl From<Outcome<Application>> for ApplicationEnvelope {
    fn from(value: Outcome<Application>) -> Self {
        Self {
            application: value.value.into(),
            interview: None,
            warnings: value.warnings,
        }
    }
}

impl From<Outcome<Advanced>> for ApplicationEnvelope {
    fn from(value: Outcome<Advanced>) -> Self {
        Self {
            application: value.value.application.into(),
            interview: value.value.interview.map(Into::into),
            warnings: value.warnings,
        }
    }
}

impl From<Outcome<Withdrawn>> for ApplicationEnvelope {
    fn from(value: Outcome<Withdrawn>) -> Self {
        Self {
            application: value.value.application.into(),
            interview: value.value.interview.map(Into::into),
            warnings: value.warnings,
        }
    }
}

impl From<Outcome<Unscheduled>> for RemoveInterviewResponse {
    fn from(value: Outcome<Unscheduled>) -> Self {
        Self {
            id: value.value.interview_id,
            application: value.value.application.map(Into::into),
            warnings: value.warnings,
        }
    }
}
