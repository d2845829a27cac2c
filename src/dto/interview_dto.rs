use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::interview::{Interview, InterviewMode, InterviewStatus};
use crate::services::notification_service::Outcome;

/// When, how and where an interview takes place.
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct InterviewDetails {
    pub date: DateTime<Utc>,
    pub mode: InterviewMode,
    #[validate(length(min = 1, max = 500))]
    pub location: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateInterviewPayload {
    pub application_id: Uuid,
    #[serde(flatten)]
    #[validate(nested)]
    pub details: InterviewDetails,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateInterviewPayload {
    pub date: Option<DateTime<Utc>>,
    pub mode: Option<InterviewMode>,
    #[validate(length(min = 1, max = 500))]
    pub location: Option<String>,
    pub notes: Option<String>,
    pub status: Option<InterviewStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InterviewResponse {
    pub id: Uuid,
    pub application_id: Uuid,
    pub job_id: Uuid,
    pub applicant_id: Uuid,
    pub recruiter_id: Uuid,
    pub date: DateTime<Utc>,
    pub mode: InterviewMode,
    pub location: String,
    pub notes: String,
    pub status: InterviewStatus,
    pub job_title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InterviewEnvelope {
    pub interview: InterviewResponse,
    pub warnings: Vec<String>,
}

impl From<Interview> for InterviewResponse {
    fn from(value: Interview) -> Self {
        Self {
            id: value.id,
            application_id: value.application_id,
            job_id: value.job_id,
            applicant_id: value.applicant_id,
            recruiter_id: value.recruiter_id,
            date: value.scheduled_at,
            mode: value.mode,
            location: value.location,
            notes: value.notes,
            status: value.status,
            job_title: value.job_title,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

impl From<Outcome<Interview>> for InterviewEnvelope {
    fn from(value: Outcome<Interview>) -> Self {
        Self {
            interview: value.value.into(),
            warnings: value.warnings,
        }
    }
}
