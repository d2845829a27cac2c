use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use super::ParseEnumError;

/// Lifecycle of an application.
///
/// Forward order is `applied < reviewed < shortlisted < interview_scheduled
/// < {hired, rejected}`. `cancelled` sits outside the order: it is reachable
/// from every non-terminal state and is itself terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Applied,
    Reviewed,
    Shortlisted,
    InterviewScheduled,
    Hired,
    Rejected,
    Cancelled,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 7] = [
        ApplicationStatus::Applied,
        ApplicationStatus::Reviewed,
        ApplicationStatus::Shortlisted,
        ApplicationStatus::InterviewScheduled,
        ApplicationStatus::Hired,
        ApplicationStatus::Rejected,
        ApplicationStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::Reviewed => "reviewed",
            ApplicationStatus::Shortlisted => "shortlisted",
            ApplicationStatus::InterviewScheduled => "interview_scheduled",
            ApplicationStatus::Hired => "hired",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Cancelled => "cancelled",
        }
    }

    /// Position in the forward order. `None` for `cancelled`.
    pub fn rank(&self) -> Option<u8> {
        match self {
            ApplicationStatus::Applied => Some(0),
            ApplicationStatus::Reviewed => Some(1),
            ApplicationStatus::Shortlisted => Some(2),
            ApplicationStatus::InterviewScheduled => Some(3),
            ApplicationStatus::Hired | ApplicationStatus::Rejected => Some(4),
            ApplicationStatus::Cancelled => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ApplicationStatus::Hired | ApplicationStatus::Rejected | ApplicationStatus::Cancelled
        )
    }

    /// Whether a recruiter-driven `advance` may move from `self` to `target`.
    /// Cancellation is not an advance and is checked separately.
    pub fn can_advance_to(&self, target: ApplicationStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self.rank(), target.rank()) {
            (Some(from), Some(to)) => to > from,
            _ => false,
        }
    }

    pub fn can_cancel(&self) -> bool {
        !self.is_terminal()
    }

    /// An interview can be attached while the application has not yet passed
    /// the interview stage.
    pub fn accepts_interview(&self) -> bool {
        !self.is_terminal() && self.rank().map_or(false, |r| r <= 3)
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ApplicationStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| ParseEnumError {
                kind: "application status",
                value: s.to_string(),
            })
    }
}

impl TryFrom<String> for ApplicationStatus {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Optional self-described profile submitted alongside the résumé.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicantProfile {
    pub full_name: Option<String>,
    pub contact_email: Option<String>,
    pub phone: Option<String>,
    pub qualifications: Option<String>,
    pub experience_years: Option<i32>,
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Application {
    pub id: Uuid,
    pub job_id: Uuid,
    pub applicant_id: Uuid,
    /// Copied from the job owner at creation, never refreshed.
    pub recruiter_id: Uuid,
    pub resume_url: String,
    pub full_name: Option<String>,
    pub contact_email: Option<String>,
    pub phone: Option<String>,
    pub qualifications: Option<String>,
    pub experience_years: Option<i32>,
    pub skills: Vec<String>,
    #[sqlx(try_from = "String")]
    pub status: ApplicationStatus,
    pub interview_id: Option<Uuid>,
    pub job_removed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    pub fn new(
        job_id: Uuid,
        applicant_id: Uuid,
        recruiter_id: Uuid,
        resume_url: String,
        profile: ApplicantProfile,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            job_id,
            applicant_id,
            recruiter_id,
            resume_url,
            full_name: profile.full_name,
            contact_email: profile.contact_email,
            phone: profile.phone,
            qualifications: profile.qualifications,
            experience_years: profile.experience_years,
            skills: profile.skills,
            status: ApplicationStatus::Applied,
            interview_id: None,
            job_removed: false,
            created_at: now,
            updated_at: now,
        }
    }
}
