use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use super::ParseEnumError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum InterviewMode {
    Online,
    Offline,
}

impl InterviewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewMode::Online => "online",
            InterviewMode::Offline => "offline",
        }
    }
}

impl fmt::Display for InterviewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterviewMode {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "online" => Ok(InterviewMode::Online),
            "offline" => Ok(InterviewMode::Offline),
            _ => Err(ParseEnumError {
                kind: "interview mode",
                value: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for InterviewMode {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// `scheduled` and `rescheduled` are live; `completed` and `cancelled` are final.
/// `rescheduled` loops on itself whenever the date moves again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum InterviewStatus {
    Scheduled,
    Completed,
    Cancelled,
    Rescheduled,
}

impl InterviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewStatus::Scheduled => "scheduled",
            InterviewStatus::Completed => "completed",
            InterviewStatus::Cancelled => "cancelled",
            InterviewStatus::Rescheduled => "rescheduled",
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, InterviewStatus::Scheduled | InterviewStatus::Rescheduled)
    }

    pub fn can_transition_to(&self, target: InterviewStatus) -> bool {
        self.is_live() && target != InterviewStatus::Scheduled
    }
}

impl fmt::Display for InterviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterviewStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scheduled" => Ok(InterviewStatus::Scheduled),
            "completed" => Ok(InterviewStatus::Completed),
            "cancelled" => Ok(InterviewStatus::Cancelled),
            "rescheduled" => Ok(InterviewStatus::Rescheduled),
            _ => Err(ParseEnumError {
                kind: "interview status",
                value: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for InterviewStatus {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Interview {
    pub id: Uuid,
    pub application_id: Uuid,
    pub job_id: Uuid,
    pub applicant_id: Uuid,
    pub recruiter_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    #[sqlx(try_from = "String")]
    pub mode: InterviewMode,
    pub location: String,
    pub notes: String,
    #[sqlx(try_from = "String")]
    pub status: InterviewStatus,
    /// Snapshot of the job title when the interview was booked.
    pub job_title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::InterviewStatus::*;

    #[test]
    fn live_interviews_move_to_any_other_state() {
        assert!(Scheduled.can_transition_to(Completed));
        assert!(Scheduled.can_transition_to(Cancelled));
        assert!(Scheduled.can_transition_to(Rescheduled));
        assert!(Rescheduled.can_transition_to(Rescheduled));
        assert!(Rescheduled.can_transition_to(Completed));
        assert!(!Rescheduled.can_transition_to(Scheduled));
    }

    #[test]
    fn finished_interviews_are_frozen() {
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Rescheduled));
    }
}
