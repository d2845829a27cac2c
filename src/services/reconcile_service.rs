//! Repairs application/interview pairs left inconsistent by a crash between
//! the two writes of a scheduling or removal. Safe to run at any time and
//! any number of times.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::Result;
use crate::models::application::ApplicationStatus;
use crate::models::interview::InterviewStatus;
use crate::services::store::Store;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct ReconcileReport {
    /// Live interviews re-attached to their application.
    pub relinked: u32,
    /// Orphaned live interviews marked cancelled.
    pub cancelled: u32,
    /// Applications moved back from `interview_scheduled` to `shortlisted`.
    pub reverted: u32,
    /// Applications whose dead interview reference was dropped.
    pub cleared: u32,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Clone)]
pub struct ReconcileService {
    store: Arc<dyn Store>,
}

impl ReconcileService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn run_once(&self) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::default();

        // Orphans first, so an interview that can be re-attached is not
        // reverted away in the second pass.
        for mut interview in self.store.unlinked_interviews().await? {
            if !interview.status.is_live() {
                continue;
            }
            let application = self.store.find_application(interview.application_id).await?;

            let relink = match &application {
                Some(app) if app.status.accepts_interview() => match app.interview_id {
                    None => true,
                    Some(other) => self.store.find_interview(other).await?.is_none(),
                },
                _ => false,
            };

            if let (true, Some(app)) = (relink, application) {
                self.store
                    .repair_application(
                        app.id,
                        ApplicationStatus::InterviewScheduled,
                        Some(interview.id),
                        Utc::now(),
                    )
                    .await?;
                tracing::info!(
                    application_id = %app.id,
                    interview_id = %interview.id,
                    "reconcile: relinked interview"
                );
                report.relinked += 1;
            } else {
                interview.status = InterviewStatus::Cancelled;
                interview.updated_at = Utc::now();
                self.store.update_interview(&interview).await?;
                tracing::info!(interview_id = %interview.id, "reconcile: cancelled orphan interview");
                report.cancelled += 1;
            }
        }

        for app in self.store.dangling_applications().await? {
            let status = if app.status == ApplicationStatus::InterviewScheduled {
                report.reverted += 1;
                ApplicationStatus::Shortlisted
            } else {
                report.cleared += 1;
                app.status
            };
            self.store
                .repair_application(app.id, status, None, Utc::now())
                .await?;
            tracing::info!(
                application_id = %app.id,
                from = %app.status,
                to = %status,
                "reconcile: released dangling application"
            );
        }

        if !report.is_clean() {
            tracing::warn!(?report, "reconciliation repaired inconsistent records");
        }
        Ok(report)
    }
}
