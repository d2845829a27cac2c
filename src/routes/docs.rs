use axum::{response::IntoResponse, Json};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::dto::{
    application_dto::{
        AdvancePayload, ApplicationEnvelope, ApplicationResponse, ApplyForm,
        RemoveInterviewResponse,
    },
    auth_dto::{
        AuthResponse, ForgotPasswordPayload, LoginPayload, MessageResponse, ResetPasswordPayload,
        SignupPayload, UserResponse,
    },
    interview_dto::{
        CreateInterviewPayload, InterviewDetails, InterviewEnvelope, InterviewResponse,
        UpdateInterviewPayload,
    },
    job_dto::{CreateJobPayload, JobListResponse, JobResponse, RemoveJobResponse, UpdateJobPayload},
};
use crate::models::{
    application::ApplicationStatus,
    interview::{InterviewMode, InterviewStatus},
    job::JobType,
    user::Role,
};
use crate::services::reconcile_service::ReconcileReport;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "Job board API", description = "Jobs, applications and interviews"),
    paths(
        super::health::health,
        super::auth::signup,
        super::auth::login,
        super::auth::profile,
        super::auth::forgot_password,
        super::auth::reset_password,
        super::jobs::list_jobs,
        super::jobs::get_job,
        super::jobs::list_my_jobs,
        super::jobs::create_job,
        super::jobs::update_job,
        super::jobs::delete_job,
        super::applications::apply,
        super::applications::list_my_applications,
        super::applications::list_received_applications,
        super::applications::list_job_applications,
        super::applications::get_application,
        super::applications::advance_application,
        super::applications::cancel_application,
        super::interviews::create_interview,
        super::interviews::list_interviews,
        super::interviews::get_interview,
        super::interviews::update_interview,
        super::interviews::delete_interview,
        super::admin::list_users,
        super::admin::reconcile,
    ),
    components(schemas(
        Role,
        JobType,
        ApplicationStatus,
        InterviewMode,
        InterviewStatus,
        SignupPayload,
        LoginPayload,
        ForgotPasswordPayload,
        ResetPasswordPayload,
        UserResponse,
        AuthResponse,
        MessageResponse,
        CreateJobPayload,
        UpdateJobPayload,
        JobResponse,
        JobListResponse,
        RemoveJobResponse,
        ApplyForm,
        AdvancePayload,
        ApplicationResponse,
        ApplicationEnvelope,
        RemoveInterviewResponse,
        InterviewDetails,
        CreateInterviewPayload,
        UpdateInterviewPayload,
        InterviewResponse,
        InterviewEnvelope,
        ReconcileReport,
    )),
    modifiers(&BearerAuth),
    tags((name = "jobboard", description = "Job board backend"))
)]
pub struct ApiDoc;

pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_core_paths() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/applications/{id}/advance",
            "/api/applications/cancel/{id}",
            "/api/interviews/{id}",
            "/api/admin/reconcile",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path} missing");
        }
    }
}
