use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;

use crate::{
    dto::{
        application_dto::{ApplicationEnvelope, RemoveInterviewResponse},
        interview_dto::{
            CreateInterviewPayload, InterviewEnvelope, InterviewResponse, UpdateInterviewPayload,
        },
    },
    error::Result,
    services::{access::Actor, application_service::Advanced, notification_service::Outcome},
    utils::validation::validate,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/interviews",
    request_body = CreateInterviewPayload,
    responses(
        (status = 201, description = "Interview booked, application moved to interview_scheduled", body = ApplicationEnvelope),
        (status = 400, description = "Invalid date, mode or location"),
        (status = 403, description = "Not the job's recruiter or an admin"),
        (status = 404, description = "Application not found"),
        (status = 409, description = "Application already has an interview or is finished")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn create_interview(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<CreateInterviewPayload>,
) -> Result<impl IntoResponse> {
    validate(&payload)?;
    let scheduled = state
        .interview_service
        .schedule(&actor, payload.application_id, payload.details)
        .await?;
    let outcome = Outcome {
        value: Advanced::from(scheduled.value),
        warnings: scheduled.warnings,
    };
    Ok((StatusCode::CREATED, Json(ApplicationEnvelope::from(outcome))))
}

#[utoipa::path(
    get,
    path = "/api/interviews",
    responses(
        (status = 200, description = "Interviews visible to the caller", body = [InterviewResponse])
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn list_interviews(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<impl IntoResponse> {
    let items = state.interview_service.list(&actor).await?;
    let body: Vec<InterviewResponse> = items.into_iter().map(Into::into).collect();
    Ok(Json(body))
}

#[utoipa::path(
    get,
    path = "/api/interviews/{id}",
    params(("id" = Uuid, Path, description = "Interview ID")),
    responses(
        (status = 200, description = "Interview found", body = InterviewResponse),
        (status = 403, description = "Not a participant or an admin"),
        (status = 404, description = "Interview not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn get_interview(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let interview = state.interview_service.view(&actor, id).await?;
    Ok(Json(InterviewResponse::from(interview)))
}

#[utoipa::path(
    put,
    path = "/api/interviews/{id}",
    params(("id" = Uuid, Path, description = "Interview ID")),
    request_body = UpdateInterviewPayload,
    responses(
        (status = 200, description = "Interview updated", body = InterviewEnvelope),
        (status = 403, description = "Not the interview's recruiter or an admin"),
        (status = 404, description = "Interview not found"),
        (status = 409, description = "Interview already completed or cancelled")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn update_interview(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateInterviewPayload>,
) -> Result<impl IntoResponse> {
    validate(&payload)?;
    let outcome = state.interview_service.update(&actor, id, payload).await?;
    Ok(Json(InterviewEnvelope::from(outcome)))
}

#[utoipa::path(
    delete,
    path = "/api/interviews/{id}",
    params(("id" = Uuid, Path, description = "Interview ID")),
    responses(
        (status = 200, description = "Interview deleted, application released", body = RemoveInterviewResponse),
        (status = 403, description = "Not the interview's recruiter or an admin"),
        (status = 404, description = "Interview not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn delete_interview(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let outcome = state.interview_service.remove(&actor, id).await?;
    Ok(Json(RemoveInterviewResponse::from(outcome)))
}
