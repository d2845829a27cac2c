use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;

use crate::{
    dto::application_dto::{
        AdvancePayload, ApplicationEnvelope, ApplicationListQuery, ApplicationResponse,
    },
    error::{Error, Result},
    models::application::{ApplicantProfile, Application},
    services::{access::Actor, upload_service::ResumeFile},
    utils::validation::validate,
    AppState,
};

fn to_responses(items: Vec<Application>) -> Json<Vec<ApplicationResponse>> {
    Json(items.into_iter().map(Into::into).collect())
}

/// Pulls the résumé and profile fields out of the form. Unknown fields are
/// ignored.
async fn read_apply_form(
    mut multipart: Multipart,
) -> Result<(Option<ResumeFile>, ApplicantProfile)> {
    let mut resume = None;
    let mut profile = ApplicantProfile::default();

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "resume" => {
                let file_name = field.file_name().unwrap_or("resume.bin").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(|e| {
                    tracing::error!("Failed to read resume bytes: {}", e);
                    Error::InvalidInput("Failed to read file upload".into())
                })?;
                if !bytes.is_empty() {
                    resume = Some(ResumeFile {
                        file_name,
                        content_type,
                        bytes,
                    });
                }
            }
            "full_name" => profile.full_name = Some(field.text().await?),
            "contact_email" => profile.contact_email = Some(field.text().await?),
            "phone" => profile.phone = Some(field.text().await?),
            "qualifications" => profile.qualifications = Some(field.text().await?),
            "experience_years" => {
                let raw = field.text().await?;
                let raw = raw.trim();
                if !raw.is_empty() {
                    let years = raw.parse::<i32>().map_err(|_| {
                        Error::InvalidInput("experience_years must be a whole number".into())
                    })?;
                    profile.experience_years = Some(years);
                }
            }
            "skills" => {
                let raw = field.text().await?;
                profile
                    .skills
                    .extend(raw.split(',').map(|s| s.trim().to_string()));
            }
            _ => {}
        }
    }

    Ok((resume, profile))
}

#[utoipa::path(
    post,
    path = "/api/applications/apply/{job_id}",
    params(("job_id" = Uuid, Path, description = "Job ID")),
    request_body(content = crate::dto::application_dto::ApplyForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Application submitted", body = ApplicationEnvelope),
        (status = 400, description = "Missing or invalid résumé"),
        (status = 404, description = "Job not found"),
        (status = 409, description = "Active application already exists or job is closed"),
        (status = 502, description = "Résumé upload failed")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn apply(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(job_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let (resume, profile) = read_apply_form(multipart).await?;
    let outcome = state
        .application_service
        .apply(&actor, job_id, resume, profile)
        .await?;
    Ok((StatusCode::CREATED, Json(ApplicationEnvelope::from(outcome))))
}

#[utoipa::path(
    get,
    path = "/api/applications/my",
    params(ApplicationListQuery),
    responses(
        (status = 200, description = "The caller's applications", body = [ApplicationResponse]),
        (status = 403, description = "Not a jobseeker")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn list_my_applications(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<ApplicationListQuery>,
) -> Result<impl IntoResponse> {
    let items = state
        .application_service
        .list_mine(&actor, query.status)
        .await?;
    Ok(to_responses(items))
}

#[utoipa::path(
    get,
    path = "/api/applications/received",
    params(ApplicationListQuery),
    responses(
        (status = 200, description = "Applications addressed to the caller", body = [ApplicationResponse]),
        (status = 403, description = "Not a recruiter or admin")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn list_received_applications(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<ApplicationListQuery>,
) -> Result<impl IntoResponse> {
    let items = state
        .application_service
        .list_received(&actor, query.status)
        .await?;
    Ok(to_responses(items))
}

#[utoipa::path(
    get,
    path = "/api/applications/job/{job_id}",
    params(("job_id" = Uuid, Path, description = "Job ID"), ApplicationListQuery),
    responses(
        (status = 200, description = "Applications for the job", body = [ApplicationResponse]),
        (status = 403, description = "Not the job owner"),
        (status = 404, description = "Job not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn list_job_applications(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(job_id): Path<Uuid>,
    Query(query): Query<ApplicationListQuery>,
) -> Result<impl IntoResponse> {
    let items = state
        .application_service
        .list_for_job(&actor, job_id, query.status)
        .await?;
    Ok(to_responses(items))
}

#[utoipa::path(
    get,
    path = "/api/applications/{id}",
    params(("id" = Uuid, Path, description = "Application ID")),
    responses(
        (status = 200, description = "Application found", body = ApplicationResponse),
        (status = 403, description = "Not the applicant, recruiter or an admin"),
        (status = 404, description = "Application not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn get_application(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let application = state.application_service.view(&actor, id).await?;
    Ok(Json(ApplicationResponse::from(application)))
}

#[utoipa::path(
    post,
    path = "/api/applications/{id}/advance",
    params(("id" = Uuid, Path, description = "Application ID")),
    request_body = AdvancePayload,
    responses(
        (status = 200, description = "Status changed", body = ApplicationEnvelope),
        (status = 400, description = "Interview details missing or invalid"),
        (status = 403, description = "Not the job's recruiter or an admin"),
        (status = 404, description = "Application not found"),
        (status = 409, description = "Transition not allowed from the current status")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn advance_application(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdvancePayload>,
) -> Result<impl IntoResponse> {
    validate(&payload)?;
    let outcome = state
        .application_service
        .advance(&actor, id, payload.status, payload.interview)
        .await?;
    Ok(Json(ApplicationEnvelope::from(outcome)))
}

#[utoipa::path(
    delete,
    path = "/api/applications/cancel/{id}",
    params(("id" = Uuid, Path, description = "Application ID")),
    responses(
        (status = 200, description = "Application cancelled", body = ApplicationEnvelope),
        (status = 403, description = "Not the applicant or an admin"),
        (status = 404, description = "Application not found"),
        (status = 409, description = "Application already finished")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn cancel_application(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let outcome = state.application_service.cancel(&actor, id).await?;
    Ok(Json(ApplicationEnvelope::from(outcome)))
}
