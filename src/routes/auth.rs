use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};

use crate::{
    dto::auth_dto::{
        ForgotPasswordPayload, LoginPayload, MessageResponse, ResetPasswordPayload, SignupPayload,
        UserResponse,
    },
    error::Result,
    services::access::Actor,
    utils::validation::validate,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignupPayload,
    responses(
        (status = 201, description = "Account created", body = crate::dto::auth_dto::AuthResponse),
        (status = 400, description = "Invalid payload"),
        (status = 409, description = "Email already registered")
    )
)]
#[axum::debug_handler]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupPayload>,
) -> Result<impl IntoResponse> {
    validate(&payload)?;
    let created = state.auth_service.signup(payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginPayload,
    responses(
        (status = 200, description = "Logged in", body = crate::dto::auth_dto::AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<impl IntoResponse> {
    validate(&payload)?;
    let session = state.auth_service.login(payload).await?;
    Ok(Json(session))
}

#[utoipa::path(
    get,
    path = "/api/auth/profile",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn profile(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<impl IntoResponse> {
    let user = state.auth_service.profile(&actor).await?;
    Ok(Json(UserResponse::from(user)))
}

#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    request_body = ForgotPasswordPayload,
    responses(
        (status = 200, description = "Reset link sent if the email is registered", body = MessageResponse)
    )
)]
#[axum::debug_handler]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordPayload>,
) -> Result<impl IntoResponse> {
    validate(&payload)?;
    let outcome = state.auth_service.forgot_password(&payload.email).await?;
    Ok(Json(MessageResponse {
        message: "If that email is registered, a reset link has been sent".into(),
        warnings: outcome.warnings,
    }))
}

#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    request_body = ResetPasswordPayload,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Invalid or expired token")
    )
)]
#[axum::debug_handler]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordPayload>,
) -> Result<impl IntoResponse> {
    validate(&payload)?;
    state
        .auth_service
        .reset_password(&payload.token, &payload.password)
        .await?;
    Ok(Json(MessageResponse {
        message: "Password has been reset".into(),
        warnings: Vec::new(),
    }))
}
