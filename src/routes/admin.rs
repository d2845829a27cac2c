use axum::{
    extract::State,
    response::{IntoResponse, Json},
    Extension,
};

use crate::{
    dto::auth_dto::UserResponse,
    error::Result,
    models::user::Role,
    services::access::Actor,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/admin/users",
    responses(
        (status = 200, description = "All accounts", body = [UserResponse]),
        (status = 403, description = "Admins only")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn list_users(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<impl IntoResponse> {
    let users = state.auth_service.list_users(&actor).await?;
    let body: Vec<UserResponse> = users.into_iter().map(Into::into).collect();
    Ok(Json(body))
}

#[utoipa::path(
    post,
    path = "/api/admin/reconcile",
    responses(
        (status = 200, description = "Repairs applied", body = crate::services::reconcile_service::ReconcileReport),
        (status = 403, description = "Admins only")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn reconcile(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<impl IntoResponse> {
    actor.require_role(&[Role::Admin])?;
    let report = state.reconcile_service.run_once().await?;
    Ok(Json(report))
}
