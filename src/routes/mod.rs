pub mod admin;
pub mod applications;
pub mod auth;
pub mod docs;
pub mod health;
pub mod interviews;
pub mod jobs;

use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::middleware::{
    auth::require_bearer_auth,
    cors::cors_layer,
    rate_limit::{rate_limit_middleware, RateLimiter},
};
use crate::AppState;

const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub fn create_router(state: AppState) -> Router {
    let config = state.config.clone();

    let public_api = Router::new()
        .route("/api/openapi.json", get(docs::openapi_json))
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/forgot-password", post(auth::forgot_password))
        .route("/api/auth/reset-password", post(auth::reset_password))
        .route("/api/jobs", get(jobs::list_jobs))
        .route("/api/jobs/:id", get(jobs::get_job));

    let protected_api = Router::new()
        .route("/api/auth/profile", get(auth::profile))
        .route("/api/jobs", post(jobs::create_job))
        .route("/api/jobs/mine", get(jobs::list_my_jobs))
        .route(
            "/api/jobs/:id",
            axum::routing::patch(jobs::update_job).delete(jobs::delete_job),
        )
        .route("/api/applications/apply/:job_id", post(applications::apply))
        .route("/api/applications/my", get(applications::list_my_applications))
        .route(
            "/api/applications/received",
            get(applications::list_received_applications),
        )
        .route(
            "/api/applications/job/:job_id",
            get(applications::list_job_applications),
        )
        .route("/api/applications/:id", get(applications::get_application))
        .route(
            "/api/applications/:id/advance",
            post(applications::advance_application),
        )
        .route(
            "/api/applications/cancel/:id",
            delete(applications::cancel_application),
        )
        .route(
            "/api/interviews",
            get(interviews::list_interviews).post(interviews::create_interview),
        )
        .route(
            "/api/interviews/:id",
            get(interviews::get_interview)
                .put(interviews::update_interview)
                .delete(interviews::delete_interview),
        )
        .route("/api/admin/users", get(admin::list_users))
        .route("/api/admin/reconcile", post(admin::reconcile))
        .route_layer(from_fn_with_state(state.clone(), require_bearer_auth));

    let limiter = RateLimiter::new(
        config.rate_limit_max,
        Duration::from_secs(config.rate_limit_window_secs),
    )
    .trust_proxy_headers(config.trust_proxy_headers);
    let api = public_api
        .merge(protected_api)
        .layer(from_fn_with_state(limiter, rate_limit_middleware));

    Router::new()
        .route("/health", get(health::health))
        .merge(api)
        .nest_service("/uploads", ServeDir::new(&config.uploads_dir))
        .with_state(state)
        .layer(cors_layer(&config.client_url))
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}
