use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use jobboard_backend::{
    config::Config,
    routes::create_router,
    services::{
        memory_store::MemoryStore, notification_service::LogMailer, upload_service::LocalUploader,
    },
    AppState,
};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;
use uuid::Uuid;

const BOUNDARY: &str = "jobboard-test-boundary";

fn app() -> Router {
    let root = std::env::temp_dir().join(format!("jobboard-api-{}", Uuid::new_v4()));
    let mut config = Config::local("api-test-secret");
    config.uploads_dir = root.to_string_lossy().into_owned();
    let state = AppState::new(
        Arc::new(config),
        Arc::new(MemoryStore::new()),
        Arc::new(LogMailer),
        Arc::new(LocalUploader::new(root, "resumes")),
    );
    create_router(state)
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<JsonValue>,
) -> (StatusCode, JsonValue) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    send(app, request).await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, JsonValue) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null);
    (status, json)
}

async fn signup(app: &Router, name: &str, role: &str) -> (String, String) {
    let email = format!("{}-{}@example.com", name, Uuid::new_v4());
    let (status, body) = call(
        app,
        Method::POST,
        "/api/auth/signup",
        None,
        Some(json!({
            "name": name,
            "email": email,
            "password": "correct-horse",
            "role": role,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    (
        body["token"].as_str().unwrap().to_string(),
        body["user"]["id"].as_str().unwrap().to_string(),
    )
}

async fn post_job(app: &Router, token: &str) -> String {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/jobs",
        Some(token),
        Some(json!({
            "title": "Site Reliability Engineer",
            "company": "Acme",
            "location": "Remote",
            "description": "Pager included",
            "skills": ["rust", "linux"],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_str().unwrap().to_string()
}

fn apply_request(job_id: &str, token: &str, file_name: &str, content: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"full_name\"\r\n\r\nAnn Example\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"skills\"\r\n\r\nrust, sql\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"resume\"; filename=\"{f}\"\r\n\
             Content-Type: application/pdf\r\n\r\n",
            b = BOUNDARY,
            f = file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(format!("/api/applications/apply/{}", job_id))
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn health_and_docs_are_public() {
    let app = app();

    let (status, body) = call(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = call(&app, Method::GET, "/api/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/applications/{id}/advance"].is_object());
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() {
    let app = app();

    let (status, _) = call(&app, Method::GET, "/api/applications/my", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(
        &app,
        Method::GET,
        "/api/interviews",
        Some("not-a-jwt"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/jobs",
        None,
        Some(json!({"title": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Browsing stays open.
    let (status, body) = call(&app, Method::GET, "/api/jobs", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn signup_login_and_profile() {
    let app = app();
    let email = format!("sam-{}@example.com", Uuid::new_v4());

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/auth/signup",
        None,
        Some(json!({"name": "Sam", "email": email, "password": "correct-horse"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["role"], "jobseeker");

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/auth/signup",
        None,
        Some(json!({"name": "Sam", "email": email, "password": "correct-horse"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/auth/signup",
        None,
        Some(json!({
            "name": "Mallory",
            "email": format!("m-{}@example.com", Uuid::new_v4()),
            "password": "correct-horse",
            "role": "admin",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"email": email, "password": "wrong-password"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"email": email, "password": "correct-horse"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = call(&app, Method::GET, "/api/auth/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], email.as_str());
}

#[tokio::test]
async fn hiring_pipeline_over_http() {
    let app = app();
    let (recruiter, _) = signup(&app, "rita", "recruiter").await;
    let (other_recruiter, _) = signup(&app, "ray", "recruiter").await;
    let (seeker, seeker_id) = signup(&app, "ann", "jobseeker").await;

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/jobs",
        Some(&seeker),
        Some(json!({
            "title": "Nope",
            "company": "Nope",
            "location": "Nowhere",
            "description": "Jobseekers cannot post",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let job_id = post_job(&app, &recruiter).await;

    let (status, body) = call(&app, Method::GET, "/api/jobs?search=reliability", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);

    // Résumé validation happens before anything is stored.
    let (status, _) = send(&app, apply_request(&job_id, &seeker, "cv.exe", b"MZ")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        apply_request(&job_id, &seeker, "cv.pdf", b"%PDF-1.7 fake body"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let app_id = body["application"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["application"]["status"], "applied");
    assert_eq!(body["application"]["applicant_id"], seeker_id.as_str());
    assert_eq!(body["application"]["skills"], json!(["rust", "sql"]));
    assert!(body["application"]["resume_url"]
        .as_str()
        .unwrap()
        .starts_with("/uploads/resumes/"));

    let (status, _) = send(
        &app,
        apply_request(&job_id, &seeker, "cv.pdf", b"%PDF-1.7 again"),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(
        &app,
        Method::GET,
        &format!("/api/applications/{}", app_id),
        Some(&other_recruiter),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(
        &app,
        Method::GET,
        "/api/applications/received",
        Some(&recruiter),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/api/applications/{}/advance", app_id),
        Some(&recruiter),
        Some(json!({"status": "shortlisted"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["application"]["status"], "shortlisted");

    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/api/applications/{}/advance", app_id),
        Some(&recruiter),
        Some(json!({"status": "reviewed"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/api/applications/{}/advance", app_id),
        Some(&recruiter),
        Some(json!({"status": "interview_scheduled"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let date = (Utc::now() + Duration::days(2)).to_rfc3339();
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/interviews",
        Some(&recruiter),
        Some(json!({
            "application_id": app_id,
            "date": date,
            "mode": "online",
            "location": "https://meet.example.com/room",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["application"]["status"], "interview_scheduled");
    let interview_id = body["interview"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["application"]["interview_id"], interview_id.as_str());

    let (status, body) = call(&app, Method::GET, "/api/interviews", Some(&seeker), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = call(
        &app,
        Method::PUT,
        &format!("/api/interviews/{}", interview_id),
        Some(&recruiter),
        Some(json!({"date": (Utc::now() + Duration::days(4)).to_rfc3339()})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["interview"]["status"], "rescheduled");

    let (status, body) = call(
        &app,
        Method::DELETE,
        &format!("/api/interviews/{}", interview_id),
        Some(&recruiter),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["application"]["status"], "shortlisted");
    assert!(body["application"]["interview_id"].is_null());

    let (status, _) = call(
        &app,
        Method::DELETE,
        &format!("/api/applications/cancel/{}", app_id),
        Some(&recruiter),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(
        &app,
        Method::DELETE,
        &format!("/api/applications/cancel/{}", app_id),
        Some(&seeker),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["application"]["status"], "cancelled");

    let (status, _) = call(
        &app,
        Method::DELETE,
        &format!("/api/applications/cancel/{}", app_id),
        Some(&seeker),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // A cancelled application frees the slot.
    let (status, _) = send(
        &app,
        apply_request(&job_id, &seeker, "cv.pdf", b"%PDF-1.7 second try"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn job_owner_controls_updates_and_removal() {
    let app = app();
    let (recruiter, _) = signup(&app, "rita", "recruiter").await;
    let (other_recruiter, _) = signup(&app, "ray", "recruiter").await;
    let job_id = post_job(&app, &recruiter).await;

    let (status, _) = call(
        &app,
        Method::PATCH,
        &format!("/api/jobs/{}", job_id),
        Some(&other_recruiter),
        Some(json!({"title": "Hijacked"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(
        &app,
        Method::PATCH,
        &format!("/api/jobs/{}", job_id),
        Some(&recruiter),
        Some(json!({"is_open": false})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["is_open"], false);

    let (status, body) = call(&app, Method::GET, "/api/jobs/mine", Some(&recruiter), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);

    let (status, body) = call(
        &app,
        Method::DELETE,
        &format!("/api/jobs/{}", job_id),
        Some(&recruiter),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cancelled_applications"], 0);

    let (status, _) = call(&app, Method::GET, &format!("/api/jobs/{}", job_id), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
