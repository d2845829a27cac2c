pub mod access;
pub mod application_service;
pub mod auth_service;
pub mod interview_service;
pub mod job_service;
pub mod memory_store;
pub mod notification_service;
pub mod pg_store;
pub mod reconcile_service;
pub mod store;
pub mod upload_service;
