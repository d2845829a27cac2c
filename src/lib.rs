pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::services::{
    application_service::ApplicationService,
    auth_service::AuthService,
    interview_service::InterviewService,
    job_service::JobService,
    notification_service::{LogMailer, Mailer, NotificationService, WebhookMailer},
    reconcile_service::ReconcileService,
    store::Store,
    upload_service::{HttpUploader, LocalUploader, Uploader},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn Store>,
    pub auth_service: AuthService,
    pub job_service: JobService,
    pub application_service: ApplicationService,
    pub interview_service: InterviewService,
    pub reconcile_service: ReconcileService,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn Store>,
        mailer: Arc<dyn Mailer>,
        uploader: Arc<dyn Uploader>,
    ) -> Self {
        let notifications = NotificationService::new(
            mailer,
            Duration::from_secs(config.collaborator_timeout_secs),
        );

        let auth_service = AuthService::new(store.clone(), config.clone(), notifications.clone());
        let job_service = JobService::new(store.clone());
        let interview_service = InterviewService::new(store.clone(), notifications.clone());
        let application_service = ApplicationService::new(
            store.clone(),
            uploader,
            notifications,
            interview_service.clone(),
        );
        let reconcile_service = ReconcileService::new(store.clone());

        Self {
            config,
            store,
            auth_service,
            job_service,
            application_service,
            interview_service,
            reconcile_service,
        }
    }

    /// Picks the mail and upload collaborators the configuration asks for.
    pub fn from_config(config: Arc<Config>, store: Arc<dyn Store>) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.collaborator_timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        let mailer: Arc<dyn Mailer> = match &config.mail_webhook_url {
            Some(url) => Arc::new(WebhookMailer::new(
                http_client.clone(),
                url.clone(),
                config.mail_from.clone(),
            )),
            None => {
                tracing::warn!("MAIL_WEBHOOK_URL not set, emails will only be logged");
                Arc::new(LogMailer)
            }
        };

        let uploader: Arc<dyn Uploader> = match &config.media_upload_url {
            Some(url) => Arc::new(HttpUploader::new(
                http_client,
                url.clone(),
                config.media_upload_preset.clone(),
                config.media_folder.clone(),
            )),
            None => Arc::new(LocalUploader::new(
                config.uploads_dir.clone(),
                config.media_folder.clone(),
            )),
        };

        Ok(Self::new(config, store, mailer, uploader))
    }
}
