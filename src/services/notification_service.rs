use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::services::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MailKind {
    ApplicationReceived,
    ApplicationSubmitted,
    ApplicationStatusChanged,
    ApplicationCancelled,
    InterviewScheduled,
    InterviewUpdated,
    InterviewRemoved,
    PasswordReset,
}

impl MailKind {
    pub fn subject(&self) -> &'static str {
        match self {
            MailKind::ApplicationReceived => "New application received",
            MailKind::ApplicationSubmitted => "Your application was submitted",
            MailKind::ApplicationStatusChanged => "Your application status changed",
            MailKind::ApplicationCancelled => "An application was withdrawn",
            MailKind::InterviewScheduled => "Interview scheduled",
            MailKind::InterviewUpdated => "Interview updated",
            MailKind::InterviewRemoved => "Interview cancelled",
            MailKind::PasswordReset => "Reset your password",
        }
    }
}

/// Outbound mail collaborator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, kind: MailKind, data: &JsonValue) -> Result<()>;
}

/// Posts each message as JSON to a relay endpoint.
pub struct WebhookMailer {
    client: Client,
    url: String,
    from: String,
}

impl WebhookMailer {
    pub fn new(client: Client, url: String, from: String) -> Self {
        Self { client, url, from }
    }
}

#[async_trait]
impl Mailer for WebhookMailer {
    async fn send(&self, to: &str, kind: MailKind, data: &JsonValue) -> Result<()> {
        let body = json!({
            "from": self.from,
            "to": to,
            "subject": kind.subject(),
            "template": kind,
            "data": data,
        });
        self.client
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Used when no relay is configured. Messages only reach the log.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, kind: MailKind, data: &JsonValue) -> Result<()> {
        tracing::info!(to, template = ?kind, %data, "mail (log only)");
        Ok(())
    }
}

/// A successful result plus any non-fatal collaborator failures that
/// happened after the state change was committed.
#[derive(Debug, Clone)]
pub struct Outcome<T> {
    pub value: T,
    pub warnings: Vec<String>,
}

impl<T> Outcome<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    pub fn warn(&mut self, warning: Option<String>) {
        if let Some(w) = warning {
            self.warnings.push(w);
        }
    }
}

#[derive(Clone)]
pub struct NotificationService {
    mailer: Arc<dyn Mailer>,
    timeout: Duration,
}

impl NotificationService {
    pub fn new(mailer: Arc<dyn Mailer>, timeout: Duration) -> Self {
        Self { mailer, timeout }
    }

    /// Sends one message. Never fails: a send error or timeout is logged and
    /// handed back as a warning for the caller to surface.
    pub async fn notify(&self, to: &str, kind: MailKind, data: JsonValue) -> Option<String> {
        let result = match tokio::time::timeout(self.timeout, self.mailer.send(to, kind, &data))
            .await
        {
            Ok(res) => res,
            Err(_) => Err(Error::Unavailable(format!(
                "mail relay did not answer within {}s",
                self.timeout.as_secs()
            ))),
        };

        match result {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(error = %e, to, template = ?kind, "notification failed");
                Some(format!("Could not send '{}' email to {}", kind.subject(), to))
            }
        }
    }

    /// Like [`notify`](Self::notify), addressed by user id.
    pub async fn notify_user(
        &self,
        store: &dyn Store,
        user_id: Uuid,
        kind: MailKind,
        data: JsonValue,
    ) -> Option<String> {
        match store.find_user(user_id).await {
            Ok(Some(user)) => self.notify(&user.email, kind, data).await,
            Ok(None) => {
                tracing::warn!(%user_id, template = ?kind, "notification recipient not found");
                Some(format!("Could not send '{}' email: recipient not found", kind.subject()))
            }
            Err(e) => {
                tracing::warn!(error = %e, %user_id, template = ?kind, "recipient lookup failed");
                Some(format!("Could not send '{}' email", kind.subject()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn successful_send_yields_no_warning() {
        let mut mailer = MockMailer::new();
        mailer.expect_send().times(1).returning(|_, _, _| Ok(()));
        let svc = NotificationService::new(Arc::new(mailer), Duration::from_secs(1));

        let warning = svc
            .notify("a@example.com", MailKind::ApplicationSubmitted, json!({}))
            .await;
        assert!(warning.is_none());
    }

    #[tokio::test]
    async fn failed_send_becomes_warning() {
        let mut mailer = MockMailer::new();
        mailer
            .expect_send()
            .returning(|_, _, _| Err(Error::Unavailable("relay down".into())));
        let svc = NotificationService::new(Arc::new(mailer), Duration::from_secs(1));

        let warning = svc
            .notify("a@example.com", MailKind::InterviewScheduled, json!({}))
            .await;
        let warning = warning.expect("warning expected");
        assert!(warning.contains("Interview scheduled"));
        assert!(warning.contains("a@example.com"));
    }

    struct SlowMailer;

    #[async_trait]
    impl Mailer for SlowMailer {
        async fn send(&self, _: &str, _: MailKind, _: &JsonValue) -> Result<()> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn slow_relay_times_out_into_warning() {
        let svc = NotificationService::new(Arc::new(SlowMailer), Duration::from_millis(20));
        let warning = svc
            .notify("r@example.com", MailKind::ApplicationReceived, json!({}))
            .await;
        assert!(warning.is_some());
    }

    #[test]
    fn outcome_collects_only_present_warnings() {
        let mut outcome = Outcome::new(1);
        outcome.warn(None);
        outcome.warn(Some("x".into()));
        assert_eq!(outcome.warnings, vec!["x".to_string()]);
    }
}
