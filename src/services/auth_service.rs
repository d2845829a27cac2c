use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use crate::config::Config;
use crate::dto::auth_dto::{AuthResponse, LoginPayload, SignupPayload};
use crate::error::{Error, Result};
use crate::middleware::auth::issue_token;
use crate::models::user::{Role, User};
use crate::services::access::Actor;
use crate::services::notification_service::{MailKind, NotificationService, Outcome};
use crate::services::store::Store;
use crate::utils::crypto::{hash_password, verify_password};
use crate::utils::token::{generate_token, hash_token};
use crate::utils::time;
use crate::utils::validation::require_text;

const RESET_TOKEN_LEN: usize = 40;
const RESET_TOKEN_MINUTES: i64 = 15;

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn Store>,
    config: Arc<Config>,
    notifications: NotificationService,
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>, config: Arc<Config>, notifications: NotificationService) -> Self {
        Self {
            store,
            config,
            notifications,
        }
    }

    pub async fn signup(&self, payload: SignupPayload) -> Result<AuthResponse> {
        let role = payload.role.unwrap_or(Role::Jobseeker);
        if role == Role::Admin {
            return Err(Error::InvalidInput(
                "Admin accounts cannot be self-registered".into(),
            ));
        }
        let name = require_text("name", &payload.name)?;

        if self.store.find_user_by_email(&payload.email).await?.is_some() {
            return Err(Error::Conflict("User already exists".into()));
        }

        let user = User::new(name, &payload.email, hash_password(&payload.password)?, role);
        self.store.insert_user(&user).await?;
        tracing::info!(user_id = %user.id, role = %user.role, "user registered");

        let token = issue_token(&self.config, &user)?;
        Ok(AuthResponse {
            token,
            user: user.into(),
        })
    }

    pub async fn login(&self, payload: LoginPayload) -> Result<AuthResponse> {
        let invalid = || Error::Unauthenticated("Invalid email or password".into());

        let user = self
            .store
            .find_user_by_email(&payload.email)
            .await?
            .ok_or_else(invalid)?;
        if !verify_password(&payload.password, &user.password_hash) {
            return Err(invalid());
        }

        let token = issue_token(&self.config, &user)?;
        Ok(AuthResponse {
            token,
            user: user.into(),
        })
    }

    pub async fn profile(&self, actor: &Actor) -> Result<User> {
        self.store
            .find_user(actor.id)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".into()))
    }

    pub async fn list_users(&self, actor: &Actor) -> Result<Vec<User>> {
        actor.require_role(&[Role::Admin])?;
        self.store.list_users().await
    }

    /// Always succeeds for well-formed input so callers cannot probe which
    /// emails are registered.
    pub async fn forgot_password(&self, email: &str) -> Result<Outcome<()>> {
        let mut outcome = Outcome::new(());
        let Some(user) = self.store.find_user_by_email(email).await? else {
            tracing::debug!("password reset requested for unknown email");
            return Ok(outcome);
        };

        let token = generate_token(RESET_TOKEN_LEN);
        self.store
            .set_reset_token(
                user.id,
                &hash_token(&token),
                time::minutes_from_now(RESET_TOKEN_MINUTES),
            )
            .await?;

        let link = format!(
            "{}/reset-password/{}",
            self.config.client_url.trim_end_matches('/'),
            token
        );
        outcome.warn(
            self.notifications
                .notify(
                    &user.email,
                    MailKind::PasswordReset,
                    json!({
                        "name": user.name,
                        "reset_link": link,
                        "expires_in_minutes": RESET_TOKEN_MINUTES,
                    }),
                )
                .await,
        );
        Ok(outcome)
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<()> {
        let user = self
            .store
            .find_user_by_reset_token(&hash_token(token), time::now())
            .await?
            .ok_or_else(|| Error::InvalidInput("Reset token is invalid or has expired".into()))?;

        self.store
            .update_password(user.id, &hash_password(new_password)?)
            .await?;
        tracing::info!(user_id = %user.id, "password reset");
        Ok(())
    }

    /// Ensures the configured admin account exists. Returns its id.
    pub async fn bootstrap_admin(&self, email: &str, password: &str) -> Result<Uuid> {
        if let Some(existing) = self.store.find_user_by_email(email).await? {
            if existing.role != Role::Admin {
                tracing::warn!(
                    user_id = %existing.id,
                    "ADMIN_EMAIL belongs to a non-admin account, leaving it unchanged"
                );
            }
            return Ok(existing.id);
        }

        let admin = User::new(
            "Administrator".into(),
            email,
            hash_password(password)?,
            Role::Admin,
        );
        self.store.insert_user(&admin).await?;
        tracing::info!(user_id = %admin.id, "admin account created");
        Ok(admin.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::auth::decode_actor;
    use crate::services::memory_store::MemoryStore;
    use crate::services::notification_service::MockMailer;
    use std::sync::Mutex;
    use std::time::Duration;

    fn service(mailer: MockMailer) -> (AuthService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let notifications = NotificationService::new(Arc::new(mailer), Duration::from_secs(1));
        let svc = AuthService::new(
            store.clone(),
            Arc::new(Config::local("auth-test-secret")),
            notifications,
        );
        (svc, store)
    }

    fn signup(email: &str, role: Option<Role>) -> SignupPayload {
        SignupPayload {
            name: "Sam".into(),
            email: email.into(),
            password: "password123".into(),
            role,
        }
    }

    #[tokio::test]
    async fn signup_then_login() {
        let (svc, _) = service(MockMailer::new());
        let created = svc
            .signup(signup("Sam@Example.com", Some(Role::Recruiter)))
            .await
            .unwrap();
        assert_eq!(created.user.email, "sam@example.com");

        let logged_in = svc
            .login(LoginPayload {
                email: "sam@example.com".into(),
                password: "password123".into(),
            })
            .await
            .unwrap();
        let actor = decode_actor(&Config::local("auth-test-secret"), &logged_in.token).unwrap();
        assert_eq!(actor.id, created.user.id);
        assert_eq!(actor.role, Role::Recruiter);
    }

    #[tokio::test]
    async fn duplicate_email_is_conflict_regardless_of_case() {
        let (svc, _) = service(MockMailer::new());
        svc.signup(signup("dup@example.com", None)).await.unwrap();
        let err = svc.signup(signup("DUP@example.com", None)).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn admin_cannot_self_register() {
        let (svc, _) = service(MockMailer::new());
        let err = svc
            .signup(signup("boss@example.com", Some(Role::Admin)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn wrong_password_is_unauthenticated() {
        let (svc, _) = service(MockMailer::new());
        svc.signup(signup("a@example.com", None)).await.unwrap();
        let err = svc
            .login(LoginPayload {
                email: "a@example.com".into(),
                password: "nope-nope".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn reset_flow_uses_mailed_token_once() {
        let captured: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
        let sink = captured.clone();
        let mut mailer = MockMailer::new();
        mailer.expect_send().times(1).returning(move |_, kind, data| {
            assert_eq!(kind, MailKind::PasswordReset);
            let link = data["reset_link"].as_str().unwrap_or_default().to_string();
            *sink.lock().unwrap() = Some(link);
            Ok(())
        });
        let (svc, _) = service(mailer);
        svc.signup(signup("r@example.com", None)).await.unwrap();

        let outcome = svc.forgot_password("r@example.com").await.unwrap();
        assert!(outcome.warnings.is_empty());
        let link = captured.lock().unwrap().clone().unwrap();
        let token = link.rsplit('/').next().unwrap().to_string();
        assert!(link.starts_with("http://localhost:3000/reset-password/"));

        svc.reset_password(&token, "brand-new-pass").await.unwrap();
        svc.login(LoginPayload {
            email: "r@example.com".into(),
            password: "brand-new-pass".into(),
        })
        .await
        .unwrap();

        let err = svc.reset_password(&token, "another-pass").await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn forgot_password_for_unknown_email_is_silent() {
        let mut mailer = MockMailer::new();
        mailer.expect_send().times(0);
        let (svc, _) = service(mailer);
        let outcome = svc.forgot_password("ghost@example.com").await.unwrap();
        assert!(outcome.warnings.is_empty());
    }

    #[tokio::test]
    async fn bootstrap_admin_is_idempotent() {
        let (svc, store) = service(MockMailer::new());
        let first = svc.bootstrap_admin("admin@example.com", "adminpass1").await.unwrap();
        let second = svc.bootstrap_admin("admin@example.com", "adminpass1").await.unwrap();
        assert_eq!(first, second);
        let admin = store.find_user(first).await.unwrap().unwrap();
        assert_eq!(admin.role, Role::Admin);
    }
}
