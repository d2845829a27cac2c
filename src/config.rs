use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_lifetime_hours: i64,
    pub client_url: String,
    pub rate_limit_max: u32,
    pub rate_limit_window_secs: u64,
    /// Key rate limits on `X-Forwarded-For`/`X-Real-IP`. Only safe behind a
    /// proxy that overwrites those headers.
    pub trust_proxy_headers: bool,
    pub uploads_dir: String,
    pub media_upload_url: Option<String>,
    pub media_upload_preset: Option<String>,
    pub media_folder: String,
    pub mail_webhook_url: Option<String>,
    pub mail_from: String,
    pub collaborator_timeout_secs: u64,
    pub reconcile_interval_secs: u64,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let config = Self {
            server_address: get_env_or("SERVER_ADDRESS", "0.0.0.0:5000"),
            database_url: get_env_opt("DATABASE_URL"),
            jwt_secret: get_env("JWT_SECRET")?,
            jwt_lifetime_hours: get_env_parse_or("JWT_LIFETIME_HOURS", 168)?,
            client_url: get_env_or("CLIENT_URL", "http://localhost:3000"),
            rate_limit_max: get_env_parse_or("RATE_LIMIT_MAX", 100)?,
            rate_limit_window_secs: get_env_parse_or("RATE_LIMIT_WINDOW_SECS", 900)?,
            trust_proxy_headers: get_env_parse_or("TRUST_PROXY_HEADERS", false)?,
            uploads_dir: get_env_or("UPLOADS_DIR", "./uploads"),
            media_upload_url: get_env_opt("MEDIA_UPLOAD_URL"),
            media_upload_preset: get_env_opt("MEDIA_UPLOAD_PRESET"),
            media_folder: get_env_or("MEDIA_FOLDER", "resumes"),
            mail_webhook_url: get_env_opt("MAIL_WEBHOOK_URL"),
            mail_from: get_env_or("MAIL_FROM", "JobDekho <no-reply@jobdekho.local>"),
            collaborator_timeout_secs: get_env_parse_or("COLLABORATOR_TIMEOUT_SECS", 10)?,
            reconcile_interval_secs: get_env_parse_or("RECONCILE_INTERVAL_SECS", 300)?,
            admin_email: get_env_opt("ADMIN_EMAIL"),
            admin_password: get_env_opt("ADMIN_PASSWORD"),
        };
        config.check_urls()?;
        Ok(config)
    }

    fn check_urls(&self) -> Result<()> {
        if self.client_url.trim() != "*" {
            check_url("CLIENT_URL", &self.client_url)?;
        }
        if let Some(url) = &self.media_upload_url {
            check_url("MEDIA_UPLOAD_URL", url)?;
        }
        if let Some(url) = &self.mail_webhook_url {
            check_url("MAIL_WEBHOOK_URL", url)?;
        }
        Ok(())
    }

    /// Defaults for a self-contained instance: no database, no remote
    /// collaborators, résumés stored under `uploads_dir`.
    pub fn local(jwt_secret: impl Into<String>) -> Self {
        Self {
            server_address: "127.0.0.1:0".to_string(),
            database_url: None,
            jwt_secret: jwt_secret.into(),
            jwt_lifetime_hours: 168,
            client_url: "http://localhost:3000".to_string(),
            rate_limit_max: 100,
            rate_limit_window_secs: 900,
            trust_proxy_headers: false,
            uploads_dir: "./uploads".to_string(),
            media_upload_url: None,
            media_upload_preset: None,
            media_folder: "resumes".to_string(),
            mail_webhook_url: None,
            mail_from: "JobDekho <no-reply@jobdekho.local>".to_string(),
            collaborator_timeout_secs: 10,
            reconcile_interval_secs: 300,
            admin_email: None,
            admin_password: None,
        }
    }
}

fn check_url(name: &str, value: &str) -> Result<()> {
    let parsed = url::Url::parse(value)
        .map_err(|e| Error::Config(format!("Invalid URL in {}: {}", name, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::Config(format!(
            "{} must use http or https, got {}",
            name, other
        ))),
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_or(name: &str, default: &str) -> String {
    get_env_opt(name).unwrap_or_else(|| default.to_string())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get_env_opt(name) {
        Some(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        None => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> Result<&'static Config> {
    CONFIG
        .get()
        .ok_or_else(|| Error::Config("Configuration has not been initialized".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_config_has_no_remote_collaborators() {
        let config = Config::local("secret");
        assert!(config.database_url.is_none());
        assert!(config.mail_webhook_url.is_none());
        assert!(config.check_urls().is_ok());
    }

    #[test]
    fn non_http_urls_are_rejected() {
        assert!(check_url("X", "https://media.example.com/upload").is_ok());
        assert!(check_url("X", "ftp://media.example.com").is_err());
        assert!(check_url("X", "not a url").is_err());
    }
}
