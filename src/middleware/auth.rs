use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::user::{Role, User};
use crate::services::access::Actor;
use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

pub fn issue_token(config: &Config, user: &User) -> Result<String> {
    let exp = crate::utils::time::hours_from_now(config.jwt_lifetime_hours).timestamp();
    let claims = Claims {
        sub: user.id.to_string(),
        role: user.role.as_str().to_string(),
        exp: exp.max(0) as usize,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| Error::Internal(format!("failed to sign token: {}", e)))
}

pub fn decode_actor(config: &Config, token: &str) -> Result<Actor> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|_| Error::Unauthenticated("invalid_token".into()))?;

    let id = Uuid::parse_str(&data.claims.sub)
        .map_err(|_| Error::Unauthenticated("invalid_token".into()))?;
    let role = data
        .claims
        .role
        .parse::<Role>()
        .map_err(|_| Error::Unauthenticated("invalid_token".into()))?;
    Ok(Actor::new(id, role))
}

fn bearer_token(req: &Request) -> Result<&str> {
    let header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| Error::Unauthenticated("missing_authorization".into()))?;
    let value = header
        .to_str()
        .map_err(|_| Error::Unauthenticated("bad_authorization".into()))?;
    value
        .strip_prefix("Bearer ")
        .ok_or_else(|| Error::Unauthenticated("unsupported_scheme".into()))
}

/// Verifies the bearer token and makes the caller available to handlers as
/// `Extension<Actor>`.
pub async fn require_bearer_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let actor = match bearer_token(&req).and_then(|t| decode_actor(&state.config, t)) {
        Ok(actor) => actor,
        Err(e) => return e.into_response(),
    };
    req.extensions_mut().insert(actor);
    next.run(req).await
}
