//! Account registration, login and the bearer-token middleware.
//!
//! - `/api/auth/register` creates an account
//! - `/api/auth/login` exchanges username/password for a short-lived JWT
//! - every other protected endpoint requires `Authorization: Bearer <jwt>`
//!
//! The middleware resolves the token to an [`AuthUser`] and stores it in the
//! request extensions; handlers pass its id explicitly to the service.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use super::routes::AppState;
use super::types::{CredentialsRequest, LoginResponse};
use crate::board::{UserId, UserSummary};

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct Claims {
    /// User id
    sub: String,
    /// Username (for display/auditing)
    #[serde(default)]
    usr: String,
    /// Issued-at unix seconds
    iat: i64,
    /// Expiration unix seconds
    exp: i64,
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: UserId,
    pub username: String,
}

pub(crate) fn issue_jwt(
    secret: &str,
    ttl_hours: i64,
    user: &UserSummary,
) -> anyhow::Result<(String, i64)> {
    let now = Utc::now();
    let exp = now + Duration::hours(ttl_hours.max(1));
    let claims = Claims {
        sub: user.id.to_string(),
        usr: user.username.clone(),
        iat: now.timestamp(),
        exp: exp.timestamp(),
    };
    let token = jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok((token, claims.exp))
}

fn verify_jwt(token: &str, secret: &str) -> anyhow::Result<Claims> {
    let validation = Validation::default();
    let token_data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    Ok(token_data.claims)
}

/// POST /api/auth/register - Create an account.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<UserSummary>), (StatusCode, String)> {
    let user = state.service.register(&req.username, &req.password).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /api/auth/login - Exchange credentials for a token.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<LoginResponse>, (StatusCode, String)> {
    // Unknown user and wrong password share one message so usernames
    // cannot be probed.
    let user = state
        .service
        .authenticate(&req.username, &req.password)
        .await?;

    let (token, exp) = issue_jwt(
        &state.config.auth.jwt_secret,
        state.config.auth.jwt_ttl_hours,
        &user,
    )
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    tracing::info!(user = %user.id, "login");
    Ok(Json(LoginResponse { token, exp }))
}

pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    let token = auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
        .unwrap_or("");

    if token.is_empty() {
        return (StatusCode::UNAUTHORIZED, "Missing Authorization header").into_response();
    }

    let claims = match verify_jwt(token, &state.config.auth.jwt_secret) {
        Ok(claims) => claims,
        Err(_) => return (StatusCode::UNAUTHORIZED, "Invalid or expired token").into_response(),
    };

    let Ok(id) = Uuid::parse_str(&claims.sub) else {
        return (StatusCode::UNAUTHORIZED, "Invalid user").into_response();
    };

    // A well-signed token for a user no longer in the store is rejected.
    match state.service.user(id).await {
        Ok(Some(user)) => {
            req.extensions_mut().insert(AuthUser {
                id: user.id,
                username: user.username,
            });
            next.run(req).await
        }
        Ok(None) => (StatusCode::UNAUTHORIZED, "Invalid user").into_response(),
        Err(e) => <(StatusCode, String)>::from(e).into_response(),
    }
}
