//! Credential sessions: JWT token creation/verification and the request extractor.
//!
//! The two hosted-API keys a user enters are held in a signed, HTTP-only
//! session cookie and never touch disk. Handlers receive them as an explicit
//! [`Credentials`] argument via the `FromRequestParts` extractor below; a
//! request without a valid session is redirected to the credential-entry page
//! before any generation work happens.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::Redirect,
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{AppState, config::Config, errors::Error};

/// The pair of hosted-API keys scoped to one browser session.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Key for the chat-completion (story generation) API
    pub story_key: String,
    /// Key for the image generation API
    pub image_key: String,
}

/// JWT session claims
#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    story_key: String,
    image_key: String,
    exp: i64, // Expiration time
    iat: i64, // Issued at
}

impl SessionClaims {
    fn new(credentials: &Credentials, config: &Config) -> Self {
        let now = Utc::now();
        let exp = now + config.session.expiry;

        Self {
            story_key: credentials.story_key.clone(),
            image_key: credentials.image_key.clone(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        }
    }
}

impl From<SessionClaims> for Credentials {
    fn from(claims: SessionClaims) -> Self {
        Self {
            story_key: claims.story_key,
            image_key: claims.image_key,
        }
    }
}

/// Create a JWT token carrying the session credentials
pub fn create_session_token(credentials: &Credentials, config: &Config) -> Result<String, Error> {
    let claims = SessionClaims::new(credentials, config);
    let key = EncodingKey::from_secret(config.secret_key.as_bytes());
    encode(&Header::default(), &claims, &key).map_err(|e| Error::Internal {
        operation: format!("create session JWT: {e}"),
    })
}

/// Verify and decode a JWT session token
pub fn verify_session_token(token: &str, config: &Config) -> Result<Credentials, Error> {
    let key = DecodingKey::from_secret(config.secret_key.as_bytes());
    let validation = Validation::default();

    let token_data = decode::<SessionClaims>(token, &key, &validation).map_err(|e| match e.kind() {
        // Client errors - malformed, tampered, or expired tokens
        jsonwebtoken::errors::ErrorKind::InvalidToken
        | jsonwebtoken::errors::ErrorKind::InvalidSignature
        | jsonwebtoken::errors::ErrorKind::ExpiredSignature
        | jsonwebtoken::errors::ErrorKind::MissingRequiredClaim(_)
        | jsonwebtoken::errors::ErrorKind::ImmatureSignature
        | jsonwebtoken::errors::ErrorKind::Base64(_)
        | jsonwebtoken::errors::ErrorKind::Json(_)
        | jsonwebtoken::errors::ErrorKind::Utf8(_)
        | jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => Error::Unauthenticated,

        // Server errors - key issues, internal failures
        _ => Error::Internal {
            operation: format!("session JWT verification: {e}"),
        },
    })?;

    Ok(Credentials::from(token_data.claims))
}

/// Build the `Set-Cookie` value for a session token
pub fn create_session_cookie(token: &str, config: &Config) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        config.session.cookie_name,
        token,
        config.session.expiry.as_secs()
    )
}

/// Find the session cookie in a Cookie header value, if present
fn session_cookie_value<'a>(cookie_header: &'a str, cookie_name: &str) -> Option<&'a str> {
    for cookie in cookie_header.split(';') {
        let cookie = cookie.trim();
        if let Some((name, value)) = cookie.split_once('=')
            && name == cookie_name
        {
            return Some(value);
        }
    }
    None
}

impl FromRequestParts<AppState> for Credentials {
    /// A request without valid credentials goes back to the credential-entry view
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let cookie_header = parts
            .headers
            .get(axum::http::header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| Redirect::to("/"))?;

        let token = session_cookie_value(cookie_header, &state.config.session.cookie_name)
            .ok_or_else(|| Redirect::to("/"))?;

        verify_session_token(token, &state.config).map_err(|e| {
            tracing::debug!("Rejecting session cookie: {}", e);
            Redirect::to("/")
        })
    }
}
