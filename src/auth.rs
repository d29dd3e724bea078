// Password hashing, JWT issuance/verification and the token lifecycle
// (refresh-token storage, rotation and access-token blacklisting).

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    config::JwtSettings,
    error::AppError,
    models::{Role, User},
    store::TokenCache,
};

// --- Passwords ---

// bcrypt is deliberately slow, keep it off the async worker threads
pub async fn hash_password(password: &str, cost: u32) -> Result<String> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .context("Password hashing task panicked")?
        .context("Failed to hash password")
}

pub async fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let password = password.to_owned();
    let hash = hash.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .context("Password verification task panicked")?
        .context("Failed to verify password hash")
}

// --- Tokens ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    pub email: String,
    pub role: Role,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub typ: TokenKind,
}

impl Claims {
    // Time left before expiry, zero once expired
    pub fn remaining(&self) -> Duration {
        let secs = self.exp - Utc::now().timestamp();
        Duration::from_secs(secs.max(0) as u64)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64, // access token lifetime in seconds
}

pub fn refresh_key(user_id: &str) -> String {
    format!("refresh:{}", user_id)
}

pub fn blacklist_key(jti: &str) -> String {
    format!("blacklist:{}", jti)
}

/// Signs and verifies HS256 tokens. Access and refresh tokens use separate secrets.
pub struct TokenService {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl TokenService {
    pub fn new(settings: &JwtSettings) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(settings.access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(settings.access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(settings.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(settings.refresh_secret.as_bytes()),
            access_ttl_secs: settings.access_ttl_secs,
            refresh_ttl_secs: settings.refresh_ttl_secs,
        }
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_ttl_secs as u64)
    }

    pub fn issue(&self, user: &User, kind: TokenKind) -> Result<String> {
        let now = Utc::now().timestamp();
        let (key, ttl) = match kind {
            TokenKind::Access => (&self.access_encoding, self.access_ttl_secs),
            TokenKind::Refresh => (&self.refresh_encoding, self.refresh_ttl_secs),
        };
        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
            jti: Uuid::new_v4().to_string(),
            iat: now,
            exp: now + ttl,
            typ: kind,
        };
        encode(&Header::new(Algorithm::HS256), &claims, key).context("Failed to sign token")
    }

    pub fn issue_pair(&self, user: &User) -> Result<TokenPair> {
        Ok(TokenPair {
            access_token: self.issue(user, TokenKind::Access)?,
            refresh_token: self.issue(user, TokenKind::Refresh)?,
            token_type: "Bearer",
            expires_in: self.access_ttl_secs,
        })
    }

    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, AppError> {
        let key = match kind {
            TokenKind::Access => &self.access_decoding,
            TokenKind::Refresh => &self.refresh_decoding,
        };
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let decoded = decode::<Claims>(token, key, &validation).map_err(|e| {
            warn!("Token validation failed: {}", e);
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::Unauthorized("Token expired".into())
                }
                _ => AppError::Unauthorized("Invalid token".into()),
            }
        })?;

        if decoded.claims.typ != kind {
            warn!("Token of type {:?} presented where {:?} expected", decoded.claims.typ, kind);
            return Err(AppError::Unauthorized("Invalid token".into()));
        }
        Ok(decoded.claims)
    }
}

// --- Session lifecycle ---

/// Issues a fresh pair and records the refresh token as the user's current one.
pub async fn start_session(
    tokens: &TokenService,
    cache: &dyn TokenCache,
    user: &User,
) -> Result<TokenPair> {
    let pair = tokens.issue_pair(user)?;
    cache
        .set(&refresh_key(&user.id), &pair.refresh_token, tokens.refresh_ttl())
        .await
        .context("Failed to store refresh token")?;
    Ok(pair)
}

/// Validates a refresh token against the stored one and returns its claims.
/// A token that verifies but is no longer current (rotated or logged out) is rejected.
pub async fn check_refresh_token(
    tokens: &TokenService,
    cache: &dyn TokenCache,
    refresh_token: &str,
) -> Result<Claims, AppError> {
    let claims = tokens.verify(refresh_token, TokenKind::Refresh)?;
    let stored = cache.get(&refresh_key(&claims.sub)).await?;
    if stored.as_deref() != Some(refresh_token) {
        warn!("Stale or revoked refresh token presented for user {}", claims.sub);
        return Err(AppError::Unauthorized("Refresh token revoked".into()));
    }
    Ok(claims)
}

/// Drops the stored refresh token and, if given, blacklists the access token
/// for whatever lifetime it has left.
pub async fn end_session(
    cache: &dyn TokenCache,
    user_id: &str,
    access: Option<&Claims>,
) -> Result<()> {
    cache
        .del(&refresh_key(user_id))
        .await
        .context("Failed to revoke refresh token")?;
    if let Some(claims) = access {
        let remaining = claims.remaining();
        if !remaining.is_zero() {
            cache
                .set(&blacklist_key(&claims.jti), "1", remaining)
                .await
                .context("Failed to blacklist access token")?;
        }
    }
    info!("Session ended for user {}", user_id);
    Ok(())
}

pub async fn is_blacklisted(cache: &dyn TokenCache, jti: &str) -> Result<bool> {
    Ok(cache.get(&blacklist_key(jti)).await?.is_some())
}
