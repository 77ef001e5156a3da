use std::time::Duration;

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    auth::{
        claims::{Claims, TokenKind},
        error::{AuthError, TokenError},
    },
    config::JwtConfig,
    users::repo_types::Role,
};

pub const ACCESS_TOKEN_TTL: Duration = Duration::from_secs(3 * 60 * 60);
pub const REFRESH_TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Signing and verification keys, built once at startup.
#[derive(Clone)]
pub struct JwtKeys {
    keys: Option<(EncodingKey, DecodingKey)>,
    issuer: String,
    audience: String,
}

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        let keys = cfg.secret.as_deref().map(|secret| {
            (
                EncodingKey::from_secret(secret.as_bytes()),
                DecodingKey::from_secret(secret.as_bytes()),
            )
        });
        if keys.is_none() {
            warn!("JWT_SECRET not set; token issuance will fail");
        }
        Self {
            keys,
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
        }
    }

    fn sign_with_kind(&self, user_id: i64, role: Role, kind: TokenKind) -> Result<String, AuthError> {
        let (encoding, _) = self.keys.as_ref().ok_or(AuthError::Configuration)?;
        let now = OffsetDateTime::now_utc();
        let ttl = match kind {
            TokenKind::Access => ACCESS_TOKEN_TTL,
            TokenKind::Refresh => REFRESH_TOKEN_TTL,
        };
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        let claims = Claims {
            id: user_id,
            role,
            kind,
            jti: Uuid::new_v4(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, encoding).map_err(AuthError::Signing)?;
        debug!(user_id, kind = ?kind, "jwt signed");
        Ok(token)
    }

    pub fn issue_pair(&self, user_id: i64, role: Role) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access_token: self.sign_with_kind(user_id, role, TokenKind::Access)?,
            refresh_token: self.sign_with_kind(user_id, role, TokenKind::Refresh)?,
        })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let (_, decoding) = self.keys.as_ref().ok_or(TokenError::NotConfigured)?;
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, decoding, &validation)?;
        debug!(user_id = data.claims.id, kind = ?data.claims.kind, "jwt verified");
        Ok(data.claims)
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = self.verify(token)?;
        if claims.kind != TokenKind::Access {
            return Err(TokenError::WrongKind("access"));
        }
        Ok(claims)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = self.verify(token)?;
        if claims.kind != TokenKind::Refresh {
            return Err(TokenError::WrongKind("refresh"));
        }
        Ok(claims)
    }
}
