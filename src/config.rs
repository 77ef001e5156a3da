use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    /// Shared HS256 secret for access and refresh tokens. `None` disables signing.
    pub secret: Option<String>,
    pub issuer: String,
    pub audience: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub frontend_login_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub jwt: JwtConfig,
    pub mail: MailConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").ok().filter(|s| !s.is_empty()),
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "savings-api".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "savings-api-users".into()),
        };
        let mail = MailConfig {
            frontend_login_url: std::env::var("FRONTEND_LOGIN_URL")
                .unwrap_or_else(|_| "http://localhost:3000/".into()),
        };
        Ok(Self {
            database_url,
            max_connections,
            jwt,
            mail,
        })
    }
}
