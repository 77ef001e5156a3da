use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    auth::{
        jwt::TokenPair,
        services::{Registered, Registration, Session},
        validate::{check_password, is_valid_email, is_valid_phone, parse_birth_date},
    },
    error::ApiError,
    users::{dto::PublicUser, repo_types::Role},
};

/// Request body for user registration.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub first_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub date_of_birth: String,
    pub phone_number: String,
    /// Accepted so that it can be logged; never used.
    #[serde(default)]
    pub role: Option<serde_json::Value>,
}

fn required(value: String, field: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::bad_request(format!("{field} is required")));
    }
    Ok(trimmed.to_owned())
}

impl RegisterRequest {
    pub fn into_registration(self) -> Result<Registration, ApiError> {
        if let Some(role) = &self.role {
            warn!(requested_role = %role, "ignoring client-supplied role at registration");
        }

        let email = self.email.trim().to_owned();
        if !is_valid_email(&email) {
            return Err(ApiError::bad_request("Invalid email"));
        }
        check_password(&self.password).map_err(ApiError::bad_request)?;

        let phone_number = self.phone_number.trim().to_owned();
        if !is_valid_phone(&phone_number) {
            return Err(ApiError::bad_request("Invalid phone number"));
        }
        let date_of_birth =
            parse_birth_date(self.date_of_birth.trim()).map_err(ApiError::bad_request)?;

        Ok(Registration {
            first_name: required(self.first_name, "firstName")?,
            middle_name: self
                .middle_name
                .map(|m| m.trim().to_owned())
                .filter(|m| !m.is_empty()),
            last_name: required(self.last_name, "lastName")?,
            email,
            password: self.password,
            date_of_birth,
            phone_number,
        })
    }
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for token refresh.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
    pub user: PublicUser,
    pub access_token: String,
    pub refresh_token: String,
    pub role: Role,
}

impl From<Registered> for RegisterResponse {
    fn from(r: Registered) -> Self {
        let TokenPair {
            access_token,
            refresh_token,
        } = r.tokens;
        Self {
            message: "User registered",
            user: PublicUser::from(&r.user),
            access_token,
            refresh_token,
            role: r.user.role,
        }
    }
}

/// Response returned after login or refresh.
#[derive(Debug, Serialize)]
pub struct TokensResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub role: Role,
}

impl From<Session> for TokensResponse {
    fn from(s: Session) -> Self {
        Self {
            access_token: s.tokens.access_token,
            refresh_token: s.tokens.refresh_token,
            role: s.role,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}
