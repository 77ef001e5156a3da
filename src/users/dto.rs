use rust_decimal::Decimal;
use serde::Serialize;
use time::OffsetDateTime;

use crate::users::repo_types::{Role, User};

/// User fields safe to return to the client. No password or refresh hash.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: i64,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub email: String,
    pub date_of_birth: String,
    pub phone_number: String,
    pub role: Role,
    pub account_number: String,
    pub balance: Decimal,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&User> for PublicUser {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            first_name: u.first_name.clone(),
            middle_name: u.middle_name.clone(),
            last_name: u.last_name.clone(),
            email: u.email.clone(),
            date_of_birth: u.date_of_birth.to_string(),
            phone_number: u.phone_number.clone(),
            role: u.role,
            account_number: u.account_number.clone(),
            balance: u.balance,
            created_at: u.created_at,
        }
    }
}

/// Response of `GET /users/profile`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub account_number: String,
    pub balance: Decimal,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&User> for ProfileResponse {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            name: u.full_name(),
            email: u.email.clone(),
            role: u.role,
            account_number: u.account_number.clone(),
            balance: u.balance,
            created_at: u.created_at,
        }
    }
}
