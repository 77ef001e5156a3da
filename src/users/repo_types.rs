use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};

/// Authorization role stored in the `user_role` Postgres enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Customer,
    Admin,
}

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,            // argon2 PHC string
    pub date_of_birth: Date,
    pub phone_number: String,
    pub role: Role,
    pub account_number: String,           // 12 digits
    pub balance: Decimal,
    pub refresh_token_hash: Option<String>, // None once the session is revoked
    pub created_at: OffsetDateTime,
}

impl User {
    pub fn full_name(&self) -> String {
        match self.middle_name.as_deref().filter(|m| !m.is_empty()) {
            Some(middle) => format!("{} {} {}", self.first_name, middle, self.last_name),
            None => format!("{} {}", self.first_name, self.last_name),
        }
    }
}

/// Row to insert at registration. `role` is set by the session layer, never by clients.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub date_of_birth: Date,
    pub phone_number: String,
    pub role: Role,
    pub account_number: String,
}

/// Outcome of a conditional balance increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deposit {
    Completed(Decimal),
    LimitExceeded,
    UserNotFound,
}

/// Outcome of a conditional balance decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Withdrawal {
    Completed(Decimal),
    InsufficientFunds,
    UserNotFound,
}
