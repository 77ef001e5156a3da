use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::users::repo_types::{Deposit, NewUser, User, Withdrawal};

const USER_COLUMNS: &str = "id, first_name, middle_name, last_name, email, password_hash, \
     date_of_birth, phone_number, role, account_number, balance, refresh_token_hash, created_at";

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("account number already taken")]
    DuplicateAccountNumber,
    #[error("user not found")]
    NotFound,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Persistence contract for user rows. Every method touches a single row.
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepoError>;
    async fn account_number_exists(&self, account_number: &str) -> Result<bool, RepoError>;
    async fn create(&self, user: NewUser) -> Result<User, RepoError>;
    /// Overwrites the refresh-token hash; `None` revokes the session.
    async fn set_refresh_token_hash(&self, id: i64, hash: Option<&str>) -> Result<(), RepoError>;
    /// Returns the new balance, or `None` if the user does not exist.
    /// Adds `amount` unless the new balance would exceed `max_balance`.
    async fn deposit(
        &self,
        id: i64,
        amount: Decimal,
        max_balance: Decimal,
    ) -> Result<Deposit, RepoError>;
    async fn withdraw(&self, id: i64, amount: Decimal) -> Result<Withdrawal, RepoError>;
}

#[derive(Clone)]
pub struct PgUserRepo {
    db: PgPool,
}

impl PgUserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn user_exists(&self, id: i64) -> Result<bool, RepoError> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.db)
                .await?;
        Ok(exists)
    }
}

fn map_insert_error(e: sqlx::Error) -> RepoError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            match db_err.constraint() {
                Some("users_email_key") => return RepoError::DuplicateEmail,
                Some("users_account_number_key") => return RepoError::DuplicateAccountNumber,
                _ => {}
            }
        }
    }
    RepoError::Database(e)
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepoError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn account_number_exists(&self, account_number: &str) -> Result<bool, RepoError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE account_number = $1)",
        )
        .bind(account_number)
        .fetch_one(&self.db)
        .await?;
        Ok(exists)
    }

    async fn create(&self, user: NewUser) -> Result<User, RepoError> {
        let sql = format!(
            r#"
            INSERT INTO users (first_name, middle_name, last_name, email, password_hash,
                               date_of_birth, phone_number, role, account_number)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&user.first_name)
            .bind(&user.middle_name)
            .bind(&user.last_name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.date_of_birth)
            .bind(&user.phone_number)
            .bind(user.role)
            .bind(&user.account_number)
            .fetch_one(&self.db)
            .await
            .map_err(map_insert_error)
    }

    async fn set_refresh_token_hash(&self, id: i64, hash: Option<&str>) -> Result<(), RepoError> {
        let result = sqlx::query("UPDATE users SET refresh_token_hash = $1 WHERE id = $2")
            .bind(hash)
            .bind(id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn deposit(
        &self,
        id: i64,
        amount: Decimal,
        max_balance: Decimal,
    ) -> Result<Deposit, RepoError> {
        let balance = sqlx::query_scalar::<_, Decimal>(
            r#"
            UPDATE users SET balance = balance + $1
            WHERE id = $2 AND balance + $1 <= $3
            RETURNING balance
            "#,
        )
        .bind(amount)
        .bind(id)
        .bind(max_balance)
        .fetch_optional(&self.db)
        .await?;

        if let Some(balance) = balance {
            return Ok(Deposit::Completed(balance));
        }
        Ok(if self.user_exists(id).await? {
            Deposit::LimitExceeded
        } else {
            Deposit::UserNotFound
        })
    }

    async fn withdraw(&self, id: i64, amount: Decimal) -> Result<Withdrawal, RepoError> {
        let balance = sqlx::query_scalar::<_, Decimal>(
            r#"
            UPDATE users SET balance = balance - $1
            WHERE id = $2 AND balance >= $1
            RETURNING balance
            "#,
        )
        .bind(amount)
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        if let Some(balance) = balance {
            return Ok(Withdrawal::Completed(balance));
        }

        Ok(if self.user_exists(id).await? {
            Withdrawal::InsufficientFunds
        } else {
            Withdrawal::UserNotFound
        })
    }
}
