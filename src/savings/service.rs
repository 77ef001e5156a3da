use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::users::{
    repo::{RepoError, UserRepo},
    repo_types::{Deposit, Withdrawal},
};

/// Largest amount accepted in a single deposit or withdrawal.
pub const MAX_TRANSACTION_UNITS: i64 = 1_000_000_000;

/// Largest balance in cents; the `NUMERIC(14, 2)` column holds nothing bigger.
pub const MAX_BALANCE_CENTS: i64 = 99_999_999_999_999;

#[derive(Debug, thiserror::Error)]
pub enum SavingsError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(&'static str),
    #[error("Insufficient funds.")]
    InsufficientFunds,
    #[error("Account not found.")]
    AccountNotFound,
    #[error(transparent)]
    Store(#[from] RepoError),
}

fn validate_amount(amount: Decimal) -> Result<Decimal, SavingsError> {
    if amount <= Decimal::ZERO {
        return Err(SavingsError::InvalidAmount("must be positive"));
    }
    if amount.normalize().scale() > 2 {
        return Err(SavingsError::InvalidAmount("at most two decimal places"));
    }
    if amount > Decimal::from(MAX_TRANSACTION_UNITS) {
        return Err(SavingsError::InvalidAmount("exceeds the per-transaction limit"));
    }
    Ok(amount)
}

/// Balance operations for the authenticated account holder.
pub struct Savings {
    users: Arc<dyn UserRepo>,
}

impl Savings {
    pub fn new(users: Arc<dyn UserRepo>) -> Self {
        Self { users }
    }

    pub async fn deposit(&self, user_id: i64, amount: Decimal) -> Result<Decimal, SavingsError> {
        let amount = validate_amount(amount)?;
        let max_balance = Decimal::new(MAX_BALANCE_CENTS, 2);
        match self.users.deposit(user_id, amount, max_balance).await? {
            Deposit::Completed(balance) => {
                info!(user_id, %amount, %balance, "deposit");
                Ok(balance)
            }
            Deposit::LimitExceeded => {
                warn!(user_id, %amount, "deposit would exceed the balance limit");
                Err(SavingsError::InvalidAmount("balance would exceed the account limit"))
            }
            Deposit::UserNotFound => Err(SavingsError::AccountNotFound),
        }
    }

    pub async fn withdraw(&self, user_id: i64, amount: Decimal) -> Result<Decimal, SavingsError> {
        let amount = validate_amount(amount)?;
        match self.users.withdraw(user_id, amount).await? {
            Withdrawal::Completed(balance) => {
                info!(user_id, %amount, %balance, "withdrawal");
                Ok(balance)
            }
            Withdrawal::InsufficientFunds => {
                warn!(user_id, %amount, "withdrawal exceeds balance");
                Err(SavingsError::InsufficientFunds)
            }
            Withdrawal::UserNotFound => Err(SavingsError::AccountNotFound),
        }
    }

    pub async fn balance(&self, user_id: i64) -> Result<Decimal, SavingsError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(SavingsError::AccountNotFound)?;
        Ok(user.balance)
    }
}
