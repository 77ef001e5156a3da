//! In-process `UserRepo` for tests. Mirrors the unique constraints of the `users` table.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Mutex,
};

use async_trait::async_trait;
use rust_decimal::Decimal;
use time::OffsetDateTime;

use crate::users::{
    repo::{RepoError, UserRepo},
    repo_types::{Deposit, NewUser, User, Withdrawal},
};

#[derive(Default)]
pub struct MemoryUserRepo {
    users: Mutex<Vec<User>>,
    fail_hash_writes: AtomicBool,
    account_insert_races: AtomicUsize,
}

impl MemoryUserRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `set_refresh_token_hash` fail with a database error.
    pub fn fail_hash_writes(&self, fail: bool) {
        self.fail_hash_writes.store(fail, Ordering::SeqCst);
    }

    /// The next `n` inserts fail with `DuplicateAccountNumber` even though
    /// `account_number_exists` reported the number as free.
    pub fn lose_account_number_races(&self, n: usize) {
        self.account_insert_races.store(n, Ordering::SeqCst);
    }

    pub fn snapshot(&self, id: i64) -> Option<User> {
        self.users.lock().unwrap().iter().find(|u| u.id == id).cloned()
    }

    pub fn count(&self) -> usize {
        self.users.lock().unwrap().len()
    }
}

#[async_trait]
impl UserRepo for MemoryUserRepo {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepoError> {
        Ok(self.snapshot(id))
    }

    async fn account_number_exists(&self, account_number: &str) -> Result<bool, RepoError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().any(|u| u.account_number == account_number))
    }

    async fn create(&self, new: NewUser) -> Result<User, RepoError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == new.email) {
            return Err(RepoError::DuplicateEmail);
        }
        if users.iter().any(|u| u.account_number == new.account_number) {
            return Err(RepoError::DuplicateAccountNumber);
        }
        let raced = self
            .account_insert_races
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if raced {
            return Err(RepoError::DuplicateAccountNumber);
        }
        let user = User {
            id: users.len() as i64 + 1,
            first_name: new.first_name,
            middle_name: new.middle_name,
            last_name: new.last_name,
            email: new.email,
            password_hash: new.password_hash,
            date_of_birth: new.date_of_birth,
            phone_number: new.phone_number,
            role: new.role,
            account_number: new.account_number,
            balance: Decimal::ZERO,
            refresh_token_hash: None,
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn set_refresh_token_hash(&self, id: i64, hash: Option<&str>) -> Result<(), RepoError> {
        if self.fail_hash_writes.load(Ordering::SeqCst) {
            return Err(RepoError::Database(sqlx::Error::PoolTimedOut));
        }
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(RepoError::NotFound)?;
        user.refresh_token_hash = hash.map(str::to_owned);
        Ok(())
    }

    async fn deposit(
        &self,
        id: i64,
        amount: Decimal,
        max_balance: Decimal,
    ) -> Result<Deposit, RepoError> {
        let mut users = self.users.lock().unwrap();
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(Deposit::UserNotFound);
        };
        if user.balance + amount > max_balance {
            return Ok(Deposit::LimitExceeded);
        }
        user.balance += amount;
        Ok(Deposit::Completed(user.balance))
    }

    async fn withdraw(&self, id: i64, amount: Decimal) -> Result<Withdrawal, RepoError> {
        let mut users = self.users.lock().unwrap();
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(Withdrawal::UserNotFound);
        };
        if user.balance < amount {
            return Ok(Withdrawal::InsufficientFunds);
        }
        user.balance -= amount;
        Ok(Withdrawal::Completed(user.balance))
    }
}
