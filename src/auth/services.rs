use std::sync::Arc;

use lazy_static::lazy_static;
use time::Date;
use tracing::{debug, info, warn};

use crate::{
    auth::{
        claims::Claims,
        error::AuthError,
        jwt::{JwtKeys, TokenPair},
        password::{hash_secret, verify_secret},
    },
    mail::{spawn_welcome, Mailer, WelcomeEmail},
    users::{
        account::{generate_account_number, is_valid_account_number, MAX_ACCOUNT_NUMBER_ATTEMPTS},
        repo::{RepoError, UserRepo},
        repo_types::{NewUser, Role, User},
    },
};

lazy_static! {
    // Verified against when the email is unknown so both login failures cost the same.
    static ref DUMMY_PASSWORD_HASH: String =
        hash_secret("dummy-password-for-timing").unwrap_or_default();
}

/// Validated registration input. Carries no role: new users are always `CUSTOMER`.
#[derive(Debug, Clone)]
pub struct Registration {
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub date_of_birth: Date,
    pub phone_number: String,
}

#[derive(Debug)]
pub struct Registered {
    pub user: User,
    pub tokens: TokenPair,
}

#[derive(Debug)]
pub struct Session {
    pub tokens: TokenPair,
    pub role: Role,
}

type AccountNumberSource = Arc<dyn Fn() -> String + Send + Sync>;

/// Registration, login, refresh and logout over a `UserRepo`.
///
/// Each user has at most one live refresh token: its argon2 hash is stored on the
/// user row and overwritten on every issuance. Two refreshes racing for the same
/// user both succeed, and whichever writes last keeps its token valid.
pub struct SessionManager {
    users: Arc<dyn UserRepo>,
    keys: JwtKeys,
    mailer: Arc<dyn Mailer>,
    login_url: String,
    next_account_number: AccountNumberSource,
    max_account_attempts: usize,
}

impl SessionManager {
    pub fn new(
        users: Arc<dyn UserRepo>,
        keys: JwtKeys,
        mailer: Arc<dyn Mailer>,
        login_url: impl Into<String>,
    ) -> Self {
        Self {
            users,
            keys,
            mailer,
            login_url: login_url.into(),
            next_account_number: Arc::new(|| generate_account_number(&mut rand::thread_rng())),
            max_account_attempts: MAX_ACCOUNT_NUMBER_ATTEMPTS,
        }
    }

    #[cfg(test)]
    pub fn with_account_numbers(
        mut self,
        source: impl Fn() -> String + Send + Sync + 'static,
    ) -> Self {
        self.next_account_number = Arc::new(source);
        self
    }

    pub async fn register(&self, reg: Registration) -> Result<Registered, AuthError> {
        let password_hash = hash_secret(&reg.password).map_err(AuthError::Hashing)?;
        let new_user = NewUser {
            first_name: reg.first_name,
            middle_name: reg.middle_name,
            last_name: reg.last_name,
            email: reg.email,
            password_hash,
            date_of_birth: reg.date_of_birth,
            phone_number: reg.phone_number,
            role: Role::Customer,
            account_number: String::new(),
        };
        let user = self.insert_with_fresh_account_number(new_user).await?;

        let tokens = self.issue_and_store(user.id, user.role).await?;

        spawn_welcome(
            self.mailer.clone(),
            WelcomeEmail::new(&user.email, &user.full_name(), &user.account_number, &self.login_url),
        );

        info!(user_id = user.id, email = %user.email, "user registered");
        Ok(Registered { user, tokens })
    }

    async fn insert_with_fresh_account_number(
        &self,
        mut new_user: NewUser,
    ) -> Result<User, AuthError> {
        for attempt in 1..=self.max_account_attempts {
            let candidate = (self.next_account_number)();
            if !is_valid_account_number(&candidate) {
                warn!(attempt, "account number source produced a malformed value");
                continue;
            }
            if self.users.account_number_exists(&candidate).await? {
                debug!(attempt, "account number already in use");
                continue;
            }
            new_user.account_number = candidate;
            match self.users.create(new_user.clone()).await {
                Ok(user) => return Ok(user),
                // Lost a race with a concurrent registration; the unique constraint caught it.
                Err(RepoError::DuplicateAccountNumber) => {
                    debug!(attempt, "account number taken at insert");
                }
                Err(RepoError::DuplicateEmail) => {
                    warn!(email = %new_user.email, "email already registered");
                    return Err(AuthError::DuplicateEmail);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(AuthError::AccountNumberExhausted(self.max_account_attempts))
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        self.try_login(email, password)
            .await
            .map_err(AuthError::into_login_error)
    }

    async fn try_login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let Some(user) = self.users.find_by_email(email).await? else {
            let _ = verify_secret(password, &DUMMY_PASSWORD_HASH);
            warn!(email = %email, "login unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_secret(password, &user.password_hash).map_err(AuthError::Hashing)? {
            warn!(user_id = user.id, "login invalid password");
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.issue_and_store(user.id, user.role).await?;
        info!(user_id = user.id, "user logged in");
        Ok(Session {
            tokens,
            role: user.role,
        })
    }

    /// `claims` must come from a verified, unexpired refresh token equal to `raw`.
    pub async fn refresh(&self, raw: &str, claims: &Claims) -> Result<Session, AuthError> {
        let user = self
            .users
            .find_by_id(claims.id)
            .await?
            .ok_or(AuthError::SessionRevoked)?;
        let stored = user
            .refresh_token_hash
            .as_deref()
            .ok_or(AuthError::SessionRevoked)?;

        if !verify_secret(raw, stored).map_err(AuthError::Hashing)? {
            warn!(user_id = user.id, "refresh token does not match stored hash");
            return Err(AuthError::InvalidRefreshToken);
        }

        let tokens = self.issue_and_store(user.id, user.role).await?;
        info!(user_id = user.id, "session refreshed");
        Ok(Session {
            tokens,
            role: user.role,
        })
    }

    pub async fn logout(&self, user_id: i64) -> Result<(), AuthError> {
        match self.clear_refresh_hash(user_id).await {
            Ok(()) | Err(AuthError::Store(RepoError::NotFound)) => {
                info!(user_id, "session revoked");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn issue_and_store(&self, user_id: i64, role: Role) -> Result<TokenPair, AuthError> {
        let tokens = self.keys.issue_pair(user_id, role)?;
        self.update_refresh_hash(user_id, &tokens.refresh_token)
            .await?;
        Ok(tokens)
    }

    pub async fn update_refresh_hash(&self, user_id: i64, raw: &str) -> Result<(), AuthError> {
        let hash = hash_secret(raw).map_err(AuthError::Hashing)?;
        self.users
            .set_refresh_token_hash(user_id, Some(&hash))
            .await?;
        Ok(())
    }

    pub async fn clear_refresh_hash(&self, user_id: i64) -> Result<(), AuthError> {
        self.users.set_refresh_token_hash(user_id, None).await?;
        Ok(())
    }
}
