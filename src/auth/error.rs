use crate::users::repo::RepoError;

/// Outcomes of the session operations. Display strings are safe to show to callers
/// for the expected variants only.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("A user with this email already exists.")]
    DuplicateEmail,
    #[error("Invalid email or password.")]
    InvalidCredentials,
    #[error("Session revoked or user not found.")]
    SessionRevoked,
    #[error("Invalid refresh token.")]
    InvalidRefreshToken,
    #[error("JWT signing secret is not configured")]
    Configuration,
    #[error("no free account number after {0} attempts")]
    AccountNumberExhausted(usize),
    #[error("token signing failed")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("hashing failed")]
    Hashing(#[source] anyhow::Error),
    #[error(transparent)]
    Store(#[from] RepoError),
    #[error("dependency failure during {operation}")]
    Dependency {
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl AuthError {
    /// Collapses anything except bad credentials into an opaque dependency failure.
    pub(crate) fn into_login_error(self) -> Self {
        match self {
            AuthError::InvalidCredentials | AuthError::Dependency { .. } => self,
            other => AuthError::Dependency {
                operation: "login",
                source: other.into(),
            },
        }
    }
}

/// Failures while decoding a presented JWT.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("JWT signing secret is not configured")]
    NotConfigured,
    #[error("invalid or expired token")]
    Invalid(#[from] jsonwebtoken::errors::Error),
    #[error("{0} token required")]
    WrongKind(&'static str),
}
