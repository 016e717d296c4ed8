//! Account creation and sign-in.
//!
//! [`AuthBackend`] abstracts the hosted identity service;
//! [`IdentityToolkitClient`] talks to it over REST. [`AccountService`]
//! runs the signup and login flows on top of a backend and a
//! [`ProfileStore`](crate::store::ProfileStore).

mod accounts;
mod avatar;
mod identity;

pub use accounts::{is_valid_email, AccountService, LoginOutcome, SignupOutcome};
pub use avatar::{assign_avatar, email_hash};
pub use identity::IdentityToolkitClient;

use async_trait::async_trait;

use crate::store::StoreError;

/// A signed-in account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    /// Account id
    pub uid: String,
    pub email: String,
    /// Short-lived token for authenticated requests
    pub id_token: String,
    pub refresh_token: String,
}

/// Errors from the signup and login flows
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("The email address is already in use by another account")]
    EmailAlreadyInUse,

    #[error("The password is too weak")]
    WeakPassword,

    #[error("The email address is badly formatted")]
    InvalidEmail,

    #[error("There is no account for this email")]
    UserNotFound,

    #[error("The password is invalid")]
    WrongPassword,

    #[error("Too many unsuccessful attempts")]
    TooManyRequests,

    #[error("Auth backend misconfigured: {0}")]
    Misconfigured(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Profile store error: {0}")]
    Store(#[from] StoreError),

    #[error("{message}")]
    Other { code: String, message: String },
}

impl AuthError {
    /// Error code in the `auth/...` form
    pub fn code(&self) -> &str {
        match self {
            AuthError::EmailAlreadyInUse => "auth/email-already-in-use",
            AuthError::WeakPassword => "auth/weak-password",
            AuthError::InvalidEmail => "auth/invalid-email",
            AuthError::UserNotFound => "auth/user-not-found",
            AuthError::WrongPassword => "auth/wrong-password",
            AuthError::TooManyRequests => "auth/too-many-requests",
            AuthError::Misconfigured(_) => "auth/invalid-api-key",
            AuthError::Network(_) => "auth/network-request-failed",
            AuthError::Store(_) => "firestore/unavailable",
            AuthError::Other { code, .. } => code,
        }
    }

    /// Message suitable for showing to the person signing in
    pub fn friendly_message(&self) -> String {
        match self {
            AuthError::EmailAlreadyInUse => {
                "This email is already registered. Try logging in instead.".to_string()
            }
            AuthError::WeakPassword => "Password should be at least 6 characters.".to_string(),
            AuthError::InvalidEmail => "Please enter a valid email address.".to_string(),
            AuthError::UserNotFound => "No account found with this email.".to_string(),
            AuthError::WrongPassword => "Incorrect password. Try again.".to_string(),
            AuthError::TooManyRequests => "Too many failed attempts. Try again later.".to_string(),
            other => other.to_string(),
        }
    }
}

/// A hosted identity service
#[async_trait]
pub trait AuthBackend: Send + Sync + std::fmt::Debug {
    /// Create an account and sign it in
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;

    /// Sign in to an existing account
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;

    /// Send the address-verification email for a signed-in account
    async fn send_email_verification(&self, id_token: &str) -> Result<(), AuthError>;
}
