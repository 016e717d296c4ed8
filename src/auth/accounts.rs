//! Signup and login flows.

use chrono::Utc;
use regex::Regex;
use std::sync::{Arc, OnceLock};

use crate::auth::{assign_avatar, AuthBackend, AuthError, AuthSession};
use crate::models::{Avatar, SignupDetails, UserProfile};
use crate::store::ProfileStore;

static EMAIL_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

/// Loose email format check run before contacting the auth service
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(email.trim()))
}

/// Result of a successful signup
#[derive(Debug, Clone)]
pub struct SignupOutcome {
    pub session: AuthSession,
    pub avatar: Avatar,
    pub profile: UserProfile,
    pub message: String,
}

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub session: AuthSession,
    pub message: String,
}

/// Runs account flows against an auth backend and a profile store
#[derive(Debug, Clone)]
pub struct AccountService {
    auth: Arc<dyn AuthBackend>,
    profiles: Arc<dyn ProfileStore>,
}

impl AccountService {
    pub fn new(auth: Arc<dyn AuthBackend>, profiles: Arc<dyn ProfileStore>) -> Self {
        Self { auth, profiles }
    }

    /// Create an account, store its profile and send the verification email.
    ///
    /// The avatar is derived from the email, so the same address always gets
    /// the same one.
    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        details: &SignupDetails,
    ) -> Result<SignupOutcome, AuthError> {
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(AuthError::InvalidEmail);
        }

        let session = self.auth.sign_up(email, password).await?;
        tracing::info!(uid = %session.uid, "Created account");

        let avatar = assign_avatar(email);
        let profile = UserProfile::new(email, details, avatar, Utc::now());
        self.profiles
            .put_profile(&session.uid, &profile, Some(&session.id_token))
            .await?;
        tracing::debug!(uid = %session.uid, avatar = avatar.gender(), "Saved profile");

        self.auth.send_email_verification(&session.id_token).await?;
        tracing::debug!(uid = %session.uid, "Sent verification email");

        Ok(SignupOutcome {
            message: format!(
                "🎉 Account created successfully! Your avatar: {}",
                avatar.emoji()
            ),
            session,
            avatar,
            profile,
        })
    }

    /// Sign in and record the login time.
    ///
    /// A profile that cannot be updated (for example one that was never
    /// written) does not fail the login.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let session = self.auth.sign_in(email.trim(), password).await?;
        tracing::info!(uid = %session.uid, "Logged in");

        if let Err(e) = self
            .profiles
            .touch_last_login(&session.uid, Utc::now(), Some(&session.id_token))
            .await
        {
            tracing::warn!(uid = %session.uid, "Could not update last login: {}", e);
        }

        Ok(LoginOutcome {
            session,
            message: "✅ Login successful!".to_string(),
        })
    }
}
