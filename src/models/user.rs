//! User accounts and the avatar assigned at signup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Avatar assigned to an account from its email hash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Avatar {
    Male,
    Female,
}

impl Avatar {
    /// Build from the stored avatar number (0 or 1); other values wrap
    pub fn from_number(number: u8) -> Self {
        if number % 2 == 0 {
            Avatar::Male
        } else {
            Avatar::Female
        }
    }

    pub fn number(&self) -> u8 {
        match self {
            Avatar::Male => 0,
            Avatar::Female => 1,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Avatar::Male => "👨",
            Avatar::Female => "👩",
        }
    }

    pub fn gender(&self) -> &'static str {
        match self {
            Avatar::Male => "male",
            Avatar::Female => "female",
        }
    }
}

impl std::fmt::Display for Avatar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.emoji())
    }
}

/// Optional details collected by the signup form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupDetails {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub student_id: String,
}

/// Profile document stored under `users/{uid}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub student_id: String,
    pub emoji_number: u8,
    pub gender: String,
    pub emoji: String,
    pub created_at: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
    pub total_books_listed: u32,
    pub profile_complete: bool,
}

impl UserProfile {
    /// Profile for a freshly created account
    pub fn new(
        email: impl Into<String>,
        details: &SignupDetails,
        avatar: Avatar,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            email: email.into(),
            first_name: details.first_name.clone(),
            last_name: details.last_name.clone(),
            student_id: details.student_id.clone(),
            emoji_number: avatar.number(),
            gender: avatar.gender().to_string(),
            emoji: avatar.emoji().to_string(),
            created_at: now,
            last_login: now,
            total_books_listed: 0,
            profile_complete: false,
        }
    }

    pub fn avatar(&self) -> Avatar {
        Avatar::from_number(self.emoji_number)
    }

    /// Name shown in the account badge: first name, else the email's local part
    pub fn display_name(&self) -> &str {
        if !self.first_name.trim().is_empty() {
            return self.first_name.trim();
        }
        self.email.split('@').next().unwrap_or(&self.email)
    }
}
