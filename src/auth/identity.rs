//! Identity Toolkit REST client.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::auth::{AuthBackend, AuthError, AuthSession};
use crate::config::FirebaseConfig;
use crate::utils::HttpClient;

const IDENTITY_TOOLKIT_BASE: &str = "https://identitytoolkit.googleapis.com/v1";

/// Email/password accounts via the Identity Toolkit API
#[derive(Debug, Clone)]
pub struct IdentityToolkitClient {
    http: HttpClient,
    base_url: String,
    api_key: String,
}

impl IdentityToolkitClient {
    pub fn new(http: HttpClient, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: IDENTITY_TOOLKIT_BASE.to_string(),
            api_key: api_key.into(),
        }
    }

    /// Create a client from the `[firebase]` settings
    pub fn from_config(config: &FirebaseConfig, http: HttpClient) -> Result<Self, AuthError> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                AuthError::Misconfigured(
                    "firebase.api_key is not set (or FIREBASE_API_KEY)".to_string(),
                )
            })?;
        Ok(Self::new(http, api_key))
    }

    /// Point the client at another endpoint (emulator or test server)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<T, AuthError> {
        let url = format!("{}/accounts:{}", self.base_url, method);
        tracing::debug!(method, "Calling Identity Toolkit");

        let response = self
            .http
            .client()
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::Network(format!("Failed to reach auth service: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AuthError::Network(format!("Failed to read auth response: {}", e)))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("Auth service returned status: {}", status));
            return Err(map_error(&message));
        }

        serde_json::from_str(&text).map_err(|e| AuthError::Other {
            code: "auth/internal-error".to_string(),
            message: format!("Failed to parse auth response: {}", e),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    local_id: String,
    #[serde(default)]
    email: String,
    id_token: String,
    #[serde(default)]
    refresh_token: String,
}

impl SessionResponse {
    fn into_session(self, email: &str) -> AuthSession {
        AuthSession {
            uid: self.local_id,
            email: if self.email.is_empty() {
                email.to_string()
            } else {
                self.email
            },
            id_token: self.id_token,
            refresh_token: self.refresh_token,
        }
    }
}

/// Map an Identity Toolkit error message to an [`AuthError`].
///
/// Messages look like `WEAK_PASSWORD : Password should be at least 6
/// characters`; only the part before ` : ` identifies the error.
fn map_error(message: &str) -> AuthError {
    let reason = message.split(" : ").next().unwrap_or(message).trim();
    match reason {
        "EMAIL_EXISTS" => AuthError::EmailAlreadyInUse,
        "WEAK_PASSWORD" => AuthError::WeakPassword,
        "INVALID_EMAIL" | "MISSING_EMAIL" => AuthError::InvalidEmail,
        "EMAIL_NOT_FOUND" => AuthError::UserNotFound,
        "INVALID_PASSWORD" => AuthError::WrongPassword,
        "TOO_MANY_ATTEMPTS_TRY_LATER" => AuthError::TooManyRequests,
        "INVALID_LOGIN_CREDENTIALS" => AuthError::Other {
            code: "auth/invalid-credential".to_string(),
            message: message.to_string(),
        },
        _ => AuthError::Other {
            code: format!("auth/{}", reason.to_lowercase().replace('_', "-")),
            message: message.to_string(),
        },
    }
}

#[async_trait]
impl AuthBackend for IdentityToolkitClient {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let response: SessionResponse = self
            .call(
                "signUp",
                json!({ "email": email, "password": password, "returnSecureToken": true }),
            )
            .await?;
        Ok(response.into_session(email))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let response: SessionResponse = self
            .call(
                "signInWithPassword",
                json!({ "email": email, "password": password, "returnSecureToken": true }),
            )
            .await?;
        Ok(response.into_session(email))
    }

    async fn send_email_verification(&self, id_token: &str) -> Result<(), AuthError> {
        let _: serde_json::Value = self
            .call(
                "sendOobCode",
                json!({ "requestType": "VERIFY_EMAIL", "idToken": id_token }),
            )
            .await?;
        Ok(())
    }
}
