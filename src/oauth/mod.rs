//! OAuth authentication module
//!
//! Authorization code exchange for VK (VK ID with legacy VK OAuth fallback)
//! and Google, plus the callback and PKCE plumbing around it.

pub mod google;
pub mod pkce;
pub mod token_processor;
pub mod vk;

pub use google::GoogleOAuth;
pub use pkce::{PkceChallenge, PkceParams, CHALLENGE_METHOD};
pub use vk::{VkEndpoint, VkTokenExchange, VkUserProfile};

use crate::models::AuthError;
use crate::settings::HttpSettings;
use serde::Deserialize;
use std::fmt;

/// Client registration used for a token exchange
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl ClientCredentials {
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
        }
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

/// Query parameters a provider sends back to the redirect URI
#[derive(Deserialize, Debug, Clone, Default)]
pub struct OAuthCallback {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
    /// VK ID only
    pub device_id: Option<String>,
}

impl OAuthCallback {
    /// Take the authorization code out of the callback
    ///
    /// # Errors
    ///
    /// Returns `CallbackRejected` if the provider reported an error and
    /// `MalformedPayload` if there is no code
    pub fn into_code(self) -> Result<String, AuthError> {
        if let Some(error) = self.error.filter(|e| !e.is_empty()) {
            return Err(AuthError::CallbackRejected(match self.error_description {
                Some(description) => format!("{error}: {description}"),
                None => error,
            }));
        }
        self.code.filter(|code| !code.is_empty()).ok_or_else(|| {
            AuthError::MalformedPayload("Callback has no authorization code".to_string())
        })
    }

    /// Like [`OAuthCallback::into_code`], also checking the CSRF `state`
    ///
    /// # Errors
    ///
    /// Returns `CallbackRejected` on a provider error or a state mismatch and
    /// `MalformedPayload` if there is no code
    pub fn into_code_checked(self, expected_state: &str) -> Result<String, AuthError> {
        if self.error.as_deref().is_some_and(|e| !e.is_empty()) {
            return self.into_code();
        }
        if self.state.as_deref() != Some(expected_state) {
            return Err(AuthError::CallbackRejected(
                "OAuth state mismatch: received state does not match stored CSRF token".to_string(),
            ));
        }
        self.into_code()
    }

    /// PKCE parameters for the VK ID token request, using the callback's
    /// `device_id` and `state`
    #[must_use]
    pub fn pkce_params(&self, code_verifier: impl Into<String>) -> PkceParams {
        PkceParams {
            code_verifier: code_verifier.into(),
            device_id: self.device_id.clone(),
            state: self.state.clone(),
        }
    }
}

/// Build the shared HTTP client with bounded waits
///
/// # Errors
///
/// Returns `ConfigurationMissing` if the client cannot be constructed
pub fn build_http_client(http: &HttpSettings) -> Result<reqwest::Client, AuthError> {
    reqwest::Client::builder()
        .timeout(http.timeout())
        .connect_timeout(http.connect_timeout())
        .user_agent(http.user_agent.as_str())
        .build()
        .map_err(|e| AuthError::ConfigurationMissing(format!("Failed to build HTTP client: {e}")))
}
