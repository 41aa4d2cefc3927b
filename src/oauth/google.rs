//! Google authorization for spreadsheet access

use crate::models::{AuthError, ExchangeFailure, TokenExchangeResult, TokenSource};
use crate::oauth::token_processor::request_tokens;
use crate::oauth::{build_http_client, ClientCredentials};
use crate::settings::{AuthSettings, GoogleSettings, HttpSettings};
use crate::utils::logging::LoggingHelper;

#[derive(Clone)]
pub struct GoogleOAuth {
    http: reqwest::Client,
    settings: GoogleSettings,
}

impl GoogleOAuth {
    /// # Errors
    ///
    /// Returns `ConfigurationMissing` if the HTTP client cannot be built
    pub fn new(settings: GoogleSettings, http: &HttpSettings) -> Result<Self, AuthError> {
        Ok(Self {
            http: build_http_client(http)?,
            settings,
        })
    }

    /// # Errors
    ///
    /// Returns `ConfigurationMissing` if the HTTP client cannot be built
    pub fn from_settings(settings: &AuthSettings) -> Result<Self, AuthError> {
        Self::new(settings.google.clone(), &settings.http)
    }

    #[must_use]
    pub fn with_client(settings: GoogleSettings, http: reqwest::Client) -> Self {
        Self { http, settings }
    }

    /// # Errors
    ///
    /// Returns `ConfigurationMissing` if the client id or secret is not set
    pub fn credentials(&self) -> Result<ClientCredentials, AuthError> {
        let client_id = self.settings.get_client_id().ok_or_else(|| {
            AuthError::ConfigurationMissing("Google client_id is not configured".to_string())
        })?;
        let client_secret = self.settings.get_client_secret().ok_or_else(|| {
            AuthError::ConfigurationMissing("Google client_secret is not configured".to_string())
        })?;
        Ok(ClientCredentials::new(
            client_id,
            client_secret,
            self.settings.redirect_uri.clone(),
        ))
    }

    /// Consent URL requesting offline access, so a refresh token is issued
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationMissing` if the client id is not set or the
    /// endpoint URL is invalid
    pub fn authorization_url(&self, state: &str) -> Result<String, AuthError> {
        let client_id = self.settings.get_client_id().ok_or_else(|| {
            AuthError::ConfigurationMissing("Google client_id is not configured".to_string())
        })?;

        let mut url = url::Url::parse(&self.settings.authorization_endpoint).map_err(|e| {
            AuthError::ConfigurationMissing(format!("Invalid Google authorization endpoint: {e}"))
        })?;
        url.query_pairs_mut()
            .append_pair("client_id", &client_id)
            .append_pair("redirect_uri", &self.settings.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.settings.scopes.join(" "))
            .append_pair("access_type", "offline")
            .append_pair("include_granted_scopes", "true")
            .append_pair("prompt", "consent")
            .append_pair("state", state);

        Ok(url.to_string())
    }

    /// Exchange an authorization code with the configured credentials
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationMissing` if credentials are not set and
    /// `ProviderExchangeFailed` with the single attempt if the exchange fails
    pub async fn exchange(&self, code: &str) -> Result<TokenExchangeResult, AuthError> {
        let credentials = self.credentials()?;
        let form = vec![
            ("grant_type", "authorization_code".to_string()),
            ("code", code.to_string()),
            ("client_id", credentials.client_id),
            ("client_secret", credentials.client_secret),
            ("redirect_uri", credentials.redirect_uri),
        ];
        self.request(&form).await
    }

    /// Obtain a new access token from a stored refresh token
    ///
    /// Google usually omits `refresh_token` from the response; the one passed
    /// in is carried over so the result can be stored as-is.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationMissing` if credentials are not set and
    /// `ProviderExchangeFailed` with the single attempt if the refresh fails
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenExchangeResult, AuthError> {
        let credentials = self.credentials()?;
        let form = vec![
            ("grant_type", "refresh_token".to_string()),
            ("refresh_token", refresh_token.to_string()),
            ("client_id", credentials.client_id),
            ("client_secret", credentials.client_secret),
        ];

        let mut result = self.request(&form).await?;
        if result.refresh_token.is_none() {
            result.refresh_token = Some(refresh_token.to_string());
        }
        Ok(result)
    }

    async fn request(&self, form: &[(&str, String)]) -> Result<TokenExchangeResult, AuthError> {
        request_tokens(&self.http, TokenSource::Google, &self.settings.token_endpoint, form)
            .await
            .map_err(|attempt| {
                LoggingHelper::log_exchange_attempt_failed(attempt.source, &attempt.reason);
                AuthError::ProviderExchangeFailed(ExchangeFailure {
                    attempts: vec![attempt],
                })
            })
    }
}
