//! VK token exchange across VK ID and legacy VK OAuth
//!
//! VK runs two incompatible authorization servers. Applications migrated to
//! VK ID get codes redeemable at `id.vk.com`, older ones at `oauth.vk.com`.
//! [`VkTokenExchange::exchange`] tries VK ID first and falls back to the
//! legacy endpoint exactly once, so callers never need to know which kind
//! of application issued the code.

use crate::models::{AuthError, ExchangeFailure, TokenExchangeResult, TokenSource};
use crate::oauth::pkce::{PkceChallenge, PkceParams, CHALLENGE_METHOD};
use crate::oauth::token_processor::{
    describe_failure, provider_error, request_tokens, scalar_to_string,
};
use crate::oauth::{build_http_client, ClientCredentials};
use crate::settings::{AuthSettings, HttpSettings, VkSettings};
use crate::utils::logging::LoggingHelper;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;

/// The two VK authorization servers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VkEndpoint {
    /// `OAuth` 2.1 with PKCE at `id.vk.com`
    VkId,
    /// `OAuth` 2.0 at `oauth.vk.com`
    LegacyOAuth,
}

impl VkEndpoint {
    /// Modern endpoint first; legacy for applications not yet migrated
    pub const FALLBACK_ORDER: [VkEndpoint; 2] = [VkEndpoint::VkId, VkEndpoint::LegacyOAuth];

    #[must_use]
    pub fn source(self) -> TokenSource {
        match self {
            VkEndpoint::VkId => TokenSource::VkId,
            VkEndpoint::LegacyOAuth => TokenSource::VkOAuth,
        }
    }

    #[must_use]
    pub fn token_url(self, settings: &VkSettings) -> &str {
        match self {
            VkEndpoint::VkId => &settings.vk_id_token_endpoint,
            VkEndpoint::LegacyOAuth => &settings.oauth_token_endpoint,
        }
    }

    #[must_use]
    pub fn authorize_url(self, settings: &VkSettings) -> &str {
        match self {
            VkEndpoint::VkId => &settings.vk_id_authorize_endpoint,
            VkEndpoint::LegacyOAuth => &settings.oauth_authorize_endpoint,
        }
    }

    /// Form body for the token request
    ///
    /// PKCE values are only sent to VK ID; the legacy server does not know them.
    #[must_use]
    pub fn token_form(
        self,
        code: &str,
        credentials: &ClientCredentials,
        pkce: Option<&PkceParams>,
    ) -> Vec<(&'static str, String)> {
        let mut form = vec![
            ("grant_type", "authorization_code".to_string()),
            ("code", code.to_string()),
            ("client_id", credentials.client_id.clone()),
            ("client_secret", credentials.client_secret.clone()),
            ("redirect_uri", credentials.redirect_uri.clone()),
        ];

        if let (VkEndpoint::VkId, Some(pkce)) = (self, pkce) {
            form.push(("code_verifier", pkce.code_verifier.clone()));
            if let Some(device_id) = &pkce.device_id {
                form.push(("device_id", device_id.clone()));
            }
            if let Some(state) = &pkce.state {
                form.push(("state", state.clone()));
            }
        }
        form
    }
}

/// VK user profile, normalized across both APIs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VkUserProfile {
    pub user_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
    pub source: TokenSource,
}

/// Exchanges VK authorization codes and fetches VK profiles
#[derive(Clone)]
pub struct VkTokenExchange {
    http: reqwest::Client,
    settings: VkSettings,
}

impl VkTokenExchange {
    /// # Errors
    ///
    /// Returns `ConfigurationMissing` if the HTTP client cannot be built
    pub fn new(settings: VkSettings, http: &HttpSettings) -> Result<Self, AuthError> {
        Ok(Self {
            http: build_http_client(http)?,
            settings,
        })
    }

    /// # Errors
    ///
    /// Returns `ConfigurationMissing` if the HTTP client cannot be built
    pub fn from_settings(settings: &AuthSettings) -> Result<Self, AuthError> {
        Self::new(settings.vk.clone(), &settings.http)
    }

    /// Use an existing client, sharing its connection pool
    #[must_use]
    pub fn with_client(settings: VkSettings, http: reqwest::Client) -> Self {
        Self { http, settings }
    }

    #[must_use]
    pub fn settings(&self) -> &VkSettings {
        &self.settings
    }

    fn client_id(&self) -> Result<String, AuthError> {
        self.settings.get_client_id().ok_or_else(|| {
            AuthError::ConfigurationMissing("VK client_id is not configured".to_string())
        })
    }

    /// Configured client credentials
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationMissing` if the client id or secret is not set
    pub fn credentials(&self) -> Result<ClientCredentials, AuthError> {
        let client_id = self.client_id()?;
        let client_secret = self.settings.get_client_secret().ok_or_else(|| {
            AuthError::ConfigurationMissing("VK client_secret is not configured".to_string())
        })?;
        Ok(ClientCredentials::new(
            client_id,
            client_secret,
            self.settings.redirect_uri.clone(),
        ))
    }

    /// Exchange an authorization code, VK ID first, legacy VK OAuth second
    ///
    /// Each endpoint is tried at most once and the first success wins.
    ///
    /// # Errors
    ///
    /// Returns `ProviderExchangeFailed` listing both attempts when neither
    /// endpoint produced an access token
    pub async fn exchange(
        &self,
        code: &str,
        credentials: &ClientCredentials,
        pkce: Option<&PkceParams>,
    ) -> Result<TokenExchangeResult, AuthError> {
        let mut failure = ExchangeFailure::default();

        for endpoint in VkEndpoint::FALLBACK_ORDER {
            let form = endpoint.token_form(code, credentials, pkce);
            let token_url = endpoint.token_url(&self.settings);
            match request_tokens(&self.http, endpoint.source(), token_url, &form).await {
                Ok(result) => return Ok(result),
                Err(attempt) => {
                    LoggingHelper::log_exchange_attempt_failed(attempt.source, &attempt.reason);
                    failure.push(attempt);
                }
            }
        }

        Err(AuthError::ProviderExchangeFailed(failure))
    }

    /// [`VkTokenExchange::exchange`] with the configured credentials
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationMissing` if credentials are not set, otherwise
    /// the same errors as [`VkTokenExchange::exchange`]
    pub async fn exchange_configured(
        &self,
        code: &str,
        pkce: Option<&PkceParams>,
    ) -> Result<TokenExchangeResult, AuthError> {
        let credentials = self.credentials()?;
        self.exchange(code, &credentials, pkce).await
    }

    /// Build the authorization URL the user is redirected to
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationMissing` if the client id is not set, if VK ID is
    /// requested without a PKCE challenge, or if the endpoint URL is invalid
    pub fn authorization_url(
        &self,
        endpoint: VkEndpoint,
        state: &str,
        pkce: Option<&PkceChallenge>,
    ) -> Result<String, AuthError> {
        let client_id = self.client_id()?;

        let mut url = url::Url::parse(endpoint.authorize_url(&self.settings)).map_err(|e| {
            AuthError::ConfigurationMissing(format!("Invalid VK authorize endpoint: {e}"))
        })?;

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &client_id)
                .append_pair("redirect_uri", &self.settings.redirect_uri)
                .append_pair("scope", &self.settings.scope)
                .append_pair("state", state);

            match endpoint {
                VkEndpoint::VkId => {
                    let pkce = pkce.ok_or_else(|| {
                        AuthError::ConfigurationMissing(
                            "VK ID authorization requires a PKCE challenge".to_string(),
                        )
                    })?;
                    query
                        .append_pair("code_challenge", pkce.challenge())
                        .append_pair("code_challenge_method", CHALLENGE_METHOD);
                }
                VkEndpoint::LegacyOAuth => {
                    query
                        .append_pair("display", "page")
                        .append_pair("v", &self.settings.api_version);
                }
            }
        }

        Ok(url.to_string())
    }

    /// Fetch the profile of the user an access token belongs to
    ///
    /// The API used depends on which endpoint issued the token.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationMissing` if a VK ID profile is requested without
    /// a configured client id, and `ProviderRequest` on network failure, a
    /// non-200 response, a provider error payload, or a response without a
    /// user id
    pub async fn fetch_user_profile(
        &self,
        access_token: &str,
        source: TokenSource,
    ) -> Result<VkUserProfile, AuthError> {
        match source {
            TokenSource::VkId => self.fetch_vk_id_profile(access_token).await,
            TokenSource::VkOAuth => self.fetch_legacy_profile(access_token).await,
            TokenSource::Google => Err(AuthError::ProviderRequest(
                "Google tokens cannot be used with the VK API".to_string(),
            )),
        }
    }

    async fn fetch_vk_id_profile(&self, access_token: &str) -> Result<VkUserProfile, AuthError> {
        let endpoint = &self.settings.vk_id_user_info_endpoint;
        LoggingHelper::log_provider_request(TokenSource::VkId, "user info", endpoint);

        let client_id = self.client_id()?;
        let response = self
            .http
            .post(endpoint)
            .form(&[("access_token", access_token), ("client_id", client_id.as_str())])
            .send()
            .await
            .map_err(|e| {
                AuthError::ProviderRequest(format!("VK ID user info: {}", e.without_url()))
            })?;

        let json = read_json(response, "VK ID user info").await?;
        let user = json.get("user").ok_or_else(|| {
            AuthError::ProviderRequest("VK ID user info response has no 'user' object".to_string())
        })?;

        profile_from_json(user, "user_id", "avatar", TokenSource::VkId)
    }

    async fn fetch_legacy_profile(&self, access_token: &str) -> Result<VkUserProfile, AuthError> {
        let endpoint = &self.settings.api_users_endpoint;
        LoggingHelper::log_provider_request(TokenSource::VkOAuth, "users.get", endpoint);

        let response = self
            .http
            .get(endpoint)
            .query(&[
                ("access_token", access_token),
                ("v", self.settings.api_version.as_str()),
                ("fields", "photo_100,email"),
            ])
            .send()
            .await
            .map_err(|e| AuthError::ProviderRequest(format!("VK users.get: {}", e.without_url())))?;

        let json = read_json(response, "VK users.get").await?;
        let user = json
            .get("response")
            .and_then(Value::as_array)
            .and_then(|users| users.first())
            .ok_or_else(|| {
                AuthError::ProviderRequest("VK users.get returned no users".to_string())
            })?;

        profile_from_json(user, "id", "photo_100", TokenSource::VkOAuth)
    }
}

/// Read a 200 JSON response, surfacing provider errors
async fn read_json(response: reqwest::Response, what: &str) -> Result<Value, AuthError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| AuthError::ProviderRequest(format!("{what}: {}", e.without_url())))?;

    if status != StatusCode::OK {
        return Err(AuthError::ProviderRequest(format!(
            "{what}: {}",
            describe_failure(status, &body)
        )));
    }

    let json: Value = serde_json::from_str(&body).map_err(|e| {
        AuthError::ProviderRequest(format!("{what}: response is not valid JSON ({e})"))
    })?;

    if let Some(error) = provider_error(&json) {
        return Err(AuthError::ProviderRequest(format!("{what}: {error}")));
    }
    Ok(json)
}

fn profile_from_json(
    user: &Value,
    id_field: &str,
    avatar_field: &str,
    source: TokenSource,
) -> Result<VkUserProfile, AuthError> {
    let text = |field: &str| {
        user.get(field)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
    };

    let user_id = user
        .get(id_field)
        .and_then(scalar_to_string)
        .ok_or_else(|| {
            AuthError::ProviderRequest(format!("{source} profile has no '{id_field}'"))
        })?;

    Ok(VkUserProfile {
        user_id,
        first_name: text("first_name"),
        last_name: text("last_name"),
        email: text("email"),
        avatar: text(avatar_field),
        source,
    })
}
