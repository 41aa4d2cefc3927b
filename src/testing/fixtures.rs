//! Test fixtures providing pre-built test objects

use crate::models::AuthError;
use crate::oauth::ClientCredentials;
use crate::settings::{GoogleSettings, VkSettings};
use crate::telegram::{compute_hash, AuthPayload, VerificationMode, VerificationSecret};

use super::constants::{
    TEST_BOT_TOKEN, TEST_REDIRECT_URI, TEST_VK_CLIENT_ID, TEST_VK_CLIENT_SECRET, TEST_WEBAPP_USER,
};

/// Central fixture provider for all test data
pub struct TestFixtures;

impl TestFixtures {
    #[must_use]
    pub fn secret() -> VerificationSecret {
        VerificationSecret::new(TEST_BOT_TOKEN)
    }

    /// Add a valid `hash` to `fields` for the given mode
    ///
    /// # Errors
    ///
    /// Returns an error if the hash cannot be computed
    pub fn sign(
        mut fields: AuthPayload,
        mode: VerificationMode,
        secret: &VerificationSecret,
    ) -> Result<AuthPayload, AuthError> {
        let hash = compute_hash(&fields, mode, secret)?;
        fields.insert("hash", hash);
        Ok(fields)
    }

    /// Encode fields as an `initData` query string, in key order
    #[must_use]
    pub fn encode_init_data(fields: &AuthPayload) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields.iter())
            .finish()
    }

    /// Signed WebApp `initData` built from the given fields
    ///
    /// # Errors
    ///
    /// Returns an error if the hash cannot be computed
    pub fn signed_init_data(fields: &[(&str, &str)]) -> Result<String, AuthError> {
        let payload = Self::sign(
            AuthPayload::from_pairs(fields.iter().copied()),
            VerificationMode::WebApp,
            &Self::secret(),
        )?;
        Ok(Self::encode_init_data(&payload))
    }

    /// Typical signed WebApp `initData` for [`TEST_WEBAPP_USER`]
    ///
    /// # Errors
    ///
    /// Returns an error if the hash cannot be computed
    pub fn webapp_init_data(auth_date: i64) -> Result<String, AuthError> {
        let auth_date = auth_date.to_string();
        Self::signed_init_data(&[
            ("query_id", "AAHdF6IQAAAAAN0XohDhrOrc"),
            ("user", TEST_WEBAPP_USER),
            ("auth_date", auth_date.as_str()),
        ])
    }

    /// Signed login widget payload
    ///
    /// # Errors
    ///
    /// Returns an error if the hash cannot be computed
    pub fn login_widget_payload(auth_date: i64) -> Result<AuthPayload, AuthError> {
        Self::sign(
            AuthPayload::from_pairs([
                ("id", "123456789".to_string()),
                ("first_name", "Ivan".to_string()),
                ("last_name", "Petrov".to_string()),
                ("username", "ivan_test".to_string()),
                ("photo_url", "https://t.me/i/userpic/320/test.jpg".to_string()),
                ("auth_date", auth_date.to_string()),
            ]),
            VerificationMode::LoginWidget,
            &Self::secret(),
        )
    }

    #[must_use]
    pub fn vk_credentials() -> ClientCredentials {
        ClientCredentials::new(TEST_VK_CLIENT_ID, TEST_VK_CLIENT_SECRET, TEST_REDIRECT_URI)
    }

    /// VK settings with every endpoint under `base_url` and env lookups disabled
    #[must_use]
    pub fn vk_settings(base_url: &str) -> VkSettings {
        VkSettings {
            client_id: Some(TEST_VK_CLIENT_ID.to_string()),
            client_secret: Some(TEST_VK_CLIENT_SECRET.to_string()),
            client_id_env: None,
            client_secret_env: None,
            redirect_uri: TEST_REDIRECT_URI.to_string(),
            vk_id_authorize_endpoint: format!("{base_url}/authorize"),
            vk_id_token_endpoint: format!("{base_url}/oauth2/auth"),
            vk_id_user_info_endpoint: format!("{base_url}/oauth2/user_info"),
            oauth_authorize_endpoint: format!("{base_url}/legacy/authorize"),
            oauth_token_endpoint: format!("{base_url}/access_token"),
            api_users_endpoint: format!("{base_url}/method/users.get"),
            ..Default::default()
        }
    }

    /// Google settings with the token endpoint under `base_url`
    #[must_use]
    pub fn google_settings(base_url: &str) -> GoogleSettings {
        GoogleSettings {
            client_id: Some("google-client-id".to_string()),
            client_secret: Some("google-client-secret".to_string()),
            client_id_env: None,
            client_secret_env: None,
            redirect_uri: "https://example.test/google-oauth-callback".to_string(),
            token_endpoint: format!("{base_url}/token"),
            ..Default::default()
        }
    }
}
