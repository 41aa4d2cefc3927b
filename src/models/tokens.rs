//! Normalized token exchange result

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which provider endpoint answered a token exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenSource {
    /// VK ID (`OAuth` 2.1, PKCE-capable)
    VkId,
    /// Legacy VK `OAuth` 2.0
    #[serde(rename = "vk_oauth")]
    VkOAuth,
    Google,
}

impl TokenSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TokenSource::VkId => "vk_id",
            TokenSource::VkOAuth => "vk_oauth",
            TokenSource::Google => "google",
        }
    }
}

impl fmt::Display for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tokens produced by whichever endpoint succeeded
///
/// Never partially populated: `access_token` is always non-empty.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct TokenExchangeResult {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub user_id: Option<String>,
    pub id_token: Option<String>,
    pub expires_in: Option<u64>,
    pub email: Option<String>,
    pub source: TokenSource,
}

impl fmt::Debug for TokenExchangeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenExchangeResult")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("user_id", &self.user_id)
            .field("id_token", &self.id_token.as_ref().map(|_| "[REDACTED]"))
            .field("expires_in", &self.expires_in)
            .field("email", &self.email)
            .field("source", &self.source)
            .finish()
    }
}
