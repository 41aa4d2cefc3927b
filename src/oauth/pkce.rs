//! PKCE (RFC 7636) helpers for the VK ID flow

use crate::utils::crypto::{generate_token, sha256_base64url};
use std::fmt;

/// Only S256 is supported
pub const CHALLENGE_METHOD: &str = "S256";

/// Random verifier bytes; encodes to 64 characters
const VERIFIER_BYTES: usize = 48;

/// Verifier and derived challenge for one authorization request
#[derive(Clone, PartialEq, Eq)]
pub struct PkceChallenge {
    verifier: String,
    challenge: String,
}

impl PkceChallenge {
    #[must_use]
    pub fn generate() -> Self {
        Self::from_verifier(generate_token(VERIFIER_BYTES))
    }

    #[must_use]
    pub fn from_verifier(verifier: impl Into<String>) -> Self {
        let verifier = verifier.into();
        let challenge = sha256_base64url(verifier.as_bytes());
        Self { verifier, challenge }
    }

    /// Kept server-side until the callback arrives
    #[must_use]
    pub fn verifier(&self) -> &str {
        &self.verifier
    }

    /// Sent on the authorization URL
    #[must_use]
    pub fn challenge(&self) -> &str {
        &self.challenge
    }
}

impl fmt::Debug for PkceChallenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PkceChallenge")
            .field("verifier", &"[REDACTED]")
            .field("challenge", &self.challenge)
            .finish()
    }
}

/// PKCE values sent with the VK ID token request
#[derive(Clone, PartialEq, Eq)]
pub struct PkceParams {
    pub code_verifier: String,
    /// Returned by VK ID on the redirect
    pub device_id: Option<String>,
    pub state: Option<String>,
}

impl PkceParams {
    #[must_use]
    pub fn new(code_verifier: impl Into<String>) -> Self {
        Self {
            code_verifier: code_verifier.into(),
            device_id: None,
            state: None,
        }
    }

    #[must_use]
    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    #[must_use]
    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }
}

impl fmt::Debug for PkceParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PkceParams")
            .field("code_verifier", &"[REDACTED]")
            .field("device_id", &self.device_id)
            .field("state", &self.state)
            .finish()
    }
}
