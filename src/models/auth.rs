//! Common authentication error types
//!
//! One error enum covers both the Telegram verifier and the OAuth
//! coordinators so the request-handling layer can map every failure to a
//! response status in one place.

use crate::models::tokens::TokenSource;
use std::fmt;

/// Authentication errors
///
/// All variants are recoverable by the caller. None of them are fatal to the
/// process.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Input could not be parsed (bad query string, missing `user`, bad JSON)
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Computed signature does not match the received `hash`
    #[error("Signature mismatch: {0}")]
    SignatureMismatch(String),

    /// A secret required for verification or exchange is not configured
    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    /// Signed data is older than the configured maximum age
    #[error("Authentication data expired: {0}")]
    Expired(String),

    /// Every token endpoint that was attempted failed
    #[error("Token exchange failed: {0}")]
    ProviderExchangeFailed(ExchangeFailure),

    /// The provider redirected back with an error instead of a code
    #[error("Provider callback rejected: {0}")]
    CallbackRejected(String),

    /// A provider API call other than the token exchange failed
    #[error("Provider request failed: {0}")]
    ProviderRequest(String),
}

impl AuthError {
    /// HTTP status the request-handling layer should answer with
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::MalformedPayload(_) => 422,
            AuthError::SignatureMismatch(_)
            | AuthError::ConfigurationMissing(_)
            | AuthError::Expired(_) => 401,
            AuthError::ProviderExchangeFailed(_)
            | AuthError::CallbackRejected(_)
            | AuthError::ProviderRequest(_) => 400,
        }
    }

    /// Attempts recorded by a failed exchange, empty for any other error
    #[must_use]
    pub fn attempts(&self) -> &[ExchangeAttempt] {
        match self {
            AuthError::ProviderExchangeFailed(failure) => &failure.attempts,
            _ => &[],
        }
    }
}

/// One failed call to a token endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeAttempt {
    pub source: TokenSource,
    pub endpoint: String,
    /// Provider diagnostic text, with secrets redacted
    pub reason: String,
}

impl fmt::Display for ExchangeAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.source, self.endpoint, self.reason)
    }
}

/// Aggregated failure of a token exchange
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExchangeFailure {
    pub attempts: Vec<ExchangeAttempt>,
}

impl ExchangeFailure {
    pub fn push(&mut self, attempt: ExchangeAttempt) {
        self.attempts.push(attempt);
    }

    /// Whether the given source was attempted
    #[must_use]
    pub fn attempted(&self, source: TokenSource) -> bool {
        self.attempts.iter().any(|a| a.source == source)
    }
}

impl fmt::Display for ExchangeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.attempts.is_empty() {
            return write!(f, "no token endpoint was attempted");
        }
        for (index, attempt) in self.attempts.iter().enumerate() {
            if index > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{attempt}")?;
        }
        Ok(())
    }
}
