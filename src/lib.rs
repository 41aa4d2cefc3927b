#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the adstat-auth library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod models;
pub mod oauth;
pub mod settings;
pub mod telegram;
pub mod utils;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use models::{AuthError, ExchangeAttempt, ExchangeFailure, TokenExchangeResult, TokenSource};
pub use oauth::{
    ClientCredentials, GoogleOAuth, OAuthCallback, PkceParams, VkEndpoint, VkTokenExchange,
};
pub use settings::AuthSettings;
pub use telegram::{TelegramVerifier, Verification, VerificationMode, VerificationSecret};
