//! Shared authentication types
//!
//! The error taxonomy used by every verifier and coordinator, and the
//! normalized token exchange result.

pub mod auth;
pub mod tokens;

pub use auth::{AuthError, ExchangeAttempt, ExchangeFailure};
pub use tokens::{TokenExchangeResult, TokenSource};
