//! Telegram login verification
//!
//! Validates login widget field maps and WebApp `initData` strings against
//! the bot token. See [`verifier`] for the two signing schemes.

pub mod payload;
pub mod verifier;

pub use payload::{
    parse_data_check_string, AuthPayload, HASH_FIELD, INIT_DATA_FIELD, SIGNATURE_FIELD,
};
pub use verifier::{
    compute_hash, ensure_fresh, verify, verify_init_data, TelegramVerifier, Verification,
    VerificationMode, VerificationSecret,
};
