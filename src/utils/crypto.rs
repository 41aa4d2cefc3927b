// Cryptographic helpers for signature verification and random tokens

use anyhow::{anyhow, Result};
use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Compute HMAC-SHA256 of `message` keyed by `key`
///
/// # Errors
///
/// Returns an error if the MAC cannot be initialised with the key
pub fn hmac_sha256(key: &[u8], message: &[u8]) -> Result<Vec<u8>> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .map_err(|e| anyhow!("Invalid HMAC key: {e}"))?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Check `expected` against HMAC-SHA256 of `message` in constant time
///
/// # Errors
///
/// Returns an error if the MAC cannot be initialised with the key
pub fn verify_hmac_sha256(key: &[u8], message: &[u8], expected: &[u8]) -> Result<bool> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .map_err(|e| anyhow!("Invalid HMAC key: {e}"))?;
    mac.update(message);
    Ok(mac.verify_slice(expected).is_ok())
}

/// Plain SHA-256 digest
#[must_use]
pub fn sha256(data: &[u8]) -> Vec<u8> {
    Sha256::digest(data).to_vec()
}

/// Generate a cryptographically secure random token of `length` bytes
///
/// # Returns
///
/// A base64url-encoded (unpadded) string of the random bytes
#[must_use]
pub fn generate_token(length: usize) -> String {
    let mut bytes = vec![0u8; length];
    rand::rng().fill_bytes(&mut bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Base64url (unpadded) encoding of the SHA-256 digest of `data`
#[must_use]
pub fn sha256_base64url(data: &[u8]) -> String {
    general_purpose::URL_SAFE_NO_PAD.encode(sha256(data))
}
