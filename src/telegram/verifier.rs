//! Telegram signature verification
//!
//! Two schemes are supported and the caller always names one explicitly:
//!
//! - [`VerificationMode::WebApp`]: `initData` forwarded by a Mini App. The
//!   HMAC key is `HMAC-SHA256(key = "WebAppData", message = bot_token)`.
//! - [`VerificationMode::LoginWidget`]: fields posted by the login widget.
//!   The HMAC key is `SHA256(bot_token)`.
//!
//! In both cases the expected hash is `HMAC-SHA256(key, data_check_string)`
//! rendered as hex, compared against the received `hash` in constant time.

use crate::models::AuthError;
use crate::settings::TelegramSettings;
use crate::telegram::payload::{AuthPayload, INIT_DATA_FIELD};
use crate::utils::crypto::{hmac_sha256, sha256, verify_hmac_sha256};
use crate::utils::logging::LoggingHelper;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::fmt;

const WEB_APP_KEY: &[u8] = b"WebAppData";

/// Which Telegram signing scheme to check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationMode {
    WebApp,
    LoginWidget,
}

impl VerificationMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            VerificationMode::WebApp => "WebApp",
            VerificationMode::LoginWidget => "LoginWidget",
        }
    }
}

impl fmt::Display for VerificationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bot token used to derive HMAC keys
#[derive(Clone, PartialEq, Eq)]
pub struct VerificationSecret(String);

impl VerificationSecret {
    #[must_use]
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self(bot_token.into())
    }

    /// HMAC key for the given mode
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationMissing` if the HMAC cannot be keyed
    pub fn derive_key(&self, mode: VerificationMode) -> Result<Vec<u8>, AuthError> {
        match mode {
            VerificationMode::WebApp => hmac_sha256(WEB_APP_KEY, self.0.as_bytes())
                .map_err(|e| AuthError::ConfigurationMissing(format!("Cannot derive key: {e}"))),
            VerificationMode::LoginWidget => Ok(sha256(self.0.as_bytes())),
        }
    }
}

impl fmt::Debug for VerificationSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VerificationSecret([REDACTED])")
    }
}

/// Outcome of a verification
#[derive(Debug, Clone, PartialEq)]
pub struct Verification {
    pub authentic: bool,
    /// Decoded user object, present only when `authentic`
    pub user: Option<Value>,
    pub mode: VerificationMode,
    /// `false` when the development bypass accepted the payload unchecked
    pub signature_checked: bool,
}

impl Verification {
    fn rejected(mode: VerificationMode) -> Self {
        Self {
            authentic: false,
            user: None,
            mode,
            signature_checked: true,
        }
    }
}

/// Compute the expected hex hash for `payload` under `mode`
///
/// # Errors
///
/// Returns `ConfigurationMissing` if the HMAC cannot be keyed
pub fn compute_hash(
    payload: &AuthPayload,
    mode: VerificationMode,
    secret: &VerificationSecret,
) -> Result<String, AuthError> {
    let key = secret.derive_key(mode)?;
    let mac = hmac_sha256(&key, payload.data_check_string().as_bytes())
        .map_err(|e| AuthError::ConfigurationMissing(format!("Cannot compute hash: {e}")))?;
    Ok(hex::encode(mac))
}

/// Verify a Telegram payload
///
/// For [`VerificationMode::WebApp`] the payload must carry the raw query
/// string under `initData`. For [`VerificationMode::LoginWidget`] the payload
/// is the widget's field map itself.
///
/// A missing or non-hex `hash` yields `authentic = false` rather than an
/// error. Pure and deterministic: no I/O, inputs are not modified.
///
/// # Errors
///
/// Returns `MalformedPayload` if `initData` is missing or unparseable, or if
/// an authentic WebApp payload has no valid `user` object
pub fn verify(
    payload: &AuthPayload,
    mode: VerificationMode,
    secret: &VerificationSecret,
) -> Result<Verification, AuthError> {
    match mode {
        VerificationMode::WebApp => {
            let init_data = payload.get(INIT_DATA_FIELD).ok_or_else(|| {
                AuthError::MalformedPayload(format!("Missing '{INIT_DATA_FIELD}' field"))
            })?;
            verify_init_data(init_data, secret)
        }
        VerificationMode::LoginWidget => verify_fields(payload, mode, secret),
    }
}

/// Verify a raw WebApp `initData` query string
///
/// # Errors
///
/// Returns `MalformedPayload` if the query string cannot be parsed or an
/// authentic payload has no valid `user` object
pub fn verify_init_data(
    init_data: &str,
    secret: &VerificationSecret,
) -> Result<Verification, AuthError> {
    let fields = AuthPayload::parse_init_data(init_data)?;
    verify_fields(&fields, VerificationMode::WebApp, secret)
}

/// Check the signature over already-decoded fields
fn verify_fields(
    fields: &AuthPayload,
    mode: VerificationMode,
    secret: &VerificationSecret,
) -> Result<Verification, AuthError> {
    let Some(received_hash) = fields.hash() else {
        LoggingHelper::log_signature_rejected(mode.as_str(), "missing hash");
        return Ok(Verification::rejected(mode));
    };

    let Ok(received) = hex::decode(received_hash) else {
        LoggingHelper::log_signature_rejected(mode.as_str(), "hash is not hex");
        return Ok(Verification::rejected(mode));
    };

    let key = secret.derive_key(mode)?;
    let matches = verify_hmac_sha256(&key, fields.data_check_string().as_bytes(), &received)
        .map_err(|e| AuthError::ConfigurationMissing(format!("Cannot compute hash: {e}")))?;

    if !matches {
        LoggingHelper::log_signature_rejected(mode.as_str(), "hash mismatch");
        return Ok(Verification::rejected(mode));
    }

    LoggingHelper::log_signature_verified(mode.as_str(), fields.signed_fields().count());
    Ok(Verification {
        authentic: true,
        user: Some(extract_user(fields, mode)?),
        mode,
        signature_checked: true,
    })
}

/// Decode the user object carried by a payload
///
/// WebApp payloads carry it as JSON in the `user` field. Login widget
/// payloads are the user fields themselves.
fn extract_user(fields: &AuthPayload, mode: VerificationMode) -> Result<Value, AuthError> {
    match mode {
        VerificationMode::WebApp => {
            let raw = fields.get("user").ok_or_else(|| {
                AuthError::MalformedPayload("initData has no 'user' field".to_string())
            })?;
            let user: Value = serde_json::from_str(raw).map_err(|e| {
                AuthError::MalformedPayload(format!("initData 'user' is not valid JSON: {e}"))
            })?;
            if !user.is_object() {
                return Err(AuthError::MalformedPayload(
                    "initData 'user' is not a JSON object".to_string(),
                ));
            }
            Ok(user)
        }
        VerificationMode::LoginWidget => {
            let mut user = Map::new();
            for (key, value) in fields.signed_fields() {
                let entry = match (key, value.parse::<i64>()) {
                    ("id" | "auth_date", Ok(number)) => Value::from(number),
                    _ => Value::String(value.to_string()),
                };
                user.insert(key.to_string(), entry);
            }
            Ok(Value::Object(user))
        }
    }
}

/// Verifier bound to the configured bot token and missing-token policy
#[derive(Debug, Clone)]
pub struct TelegramVerifier {
    secret: Option<VerificationSecret>,
    allow_unverified: bool,
    max_auth_age_secs: Option<u64>,
}

impl TelegramVerifier {
    #[must_use]
    pub fn new(secret: VerificationSecret) -> Self {
        Self {
            secret: Some(secret),
            allow_unverified: false,
            max_auth_age_secs: None,
        }
    }

    #[must_use]
    pub fn from_settings(settings: &TelegramSettings) -> Self {
        let secret = settings.get_bot_token().map(VerificationSecret::new);
        if secret.is_none() {
            if settings.allow_unverified {
                log::warn!(
                    "⚠️  Telegram bot token is not configured; development mode accepts unverified payloads"
                );
            } else {
                log::info!(
                    "Telegram bot token is not configured; Telegram authentication will be refused"
                );
            }
        }
        Self {
            secret,
            allow_unverified: settings.allow_unverified,
            max_auth_age_secs: settings.max_auth_age_secs,
        }
    }

    /// Accept payloads unverified when no bot token is configured
    #[must_use]
    pub fn allow_unverified(mut self, allow: bool) -> Self {
        self.allow_unverified = allow;
        self
    }

    #[must_use]
    pub fn with_max_auth_age(mut self, max_auth_age_secs: Option<u64>) -> Self {
        self.max_auth_age_secs = max_auth_age_secs;
        self
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    /// Verify `payload` under `mode`
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationMissing` when no bot token is configured and
    /// unverified payloads are not allowed, or any error from [`verify`]
    pub fn verify(
        &self,
        payload: &AuthPayload,
        mode: VerificationMode,
    ) -> Result<Verification, AuthError> {
        match &self.secret {
            Some(secret) => verify(payload, mode, secret),
            None => self.bypass(payload, mode),
        }
    }

    /// Verify a raw WebApp `initData` query string
    ///
    /// # Errors
    ///
    /// Same as [`TelegramVerifier::verify`]
    pub fn verify_init_data(&self, init_data: &str) -> Result<Verification, AuthError> {
        let payload = AuthPayload::from_pairs([(INIT_DATA_FIELD, init_data)]);
        self.verify(&payload, VerificationMode::WebApp)
    }

    /// Strict path: authentic payload and fresh `auth_date`, or an error
    ///
    /// # Errors
    ///
    /// Returns `SignatureMismatch` for a non-authentic payload, `Expired` for
    /// a stale one, or any error from [`TelegramVerifier::verify`]
    pub fn authenticate(
        &self,
        payload: &AuthPayload,
        mode: VerificationMode,
    ) -> Result<Value, AuthError> {
        self.authenticate_at(payload, mode, Utc::now())
    }

    /// [`TelegramVerifier::authenticate`] with an explicit clock
    ///
    /// # Errors
    ///
    /// Same as [`TelegramVerifier::authenticate`]
    pub fn authenticate_at(
        &self,
        payload: &AuthPayload,
        mode: VerificationMode,
        now: DateTime<Utc>,
    ) -> Result<Value, AuthError> {
        let verification = self.verify(payload, mode)?;
        if !verification.authentic {
            return Err(AuthError::SignatureMismatch(format!(
                "Telegram {mode} data failed signature verification"
            )));
        }

        if let Some(max_age) = self.max_auth_age_secs {
            let signed_fields = match mode {
                VerificationMode::WebApp => {
                    let init_data = payload.get(INIT_DATA_FIELD).unwrap_or_default();
                    AuthPayload::parse_init_data(init_data)?
                }
                VerificationMode::LoginWidget => payload.clone(),
            };
            ensure_fresh(&signed_fields, max_age, now)?;
        }

        verification
            .user
            .ok_or_else(|| AuthError::MalformedPayload("Verified payload has no user".to_string()))
    }

    fn bypass(
        &self,
        payload: &AuthPayload,
        mode: VerificationMode,
    ) -> Result<Verification, AuthError> {
        if !self.allow_unverified {
            return Err(AuthError::ConfigurationMissing(
                "Telegram bot token is not configured".to_string(),
            ));
        }

        LoggingHelper::log_development_bypass(mode.as_str());
        let fields = match mode {
            VerificationMode::WebApp => {
                let init_data = payload.get(INIT_DATA_FIELD).ok_or_else(|| {
                    AuthError::MalformedPayload(format!("Missing '{INIT_DATA_FIELD}' field"))
                })?;
                AuthPayload::parse_init_data(init_data)?
            }
            VerificationMode::LoginWidget => payload.clone(),
        };

        Ok(Verification {
            authentic: true,
            user: Some(extract_user(&fields, mode)?),
            mode,
            signature_checked: false,
        })
    }
}

/// Reject payloads whose `auth_date` is older than `max_age_secs`
///
/// # Errors
///
/// Returns `MalformedPayload` if `auth_date` is missing or not numeric, and
/// `Expired` if it is too old
pub fn ensure_fresh(
    payload: &AuthPayload,
    max_age_secs: u64,
    now: DateTime<Utc>,
) -> Result<(), AuthError> {
    let auth_date = payload.auth_date().ok_or_else(|| {
        AuthError::MalformedPayload("Missing or non-numeric 'auth_date'".to_string())
    })?;

    let age = now.timestamp().saturating_sub(auth_date);
    let max_age = i64::try_from(max_age_secs).unwrap_or(i64::MAX);
    if age > max_age {
        return Err(AuthError::Expired(format!(
            "auth_date is {age}s old, maximum is {max_age_secs}s"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BOT_TOKEN: &str = "7342037359:AAHI25ES9xCOMPWYWjSHx2nM8e5N2AKFXmo";
    const WIDGET_HASH: &str = "9d27cba95abaa1300a5f2d23cd576767a82f376420a1f23b95960ff814a02923";

    fn widget_payload() -> AuthPayload {
        AuthPayload::from_pairs([
            ("id", "123456789"),
            ("first_name", "Ivan"),
            ("username", "ivan_test"),
            ("photo_url", "https://t.me/i/userpic/320/test.jpg"),
            ("auth_date", "1700000000"),
            ("hash", WIDGET_HASH),
        ])
    }

    fn secret() -> VerificationSecret {
        VerificationSecret::new(BOT_TOKEN)
    }

    #[test]
    fn test_login_widget_known_vector() {
        let verification =
            verify(&widget_payload(), VerificationMode::LoginWidget, &secret()).unwrap();

        assert!(verification.authentic);
        assert!(verification.signature_checked);
        assert_eq!(
            verification.user,
            Some(json!({
                "id": 123_456_789,
                "first_name": "Ivan",
                "username": "ivan_test",
                "photo_url": "https://t.me/i/userpic/320/test.jpg",
                "auth_date": 1_700_000_000
            }))
        );
    }

    #[test]
    fn test_compute_hash_matches_known_vector() {
        let hash =
            compute_hash(&widget_payload(), VerificationMode::LoginWidget, &secret()).unwrap();
        assert_eq!(hash, WIDGET_HASH);
    }

    #[test]
    fn test_uppercase_hash_accepted() {
        let mut payload = widget_payload();
        payload.insert("hash", WIDGET_HASH.to_uppercase());
        let verification = verify(&payload, VerificationMode::LoginWidget, &secret()).unwrap();
        assert!(verification.authentic);
    }

    #[test]
    fn test_modes_are_not_interchangeable() {
        // The widget vector must not validate under the WebApp key derivation
        let mut payload = widget_payload();
        let init_data = payload
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        payload.insert(INIT_DATA_FIELD, init_data);

        let verification = verify(&payload, VerificationMode::WebApp, &secret()).unwrap();
        assert!(!verification.authentic);
        assert!(verification.user.is_none());
    }

    #[test]
    fn test_missing_hash_is_not_authentic() {
        let payload = AuthPayload::from_pairs([("id", "1"), ("auth_date", "1")]);
        let verification = verify(&payload, VerificationMode::LoginWidget, &secret()).unwrap();
        assert!(!verification.authentic);
    }

    #[test]
    fn test_non_hex_hash_is_not_authentic() {
        let mut payload = widget_payload();
        payload.insert("hash", "mock_hash");
        let verification = verify(&payload, VerificationMode::LoginWidget, &secret()).unwrap();
        assert!(!verification.authentic);
    }

    #[test]
    fn test_webapp_requires_init_data_field() {
        let result = verify(&widget_payload(), VerificationMode::WebApp, &secret());
        assert!(matches!(result, Err(AuthError::MalformedPayload(_))));
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        assert!(!format!("{:?}", secret()).contains("AAHI25"));
    }

    #[test]
    fn test_missing_token_without_bypass_is_configuration_error() {
        let verifier = TelegramVerifier::from_settings(&TelegramSettings {
            bot_token: None,
            bot_token_env: None,
            allow_unverified: false,
            max_auth_age_secs: None,
        });

        assert!(!verifier.is_configured());
        let result = verifier.verify(&widget_payload(), VerificationMode::LoginWidget);
        assert!(matches!(result, Err(AuthError::ConfigurationMissing(_))));
    }

    #[test]
    fn test_missing_token_with_bypass_is_flagged_unchecked() {
        let verifier = TelegramVerifier::from_settings(&TelegramSettings {
            bot_token: None,
            bot_token_env: None,
            allow_unverified: true,
            max_auth_age_secs: None,
        });

        let mut payload = widget_payload();
        payload.insert("hash", "anything");
        let verification = verifier.verify(&payload, VerificationMode::LoginWidget).unwrap();
        assert!(verification.authentic);
        assert!(!verification.signature_checked);
        assert_eq!(verification.user.unwrap()["id"], json!(123_456_789));
    }

    #[test]
    fn test_bypass_warns_on_every_call() {
        let verifier = TelegramVerifier {
            secret: None,
            allow_unverified: true,
            max_auth_age_secs: None,
        };
        let mut payload = widget_payload();
        payload.insert("hash", "anything");

        testing_logger::setup();
        verifier.verify(&payload, VerificationMode::LoginWidget).unwrap();
        verifier.verify(&payload, VerificationMode::LoginWidget).unwrap();

        testing_logger::validate(|captured_logs| {
            let warnings: Vec<_> = captured_logs
                .iter()
                .filter(|log| log.level == log::Level::Warn)
                .collect();
            assert_eq!(warnings.len(), 2);
            assert!(warnings
                .iter()
                .all(|log| log.body.contains("skipping LoginWidget signature verification")));
        });
    }

    #[test]
    fn test_checked_verification_does_not_warn() {
        let verifier = TelegramVerifier::new(secret());

        testing_logger::setup();
        let verification = verifier
            .verify(&widget_payload(), VerificationMode::LoginWidget)
            .unwrap();
        assert!(verification.signature_checked);

        testing_logger::validate(|captured_logs| {
            assert!(captured_logs.iter().all(|log| log.level != log::Level::Warn));
        });
    }

    #[test]
    fn test_bypass_still_rejects_malformed_init_data() {
        let verifier = TelegramVerifier {
            secret: None,
            allow_unverified: true,
            max_auth_age_secs: None,
        };
        let result = verifier.verify_init_data("not a query string");
        assert!(matches!(result, Err(AuthError::MalformedPayload(_))));
    }

    #[test]
    fn test_authenticate_freshness() {
        let verifier = TelegramVerifier::new(secret()).with_max_auth_age(Some(3600));
        let signed_at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

        let user = verifier
            .authenticate_at(
                &widget_payload(),
                VerificationMode::LoginWidget,
                signed_at + chrono::Duration::minutes(30),
            )
            .unwrap();
        assert_eq!(user["username"], json!("ivan_test"));

        let result = verifier.authenticate_at(
            &widget_payload(),
            VerificationMode::LoginWidget,
            signed_at + chrono::Duration::hours(2),
        );
        assert!(matches!(result, Err(AuthError::Expired(_))));
    }

    #[test]
    fn test_authenticate_maps_mismatch_to_error() {
        let verifier = TelegramVerifier::new(secret());
        let mut payload = widget_payload();
        payload.insert("first_name", "Pavel");

        let result = verifier.authenticate(&payload, VerificationMode::LoginWidget);
        assert!(matches!(result, Err(AuthError::SignatureMismatch(_))));
    }

    #[test]
    fn test_ensure_fresh_requires_auth_date() {
        let payload = AuthPayload::from_pairs([("id", "1")]);
        let result = ensure_fresh(&payload, 60, Utc::now());
        assert!(matches!(result, Err(AuthError::MalformedPayload(_))));
    }
}
