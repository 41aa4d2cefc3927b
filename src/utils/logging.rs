// Centralized logging utilities; every helper here redacts secrets before logging
use crate::models::TokenSource;
use log::{debug, info, warn};
use serde_json::Value;

/// Form and JSON keys whose values never reach the log
pub const SENSITIVE_KEYS: &[&str] = &[
    "client_secret",
    "code",
    "code_verifier",
    "access_token",
    "refresh_token",
    "id_token",
];

const REDACTED: &str = "[REDACTED]";

/// Longest response body excerpt kept in logs and error messages
pub const MAX_BODY_EXCERPT: usize = 300;

pub struct LoggingHelper;

impl LoggingHelper {
    /// Log the start of a token exchange attempt
    pub fn log_token_exchange_start(source: TokenSource, endpoint: &str) {
        info!("🔄 Exchanging authorization code for tokens with {source} ({endpoint})");
    }

    /// Log the redacted request form at debug level
    pub fn log_token_request(source: TokenSource, params: &[(&str, String)]) {
        debug!("{source} token request: {}", redact_form(params));
    }

    /// Log the redacted raw response at debug level
    pub fn log_token_response_raw(source: TokenSource, status: u16, body: &str) {
        debug!("Raw {source} token response (HTTP {status}): {}", redact_body(body));
    }

    /// Log a failed attempt before falling back
    pub fn log_exchange_attempt_failed(source: TokenSource, reason: &str) {
        warn!("⚠️  {source} token exchange failed: {reason}");
    }

    /// Log token exchange summary
    pub fn log_token_exchange_summary(
        source: TokenSource,
        refresh_token: Option<&String>,
        user_id: Option<&String>,
        expires_in: Option<u64>,
    ) {
        info!(
            "✅ Token exchange via {source} succeeded: refresh_token={}, user_id={}, expires_in={:?}",
            refresh_token.map_or("missing", |_| "present"),
            user_id.map_or("missing", String::as_str),
            expires_in
        );
    }

    /// Log that the bot token is missing and verification is skipped
    pub fn log_development_bypass(mode: &str) {
        warn!(
            "⚠️  Telegram bot token is not configured; skipping {mode} signature verification (allow_unverified = true)"
        );
    }

    /// Log a rejected Telegram signature
    pub fn log_signature_rejected(mode: &str, reason: &str) {
        debug!("Telegram {mode} signature rejected: {reason}");
    }

    /// Log a successful Telegram verification
    pub fn log_signature_verified(mode: &str, field_count: usize) {
        debug!("Telegram {mode} signature verified over {field_count} fields");
    }

    /// Log provider API calls other than token exchange
    pub fn log_provider_request(source: TokenSource, what: &str, endpoint: &str) {
        debug!("Requesting {what} from {source} ({endpoint})");
    }
}

/// Render form parameters as `key=value&...` with sensitive values replaced
#[must_use]
pub fn redact_form(params: &[(&str, String)]) -> String {
    params
        .iter()
        .map(|(key, value)| {
            if is_sensitive(key) {
                format!("{key}={REDACTED}")
            } else {
                format!("{key}={value}")
            }
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Redact a provider response body for logging
///
/// JSON bodies have sensitive keys replaced at any depth. Anything else is
/// cut down to an excerpt.
#[must_use]
pub fn redact_body(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(mut value) => {
            redact_value(&mut value);
            truncate_for_log(&value.to_string(), MAX_BODY_EXCERPT)
        }
        Err(_) => truncate_for_log(body, MAX_BODY_EXCERPT),
    }
}

fn redact_value(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, entry) in map.iter_mut() {
                if is_sensitive(key) {
                    *entry = Value::String(REDACTED.to_string());
                } else {
                    redact_value(entry);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact_value),
        _ => {}
    }
}

fn is_sensitive(key: &str) -> bool {
    SENSITIVE_KEYS.contains(&key)
}

/// Cut `text` to at most `max` characters, marking the cut
#[must_use]
pub fn truncate_for_log(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((index, _)) => format!("{}…", &text[..index]),
        None => text.to_string(),
    }
}
