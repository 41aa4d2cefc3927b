//! Telegram authentication payloads and the canonical data-check string

use crate::models::AuthError;
use serde_json::Value;
use std::collections::BTreeMap;

/// Field carrying the received signature
pub const HASH_FIELD: &str = "hash";

/// Ed25519 signature for third-party validation; never part of the HMAC input
pub const SIGNATURE_FIELD: &str = "signature";

/// Field carrying the raw WebApp query string
pub const INIT_DATA_FIELD: &str = "initData";

/// Fields excluded from the data-check string
const EXCLUDED_FIELDS: &[&str] = &[HASH_FIELD, SIGNATURE_FIELD];

/// Field map supplied by Telegram
///
/// Keys are kept sorted, so iteration order never depends on how the
/// payload was assembled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthPayload {
    fields: BTreeMap<String, String>,
}

impl AuthPayload {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a payload from any iterator of key/value pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Build a payload from a JSON object as posted by the login widget
    ///
    /// Numbers and booleans are rendered in their plain textual form, which
    /// is what Telegram signed. `null` fields are dropped.
    ///
    /// # Errors
    ///
    /// Returns `MalformedPayload` if the value is not an object or contains
    /// nested arrays or objects
    pub fn from_json(value: &Value) -> Result<Self, AuthError> {
        let object = value.as_object().ok_or_else(|| {
            AuthError::MalformedPayload("Telegram payload must be a JSON object".to_string())
        })?;

        let mut fields = BTreeMap::new();
        for (key, entry) in object {
            let rendered = match entry {
                Value::Null => continue,
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Array(_) | Value::Object(_) => {
                    return Err(AuthError::MalformedPayload(format!(
                        "Field '{key}' must be a scalar value"
                    )))
                }
            };
            fields.insert(key.clone(), rendered);
        }
        Ok(Self { fields })
    }

    /// Parse a WebApp `initData` query string
    ///
    /// Values are percent-decoded. An empty string, a pair without `=`, or a
    /// repeated key is rejected.
    ///
    /// # Errors
    ///
    /// Returns `MalformedPayload` describing the first offending segment
    pub fn parse_init_data(init_data: &str) -> Result<Self, AuthError> {
        let init_data = init_data.trim();
        if init_data.is_empty() {
            return Err(AuthError::MalformedPayload("initData is empty".to_string()));
        }

        let mut fields = BTreeMap::new();
        for segment in init_data.split('&') {
            if !segment.contains('=') {
                return Err(AuthError::MalformedPayload(format!(
                    "initData segment '{segment}' is not a key=value pair"
                )));
            }
            let Some((key, value)) = url::form_urlencoded::parse(segment.as_bytes()).next() else {
                return Err(AuthError::MalformedPayload(format!(
                    "initData segment '{segment}' could not be decoded"
                )));
            };
            if key.is_empty() {
                return Err(AuthError::MalformedPayload(
                    "initData contains an empty key".to_string(),
                ));
            }
            if fields.insert(key.to_string(), value.into_owned()).is_some() {
                return Err(AuthError::MalformedPayload(format!(
                    "initData repeats the '{key}' field"
                )));
            }
        }
        Ok(Self { fields })
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn hash(&self) -> Option<&str> {
        self.get(HASH_FIELD).filter(|h| !h.is_empty())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Fields covered by the signature, in key order
    pub fn signed_fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter().filter(|(k, _)| !EXCLUDED_FIELDS.contains(k))
    }

    /// Canonical newline-joined `key=value` form used as HMAC input
    #[must_use]
    pub fn data_check_string(&self) -> String {
        self.signed_fields()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Unix timestamp from `auth_date`, if present and numeric
    #[must_use]
    pub fn auth_date(&self) -> Option<i64> {
        self.get("auth_date").and_then(|v| v.parse().ok())
    }
}

/// Parse a data-check string back into a payload
///
/// Lines without `=` are skipped. Values may contain `=` and are kept whole.
#[must_use]
pub fn parse_data_check_string(data_check_string: &str) -> AuthPayload {
    AuthPayload::from_pairs(
        data_check_string
            .lines()
            .filter_map(|line| line.split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string())),
    )
}
