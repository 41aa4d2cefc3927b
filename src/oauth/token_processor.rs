//! Token endpoint calls and response normalization
//!
//! Every provider posts a form to its token endpoint and gets back JSON. This
//! module performs one such attempt and turns the response into a
//! [`TokenExchangeResult`] or an [`ExchangeAttempt`] describing the failure.

use crate::models::{ExchangeAttempt, TokenExchangeResult, TokenSource};
use crate::utils::logging::{redact_body, LoggingHelper};
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde_json::Value;

/// Perform one form POST against a token endpoint
///
/// Succeeds only on HTTP 200 with a non-empty `access_token`.
///
/// # Errors
///
/// Returns the failed attempt, carrying the provider's diagnostic text with
/// secrets redacted
pub async fn request_tokens(
    http: &reqwest::Client,
    source: TokenSource,
    endpoint: &str,
    params: &[(&str, String)],
) -> Result<TokenExchangeResult, ExchangeAttempt> {
    let failed = |reason: String| ExchangeAttempt {
        source,
        endpoint: endpoint.to_string(),
        reason,
    };

    LoggingHelper::log_token_exchange_start(source, endpoint);
    LoggingHelper::log_token_request(source, params);

    let response = http
        .post(endpoint)
        .header(ACCEPT, "application/json")
        .form(params)
        .send()
        .await
        .map_err(|e| failed(format!("request failed: {}", e.without_url())))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| failed(format!("failed to read response body: {}", e.without_url())))?;

    LoggingHelper::log_token_response_raw(source, status.as_u16(), &body);

    if status != StatusCode::OK {
        return Err(failed(describe_failure(status, &body)));
    }

    let result = parse_token_response(source, &body).map_err(failed)?;
    LoggingHelper::log_token_exchange_summary(
        source,
        result.refresh_token.as_ref(),
        result.user_id.as_ref(),
        result.expires_in,
    );
    Ok(result)
}

/// Normalize a successful token response body
///
/// # Errors
///
/// Returns a diagnostic string if the body is not JSON, carries an `error`,
/// or has no usable `access_token`
pub fn parse_token_response(
    source: TokenSource,
    body: &str,
) -> Result<TokenExchangeResult, String> {
    let json: Value = serde_json::from_str(body)
        .map_err(|e| format!("response is not valid JSON ({e}): {}", redact_body(body)))?;

    if let Some(error) = provider_error(&json) {
        return Err(error);
    }

    let access_token = json
        .get("access_token")
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| format!("response has no access_token: {}", redact_body(body)))?;

    Ok(TokenExchangeResult {
        access_token: access_token.to_string(),
        refresh_token: non_empty_string(json.get("refresh_token")),
        user_id: json.get("user_id").and_then(scalar_to_string),
        id_token: non_empty_string(json.get("id_token")),
        expires_in: json.get("expires_in").and_then(Value::as_u64),
        email: non_empty_string(json.get("email")),
        source,
    })
}

/// Diagnostic text for a non-200 response
#[must_use]
pub fn describe_failure(status: StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| provider_error(&json))
        .unwrap_or_else(|| redact_body(body));
    format!("HTTP {}: {detail}", status.as_u16())
}

/// Extract `error` / `error_description` in either the `OAuth` or VK API shape
#[must_use]
pub fn provider_error(json: &Value) -> Option<String> {
    let error = json.get("error")?;
    match error {
        // OAuth: {"error": "invalid_grant", "error_description": "..."}
        Value::String(code) => Some(match json.get("error_description").and_then(Value::as_str) {
            Some(description) => format!("{code}: {description}"),
            None => code.clone(),
        }),
        // VK API: {"error": {"error_code": 5, "error_msg": "..."}}
        Value::Object(details) => {
            let code = details.get("error_code").and_then(scalar_to_string);
            let message = details
                .get("error_msg")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            Some(match code {
                Some(code) => format!("error {code}: {message}"),
                None => message.to_string(),
            })
        }
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Render a JSON string or number as a string
#[must_use]
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_empty_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}
