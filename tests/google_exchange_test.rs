// Integration tests for the Google authorization code exchange against a mock server
use adstat_auth::testing::TestFixtures;
use adstat_auth::{AuthError, GoogleOAuth, TokenSource};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn google_for(server: &MockServer) -> GoogleOAuth {
    GoogleOAuth::with_client(TestFixtures::google_settings(&server.uri()), reqwest::Client::new())
}

#[tokio::test]
async fn test_google_exchange_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=4%2F0Adeu5BW"))
        .and(body_string_contains("client_id=google-client-id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.a0AfH6SM",
            "refresh_token": "1//0gRefresh",
            "expires_in": 3599,
            "scope": "https://www.googleapis.com/auth/spreadsheets",
            "token_type": "Bearer",
            "id_token": "eyJhbGciOiJSUzI1NiJ9.e30.sig"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = google_for(&server).exchange("4/0Adeu5BW").await.unwrap();

    assert_eq!(result.source, TokenSource::Google);
    assert_eq!(result.access_token, "ya29.a0AfH6SM");
    assert_eq!(result.refresh_token.as_deref(), Some("1//0gRefresh"));
    assert_eq!(result.expires_in, Some(3599));
    assert!(result.id_token.is_some());

    // Debug output never carries the tokens
    let debug = format!("{result:?}");
    assert!(!debug.contains("ya29.a0AfH6SM"));
    assert!(!debug.contains("1//0gRefresh"));
}

#[tokio::test]
async fn test_google_exchange_failure_has_single_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Malformed auth code."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = google_for(&server).exchange("bad-code").await.unwrap_err();

    let AuthError::ProviderExchangeFailed(ref failure) = err else {
        panic!("expected ProviderExchangeFailed, got {err:?}");
    };
    assert_eq!(failure.attempts.len(), 1);
    assert_eq!(failure.attempts[0].source, TokenSource::Google);
    assert_eq!(
        failure.attempts[0].reason,
        "HTTP 400: invalid_grant: Malformed auth code."
    );
    assert!(!err.to_string().contains("google-client-secret"));
}

#[tokio::test]
async fn test_google_exchange_without_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let mut settings = TestFixtures::google_settings(&server.uri());
    settings.client_secret = None;
    let google = GoogleOAuth::with_client(settings, reqwest::Client::new());

    let err = google.exchange("code").await.unwrap_err();
    assert!(matches!(err, AuthError::ConfigurationMissing(_)));
    assert_eq!(err.status_code(), 401);
}

#[tokio::test]
async fn test_google_refresh_keeps_refresh_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=1%2F%2F0gRefresh"))
        .and(body_string_contains("client_secret=google-client-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.refreshed",
            "expires_in": 3599,
            "scope": "https://www.googleapis.com/auth/spreadsheets",
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = google_for(&server).refresh("1//0gRefresh").await.unwrap();

    assert_eq!(result.source, TokenSource::Google);
    assert_eq!(result.access_token, "ya29.refreshed");
    assert_eq!(result.refresh_token.as_deref(), Some("1//0gRefresh"));
    assert_eq!(result.expires_in, Some(3599));

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(!body.contains("redirect_uri"));
    assert!(!body.contains("code="));
}

#[tokio::test]
async fn test_google_refresh_prefers_rotated_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.refreshed",
            "refresh_token": "1//0gRotated",
            "expires_in": 3599
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = google_for(&server).refresh("1//0gRefresh").await.unwrap();
    assert_eq!(result.refresh_token.as_deref(), Some("1//0gRotated"));
}

#[tokio::test]
async fn test_google_refresh_revoked_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Token has been expired or revoked."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = google_for(&server).refresh("1//0gRevoked").await.unwrap_err();

    let attempts = err.attempts();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].source, TokenSource::Google);
    assert_eq!(
        attempts[0].reason,
        "HTTP 400: invalid_grant: Token has been expired or revoked."
    );
    assert!(!err.to_string().contains("1//0gRevoked"));
}
