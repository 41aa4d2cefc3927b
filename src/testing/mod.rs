//! Testing utilities for adstat-auth
//!
//! Available to unit tests and, through the `testing` feature, to the
//! integration tests under `tests/`.
//!
//! - [`fixtures`] - signed Telegram payloads and provider settings pointing
//!   at a mock server

pub mod fixtures;

pub use fixtures::TestFixtures;

/// Common test constants
pub mod constants {
    /// Bot token shared by all Telegram fixtures
    pub const TEST_BOT_TOKEN: &str = "7342037359:AAHI25ES9xCOMPWYWjSHx2nM8e5N2AKFXmo";

    /// Default VK application id
    pub const TEST_VK_CLIENT_ID: &str = "53860967";

    /// Default VK application secret
    pub const TEST_VK_CLIENT_SECRET: &str = "test-vk-client-secret";

    /// Default redirect URI
    pub const TEST_REDIRECT_URI: &str = "https://example.test/vk-oauth-callback";

    /// Telegram user JSON carried in WebApp fixtures
    pub const TEST_WEBAPP_USER: &str = r#"{"id":279058397,"first_name":"Vladislav","last_name":"Kibenko","username":"vdkfrost","language_code":"ru","is_premium":true,"allows_write_to_pm":true}"#;
}
