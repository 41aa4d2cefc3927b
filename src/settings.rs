use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AuthSettings {
    pub telegram: TelegramSettings,
    pub vk: VkSettings,
    pub google: GoogleSettings,
    pub http: HttpSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramSettings {
    // Direct value (can be overridden by environment variable)
    pub bot_token: Option<String>,
    pub bot_token_env: Option<String>,

    /// Development mode: accept payloads unverified when no bot token is set.
    /// Every skipped verification is logged as a warning.
    pub allow_unverified: bool,

    /// Maximum age of `auth_date` accepted by the strict authentication path.
    /// `None` disables the freshness check.
    pub max_auth_age_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VkSettings {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub client_id_env: Option<String>,
    pub client_secret_env: Option<String>,
    pub redirect_uri: String,
    pub scope: String,
    pub api_version: String,

    // VK ID (OAuth 2.1) endpoints
    pub vk_id_authorize_endpoint: String,
    pub vk_id_token_endpoint: String,
    pub vk_id_user_info_endpoint: String,

    // Legacy VK OAuth 2.0 endpoints
    pub oauth_authorize_endpoint: String,
    pub oauth_token_endpoint: String,
    pub api_users_endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub client_id_env: Option<String>,
    pub client_secret_env: Option<String>,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Whole-request timeout for provider calls
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for TelegramSettings {
    fn default() -> Self {
        Self {
            bot_token: None,
            bot_token_env: Some("TELEGRAM_BOT_TOKEN".to_string()),
            allow_unverified: false,
            max_auth_age_secs: Some(86_400), // one day
        }
    }
}

impl Default for VkSettings {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            client_id_env: Some("VK_CLIENT_ID".to_string()),
            client_secret_env: Some("VK_CLIENT_SECRET".to_string()),
            redirect_uri: "http://localhost:3000/vk-oauth-callback".to_string(),
            scope: "email".to_string(),
            api_version: "5.131".to_string(),
            vk_id_authorize_endpoint: "https://id.vk.com/authorize".to_string(),
            vk_id_token_endpoint: "https://id.vk.com/oauth2/auth".to_string(),
            vk_id_user_info_endpoint: "https://id.vk.com/oauth2/user_info".to_string(),
            oauth_authorize_endpoint: "https://oauth.vk.com/authorize".to_string(),
            oauth_token_endpoint: "https://oauth.vk.com/access_token".to_string(),
            api_users_endpoint: "https://api.vk.com/method/users.get".to_string(),
        }
    }
}

impl Default for GoogleSettings {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            client_id_env: Some("GOOGLE_CLIENT_ID".to_string()),
            client_secret_env: Some("GOOGLE_CLIENT_SECRET".to_string()),
            redirect_uri: "http://localhost:3000/google-oauth-callback".to_string(),
            scopes: vec![
                "https://www.googleapis.com/auth/spreadsheets".to_string(),
                "https://www.googleapis.com/auth/drive.metadata.readonly".to_string(),
                "https://www.googleapis.com/auth/drive".to_string(),
            ],
            authorization_endpoint: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_endpoint: "https://oauth2.googleapis.com/token".to_string(),
        }
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            connect_timeout_secs: 5,
            user_agent: format!("adstat-auth/{}", crate::VERSION),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AuthSettings {
    /// Load settings from configuration files and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Settings file cannot be read or parsed
    /// - TOML parsing fails
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Self::load_env_file(Path::new(".env"));

        // Load base settings from TOML or defaults
        let mut settings = Self::load_base_settings()?;

        // Apply environment variable overrides
        Self::apply_env_overrides(&mut settings);

        Ok(settings)
    }

    /// Initialize `env_logger` with the configured level
    ///
    /// # Errors
    ///
    /// Returns an error if a logger is already installed
    pub fn init_logging(&self) -> Result<(), Box<dyn std::error::Error>> {
        env_logger::Builder::new()
            .parse_filters(&self.logging.level)
            .try_init()?;
        Ok(())
    }

    /// Load base settings from TOML file(s) or use defaults
    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables (applied separately after loading base settings)
    /// 2. Settings.toml in `ADSTAT_SECRETS_DIR` (if specified and exists)
    /// 3. Settings.toml in current directory (if exists)
    /// 4. Default settings
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Settings file cannot be read
    /// - TOML parsing fails
    fn load_base_settings() -> Result<Self, Box<dyn std::error::Error>> {
        let mut settings = Self::default();

        let default_config_path = std::path::PathBuf::from("Settings.toml");
        if default_config_path.exists() {
            settings = Self::from_file(&default_config_path)?;
            log::info!(
                "✓ Loaded base settings from {}",
                default_config_path.display()
            );
        }

        if let Ok(secrets_dir) = std::env::var("ADSTAT_SECRETS_DIR") {
            let secrets_path = std::path::Path::new(&secrets_dir).join("Settings.toml");
            if secrets_path.exists() {
                settings = Self::from_file(&secrets_path)?;
                log::info!("✓ Overriding settings from {}", secrets_path.display());
            } else {
                log::info!(
                    "ℹ ADSTAT_SECRETS_DIR set but no Settings.toml found at: {}",
                    secrets_path.display()
                );
            }
        }

        Ok(settings)
    }

    /// Parse a settings file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML
    pub fn from_file(path: &std::path::Path) -> Result<Self, Box<dyn std::error::Error>> {
        let toml_content = fs::read_to_string(path)?;
        Ok(basic_toml::from_str(&toml_content)?)
    }

    /// Apply environment variable overrides to settings
    pub fn apply_env_overrides(settings: &mut Self) {
        Self::apply_telegram_env_overrides(&mut settings.telegram);
        Self::apply_vk_env_overrides(&mut settings.vk);
        Self::apply_google_env_overrides(&mut settings.google);
        Self::apply_http_env_overrides(&mut settings.http);
        Self::apply_logging_env_overrides(&mut settings.logging);
    }

    fn apply_telegram_env_overrides(telegram: &mut TelegramSettings) {
        if let Ok(value) = std::env::var("TELEGRAM_ALLOW_UNVERIFIED") {
            if let Ok(allow) = value.parse::<bool>() {
                telegram.allow_unverified = allow;
            }
        }
        if let Ok(value) = std::env::var("TELEGRAM_MAX_AUTH_AGE_SECS") {
            if let Ok(secs) = value.parse::<u64>() {
                // 0 disables the freshness check
                telegram.max_auth_age_secs = (secs > 0).then_some(secs);
            }
        }
    }

    fn apply_vk_env_overrides(vk: &mut VkSettings) {
        if let Ok(redirect_uri) = std::env::var("VK_REDIRECT_URI") {
            vk.redirect_uri = redirect_uri;
        }
    }

    fn apply_google_env_overrides(google: &mut GoogleSettings) {
        if let Ok(redirect_uri) = std::env::var("GOOGLE_REDIRECT_URI") {
            google.redirect_uri = redirect_uri;
        }
    }

    /// Apply environment overrides for HTTP client settings
    pub fn apply_http_env_overrides(http: &mut HttpSettings) {
        Self::apply_numeric_env_override("HTTP_TIMEOUT_SECS", &mut http.timeout_secs);
        Self::apply_numeric_env_override(
            "HTTP_CONNECT_TIMEOUT_SECS",
            &mut http.connect_timeout_secs,
        );
    }

    /// Helper function to apply numeric environment variable overrides
    fn apply_numeric_env_override(env_var: &str, target: &mut u64) {
        if let Ok(value_str) = std::env::var(env_var) {
            if let Ok(value) = value_str.parse::<u64>() {
                *target = value;
            }
        }
    }

    fn apply_logging_env_overrides(logging_settings: &mut LoggingSettings) {
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            logging_settings.level = log_level;
        }
    }

    /// Load variables from a `.env` file without overriding the process environment
    fn load_env_file(path: &Path) {
        match dotenvy::from_path(path) {
            Ok(()) => log::info!("✓ Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => log::warn!("⚠️  Ignoring unreadable {}: {e}", path.display()),
        }
    }
}

/// Read a value from the named environment variable, falling back to the direct value
fn env_or(env_var: Option<&String>, direct: Option<&String>) -> Option<String> {
    if let Some(env_var) = env_var {
        if let Ok(value) = std::env::var(env_var) {
            if !value.is_empty() {
                return Some(value);
            }
        }
    }
    direct.filter(|value| !value.is_empty()).cloned()
}

impl TelegramSettings {
    /// Get the bot token, checking environment variable first, then falling back to direct value
    #[must_use]
    pub fn get_bot_token(&self) -> Option<String> {
        env_or(self.bot_token_env.as_ref(), self.bot_token.as_ref())
    }
}

impl VkSettings {
    /// Get the client ID, checking environment variable first, then falling back to direct value
    #[must_use]
    pub fn get_client_id(&self) -> Option<String> {
        env_or(self.client_id_env.as_ref(), self.client_id.as_ref())
    }

    /// Get the client secret, checking environment variable first, then the direct value
    #[must_use]
    pub fn get_client_secret(&self) -> Option<String> {
        env_or(self.client_secret_env.as_ref(), self.client_secret.as_ref())
    }
}

impl GoogleSettings {
    #[must_use]
    pub fn get_client_id(&self) -> Option<String> {
        env_or(self.client_id_env.as_ref(), self.client_id.as_ref())
    }

    #[must_use]
    pub fn get_client_secret(&self) -> Option<String> {
        env_or(self.client_secret_env.as_ref(), self.client_secret.as_ref())
    }
}

impl HttpSettings {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
