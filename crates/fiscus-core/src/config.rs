use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::FiscusError;

/// Top-level Fiscus configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub rates: RatesConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default)]
    pub reminders: ReminderConfig,
}

/// General assistant settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
        }
    }
}

/// Provider configuration. Missing sections disable that provider;
/// the local rule-based responder is always present.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderConfig {
    pub gemini: Option<GeminiConfig>,
    pub openai: Option<OpenAiConfig>,
}

/// Google Gemini provider config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
}

/// OpenAI provider config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_openai_model")]
    pub model: String,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
}

/// Retry policy applied to each remote provider before falling through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_backoff_factor")]
    pub factor: f64,
    /// Maximum random jitter added to each delay, as a fraction (0.3 = up to +30%).
    #[serde(default = "default_jitter")]
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            factor: default_backoff_factor(),
            jitter: default_jitter(),
        }
    }
}

/// Storage config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

/// HTTP server config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allow-list. Entries may use `*` as a wildcard segment
    /// (e.g. `https://*.example.com`).
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_host(),
            port: default_port(),
            allowed_origins: default_allowed_origins(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// Sliding-window rate limit applied to `/api/*` routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
        }
    }
}

/// Exchange-rate service config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatesConfig {
    #[serde(default = "default_rates_base_url")]
    pub base_url: String,
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            base_url: default_rates_base_url(),
        }
    }
}

/// External calendar mirror config. Disabled unless an access token is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_calendar_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub access_token: String,
    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_calendar_base_url(),
            access_token: String::new(),
            calendar_id: default_calendar_id(),
        }
    }
}

/// Text-to-speech config. Uses the OpenAI speech endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_voice")]
    pub voice: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            voice: default_voice(),
        }
    }
}

/// Reminder delivery loop config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_secs: default_poll_interval(),
        }
    }
}

// --- Default value functions ---

fn default_name() -> String {
    "Fiscus".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}
fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_max_attempts() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    500
}
fn default_max_delay_ms() -> u64 {
    5000
}
fn default_backoff_factor() -> f64 {
    2.0
}
fn default_jitter() -> f64 {
    0.3
}
fn default_db_path() -> String {
    "~/.fiscus/fiscus.db".to_string()
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    3001
}
fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:8081".into(), "http://localhost:19006".into()]
}
fn default_max_requests() -> u32 {
    100
}
fn default_window_secs() -> u64 {
    900
}
fn default_rates_base_url() -> String {
    "https://api.exchangerate-api.com/v4".to_string()
}
fn default_calendar_base_url() -> String {
    "https://www.googleapis.com/calendar/v3".to_string()
}
fn default_calendar_id() -> String {
    "primary".to_string()
}
fn default_voice() -> String {
    "nova".to_string()
}
fn default_poll_interval() -> u64 {
    60
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist.
pub fn load(path: &str) -> Result<Config, FiscusError> {
    let path = Path::new(path);
    if !path.exists() {
        tracing::info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| FiscusError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| FiscusError::Config(format!("failed to parse config: {}", e)))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_defaults() {
        let retry = RetryConfig::default();
        assert_eq!(retry.max_attempts, 3);
        assert_eq!(retry.base_delay_ms, 500);
        assert_eq!(retry.max_delay_ms, 5000);
        assert!((retry.factor - 2.0).abs() < f64::EPSILON);
        assert!((retry.jitter - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn test_retry_from_toml() {
        let toml_str = r#"
            max_attempts = 5
            base_delay_ms = 100
        "#;
        let retry: RetryConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(retry.max_attempts, 5);
        assert_eq!(retry.base_delay_ms, 100);
        assert_eq!(retry.max_delay_ms, 5000);
    }

    #[test]
    fn test_rate_limit_defaults() {
        let rl = RateLimitConfig::default();
        assert_eq!(rl.max_requests, 100);
        assert_eq!(rl.window_secs, 900);
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            [assistant]
            name = "Fiscus"

            [provider.gemini]
            enabled = true
            api_key = "test-key"

            [server]
            port = 4000
            allowed_origins = ["https://*.example.com"]
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        let gemini = config.provider.gemini.unwrap();
        assert!(gemini.enabled);
        assert_eq!(gemini.api_key, "test-key");
        assert_eq!(gemini.model, "gemini-1.5-flash");
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.server.allowed_origins, vec!["https://*.example.com"]);
        assert!(config.provider.openai.is_none());
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.assistant.name, "Fiscus");
        assert_eq!(config.server.port, 3001);
        assert!(config.server.enabled);
        assert_eq!(config.reminders.poll_interval_secs, 60);
        assert_eq!(config.rates.base_url, "https://api.exchangerate-api.com/v4");
    }

    #[test]
    fn test_shellexpand_home() {
        std::env::set_var("HOME", "/home/test");
        assert_eq!(shellexpand("~/x.db"), "/home/test/x.db");
        assert_eq!(shellexpand("/abs/x.db"), "/abs/x.db");
    }
}
