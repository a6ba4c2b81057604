use chrono::Duration;

pub const DEFAULT_OPENROUTER_BASE: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_OPENROUTER_MODEL: &str = "meta-llama/llama-3.2-3b-instruct:free";
pub const DEFAULT_UNSPLASH_BASE: &str = "https://api.unsplash.com";
pub const DEFAULT_STRIPE_BASE: &str = "https://api.stripe.com/v1";
pub const DEFAULT_APP_ORIGIN: &str = "http://localhost:3000";

/// Runtime configuration, read from the process environment (and `.env`).
///
/// Vendor credentials are optional on purpose: a missing key only fails the
/// requests that need it, never the whole server.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub openrouter_api_key: Option<String>,
    pub openrouter_base_url: String,
    pub openrouter_model: String,
    pub unsplash_access_key: Option<String>,
    pub unsplash_base_url: String,
    pub stripe_secret_key: Option<String>,
    pub stripe_webhook_secret: Option<String>,
    pub stripe_base_url: String,
    pub app_origin: String,
    pub session_ttl: Duration,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openrouter_api_key: None,
            openrouter_base_url: DEFAULT_OPENROUTER_BASE.to_string(),
            openrouter_model: DEFAULT_OPENROUTER_MODEL.to_string(),
            unsplash_access_key: None,
            unsplash_base_url: DEFAULT_UNSPLASH_BASE.to_string(),
            stripe_secret_key: None,
            stripe_webhook_secret: None,
            stripe_base_url: DEFAULT_STRIPE_BASE.to_string(),
            app_origin: DEFAULT_APP_ORIGIN.to_string(),
            session_ttl: Duration::hours(168),
            port: 8080,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();
        Self {
            openrouter_api_key: secret("OPENROUTER_API_KEY"),
            openrouter_base_url: lookup("OPENROUTER_API_BASE").unwrap_or(defaults.openrouter_base_url),
            openrouter_model: lookup("OPENROUTER_MODEL").unwrap_or(defaults.openrouter_model),
            unsplash_access_key: secret("UNSPLASH_ACCESS_KEY"),
            unsplash_base_url: lookup("UNSPLASH_API_BASE").unwrap_or(defaults.unsplash_base_url),
            stripe_secret_key: secret("STRIPE_SECRET_KEY"),
            stripe_webhook_secret: secret("STRIPE_WEBHOOK_SECRET"),
            stripe_base_url: lookup("STRIPE_API_BASE").unwrap_or(defaults.stripe_base_url),
            app_origin: lookup("APP_ORIGIN").unwrap_or(defaults.app_origin),
            session_ttl: lookup("SESSION_TTL_HOURS")
                .and_then(|v| v.parse::<i64>().ok())
                .filter(|h| *h > 0)
                .map(Duration::hours)
                .unwrap_or(defaults.session_ttl),
            port: lookup("PORT").and_then(|v| v.parse().ok()).unwrap_or(defaults.port),
        }
    }
}

/// Shortens a credential for log output.
pub fn key_preview(key: Option<&str>) -> String {
    match key {
        Some(k) => format!("{}...", &k[..k.char_indices().nth(6).map(|(i, _)| i).unwrap_or(k.len())]),
        None => "<unset>".to_string(),
    }
}
