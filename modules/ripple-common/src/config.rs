use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // AI provider
    pub anthropic_api_key: String,
    pub anthropic_model: String,

    // Design rendering service
    pub design_api_key: String,
    pub design_base_url: Option<String>,

    // Asset storage
    pub data_dir: String,
    /// Prefix prepended to stored asset paths to form public URLs.
    pub asset_base_url: String,

    // Prompting
    pub brand_voice: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            anthropic_api_key: required_env("ANTHROPIC_API_KEY"),
            anthropic_model: env::var("ANTHROPIC_MODEL")
                .unwrap_or_else(|_| "claude-sonnet-4-5".to_string()),
            design_api_key: required_env("DESIGN_API_KEY"),
            design_base_url: env::var("DESIGN_BASE_URL").ok(),
            data_dir: env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()),
            asset_base_url: env::var("PUBLIC_ASSET_BASE_URL")
                .unwrap_or_else(|_| "file://./data/assets".to_string()),
            brand_voice: env::var("BRAND_VOICE").ok(),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
