use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image-preview";
pub const DEFAULT_STATUS_INTERVAL: Duration = Duration::from_millis(2500);

/// Placeholder key that selects the offline demo synthesizer.
pub const DEMO_KEY: &str = "DEMO_KEY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_key: Option<String>,
    pub api_base: String,
    pub image_model: String,
    pub status_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            status_interval: DEFAULT_STATUS_INTERVAL,
        }
    }
}

impl Config {
    /// Loads `.env` (if present) and reads the process environment.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let api_key = lookup("GEMINI_API_KEY")
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty() && k != DEMO_KEY);
        let status_interval = lookup("MODELSHOT_STATUS_INTERVAL_MS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(defaults.status_interval);
        Self {
            api_key,
            api_base: lookup("GEMINI_API_BASE").unwrap_or(defaults.api_base),
            image_model: lookup("GEMINI_IMAGE_MODEL").unwrap_or(defaults.image_model),
            status_interval,
        }
    }

    pub fn demo_mode(&self) -> bool {
        self.api_key.is_none()
    }

    /// First few characters of the key, for start-up logging.
    pub fn redacted_key(&self) -> String {
        match &self.api_key {
            Some(key) => format!("{}...", key.chars().take(6).collect::<String>()),
            None => "<none>".to_string(),
        }
    }
}
