use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Environment variable holding the remote service base URL.
pub const ENV_REMOTE_URL: &str = "SUBTRACK_REMOTE_URL";
/// Environment variable holding the remote service public API key.
pub const ENV_API_KEY: &str = "SUBTRACK_API_KEY";
/// Environment variable overriding the remote table name.
pub const ENV_TABLE: &str = "SUBTRACK_TABLE";

/// Library configuration: where the remote store lives and which local keys
/// hold guest data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Base URL of the remote service (e.g., "https://xyz.supabase.co")
    #[serde(default)]
    pub remote_url: String,

    /// Public (anon) API key sent with every remote request
    #[serde(default)]
    pub api_key: String,

    /// Remote table holding entries
    #[serde(default = "default_table")]
    pub table: String,

    /// Local key of the guest-mode flag
    #[serde(default = "default_guest_flag_key")]
    pub guest_flag_key: String,

    /// Local key of the serialized guest collection
    #[serde(default = "default_guest_collection_key")]
    pub guest_collection_key: String,

    /// Currency symbol used when formatting amounts for display
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
}

fn default_table() -> String {
    "subscriptions".to_string()
}

fn default_guest_flag_key() -> String {
    "guestMode".to_string()
}

fn default_guest_collection_key() -> String {
    "guestSubscriptions".to_string()
}

fn default_currency_symbol() -> String {
    "¥".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            remote_url: String::new(),
            api_key: String::new(),
            table: default_table(),
            guest_flag_key: default_guest_flag_key(),
            guest_collection_key: default_guest_collection_key(),
            currency_symbol: default_currency_symbol(),
        }
    }
}

impl Settings {
    /// Defaults overlaid with `SUBTRACK_*` environment variables.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Ok(url) = std::env::var(ENV_REMOTE_URL) {
            settings.remote_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Ok(key) = std::env::var(ENV_API_KEY) {
            settings.api_key = key.trim().to_string();
        }
        if let Ok(table) = std::env::var(ENV_TABLE) {
            if !table.trim().is_empty() {
                settings.table = table.trim().to_string();
            }
        }
        settings
    }

    /// Parse settings from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(json)?)
    }

    /// `true` when enough is configured to talk to the remote service.
    pub fn has_remote(&self) -> bool {
        !self.remote_url.is_empty() && !self.api_key.is_empty()
    }

    /// Check the settings are usable.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !self.remote_url.is_empty()
            && !(self.remote_url.starts_with("https://") || self.remote_url.starts_with("http://"))
        {
            return Err(CoreError::Validation(format!(
                "Remote URL must start with http:// or https:// (got '{}')",
                self.remote_url
            )));
        }
        if self.table.trim().is_empty() {
            return Err(CoreError::Validation("Remote table name must not be empty".into()));
        }
        if self.guest_flag_key.is_empty() || self.guest_collection_key.is_empty() {
            return Err(CoreError::Validation("Guest storage keys must not be empty".into()));
        }
        if self.guest_flag_key == self.guest_collection_key {
            return Err(CoreError::Validation(
                "Guest flag and collection keys must differ".into(),
            ));
        }
        Ok(())
    }

    /// Format an amount for display: rounded to whole units, with the
    /// currency symbol and thousands separators (e.g., "¥1,490").
    pub fn format_amount(&self, amount: f64) -> String {
        let rounded = amount.round() as i64;
        let digits = rounded.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        let sign = if rounded < 0 { "-" } else { "" };
        format!("{sign}{}{grouped}", self.currency_symbol)
    }
}
