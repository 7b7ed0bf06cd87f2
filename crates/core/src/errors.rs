use thiserror::Error;

/// Unified error type for the entire subscription-tracker-core library.
/// Every fallible public function returns `Result<T, CoreError>`.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Client-side validation ──────────────────────────────────────
    #[error("Validation failed: {0}")]
    Validation(String),

    // ── Remote service ──────────────────────────────────────────────
    #[error("Service error ({operation}): {message}")]
    Service {
        operation: String,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Not authenticated: sign in or enter guest mode first")]
    NotAuthenticated,

    // ── Entries ─────────────────────────────────────────────────────
    #[error("Entry not found: {0}")]
    NotFound(String),

    // ── Local storage ───────────────────────────────────────────────
    #[error("Stored data could not be parsed: {0}")]
    Parse(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Local storage error: {0}")]
    Storage(String),

    #[error("Random source unavailable: {0}")]
    Random(String),
}

impl CoreError {
    /// `true` for any failure of the remote service, transport included.
    pub fn is_service_failure(&self) -> bool {
        matches!(self, CoreError::Service { .. } | CoreError::Network(_))
    }

    /// Message suitable for showing to the user.
    ///
    /// Validation messages are shown as written; everything else collapses
    /// into a generic message per failure class.
    pub fn user_message(&self) -> String {
        match self {
            CoreError::Validation(msg) => msg.clone(),
            CoreError::Service { .. } | CoreError::Network(_) => {
                "通信に失敗しました。もう一度お試しください。".to_string()
            }
            CoreError::NotAuthenticated => "ログインしてください。".to_string(),
            CoreError::NotFound(_) => "対象のサブスクが見つかりません。".to_string(),
            _ => "保存に失敗しました。".to_string(),
        }
    }
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // Strip query strings: filter values carry user and entry ids.
        let msg = e.to_string();
        let sanitized = if let Some(idx) = msg.find('?') {
            format!("{}?<query redacted>", &msg[..idx])
        } else {
            msg
        };
        CoreError::Network(sanitized)
    }
}
