use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entry::GUEST_OWNER_ID;

/// Which store a session's CRUD calls go to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// Neither guest nor signed in; the caller belongs at the login screen
    #[default]
    Unknown,
    /// Entries live in the local guest collection
    Guest,
    /// Entries live in the remote store, scoped to the signed-in identity
    Authenticated,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Unknown => write!(f, "Unknown"),
            Mode::Guest => write!(f, "Guest"),
            Mode::Authenticated => write!(f, "Authenticated"),
        }
    }
}

/// An authenticated account as reported by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Identity {
    pub fn new(id: Uuid, email: impl Into<String>) -> Self {
        Self {
            id,
            email: Some(email.into()),
            created_at: None,
        }
    }
}

/// The resolved operating mode for one session.
///
/// Built once at bootstrap and passed to store routing explicitly; it only
/// changes through sign-in, sign-out, and entering or leaving guest mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    mode: Mode,
    identity: Option<Identity>,
}

impl Session {
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn guest() -> Self {
        Self {
            mode: Mode::Guest,
            identity: None,
        }
    }

    pub fn authenticated(identity: Identity) -> Self {
        Self {
            mode: Mode::Authenticated,
            identity: Some(identity),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn is_guest(&self) -> bool {
        self.mode == Mode::Guest
    }

    pub fn is_authenticated(&self) -> bool {
        self.mode == Mode::Authenticated
    }

    /// Owner id stamped on entries created in this session.
    pub fn owner_id(&self) -> Option<String> {
        match self.mode {
            Mode::Guest => Some(GUEST_OWNER_ID.to_string()),
            Mode::Authenticated => self.identity.as_ref().map(|i| i.id.to_string()),
            Mode::Unknown => None,
        }
    }

    /// Name shown in the header.
    pub fn display_name(&self) -> String {
        match (&self.mode, &self.identity) {
            (Mode::Guest, _) => "ゲストユーザー".to_string(),
            (Mode::Authenticated, Some(identity)) => identity
                .email
                .clone()
                .unwrap_or_else(|| identity.id.to_string()),
            _ => String::new(),
        }
    }
}
