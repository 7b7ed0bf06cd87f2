use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use tracing::{debug, info, warn};

use super::traits::RemoteService;
use crate::errors::CoreError;
use crate::models::entry::{Entry, EntryDraft, EntryPatch};
use crate::models::session::Identity;
use crate::models::settings::Settings;

const DEFAULT_TABLE: &str = "subscriptions";

/// Client for a PostgREST + GoTrue style backend (e.g., Supabase).
///
/// - **Auth**: `/auth/v1/token`, `/auth/v1/signup`, `/auth/v1/logout`, `/auth/v1/user`
/// - **Entries**: `/rest/v1/{table}`, filtered by owner and id
/// - **Keys**: every request carries the public `apikey`; entry and session
///   requests also carry the signed-in user's bearer token.
///
/// The access token lives only in this process; nothing is persisted.
/// No request timeout is set here; the backend's own limits apply.
pub struct RestClient {
    client: Client,
    base_url: String,
    api_key: String,
    table: String,
    auth: RwLock<Option<AuthState>>,
}

#[derive(Clone)]
struct AuthState {
    access_token: String,
    identity: Identity,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url)
            .field("table", &self.table)
            .field("signed_in", &self.is_signed_in())
            .finish()
    }
}

impl RestClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            table: DEFAULT_TABLE.to_string(),
            auth: RwLock::new(None),
        }
    }

    /// Build a client from settings; fails when no remote is configured.
    pub fn from_settings(settings: &Settings) -> Result<Self, CoreError> {
        settings.validate()?;
        if !settings.has_remote() {
            return Err(CoreError::Validation(
                "Remote URL and API key are required for the remote store".into(),
            ));
        }
        Ok(Self::new(settings.remote_url.clone(), settings.api_key.clone())
            .with_table(settings.table.clone()))
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// URL of an auth endpoint, e.g. `auth_url("signup")`.
    pub fn auth_url(&self, endpoint: &str) -> String {
        format!("{}/auth/v1/{endpoint}", self.base_url)
    }

    /// URL of the entries table.
    pub fn entries_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    pub fn is_signed_in(&self) -> bool {
        self.auth.read().map(|a| a.is_some()).unwrap_or(false)
    }

    fn access_token(&self) -> Option<String> {
        self.auth
            .read()
            .ok()
            .and_then(|a| a.as_ref().map(|s| s.access_token.clone()))
    }

    fn require_token(&self, operation: &str) -> Result<String, CoreError> {
        self.access_token().ok_or_else(|| CoreError::Service {
            operation: operation.to_string(),
            message: "No signed-in session".into(),
        })
    }

    fn set_auth(&self, state: Option<AuthState>) {
        match self.auth.write() {
            Ok(mut guard) => *guard = state,
            Err(_) => warn!("Auth state lock poisoned; session not updated"),
        }
    }

    fn public_request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("apikey", &self.api_key)
    }

    fn authorized_request(&self, builder: RequestBuilder, token: &str) -> RequestBuilder {
        self.public_request(builder).bearer_auth(token)
    }
}

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    user: Identity,
}

#[derive(Serialize)]
struct NewEntryRow<'a> {
    user_id: String,
    #[serde(flatten)]
    draft: &'a EntryDraft,
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Turn a non-2xx response into `CoreError::Service`, keeping the server's
/// own message when it sent one.
async fn ensure_success(resp: Response, operation: &str) -> Result<Response, CoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let parsed: ErrorBody = serde_json::from_str(&body).unwrap_or_default();
    let detail = parsed
        .message
        .or(parsed.msg)
        .or(parsed.error_description)
        .unwrap_or_else(|| body.chars().take(200).collect());
    Err(CoreError::Service {
        operation: operation.to_string(),
        message: format!("HTTP {status}: {detail}"),
    })
}

async fn parse_json<T: serde::de::DeserializeOwned>(
    resp: Response,
    operation: &str,
) -> Result<T, CoreError> {
    resp.json().await.map_err(|e| CoreError::Service {
        operation: operation.to_string(),
        message: format!("Failed to parse response: {e}"),
    })
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl RemoteService for RestClient {
    fn name(&self) -> &str {
        "RestClient"
    }

    async fn current_identity(&self) -> Result<Option<Identity>, CoreError> {
        let Some(token) = self.access_token() else {
            return Ok(None);
        };

        let resp = self
            .authorized_request(self.client.get(self.auth_url("user")), &token)
            .send()
            .await?;

        if matches!(resp.status(), StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            debug!("Stored access token rejected; treating caller as signed out");
            self.set_auth(None);
            return Ok(None);
        }

        let resp = ensure_success(resp, "current_identity").await?;
        let identity: Identity = parse_json(resp, "current_identity").await?;
        self.set_auth(Some(AuthState {
            access_token: token,
            identity: identity.clone(),
        }));
        Ok(Some(identity))
    }

    async fn list_entries(&self, identity: &Identity) -> Result<Vec<Entry>, CoreError> {
        let token = self.require_token("list_entries")?;
        let owner_filter = format!("eq.{}", identity.id);

        let resp = self
            .authorized_request(self.client.get(self.entries_url()), &token)
            .query(&[
                ("select", "*"),
                ("user_id", owner_filter.as_str()),
                ("order", "created_at.desc"),
            ])
            .send()
            .await?;

        let resp = ensure_success(resp, "list_entries").await?;
        let entries: Vec<Entry> = parse_json(resp, "list_entries").await?;
        debug!("Listed {} remote entries", entries.len());
        Ok(entries)
    }

    async fn insert_entry(
        &self,
        identity: &Identity,
        draft: &EntryDraft,
    ) -> Result<Entry, CoreError> {
        let token = self.require_token("insert_entry")?;
        let row = NewEntryRow {
            user_id: identity.id.to_string(),
            draft,
        };

        let resp = self
            .authorized_request(self.client.post(self.entries_url()), &token)
            .header("Prefer", "return=representation")
            .json(&[row])
            .send()
            .await?;

        let resp = ensure_success(resp, "insert_entry").await?;
        let mut created: Vec<Entry> = parse_json(resp, "insert_entry").await?;
        if created.is_empty() {
            return Err(CoreError::Service {
                operation: "insert_entry".into(),
                message: "Service returned no inserted row".into(),
            });
        }
        Ok(created.swap_remove(0))
    }

    async fn update_entry(&self, id: &str, patch: &EntryPatch) -> Result<(), CoreError> {
        let token = self.require_token("update_entry")?;
        let id_filter = format!("eq.{id}");

        let resp = self
            .authorized_request(self.client.patch(self.entries_url()), &token)
            .query(&[("id", id_filter.as_str())])
            .header("Prefer", "return=representation")
            .json(patch)
            .send()
            .await?;

        let resp = ensure_success(resp, "update_entry").await?;
        // Row-level security hides other owners' rows, so "not mine" and
        // "does not exist" both come back as zero affected rows.
        let updated: Vec<Entry> = parse_json(resp, "update_entry").await?;
        if updated.is_empty() {
            return Err(CoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn delete_entry(&self, id: &str) -> Result<(), CoreError> {
        let token = self.require_token("delete_entry")?;
        let id_filter = format!("eq.{id}");

        let resp = self
            .authorized_request(self.client.delete(self.entries_url()), &token)
            .query(&[("id", id_filter.as_str())])
            .header("Prefer", "return=representation")
            .send()
            .await?;

        let resp = ensure_success(resp, "delete_entry").await?;
        let deleted: Vec<Entry> = parse_json(resp, "delete_entry").await?;
        if deleted.is_empty() {
            return Err(CoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, CoreError> {
        let resp = self
            .public_request(self.client.post(self.auth_url("token")))
            .query(&[("grant_type", "password")])
            .json(&Credentials { email, password })
            .send()
            .await?;

        let resp = ensure_success(resp, "sign_in").await?;
        let token: TokenResponse = parse_json(resp, "sign_in").await?;
        let identity = token.user.clone();
        self.set_auth(Some(AuthState {
            access_token: token.access_token,
            identity: token.user,
        }));
        info!("Signed in as {}", identity.id);
        Ok(identity)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<(), CoreError> {
        let resp = self
            .public_request(self.client.post(self.auth_url("signup")))
            .json(&Credentials { email, password })
            .send()
            .await?;

        ensure_success(resp, "sign_up").await?;
        info!("Registered a new account");
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), CoreError> {
        let Some(token) = self.access_token() else {
            return Ok(());
        };
        // The local session ends even if the server call fails.
        let signed_out = self.auth.read().ok().and_then(|a| a.as_ref().map(|s| s.identity.id));
        self.set_auth(None);

        let resp = self
            .authorized_request(self.client.post(self.auth_url("logout")), &token)
            .send()
            .await?;
        ensure_success(resp, "sign_out").await?;
        if let Some(id) = signed_out {
            info!("Signed out {id}");
        }
        Ok(())
    }
}
