use async_trait::async_trait;

use crate::errors::CoreError;
use crate::models::entry::{Entry, EntryDraft, EntryPatch};
use crate::models::session::Identity;

/// The remote persistence + auth service, seen from this library.
///
/// Only the contract is fixed here; [`super::rest::RestClient`] is one
/// implementation, tests bring their own in-memory one. All failures of the
/// service itself surface as `CoreError::Service` or `CoreError::Network`.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait RemoteService: Send + Sync {
    /// Human-readable name of this service (for logs/errors).
    fn name(&self) -> &str;

    /// The signed-in caller, or `None` when nobody is signed in.
    async fn current_identity(&self) -> Result<Option<Identity>, CoreError>;

    /// All entries owned by `identity`, newest `created_at` first.
    async fn list_entries(&self, identity: &Identity) -> Result<Vec<Entry>, CoreError>;

    /// Store a new entry. The service assigns `id`, `created_at`, `updated_at`.
    async fn insert_entry(
        &self,
        identity: &Identity,
        draft: &EntryDraft,
    ) -> Result<Entry, CoreError>;

    /// Update fields of one of the caller's entries.
    /// `CoreError::NotFound` if `id` is not in the caller's collection.
    async fn update_entry(&self, id: &str, patch: &EntryPatch) -> Result<(), CoreError>;

    /// Delete one of the caller's entries.
    /// `CoreError::NotFound` if absent.
    async fn delete_entry(&self, id: &str) -> Result<(), CoreError>;

    /// Password sign-in.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, CoreError>;

    /// Register an account. The service may require out-of-band confirmation
    /// before the account can sign in.
    async fn sign_up(&self, email: &str, password: &str) -> Result<(), CoreError>;

    /// End the current remote session.
    async fn sign_out(&self) -> Result<(), CoreError>;
}
