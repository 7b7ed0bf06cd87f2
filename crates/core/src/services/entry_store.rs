use async_trait::async_trait;
use chrono::Utc;

use crate::errors::CoreError;
use crate::models::entry::{Entry, EntryDraft, EntryPatch};
use crate::models::session::{Identity, Mode};
use crate::remote::traits::RemoteService;
use crate::storage::guest_store::GuestStore;

/// The CRUD capability every caller works against, whichever medium backs it.
///
/// Two variants exist: [`GuestEntryStore`] over the local guest collection and
/// [`RemoteEntryStore`] over the remote service. Pick one with
/// `SessionService::route`.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait EntryStore: Send + Sync {
    /// The mode this store serves.
    fn mode(&self) -> Mode;

    /// Every entry of the collection.
    async fn list(&self) -> Result<Vec<Entry>, CoreError>;

    /// Store a new entry and return it with id and timestamps assigned.
    /// Drafts breaking the record rules fail with `CoreError::Validation`.
    async fn insert(&self, draft: EntryDraft) -> Result<Entry, CoreError>;

    /// Update an entry; `CoreError::NotFound` for an unknown id,
    /// `CoreError::Validation` when the result would break the record rules.
    async fn update(&self, id: &str, patch: &EntryPatch) -> Result<(), CoreError>;

    /// Delete an entry; `CoreError::NotFound` for an unknown id.
    async fn delete(&self, id: &str) -> Result<(), CoreError>;
}

/// Entries in the local guest collection. Listed in stored (insertion) order.
pub struct GuestEntryStore<'a> {
    store: &'a GuestStore,
}

impl<'a> GuestEntryStore<'a> {
    pub fn new(store: &'a GuestStore) -> Self {
        Self { store }
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl EntryStore for GuestEntryStore<'_> {
    fn mode(&self) -> Mode {
        Mode::Guest
    }

    async fn list(&self) -> Result<Vec<Entry>, CoreError> {
        self.store.read_collection()
    }

    async fn insert(&self, draft: EntryDraft) -> Result<Entry, CoreError> {
        self.store.insert_entry(draft, Utc::now())
    }

    async fn update(&self, id: &str, patch: &EntryPatch) -> Result<(), CoreError> {
        self.store.update_entry(id, patch, Utc::now()).map(|_| ())
    }

    async fn delete(&self, id: &str) -> Result<(), CoreError> {
        self.store.delete_entry(id)
    }
}

/// Entries owned by one identity in the remote store. Listed newest first.
pub struct RemoteEntryStore<'a> {
    service: &'a dyn RemoteService,
    identity: &'a Identity,
}

impl<'a> RemoteEntryStore<'a> {
    pub fn new(service: &'a dyn RemoteService, identity: &'a Identity) -> Self {
        Self { service, identity }
    }

    pub fn identity(&self) -> &Identity {
        self.identity
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl EntryStore for RemoteEntryStore<'_> {
    fn mode(&self) -> Mode {
        Mode::Authenticated
    }

    async fn list(&self) -> Result<Vec<Entry>, CoreError> {
        self.service.list_entries(self.identity).await
    }

    async fn insert(&self, draft: EntryDraft) -> Result<Entry, CoreError> {
        draft.validate()?;
        self.service.insert_entry(self.identity, &draft).await
    }

    async fn update(&self, id: &str, patch: &EntryPatch) -> Result<(), CoreError> {
        patch.validate()?;
        self.service.update_entry(id, patch).await
    }

    async fn delete(&self, id: &str) -> Result<(), CoreError> {
        self.service.delete_entry(id).await
    }
}
