use tracing::debug;

use crate::errors::CoreError;
use crate::models::session::{Mode, Session};
use crate::remote::traits::RemoteService;
use crate::services::entry_store::{EntryStore, GuestEntryStore, RemoteEntryStore};
use crate::storage::guest_store::GuestStore;

/// Resolves a session's mode and routes CRUD calls to the matching store.
///
/// Resolution order:
/// 1. guest flag set → `Guest` (the remote service is not consulted)
/// 2. remote reports a signed-in identity → `Authenticated`
/// 3. otherwise → `Unknown`
pub struct SessionService;

impl SessionService {
    pub fn new() -> Self {
        Self
    }

    /// Resolve the session once, at bootstrap.
    pub async fn resolve(
        &self,
        guest: &GuestStore,
        remote: &dyn RemoteService,
    ) -> Result<Session, CoreError> {
        if guest.is_guest_mode() {
            debug!("Guest flag set; resolving session as guest");
            return Ok(Session::guest());
        }

        let session = match remote.current_identity().await? {
            Some(identity) => Session::authenticated(identity),
            None => Session::unknown(),
        };
        debug!("Resolved session mode {} via {}", session.mode(), remote.name());
        Ok(session)
    }

    /// The store every CRUD call of `session` goes to.
    /// `CoreError::NotAuthenticated` while the mode is `Unknown`.
    pub fn route<'a>(
        &self,
        session: &'a Session,
        guest: &'a GuestStore,
        remote: &'a dyn RemoteService,
    ) -> Result<Box<dyn EntryStore + 'a>, CoreError> {
        match session.mode() {
            Mode::Guest => Ok(Box::new(GuestEntryStore::new(guest))),
            Mode::Authenticated => {
                let identity = session.identity().ok_or(CoreError::NotAuthenticated)?;
                Ok(Box::new(RemoteEntryStore::new(remote, identity)))
            }
            Mode::Unknown => Err(CoreError::NotAuthenticated),
        }
    }
}

impl Default for SessionService {
    fn default() -> Self {
        Self::new()
    }
}
