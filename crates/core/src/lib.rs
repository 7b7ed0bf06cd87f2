pub mod errors;
pub mod models;
pub mod remote;
pub mod services;
pub mod storage;

use chrono::{NaiveDate, Utc};
use models::{
    entry::{Entry, EntryPatch},
    form::{EntryForm, SignInForm, SignUpForm},
    session::{Identity, Mode, Session},
    settings::Settings,
    summary::{DashboardSummary, Reminder},
};
use remote::{rest::RestClient, traits::RemoteService};
use services::{
    aggregation_service::AggregationService, billing_service::BillingService,
    entry_store::EntryStore, session_service::SessionService,
};
use storage::{guest_store::GuestStore, medium::KeyValueMedium};
use tracing::{info, warn};

use errors::CoreError;

/// Main entry point for the Subscription Tracker core library.
///
/// Holds the resolved session, both stores, and the most recently listed
/// collection. Every CRUD call goes to whichever store the session routes to.
#[must_use]
pub struct SubscriptionTracker {
    guest: GuestStore,
    remote: Box<dyn RemoteService>,
    session: Session,
    entries: Vec<Entry>,
    session_service: SessionService,
    billing_service: BillingService,
    aggregation_service: AggregationService,
}

impl std::fmt::Debug for SubscriptionTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionTracker")
            .field("mode", &self.session.mode())
            .field("entries", &self.entries.len())
            .field("remote", &self.remote.name())
            .finish()
    }
}

impl SubscriptionTracker {
    /// Resolve the session and load its collection.
    ///
    /// In `Mode::Unknown` the collection stays empty and the caller should
    /// show the login screen.
    pub async fn bootstrap(
        guest: GuestStore,
        remote: Box<dyn RemoteService>,
    ) -> Result<Self, CoreError> {
        let session_service = SessionService::new();
        let session = session_service.resolve(&guest, remote.as_ref()).await?;

        let mut tracker = Self {
            guest,
            remote,
            session,
            entries: Vec::new(),
            session_service,
            billing_service: BillingService::new(),
            aggregation_service: AggregationService::new(),
        };
        if tracker.session.mode() != Mode::Unknown {
            tracker.refresh().await?;
        }
        info!("Session bootstrapped in {} mode", tracker.session.mode());
        Ok(tracker)
    }

    /// Bootstrap against the REST backend named in `settings`.
    pub async fn from_settings(
        settings: &Settings,
        medium: Option<Box<dyn KeyValueMedium>>,
    ) -> Result<Self, CoreError> {
        let remote = RestClient::from_settings(settings)?;
        let guest = GuestStore::with_settings(medium, settings);
        Self::bootstrap(guest, Box::new(remote)).await
    }

    // ── Session ─────────────────────────────────────────────────────

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.session.mode()
    }

    /// Start a guest session. The guest collection is seeded on first read.
    pub async fn enter_guest_mode(&mut self) -> Result<(), CoreError> {
        self.guest.enter_guest_mode()?;
        self.session = Session::guest();
        self.refresh().await?;
        Ok(())
    }

    /// End the guest session. Guest data is deleted, not kept for later.
    pub async fn exit_guest_mode(&mut self) -> Result<(), CoreError> {
        self.guest.exit_guest_mode()?;
        self.reset_session();
        Ok(())
    }

    /// Sign in with email and password, then load that account's entries.
    ///
    /// Not available while in guest mode: the guest flag would win again at
    /// the next bootstrap.
    pub async fn sign_in(&mut self, form: &SignInForm) -> Result<Identity, CoreError> {
        form.validate()?;
        if self.session.is_guest() {
            return Err(CoreError::Validation(
                "ゲストモードを終了してからログインしてください".into(),
            ));
        }

        let identity = self
            .remote
            .sign_in(form.email.trim(), &form.password)
            .await?;
        self.session = Session::authenticated(identity.clone());
        self.refresh().await?;
        Ok(identity)
    }

    /// Register an account. Does not sign in; the service may require
    /// confirming the address first.
    pub async fn sign_up(&self, form: &SignUpForm) -> Result<(), CoreError> {
        form.validate()?;
        self.remote.sign_up(form.email.trim(), &form.password).await
    }

    /// Leave the current session, whichever mode it is in.
    ///
    /// The local session is reset even when the remote sign-out call fails;
    /// that failure is still returned.
    pub async fn sign_out(&mut self) -> Result<(), CoreError> {
        match self.session.mode() {
            Mode::Guest => self.exit_guest_mode().await,
            Mode::Authenticated => {
                let result = self.remote.sign_out().await;
                self.reset_session();
                if let Err(e) = &result {
                    warn!("Remote sign-out failed: {e}");
                }
                result
            }
            Mode::Unknown => Ok(()),
        }
    }

    fn reset_session(&mut self) {
        self.session = Session::unknown();
        self.entries.clear();
    }

    // ── Entries ─────────────────────────────────────────────────────

    /// The store this session's CRUD calls go to.
    pub fn store(&self) -> Result<Box<dyn EntryStore + '_>, CoreError> {
        self.session_service
            .route(&self.session, &self.guest, self.remote.as_ref())
    }

    /// Re-list the collection from the session's store.
    pub async fn refresh(&mut self) -> Result<&[Entry], CoreError> {
        let entries = self.store()?.list().await?;
        self.entries = entries;
        Ok(&self.entries)
    }

    /// The most recently listed collection.
    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    #[must_use]
    pub fn get_entry(&self, id: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id == id)
    }

    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Prefilled form for editing an entry.
    #[must_use]
    pub fn edit_form(&self, id: &str) -> Option<EntryForm> {
        self.get_entry(id).map(EntryForm::from_entry)
    }

    /// Validate the add-entry form and store the new entry.
    /// On a validation failure nothing is sent and the form is untouched.
    ///
    /// Once the store accepts the entry this returns `Ok`, even if re-listing
    /// the collection afterwards fails; the cached list then gains the entry
    /// locally.
    pub async fn add_entry(&mut self, form: &EntryForm) -> Result<Entry, CoreError> {
        let draft = form.to_draft()?;
        let entry = self.store()?.insert(draft).await?;
        if let Err(e) = self.refresh().await {
            warn!("Entry {} stored but the collection could not be re-listed: {e}", entry.id);
            self.entries.push(entry.clone());
        }
        Ok(entry)
    }

    /// Validate the edit form and apply it to the entry with `id`.
    ///
    /// Like [`Self::add_entry`], a committed update returns `Ok` even when
    /// the re-list fails; the cached entry is patched locally instead.
    pub async fn edit_entry(&mut self, id: &str, form: &EntryForm) -> Result<(), CoreError> {
        let patch: EntryPatch = form.to_draft()?.into();
        self.store()?.update(id, &patch).await?;
        if let Err(e) = self.refresh().await {
            warn!("Entry {id} updated but the collection could not be re-listed: {e}");
            if let Some(cached) = self.entries.iter_mut().find(|e| e.id == id) {
                cached.apply(&patch, Utc::now());
            }
        }
        Ok(())
    }

    /// Delete an entry after asking `confirm`.
    ///
    /// Returns `Ok(false)` when the confirmation is declined; the collection
    /// is then left exactly as it was.
    pub async fn delete_entry<F>(&mut self, id: &str, confirm: F) -> Result<bool, CoreError>
    where
        F: FnOnce(&Entry) -> bool,
    {
        let entry = self
            .get_entry(id)
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;
        if !confirm(entry) {
            return Ok(false);
        }

        self.store()?.delete(id).await?;
        if let Err(e) = self.refresh().await {
            warn!("Entry {id} deleted but the collection could not be re-listed: {e}");
            self.entries.retain(|e| e.id != id);
        }
        Ok(true)
    }

    // ── Dashboard ───────────────────────────────────────────────────

    /// Totals, category breakdown, and billing calendar of the collection.
    #[must_use]
    pub fn dashboard(&self) -> DashboardSummary {
        self.aggregation_service.summarize(&self.entries)
    }

    /// Entries billing on `today` or the day after.
    #[must_use]
    pub fn reminders(&self, today: NaiveDate) -> Vec<Reminder> {
        self.billing_service.upcoming_reminders(&self.entries, today)
    }

    /// [`Self::reminders`] for the local calendar day.
    #[must_use]
    pub fn reminders_for_today(&self) -> Vec<Reminder> {
        self.reminders(chrono::Local::now().date_naive())
    }

    /// Next billing date of an entry, relative to `today`.
    #[must_use]
    pub fn next_billing_date(&self, id: &str, today: NaiveDate) -> Option<NaiveDate> {
        self.get_entry(id).map(|e| {
            self.billing_service
                .resolve_next_billing_date(e.billing_day, today)
        })
    }
}
