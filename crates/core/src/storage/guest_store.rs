use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::errors::CoreError;
use crate::models::entry::{Entry, EntryDraft, EntryPatch, GUEST_OWNER_ID};
use crate::models::settings::Settings;

use super::medium::KeyValueMedium;
use super::seed::default_guest_entries;

/// Value the guest flag holds while guest mode is on.
const FLAG_ON: &str = "true";

/// Characters used for the random suffix of local ids.
const ID_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Length of the random suffix of local ids.
const ID_SUFFIX_LEN: usize = 9;

/// Guest-mode persistence over a local key-value medium.
///
/// Two keys are used: the guest-mode flag and the JSON-serialized guest
/// collection. Without a medium (non-interactive context) guest mode reads
/// as off, the collection reads as the default seed, and writes are dropped.
pub struct GuestStore {
    medium: Option<Box<dyn KeyValueMedium>>,
    flag_key: String,
    collection_key: String,
}

impl std::fmt::Debug for GuestStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuestStore")
            .field("has_medium", &self.medium.is_some())
            .field("flag_key", &self.flag_key)
            .field("collection_key", &self.collection_key)
            .finish()
    }
}

impl GuestStore {
    /// Guest store over `medium`, using the default key names.
    pub fn new(medium: impl KeyValueMedium + 'static) -> Self {
        Self::with_settings(Some(Box::new(medium)), &Settings::default())
    }

    /// Guest store with key names taken from `settings`.
    pub fn with_settings(medium: Option<Box<dyn KeyValueMedium>>, settings: &Settings) -> Self {
        Self {
            medium,
            flag_key: settings.guest_flag_key.clone(),
            collection_key: settings.guest_collection_key.clone(),
        }
    }

    /// Guest store with no medium behind it.
    pub fn detached() -> Self {
        Self::with_settings(None, &Settings::default())
    }

    pub fn has_medium(&self) -> bool {
        self.medium.is_some()
    }

    // ── Mode flag ───────────────────────────────────────────────────

    /// `true` iff the flag key is present and set.
    /// An unreadable medium counts as "not guest".
    pub fn is_guest_mode(&self) -> bool {
        let Some(medium) = &self.medium else {
            return false;
        };
        match medium.get(&self.flag_key) {
            Ok(value) => value.as_deref() == Some(FLAG_ON),
            Err(e) => {
                warn!("Could not read guest flag '{}': {e}", self.flag_key);
                false
            }
        }
    }

    /// Turn guest mode on. Seeding happens lazily on the first read.
    pub fn enter_guest_mode(&self) -> Result<(), CoreError> {
        let medium = self
            .medium
            .as_ref()
            .ok_or_else(|| CoreError::Storage("No local storage available for guest mode".into()))?;
        medium.set(&self.flag_key, FLAG_ON)?;
        info!("Entered guest mode");
        Ok(())
    }

    /// Turn guest mode off and delete the guest collection with it.
    pub fn exit_guest_mode(&self) -> Result<(), CoreError> {
        if let Some(medium) = &self.medium {
            medium.remove(&self.flag_key)?;
            medium.remove(&self.collection_key)?;
            info!("Exited guest mode; guest collection cleared");
        }
        Ok(())
    }

    // ── Collection ──────────────────────────────────────────────────

    /// Read the guest collection.
    ///
    /// - Key absent: the default seed is written and returned.
    /// - Stored value unreadable: the default seed is returned and the stored
    ///   value is left untouched.
    /// - Otherwise the stored collection is returned as is.
    pub fn read_collection(&self) -> Result<Vec<Entry>, CoreError> {
        let Some(medium) = &self.medium else {
            return Ok(default_guest_entries());
        };

        match medium.get(&self.collection_key)? {
            None => {
                let seed = default_guest_entries();
                debug!("Seeding guest collection with {} entries", seed.len());
                self.write_collection(&seed)?;
                Ok(seed)
            }
            Some(raw) => match parse_collection(&raw) {
                Ok(entries) => Ok(entries),
                Err(e) => {
                    warn!("Guest collection unreadable, using default seed: {e}");
                    Ok(default_guest_entries())
                }
            },
        }
    }

    /// Overwrite the stored guest collection.
    ///
    /// Every entry must pass [`Entry::validate`]; otherwise nothing is written
    /// and `CoreError::Validation` is returned.
    pub fn write_collection(&self, entries: &[Entry]) -> Result<(), CoreError> {
        for entry in entries {
            entry.validate()?;
        }
        let Some(medium) = &self.medium else {
            return Ok(());
        };
        let json = serde_json::to_string(entries).map_err(|e| {
            CoreError::Serialization(format!("Failed to serialize guest collection: {e}"))
        })?;
        medium.set(&self.collection_key, &json)?;
        debug!("Wrote {} guest entries", entries.len());
        Ok(())
    }

    // ── Entry operations ────────────────────────────────────────────

    /// Append a new entry built from `draft`. Returns the stored entry.
    pub fn insert_entry(&self, draft: EntryDraft, now: DateTime<Utc>) -> Result<Entry, CoreError> {
        let entry = Entry::from_draft(generate_local_id()?, GUEST_OWNER_ID, draft, now);
        entry.validate()?;
        let mut entries = self.read_collection()?;
        entries.push(entry.clone());
        self.write_collection(&entries)?;
        Ok(entry)
    }

    /// Apply `patch` to the entry with `id`. Returns the updated entry.
    /// A patch that would leave the entry invalid is rejected unwritten.
    pub fn update_entry(
        &self,
        id: &str,
        patch: &EntryPatch,
        now: DateTime<Utc>,
    ) -> Result<Entry, CoreError> {
        let mut entries = self.read_collection()?;
        let slot = entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;
        let mut updated = slot.clone();
        updated.apply(patch, now);
        updated.validate()?;
        *slot = updated.clone();
        self.write_collection(&entries)?;
        Ok(updated)
    }

    /// Remove the entry with `id`.
    pub fn delete_entry(&self, id: &str) -> Result<(), CoreError> {
        let mut entries = self.read_collection()?;
        let before = entries.len();
        entries.retain(|e| e.id != id);
        if entries.len() == before {
            return Err(CoreError::NotFound(id.to_string()));
        }
        self.write_collection(&entries)
    }
}

/// Parse a stored collection; any entry breaking the record invariants makes
/// the whole payload invalid.
fn parse_collection(raw: &str) -> Result<Vec<Entry>, CoreError> {
    let entries: Vec<Entry> =
        serde_json::from_str(raw).map_err(|e| CoreError::Parse(e.to_string()))?;
    for entry in &entries {
        entry
            .validate()
            .map_err(|e| CoreError::Parse(e.to_string()))?;
    }
    Ok(entries)
}

/// New local entry id: `guest-<unix millis>-<9 random base36 chars>`.
///
/// Collisions are improbable, not impossible.
pub fn generate_local_id() -> Result<String, CoreError> {
    let mut bytes = [0u8; ID_SUFFIX_LEN];
    getrandom::getrandom(&mut bytes)
        .map_err(|e| CoreError::Random(format!("Failed to generate id suffix: {e}")))?;
    let suffix: String = bytes
        .iter()
        .map(|b| ID_ALPHABET[(*b as usize) % ID_ALPHABET.len()] as char)
        .collect();
    Ok(format!("guest-{}-{suffix}", Utc::now().timestamp_millis()))
}
