use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::category::Category;
use crate::errors::CoreError;

/// Owner id stamped on every entry in the local guest collection.
pub const GUEST_OWNER_ID: &str = "guest";

/// Lowest accepted billing day.
pub const MIN_BILLING_DAY: u32 = 1;

/// Highest accepted billing day. Not checked against the length of any month.
pub const MAX_BILLING_DAY: u32 = 31;

/// A single tracked subscription.
///
/// Field names on the wire (`user_id`, `amount`, `billing_date`) match the
/// remote table and the guest collection already stored by existing clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Opaque identifier: server-assigned, or `guest-<millis>-<suffix>` locally
    pub id: String,

    /// Owning identity id, or [`GUEST_OWNER_ID`]
    #[serde(rename = "user_id")]
    pub owner_id: String,

    /// Service name shown in lists (never empty)
    pub name: String,

    /// Cost per month. Yearly prices are divided by 12 before they get here.
    #[serde(rename = "amount")]
    pub monthly_amount: f64,

    /// Day of month the service bills on, 1–31
    #[serde(rename = "billing_date")]
    pub billing_day: u32,

    pub category: Category,

    /// Optional free-text memo
    #[serde(default)]
    pub memo: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Entry {
    /// Build an entry from a validated draft.
    pub fn from_draft(
        id: impl Into<String>,
        owner_id: impl Into<String>,
        draft: EntryDraft,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            name: draft.name,
            monthly_amount: draft.monthly_amount,
            billing_day: draft.billing_day,
            category: draft.category,
            memo: draft.memo,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check the record invariants: non-empty name, finite non-negative
    /// amount, billing day 1–31, `updated_at >= created_at`.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.id.is_empty() {
            return Err(CoreError::Validation("Entry id must not be empty".into()));
        }
        check_fields(
            &format!("Entry {}", self.id),
            Some(&self.name),
            Some(self.monthly_amount),
            Some(self.billing_day),
        )?;
        if self.updated_at < self.created_at {
            return Err(CoreError::Validation(format!(
                "Entry {} was updated before it was created",
                self.id
            )));
        }
        Ok(())
    }

    pub fn is_guest(&self) -> bool {
        self.owner_id == GUEST_OWNER_ID
    }

    /// Apply a patch and refresh `updated_at`.
    ///
    /// `updated_at` never moves before `created_at`, even with a skewed clock.
    pub fn apply(&mut self, patch: &EntryPatch, now: DateTime<Utc>) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(amount) = patch.monthly_amount {
            self.monthly_amount = amount;
        }
        if let Some(day) = patch.billing_day {
            self.billing_day = day;
        }
        if let Some(category) = &patch.category {
            self.category = category.clone();
        }
        if let Some(memo) = &patch.memo {
            self.memo = memo.clone();
        }
        self.updated_at = now.max(self.created_at);
    }

    /// Confirmation prompt shown before deleting this entry.
    pub fn delete_prompt(&self) -> String {
        format!("{}を削除しますか？", self.name)
    }
}

/// An entry as produced by the entry form: no id, owner, or timestamps yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryDraft {
    pub name: String,

    #[serde(rename = "amount")]
    pub monthly_amount: f64,

    #[serde(rename = "billing_date")]
    pub billing_day: u32,

    pub category: Category,

    #[serde(default)]
    pub memo: Option<String>,
}

impl EntryDraft {
    /// Same field rules as [`Entry::validate`].
    pub fn validate(&self) -> Result<(), CoreError> {
        check_fields(
            "New entry",
            Some(&self.name),
            Some(self.monthly_amount),
            Some(self.billing_day),
        )
    }
}

/// Partial update of an entry. `None` leaves a field unchanged.
///
/// `memo` is doubly optional: `Some(None)` clears the memo.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EntryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "amount", skip_serializing_if = "Option::is_none")]
    pub monthly_amount: Option<f64>,

    #[serde(rename = "billing_date", skip_serializing_if = "Option::is_none")]
    pub billing_day: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<Option<String>>,
}

impl EntryPatch {
    /// Check the fields this patch sets; absent fields are not checked.
    pub fn validate(&self) -> Result<(), CoreError> {
        check_fields(
            "Patch",
            self.name.as_deref(),
            self.monthly_amount,
            self.billing_day,
        )
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.monthly_amount.is_none()
            && self.billing_day.is_none()
            && self.category.is_none()
            && self.memo.is_none()
    }
}

impl From<EntryDraft> for EntryPatch {
    fn from(draft: EntryDraft) -> Self {
        Self {
            name: Some(draft.name),
            monthly_amount: Some(draft.monthly_amount),
            billing_day: Some(draft.billing_day),
            category: Some(draft.category),
            memo: Some(draft.memo),
        }
    }
}

fn check_fields(
    subject: &str,
    name: Option<&str>,
    amount: Option<f64>,
    billing_day: Option<u32>,
) -> Result<(), CoreError> {
    if name.is_some_and(|n| n.trim().is_empty()) {
        return Err(CoreError::Validation(format!("{subject} has an empty name")));
    }
    if let Some(amount) = amount {
        if !amount.is_finite() || amount < 0.0 {
            return Err(CoreError::Validation(format!(
                "{subject} has invalid amount {amount}"
            )));
        }
    }
    if let Some(day) = billing_day {
        if !(MIN_BILLING_DAY..=MAX_BILLING_DAY).contains(&day) {
            return Err(CoreError::Validation(format!(
                "{subject} has billing day {day} outside {MIN_BILLING_DAY}..={MAX_BILLING_DAY}"
            )));
        }
    }
    Ok(())
}
