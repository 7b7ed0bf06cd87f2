use serde::{Deserialize, Serialize};

use super::category::Category;
use super::entry::{Entry, EntryDraft, MAX_BILLING_DAY, MIN_BILLING_DAY};
use crate::errors::CoreError;
use crate::services::billing_service::BillingService;

/// Minimum password length accepted at sign-up.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// How the price typed into the entry form is expressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PricingPeriod {
    #[default]
    Monthly,
    Yearly,
}

impl std::fmt::Display for PricingPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PricingPeriod::Monthly => write!(f, "monthly"),
            PricingPeriod::Yearly => write!(f, "yearly"),
        }
    }
}

/// Raw state of the add/edit entry form.
///
/// Validation borrows the form, so a rejected submission keeps every value
/// the user typed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryForm {
    pub name: String,
    pub pricing_period: PricingPeriod,
    /// Price as typed, in `pricing_period` units
    pub amount: f64,
    pub billing_day: u32,
    /// `None` until the user picks one
    pub category: Option<Category>,
    pub memo: String,
}

impl EntryForm {
    /// A blank form for adding a new entry.
    pub fn new_entry() -> Self {
        Self::default()
    }

    /// Prefill the form for editing.
    ///
    /// Entries only store the monthly figure, so the form always opens in
    /// monthly mode showing that figure.
    pub fn from_entry(entry: &Entry) -> Self {
        Self {
            name: entry.name.clone(),
            pricing_period: PricingPeriod::Monthly,
            amount: entry.monthly_amount,
            billing_day: entry.billing_day,
            category: Some(entry.category.clone()),
            memo: entry.memo.clone().unwrap_or_default(),
        }
    }

    /// Rounded monthly equivalent shown under a yearly price.
    /// `None` in monthly mode or while the amount is unusable.
    pub fn monthly_preview(&self) -> Option<i64> {
        if self.pricing_period != PricingPeriod::Yearly || !self.amount.is_finite() {
            return None;
        }
        let billing = BillingService::new();
        let monthly = billing.to_monthly_amount(self.amount, self.pricing_period);
        Some(billing.round_for_display(monthly))
    }

    /// Validate the form and normalize it into a draft.
    ///
    /// Rules:
    /// - name is required (after trimming)
    /// - amount must be finite and non-negative
    /// - billing day must be within 1–31
    /// - a category must be selected
    ///
    /// The stored amount is always monthly; an empty memo becomes `None`.
    pub fn to_draft(&self) -> Result<EntryDraft, CoreError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(CoreError::Validation("サービス名を入力してください".into()));
        }
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(CoreError::Validation(format!(
                "料金は0以上の数値で入力してください (got {})",
                self.amount
            )));
        }
        if !(MIN_BILLING_DAY..=MAX_BILLING_DAY).contains(&self.billing_day) {
            return Err(CoreError::Validation(format!(
                "請求日は{MIN_BILLING_DAY}〜{MAX_BILLING_DAY}日で選択してください (got {})",
                self.billing_day
            )));
        }
        let category = self
            .category
            .clone()
            .ok_or_else(|| CoreError::Validation("カテゴリを選択してください".into()))?;

        let monthly_amount =
            BillingService::new().to_monthly_amount(self.amount, self.pricing_period);
        let memo = self.memo.trim();

        Ok(EntryDraft {
            name: name.to_string(),
            monthly_amount,
            billing_day: self.billing_day,
            category,
            memo: (!memo.is_empty()).then(|| memo.to_string()),
        })
    }
}

/// Email/password sign-in form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

impl SignInForm {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        require_email(&self.email)?;
        if self.password.is_empty() {
            return Err(CoreError::Validation("パスワードを入力してください".into()));
        }
        Ok(())
    }
}

/// Account registration form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignUpForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignUpForm {
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        confirm_password: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            confirm_password: confirm_password.into(),
        }
    }

    /// Mismatch is reported before length, matching the order users see.
    pub fn validate(&self) -> Result<(), CoreError> {
        require_email(&self.email)?;
        if self.password != self.confirm_password {
            return Err(CoreError::Validation("パスワードが一致しません".into()));
        }
        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(CoreError::Validation(format!(
                "パスワードは{MIN_PASSWORD_LENGTH}文字以上で入力してください"
            )));
        }
        Ok(())
    }
}

fn require_email(email: &str) -> Result<(), CoreError> {
    if email.trim().is_empty() {
        return Err(CoreError::Validation("メールアドレスを入力してください".into()));
    }
    Ok(())
}
