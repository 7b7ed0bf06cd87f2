use chrono::{Datelike, NaiveDate};

use crate::models::entry::{Entry, MAX_BILLING_DAY, MIN_BILLING_DAY};
use crate::models::form::PricingPeriod;
use crate::models::summary::{DueStatus, Reminder};

/// Billing-date math and amount normalization.
///
/// Pure business logic: no I/O, no clock. Every date function takes the
/// reference day explicitly and compares calendar days only.
///
/// **Short months**: a billing day past the end of a month resolves to that
/// month's last day (31 → 30th in a 30-day month, 29–31 → 28th or 29th in
/// February).
pub struct BillingService;

impl BillingService {
    pub fn new() -> Self {
        Self
    }

    /// Convert a typed price to its monthly equivalent.
    /// Yearly prices are divided by 12; nothing is rounded.
    pub fn to_monthly_amount(&self, raw_amount: f64, period: PricingPeriod) -> f64 {
        match period {
            PricingPeriod::Monthly => raw_amount,
            PricingPeriod::Yearly => raw_amount / 12.0,
        }
    }

    /// Round an amount to whole currency units for display only.
    pub fn round_for_display(&self, amount: f64) -> i64 {
        amount.round() as i64
    }

    /// The next date (on or after `reference`) this billing day falls on.
    ///
    /// Takes the billing day in the reference month; if that is already
    /// behind `reference`, moves one calendar month ahead with the same day.
    /// Days outside 1–31 are pulled into range first.
    pub fn resolve_next_billing_date(&self, billing_day: u32, reference: NaiveDate) -> NaiveDate {
        let day = billing_day.clamp(MIN_BILLING_DAY, MAX_BILLING_DAY);
        let candidate = clamped_date(reference.year(), reference.month(), day);

        match candidate {
            Some(date) if date >= reference => date,
            _ => {
                let (year, month) = next_month(reference.year(), reference.month());
                clamped_date(year, month, day).unwrap_or(reference)
            }
        }
    }

    /// Whole days from `reference` to the next billing date (0 = today).
    pub fn days_until_billing(&self, billing_day: u32, reference: NaiveDate) -> i64 {
        (self.resolve_next_billing_date(billing_day, reference) - reference).num_days()
    }

    /// Whether the next billing date is today or tomorrow.
    pub fn due_status(&self, billing_day: u32, reference: NaiveDate) -> Option<DueStatus> {
        let next = self.resolve_next_billing_date(billing_day, reference);
        if next == reference {
            Some(DueStatus::Today)
        } else if reference.succ_opt() == Some(next) {
            Some(DueStatus::Tomorrow)
        } else {
            None
        }
    }

    /// `true` iff the entry bills today or tomorrow.
    pub fn is_due_soon(&self, billing_day: u32, reference: NaiveDate) -> bool {
        self.due_status(billing_day, reference).is_some()
    }

    /// Reminders for every entry billing today or tomorrow.
    /// Sorted by billing date, then name.
    pub fn upcoming_reminders(&self, entries: &[Entry], reference: NaiveDate) -> Vec<Reminder> {
        let mut reminders: Vec<Reminder> = entries
            .iter()
            .filter_map(|entry| {
                let status = self.due_status(entry.billing_day, reference)?;
                Some(Reminder {
                    entry: entry.clone(),
                    billing_date: self.resolve_next_billing_date(entry.billing_day, reference),
                    status,
                })
            })
            .collect();

        reminders.sort_by(|a, b| {
            a.billing_date
                .cmp(&b.billing_date)
                .then_with(|| a.entry.name.cmp(&b.entry.name))
                .then_with(|| a.entry.id.cmp(&b.entry.id))
        });
        reminders
    }
}

impl Default for BillingService {
    fn default() -> Self {
        Self::new()
    }
}

fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

/// Number of days in the given month.
fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = next_month(year, month);
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

/// `year-month-day`, with the day pulled back to the month's last day.
fn clamped_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day.min(days_in_month(year, month)))
}
