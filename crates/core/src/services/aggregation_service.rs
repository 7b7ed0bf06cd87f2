use std::collections::BTreeMap;

use crate::models::category::Category;
use crate::models::entry::{Entry, MAX_BILLING_DAY, MIN_BILLING_DAY};
use crate::models::summary::{DashboardSummary, DaySchedule};

/// Computes dashboard aggregates over a collection of entries.
///
/// Results do not depend on input order. Sums are taken over amounts sorted
/// by `f64::total_cmp`, so reordering the collection cannot change a single
/// bit of a total.
pub struct AggregationService;

impl AggregationService {
    pub fn new() -> Self {
        Self
    }

    /// Total monthly spend; 0 for an empty collection.
    pub fn total_monthly_spend(&self, entries: &[Entry]) -> f64 {
        stable_sum(entries.iter().map(|e| e.monthly_amount))
    }

    /// Monthly spend per category. Only categories with entries appear.
    pub fn spend_by_category(&self, entries: &[Entry]) -> BTreeMap<Category, f64> {
        let mut grouped: BTreeMap<Category, Vec<f64>> = BTreeMap::new();
        for entry in entries {
            grouped
                .entry(entry.category.clone())
                .or_default()
                .push(entry.monthly_amount);
        }

        grouped
            .into_iter()
            .map(|(category, amounts)| (category, stable_sum(amounts)))
            .collect()
    }

    /// Average monthly amount per entry; 0 when there are no entries.
    pub fn average_per_entry(&self, entries: &[Entry]) -> f64 {
        if entries.is_empty() {
            return 0.0;
        }
        self.total_monthly_spend(entries) / entries.len() as f64
    }

    /// Entries grouped by billing day for the month calendar.
    ///
    /// Days with no entries are omitted; days come out ascending.
    pub fn schedule_by_day(&self, entries: &[Entry]) -> Vec<DaySchedule> {
        let mut by_day: BTreeMap<u32, Vec<Entry>> = BTreeMap::new();
        for entry in entries {
            if (MIN_BILLING_DAY..=MAX_BILLING_DAY).contains(&entry.billing_day) {
                by_day.entry(entry.billing_day).or_default().push(entry.clone());
            }
        }

        by_day
            .into_iter()
            .map(|(day, mut day_entries)| {
                day_entries.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
                let amount = stable_sum(day_entries.iter().map(|e| e.monthly_amount));
                DaySchedule {
                    day,
                    count: day_entries.len(),
                    amount,
                    entries: day_entries,
                }
            })
            .collect()
    }

    /// Everything the dashboard shows.
    pub fn summarize(&self, entries: &[Entry]) -> DashboardSummary {
        DashboardSummary {
            total_monthly: self.total_monthly_spend(entries),
            entry_count: entries.len(),
            average_per_entry: self.average_per_entry(entries),
            by_category: self.spend_by_category(entries),
            schedule: self.schedule_by_day(entries),
        }
    }
}

impl Default for AggregationService {
    fn default() -> Self {
        Self::new()
    }
}

fn stable_sum(amounts: impl IntoIterator<Item = f64>) -> f64 {
    let mut sorted: Vec<f64> = amounts.into_iter().collect();
    sorted.sort_by(f64::total_cmp);
    sorted.into_iter().fold(0.0, |acc, amount| acc + amount)
}
