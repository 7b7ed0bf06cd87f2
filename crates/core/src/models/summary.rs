use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::category::Category;
use super::entry::Entry;

/// Dashboard figures for a collection of entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    /// Sum of all monthly amounts
    pub total_monthly: f64,

    /// Number of entries
    pub entry_count: usize,

    /// total_monthly / entry_count, or 0 with no entries
    pub average_per_entry: f64,

    /// Monthly spend per category; categories without entries are absent
    pub by_category: BTreeMap<Category, f64>,

    /// Billing days of the month that have at least one entry, ascending
    pub schedule: Vec<DaySchedule>,
}

/// Everything billed on one day of the month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySchedule {
    /// Day of month, 1–31
    pub day: u32,

    /// Entries billed on this day, ordered by name then id
    pub entries: Vec<Entry>,

    pub count: usize,

    /// Sum of the entries' monthly amounts
    pub amount: f64,
}

/// How close a reminder's billing date is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DueStatus {
    Today,
    Tomorrow,
}

impl DueStatus {
    pub fn label(&self) -> &'static str {
        match self {
            DueStatus::Today => "今日",
            DueStatus::Tomorrow => "明日",
        }
    }
}

/// An entry whose next billing date is today or tomorrow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub entry: Entry,
    pub billing_date: NaiveDate,
    pub status: DueStatus,
}
