// ═══════════════════════════════════════════════════════════════════
// Service Tests: BillingService, AggregationService, SessionService,
// EntryStore routing
// ═══════════════════════════════════════════════════════════════════

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use subscription_tracker_core::errors::CoreError;
use subscription_tracker_core::models::category::Category;
use subscription_tracker_core::models::entry::{Entry, EntryDraft, EntryPatch};
use subscription_tracker_core::models::form::PricingPeriod;
use subscription_tracker_core::models::session::{Identity, Mode, Session};
use subscription_tracker_core::models::summary::DueStatus;
use subscription_tracker_core::remote::traits::RemoteService;
use subscription_tracker_core::services::aggregation_service::AggregationService;
use subscription_tracker_core::services::billing_service::BillingService;
use subscription_tracker_core::services::session_service::SessionService;
use subscription_tracker_core::storage::guest_store::GuestStore;
use subscription_tracker_core::storage::medium::MemoryMedium;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn stamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

fn entry(id: &str, name: &str, amount: f64, day: u32, category: Category) -> Entry {
    Entry {
        id: id.into(),
        owner_id: "guest".into(),
        name: name.into(),
        monthly_amount: amount,
        billing_day: day,
        category,
        memo: None,
        created_at: stamp(),
        updated_at: stamp(),
    }
}

fn draft(name: &str, amount: f64) -> EntryDraft {
    EntryDraft {
        name: name.into(),
        monthly_amount: amount,
        billing_day: 5,
        category: Category::Other,
        memo: None,
    }
}

// ═══════════════════════════════════════════════════════════════════
// Mock Remote Service
// ═══════════════════════════════════════════════════════════════════

#[derive(Default)]
struct MockState {
    signed_in: Option<Identity>,
    entries: Vec<Entry>,
    next_id: i64,
    identity_calls: usize,
}

#[derive(Clone, Default)]
struct MockRemote {
    state: Arc<Mutex<MockState>>,
}

impl MockRemote {
    fn signed_in_as(identity: Identity) -> Self {
        let remote = Self::default();
        remote.state.lock().unwrap().signed_in = Some(identity);
        remote
    }

    fn identity_calls(&self) -> usize {
        self.state.lock().unwrap().identity_calls
    }

    fn caller(&self) -> Result<Identity, CoreError> {
        self.state
            .lock()
            .unwrap()
            .signed_in
            .clone()
            .ok_or_else(|| CoreError::Service {
                operation: "mock".into(),
                message: "No signed-in session".into(),
            })
    }
}

#[async_trait]
impl RemoteService for MockRemote {
    fn name(&self) -> &str {
        "MockRemote"
    }

    async fn current_identity(&self) -> Result<Option<Identity>, CoreError> {
        let mut state = self.state.lock().unwrap();
        state.identity_calls += 1;
        Ok(state.signed_in.clone())
    }

    async fn list_entries(&self, identity: &Identity) -> Result<Vec<Entry>, CoreError> {
        let owner = identity.id.to_string();
        let mut entries: Vec<Entry> = self
            .state
            .lock()
            .unwrap()
            .entries
            .iter()
            .filter(|e| e.owner_id == owner)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    async fn insert_entry(
        &self,
        identity: &Identity,
        draft: &EntryDraft,
    ) -> Result<Entry, CoreError> {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let created = stamp() + Duration::seconds(state.next_id);
        let entry = Entry::from_draft(
            format!("remote-{}", state.next_id),
            identity.id.to_string(),
            draft.clone(),
            created,
        );
        state.entries.push(entry.clone());
        Ok(entry)
    }

    async fn update_entry(&self, id: &str, patch: &EntryPatch) -> Result<(), CoreError> {
        let owner = self.caller()?.id.to_string();
        let mut state = self.state.lock().unwrap();
        let entry = state
            .entries
            .iter_mut()
            .find(|e| e.id == id && e.owner_id == owner)
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;
        entry.apply(patch, stamp() + Duration::days(1));
        Ok(())
    }

    async fn delete_entry(&self, id: &str) -> Result<(), CoreError> {
        let owner = self.caller()?.id.to_string();
        let mut state = self.state.lock().unwrap();
        let before = state.entries.len();
        state.entries.retain(|e| !(e.id == id && e.owner_id == owner));
        if state.entries.len() == before {
            return Err(CoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn sign_in(&self, email: &str, _password: &str) -> Result<Identity, CoreError> {
        let identity = Identity::new(Uuid::new_v4(), email);
        self.state.lock().unwrap().signed_in = Some(identity.clone());
        Ok(identity)
    }

    async fn sign_up(&self, _email: &str, _password: &str) -> Result<(), CoreError> {
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), CoreError> {
        self.state.lock().unwrap().signed_in = None;
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════
// BillingService: amounts
// ═══════════════════════════════════════════════════════════════════

mod billing_amounts {
    use super::*;

    #[test]
    fn monthly_is_unchanged() {
        let svc = BillingService::new();
        assert_eq!(svc.to_monthly_amount(980.0, PricingPeriod::Monthly), 980.0);
    }

    #[test]
    fn yearly_is_divided_by_twelve() {
        let svc = BillingService::new();
        assert_eq!(svc.to_monthly_amount(17880.0, PricingPeriod::Yearly), 1490.0);
        assert_eq!(svc.to_monthly_amount(12000.0, PricingPeriod::Yearly), 1000.0);
        for amount in [0.0, 1.0, 999.0, 78624.0, 123456.78] {
            assert_eq!(
                svc.to_monthly_amount(amount, PricingPeriod::Yearly),
                amount / 12.0
            );
        }
    }

    #[test]
    fn rounding_is_display_only() {
        let svc = BillingService::new();
        let monthly = svc.to_monthly_amount(1000.0, PricingPeriod::Yearly);
        assert!((monthly - 83.333).abs() < 0.001);
        assert_eq!(svc.round_for_display(monthly), 83);
        assert_eq!(svc.round_for_display(82.5), 83);
        assert_eq!(svc.round_for_display(0.4), 0);
    }
}

// ═══════════════════════════════════════════════════════════════════
// BillingService: dates
// ═══════════════════════════════════════════════════════════════════

mod billing_dates {
    use super::*;

    #[test]
    fn later_day_stays_in_month() {
        let svc = BillingService::new();
        assert_eq!(
            svc.resolve_next_billing_date(20, date(2025, 3, 15)),
            date(2025, 3, 20)
        );
    }

    #[test]
    fn earlier_day_moves_to_next_month() {
        let svc = BillingService::new();
        assert_eq!(
            svc.resolve_next_billing_date(10, date(2025, 3, 15)),
            date(2025, 4, 10)
        );
    }

    #[test]
    fn same_day_is_today() {
        let svc = BillingService::new();
        assert_eq!(
            svc.resolve_next_billing_date(15, date(2025, 3, 15)),
            date(2025, 3, 15)
        );
    }

    #[test]
    fn december_rolls_into_january() {
        let svc = BillingService::new();
        assert_eq!(
            svc.resolve_next_billing_date(5, date(2025, 12, 20)),
            date(2026, 1, 5)
        );
    }

    #[test]
    fn day_31_clamps_in_thirty_day_month() {
        let svc = BillingService::new();
        assert_eq!(
            svc.resolve_next_billing_date(31, date(2025, 4, 10)),
            date(2025, 4, 30)
        );
    }

    #[test]
    fn day_31_clamps_in_february() {
        let svc = BillingService::new();
        assert_eq!(
            svc.resolve_next_billing_date(31, date(2025, 2, 1)),
            date(2025, 2, 28)
        );
        assert_eq!(
            svc.resolve_next_billing_date(30, date(2024, 2, 1)),
            date(2024, 2, 29)
        );
    }

    #[test]
    fn month_end_days() {
        let svc = BillingService::new();
        assert_eq!(
            svc.resolve_next_billing_date(31, date(2025, 1, 31)),
            date(2025, 1, 31)
        );
        assert_eq!(
            svc.resolve_next_billing_date(30, date(2025, 2, 28)),
            date(2025, 2, 28)
        );
        assert_eq!(
            svc.resolve_next_billing_date(29, date(2025, 3, 30)),
            date(2025, 4, 29)
        );
    }

    #[test]
    fn out_of_range_days_are_clamped() {
        let svc = BillingService::new();
        assert_eq!(
            svc.resolve_next_billing_date(0, date(2025, 3, 1)),
            date(2025, 3, 1)
        );
        assert_eq!(
            svc.resolve_next_billing_date(45, date(2025, 3, 1)),
            date(2025, 3, 31)
        );
    }

    #[test]
    fn result_is_never_before_reference() {
        let svc = BillingService::new();
        let mut reference = date(2024, 1, 1);
        while reference <= date(2025, 12, 31) {
            for day in 1..=31 {
                let next = svc.resolve_next_billing_date(day, reference);
                assert!(next >= reference, "day {day} at {reference} gave {next}");
                assert!((next - reference).num_days() <= 31);
            }
            reference = reference.succ_opt().unwrap();
        }
    }

    #[test]
    fn days_until_billing_counts_calendar_days() {
        let svc = BillingService::new();
        assert_eq!(svc.days_until_billing(15, date(2025, 3, 15)), 0);
        assert_eq!(svc.days_until_billing(20, date(2025, 3, 15)), 5);
        assert_eq!(svc.days_until_billing(10, date(2025, 3, 15)), 26);
    }
}

// ═══════════════════════════════════════════════════════════════════
// BillingService: due soon & reminders
// ═══════════════════════════════════════════════════════════════════

mod billing_reminders {
    use super::*;

    #[test]
    fn due_today_and_tomorrow() {
        let svc = BillingService::new();
        let today = date(2025, 6, 10);
        assert!(svc.is_due_soon(10, today));
        assert!(svc.is_due_soon(11, today));
        assert!(!svc.is_due_soon(12, today));
        assert!(!svc.is_due_soon(9, today));
        assert_eq!(svc.due_status(10, today), Some(DueStatus::Today));
        assert_eq!(svc.due_status(11, today), Some(DueStatus::Tomorrow));
        assert_eq!(svc.due_status(20, today), None);
    }

    #[test]
    fn ten_days_out_is_not_due() {
        let svc = BillingService::new();
        let today = date(2025, 6, 10);
        assert!(!svc.is_due_soon(20, today));
    }

    #[test]
    fn tomorrow_across_month_end() {
        let svc = BillingService::new();
        assert_eq!(svc.due_status(1, date(2025, 6, 30)), Some(DueStatus::Tomorrow));
        assert_eq!(svc.due_status(1, date(2025, 12, 31)), Some(DueStatus::Tomorrow));
    }

    #[test]
    fn clamped_day_is_due_on_last_day() {
        let svc = BillingService::new();
        assert_eq!(svc.due_status(31, date(2025, 4, 30)), Some(DueStatus::Today));
        assert_eq!(svc.due_status(31, date(2025, 4, 29)), Some(DueStatus::Tomorrow));
    }

    #[test]
    fn works_against_the_local_clock() {
        let svc = BillingService::new();
        let today = chrono::Local::now().date_naive();
        assert!(svc.is_due_soon(today.day(), today));
        let ten_days_out = today + Duration::days(10);
        assert!(!svc.is_due_soon(ten_days_out.day(), today));
    }

    #[test]
    fn upcoming_reminders_filters_and_sorts() {
        let svc = BillingService::new();
        let entries = vec![
            entry("a", "Spotify", 980.0, 11, Category::Entertainment),
            entry("b", "Netflix", 1490.0, 10, Category::Entertainment),
            entry("c", "GitHub Pro", 500.0, 20, Category::Business),
            entry("d", "Adobe", 6552.0, 11, Category::Business),
        ];
        let reminders = svc.upcoming_reminders(&entries, date(2025, 6, 10));

        let names: Vec<&str> = reminders.iter().map(|r| r.entry.name.as_str()).collect();
        assert_eq!(names, vec!["Netflix", "Adobe", "Spotify"]);
        assert_eq!(reminders[0].status, DueStatus::Today);
        assert_eq!(reminders[0].billing_date, date(2025, 6, 10));
        assert_eq!(reminders[1].status, DueStatus::Tomorrow);
        assert_eq!(reminders[1].status.label(), "明日");
    }

    #[test]
    fn no_reminders_for_empty_collection() {
        let svc = BillingService::new();
        assert!(svc.upcoming_reminders(&[], date(2025, 6, 10)).is_empty());
    }
}

// ═══════════════════════════════════════════════════════════════════
// AggregationService
// ═══════════════════════════════════════════════════════════════════

mod aggregation {
    use super::*;

    fn sample() -> Vec<Entry> {
        vec![
            entry("1", "Netflix", 1490.0, 15, Category::Entertainment),
            entry("2", "Spotify", 980.0, 3, Category::Entertainment),
            entry("3", "Adobe", 6552.0, 25, Category::Business),
            entry("4", "GitHub Pro", 500.0, 15, Category::Business),
            entry("5", "Gym", 0.1, 3, Category::Custom("Sports".into())),
            entry("6", "Cloud", 0.2, 25, Category::Utilities),
        ]
    }

    #[test]
    fn empty_collection_totals_zero() {
        let svc = AggregationService::new();
        assert_eq!(svc.total_monthly_spend(&[]), 0.0);
        assert!(svc.total_monthly_spend(&[]).is_sign_positive());
        assert_eq!(svc.average_per_entry(&[]), 0.0);
        assert!(svc.spend_by_category(&[]).is_empty());
        assert!(svc.schedule_by_day(&[]).is_empty());
    }

    #[test]
    fn total_is_sum_of_monthly_amounts() {
        let svc = AggregationService::new();
        let total = svc.total_monthly_spend(&sample());
        assert!((total - 9522.3).abs() < 1e-9);
    }

    #[test]
    fn total_ignores_order() {
        let svc = AggregationService::new();
        let mut entries = sample();
        let forward = svc.total_monthly_spend(&entries);
        entries.reverse();
        assert_eq!(svc.total_monthly_spend(&entries).to_bits(), forward.to_bits());
        entries.swap(0, 3);
        entries.swap(1, 5);
        assert_eq!(svc.total_monthly_spend(&entries).to_bits(), forward.to_bits());
    }

    #[test]
    fn by_category_only_lists_present_categories() {
        let svc = AggregationService::new();
        let by_category = svc.spend_by_category(&sample());
        assert_eq!(by_category.len(), 4);
        assert_eq!(by_category[&Category::Entertainment], 2470.0);
        assert_eq!(by_category[&Category::Business], 7052.0);
        assert!(!by_category.contains_key(&Category::Education));
        assert!(by_category.contains_key(&Category::Custom("Sports".into())));
    }

    #[test]
    fn by_category_sums_to_total() {
        let svc = AggregationService::new();
        let entries = sample();
        let parts: f64 = svc.spend_by_category(&entries).values().sum();
        assert!((parts - svc.total_monthly_spend(&entries)).abs() < 1e-9);
    }

    #[test]
    fn by_category_ignores_order() {
        let svc = AggregationService::new();
        let mut entries = sample();
        let forward = svc.spend_by_category(&entries);
        entries.reverse();
        assert_eq!(svc.spend_by_category(&entries), forward);
    }

    #[test]
    fn average_per_entry() {
        let svc = AggregationService::new();
        let entries = vec![
            entry("1", "A", 1000.0, 1, Category::Other),
            entry("2", "B", 500.0, 1, Category::Other),
        ];
        assert_eq!(svc.average_per_entry(&entries), 750.0);
    }

    #[test]
    fn schedule_omits_empty_days() {
        let svc = AggregationService::new();
        let schedule = svc.schedule_by_day(&sample());
        let days: Vec<u32> = schedule.iter().map(|d| d.day).collect();
        assert_eq!(days, vec![3, 15, 25]);

        let fifteenth = &schedule[1];
        assert_eq!(fifteenth.count, 2);
        assert_eq!(fifteenth.amount, 1990.0);
        let names: Vec<&str> = fifteenth.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["GitHub Pro", "Netflix"]);
    }

    #[test]
    fn schedule_ignores_order() {
        let svc = AggregationService::new();
        let mut entries = sample();
        let forward = svc.schedule_by_day(&entries);
        entries.reverse();
        assert_eq!(svc.schedule_by_day(&entries), forward);
    }

    #[test]
    fn summarize_combines_everything() {
        let svc = AggregationService::new();
        let entries = sample();
        let summary = svc.summarize(&entries);
        assert_eq!(summary.entry_count, 6);
        assert_eq!(summary.total_monthly, svc.total_monthly_spend(&entries));
        assert_eq!(summary.average_per_entry, svc.average_per_entry(&entries));
        assert_eq!(summary.by_category, svc.spend_by_category(&entries));
        assert_eq!(summary.schedule.len(), 3);
    }
}

// ═══════════════════════════════════════════════════════════════════
// SessionService: resolution
// ═══════════════════════════════════════════════════════════════════

mod session_resolution {
    use super::*;

    #[tokio::test]
    async fn guest_flag_wins_over_identity() {
        let guest = GuestStore::new(MemoryMedium::new());
        guest.enter_guest_mode().unwrap();
        let remote = MockRemote::signed_in_as(Identity::new(Uuid::new_v4(), "me@example.com"));

        let session = SessionService::new().resolve(&guest, &remote).await.unwrap();
        assert_eq!(session.mode(), Mode::Guest);
        assert_eq!(remote.identity_calls(), 0);
    }

    #[tokio::test]
    async fn identity_without_flag_is_authenticated() {
        let guest = GuestStore::new(MemoryMedium::new());
        let identity = Identity::new(Uuid::new_v4(), "me@example.com");
        let remote = MockRemote::signed_in_as(identity.clone());

        let session = SessionService::new().resolve(&guest, &remote).await.unwrap();
        assert_eq!(session.mode(), Mode::Authenticated);
        assert_eq!(session.identity(), Some(&identity));
    }

    #[tokio::test]
    async fn nothing_set_is_unknown() {
        let guest = GuestStore::new(MemoryMedium::new());
        let remote = MockRemote::default();

        let session = SessionService::new().resolve(&guest, &remote).await.unwrap();
        assert_eq!(session.mode(), Mode::Unknown);
    }

    #[tokio::test]
    async fn detached_guest_store_never_resolves_guest() {
        let guest = GuestStore::detached();
        let remote = MockRemote::default();

        let session = SessionService::new().resolve(&guest, &remote).await.unwrap();
        assert_eq!(session.mode(), Mode::Unknown);
    }
}

// ═══════════════════════════════════════════════════════════════════
// SessionService: routing
// ═══════════════════════════════════════════════════════════════════

mod routing {
    use super::*;

    #[tokio::test]
    async fn unknown_mode_is_not_authenticated() {
        let guest = GuestStore::new(MemoryMedium::new());
        let remote = MockRemote::default();
        let session = Session::unknown();

        let result = SessionService::new().route(&session, &guest, &remote);
        assert!(matches!(result, Err(CoreError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn guest_session_never_touches_remote() {
        let medium = MemoryMedium::new();
        let guest = GuestStore::new(medium.clone());
        guest.enter_guest_mode().unwrap();
        let remote = MockRemote::default();
        let session = Session::guest();

        let store = SessionService::new().route(&session, &guest, &remote).unwrap();
        assert_eq!(store.mode(), Mode::Guest);

        let seeded = store.list().await.unwrap();
        assert_eq!(seeded.len(), 5);

        let added = store.insert(draft("Hulu", 1026.0)).await.unwrap();
        assert!(added.id.starts_with("guest-"));
        assert_eq!(added.owner_id, "guest");
        assert_eq!(store.list().await.unwrap().len(), 6);

        assert!(remote.state.lock().unwrap().entries.is_empty());
    }

    #[tokio::test]
    async fn authenticated_session_never_touches_guest_collection() {
        let medium = MemoryMedium::new();
        let guest = GuestStore::new(medium.clone());
        let identity = Identity::new(Uuid::new_v4(), "me@example.com");
        let remote = MockRemote::signed_in_as(identity.clone());
        let session = Session::authenticated(identity.clone());

        let store = SessionService::new().route(&session, &guest, &remote).unwrap();
        assert_eq!(store.mode(), Mode::Authenticated);

        let added = store.insert(draft("Hulu", 1026.0)).await.unwrap();
        assert_eq!(added.owner_id, identity.id.to_string());
        assert_eq!(store.list().await.unwrap().len(), 1);

        assert!(medium.is_empty());
    }

    #[tokio::test]
    async fn remote_list_is_newest_first() {
        let guest = GuestStore::detached();
        let identity = Identity::new(Uuid::new_v4(), "me@example.com");
        let remote = MockRemote::signed_in_as(identity.clone());
        let session = Session::authenticated(identity);

        let store = SessionService::new().route(&session, &guest, &remote).unwrap();
        store.insert(draft("First", 100.0)).await.unwrap();
        store.insert(draft("Second", 200.0)).await.unwrap();

        let names: Vec<String> = store.list().await.unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["Second", "First"]);
    }

    #[tokio::test]
    async fn remote_update_and_delete_unknown_id() {
        let guest = GuestStore::detached();
        let identity = Identity::new(Uuid::new_v4(), "me@example.com");
        let remote = MockRemote::signed_in_as(identity.clone());
        let session = Session::authenticated(identity);

        let store = SessionService::new().route(&session, &guest, &remote).unwrap();
        let patch = EntryPatch {
            name: Some("Renamed".into()),
            ..Default::default()
        };
        assert!(matches!(
            store.update("missing", &patch).await,
            Err(CoreError::NotFound(_))
        ));
        assert!(matches!(store.delete("missing").await, Err(CoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn remote_entries_of_other_owners_are_invisible() {
        let guest = GuestStore::detached();
        let me = Identity::new(Uuid::new_v4(), "me@example.com");
        let other = Identity::new(Uuid::new_v4(), "other@example.com");
        let remote = MockRemote::signed_in_as(me.clone());
        remote.insert_entry(&other, &draft("Theirs", 1.0)).await.unwrap();

        let session = Session::authenticated(me);
        let store = SessionService::new().route(&session, &guest, &remote).unwrap();
        assert!(store.list().await.unwrap().is_empty());
        assert!(matches!(store.delete("remote-1").await, Err(CoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn both_stores_reject_invalid_writes() {
        let guest = GuestStore::new(MemoryMedium::new());
        let identity = Identity::new(Uuid::new_v4(), "me@example.com");
        let remote = MockRemote::signed_in_as(identity.clone());
        let bad_draft = EntryDraft {
            billing_day: 32,
            ..draft("Hulu", 1026.0)
        };
        let bad_patch = EntryPatch {
            monthly_amount: Some(f64::NAN),
            ..Default::default()
        };

        for session in [Session::guest(), Session::authenticated(identity)] {
            let store = SessionService::new().route(&session, &guest, &remote).unwrap();
            let kept = store.insert(draft("Kept", 100.0)).await.unwrap();
            let before = store.list().await.unwrap();

            assert!(matches!(
                store.insert(bad_draft.clone()).await,
                Err(CoreError::Validation(_))
            ));
            assert!(matches!(
                store.update(&kept.id, &bad_patch).await,
                Err(CoreError::Validation(_))
            ));
            assert_eq!(store.list().await.unwrap(), before, "{} store changed", store.mode());
        }
        assert_eq!(remote.state.lock().unwrap().entries.len(), 1);
    }
}
