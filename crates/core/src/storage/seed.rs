use chrono::{DateTime, Utc};

use crate::models::category::Category;
use crate::models::entry::{Entry, GUEST_OWNER_ID};

/// 2024-01-01T00:00:00Z, the timestamp of every seed entry.
const SEED_TIMESTAMP: i64 = 1_704_067_200;

/// Example collection shown to a guest on first visit, and whenever the
/// stored guest collection cannot be read.
pub fn default_guest_entries() -> Vec<Entry> {
    let seeded_at: DateTime<Utc> = DateTime::from_timestamp(SEED_TIMESTAMP, 0).unwrap_or_default();

    let seed = |id: &str, name: &str, amount: f64, day: u32, category: Category, memo: &str| Entry {
        id: id.to_string(),
        owner_id: GUEST_OWNER_ID.to_string(),
        name: name.to_string(),
        monthly_amount: amount,
        billing_day: day,
        category,
        memo: Some(memo.to_string()),
        created_at: seeded_at,
        updated_at: seeded_at,
    };

    vec![
        seed("guest-1", "Netflix", 1490.0, 15, Category::Entertainment, "プレミアムプラン"),
        seed("guest-2", "Spotify", 980.0, 3, Category::Entertainment, "音楽ストリーミング"),
        seed("guest-3", "Adobe Creative Cloud", 6552.0, 25, Category::Business, "年額プランを月額換算"),
        seed("guest-4", "GitHub Pro", 500.0, 10, Category::Business, "開発者向けプラン"),
        seed("guest-5", "Notion Pro", 800.0, 20, Category::Business, "チームプラン"),
    ]
}
