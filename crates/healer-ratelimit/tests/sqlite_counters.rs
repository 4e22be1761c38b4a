use chrono::NaiveDate;
use healer_core::{RateLimitConfig, Settings};
use healer_db::Database;
use healer_ratelimit::{FixedClock, RateLimiter};
use std::sync::Arc;

fn wednesday(hour: u32) -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 3, 4)
        .and_then(|d| d.and_hms_opt(hour, 0, 0))
        .expect("valid datetime")
}

#[tokio::test]
async fn test_counters_survive_a_new_limiter() {
    let db = Arc::new(Database::in_memory().await.expect("create test database"));
    let clock = Arc::new(FixedClock::new(wednesday(10)));

    let first = RateLimiter::new(db.clone(), Settings::new(db.clone()), RateLimitConfig::default())
        .with_clock(clock.clone());
    for _ in 0..5 {
        first.record_action("linkedin", "connect").await.expect("record");
    }

    // A fresh limiter has an empty hourly window but reads the same counters
    let second = RateLimiter::new(db.clone(), Settings::new(db.clone()), RateLimitConfig::default())
        .with_clock(clock.clone());
    let decision = second.can_perform_action("linkedin", "connect").await;
    assert!(!decision.allowed);
    assert_eq!(
        decision.reason.as_deref(),
        Some("Daily linkedin limit reached (5)")
    );

    clock.set(wednesday(10) + chrono::Duration::days(1));
    assert!(second.can_perform_action("linkedin", "connect").await.allowed);
}

#[tokio::test]
async fn test_week_persists_in_settings() {
    let db = Arc::new(Database::in_memory().await.expect("create test database"));
    let limiter = RateLimiter::new(db.clone(), Settings::new(db.clone()), RateLimitConfig::default())
        .with_clock(Arc::new(FixedClock::new(wednesday(10))));

    limiter.update_week(4).await.expect("update week");

    let stored = healer_db::settings::get_setting(db.pool(), "progressive_limit")
        .await
        .expect("get");
    assert_eq!(stored.as_deref(), Some("14"));
    assert_eq!(limiter.progressive_limit().await.expect("limit"), 14);
}
