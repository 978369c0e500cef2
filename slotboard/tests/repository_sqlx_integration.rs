use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use sqlx::Row;
use uuid::Uuid;

use slotboard::batch::executor::BatchConfig;
use slotboard::db::Db;
use slotboard::metrics::counters::Counters;
use slotboard::slot::model::SlotPatch;
use slotboard::slot::repository::SlotRepository;
use slotboard::slot::repository_sqlx::SqlxSlotRepository;
use slotboard::slot::store::SlotStore;
use slotboard::time::ManualClock;
use slotboard::{
    DraftStatus, ListingWindow, MaintenanceOperation, RequestContext, SlotErrorType, SlotService,
    SlotStatus,
};

/// Isolated in-memory SQLite database per test; the unique name keeps parallel tests apart.
async fn setup_db() -> Db {
    let db_name = Uuid::new_v4().to_string();
    let conn_str = format!("sqlite:file:{}?mode=memory&cache=shared", db_name);

    let db = Db::connect(&conn_str).await.unwrap();
    db.migrate().await.unwrap();
    db.seed().await.unwrap();
    db
}

#[tokio::test]
async fn seeding_is_idempotent_and_creates_exactly_the_fixed_rows() {
    let db = setup_db().await;

    assert_eq!(db.seed().await.unwrap(), 0);

    let row = sqlx::query("SELECT COUNT(*) AS n, MIN(id) AS lo, MAX(id) AS hi FROM slots;")
        .fetch_one(&db.pool)
        .await
        .unwrap();
    assert_eq!(row.get::<i64, _>("n"), 25);
    assert_eq!(row.get::<i64, _>("lo"), 1);
    assert_eq!(row.get::<i64, _>("hi"), 25);
}

#[tokio::test]
async fn fetch_maps_seeded_rows() {
    let db = setup_db().await;
    let repo = SqlxSlotRepository::new(db.pool.clone());

    let slot = repo.fetch_by_id(3).await.unwrap().unwrap();
    assert_eq!(slot.id, 3);
    assert_eq!(slot.status, SlotStatus::Empty);
    assert_eq!(slot.draft_status, DraftStatus::Empty);
    assert_eq!(slot.product_id, None);
    assert!(!slot.is_active);

    assert!(repo.fetch_by_id(26).await.unwrap().is_none());

    let many = repo.fetch_many(&[5, 1, 40]).await.unwrap();
    assert_eq!(many.iter().map(|s| s.id).collect::<Vec<_>>(), vec![1, 5]);
}

#[tokio::test]
async fn partial_update_writes_and_clears_columns() {
    let db = setup_db().await;
    let repo = SqlxSlotRepository::new(db.pool.clone());
    let until = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();

    let patch = SlotPatch {
        status: Some(SlotStatus::Live),
        product_id: Some(Some("prod-7".into())),
        is_active: Some(true),
        reserved_by: Some(Some("ops".into())),
        reservation_end_time: Some(Some(until)),
        ..SlotPatch::default()
    };
    let stored = repo.update(7, &patch).await.unwrap().unwrap();
    assert_eq!(stored.status, SlotStatus::Live);
    assert_eq!(stored.product_id.as_deref(), Some("prod-7"));
    assert_eq!(stored.reservation_end_time, Some(until));

    let clear = SlotPatch {
        reserved_by: Some(None),
        reservation_end_time: Some(None),
        ..SlotPatch::default()
    };
    let stored = repo.update(7, &clear).await.unwrap().unwrap();
    assert_eq!(stored.reserved_by, None);
    assert_eq!(stored.reservation_end_time, None);
    // Untouched columns keep their values.
    assert_eq!(stored.product_id.as_deref(), Some("prod-7"));

    assert!(repo.update(99, &patch).await.unwrap().is_none());
    repo.ping().await.unwrap();
}

#[tokio::test]
async fn malformed_row_is_skipped_in_multi_read() {
    let db = setup_db().await;
    sqlx::query("UPDATE slots SET status = 'parked' WHERE id = 2;")
        .execute(&db.pool)
        .await
        .unwrap();

    let repo = SqlxSlotRepository::new(db.pool.clone());
    let many = repo.fetch_many(&[1, 2, 3]).await.unwrap();
    assert_eq!(many.iter().map(|s| s.id).collect::<Vec<_>>(), vec![1, 3]);

    assert!(repo.fetch_by_id(2).await.is_err());
}

#[tokio::test]
async fn service_runs_end_to_end_over_sqlite() {
    let db = setup_db().await;
    let t0 = Utc.with_ymd_and_hms(2026, 5, 1, 10, 0, 0).unwrap();

    let repo = Arc::new(SqlxSlotRepository::new(db.pool.clone()));
    let store = Arc::new(SlotStore::new(repo));
    let clock = Arc::new(ManualClock::new(t0));
    let service = SlotService::new(store, BatchConfig::default(), clock, Counters::default());
    let ctx = RequestContext::new("admin-A");

    let r = service
        .reserve_multiple_slots(&ctx, &[2], t0 + Duration::hours(1), "admin-A")
        .await
        .unwrap();
    assert!(r.overall_success);

    let r = service
        .set_maintenance_status(&ctx, &[1, 2, 3], MaintenanceOperation::Enable)
        .await
        .unwrap();
    assert_eq!(r.success_count, 2);
    assert_eq!(r.errors[0].slot_id, 2);
    assert_eq!(r.errors[0].error, SlotErrorType::ReservationConflict);

    let r = service
        .assign_product(&ctx, 2, "prod-2".into(), ListingWindow::default())
        .await
        .unwrap();
    assert!(r.overall_success);

    let rows = service
        .get_multiple_slots_status(&ctx, &[1, 2, 3])
        .await
        .unwrap();
    let statuses: Vec<_> = rows.iter().map(|s| s.status).collect();
    assert_eq!(
        statuses,
        vec![SlotStatus::Maintenance, SlotStatus::Live, SlotStatus::Maintenance]
    );
    assert_eq!(rows[1].reserved_by, None);
    for s in &rows {
        assert!(s.check_invariants().is_ok());
    }
}
