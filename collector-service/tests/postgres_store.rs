//! Round trips against a real PostgreSQL.
//!
//! Run with `DATABASE_URL=postgres://... cargo test -- --ignored` against a
//! disposable database; the schema is created if missing.

use collector_service::{
    config::DatabaseConfig,
    pipeline::PipelineError,
    sinks::{postgres::connect_pool, PgRecordStore, RecordStore},
};
use sqlx::PgPool;
use time::{macros::datetime, Date, OffsetDateTime};
use vpp_client::{
    db::{ensure_schema, load_queries, reserve_queries, solar_queries},
    domain::{LoadRecord, ReserveRecord, SolarRecord},
};

async fn pool() -> PgPool {
    pool_with(2).await
}

async fn pool_with(max_connections: u32) -> PgPool {
    let uri = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for ignored tests");
    let cfg = DatabaseConfig {
        uri,
        max_connections,
        acquire_timeout_secs: 5,
        statement_timeout_ms: 10_000,
        apply_schema: true,
    };
    let pool = connect_pool(&cfg).await.unwrap();
    ensure_schema(&pool).await.unwrap();
    pool
}

fn unique(prefix: &str) -> String {
    let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
    format!("{prefix}-{nanos}")
}

/// A day nobody else writes to, derived from the current clock.
fn unique_day() -> Date {
    let offset = (OffsetDateTime::now_utc().unix_timestamp_nanos() % 3000) as i64;
    Date::from_calendar_date(2099, time::Month::January, 1).unwrap() + time::Duration::days(offset)
}

fn reserve_hour(date: Date, hour: i32, sr_bid: f64) -> ReserveRecord {
    let mut r = ReserveRecord::zeroed(date, hour);
    r.sr_bid = sr_bid;
    r.sr_price = 10.0 + hour as f64;
    r
}

async fn clear_reserve_day(pool: &PgPool, date: Date) {
    sqlx::query("DELETE FROM taipower_reserve_data WHERE tran_date = $1")
        .bind(date)
        .execute(pool)
        .await
        .unwrap();
}

#[tokio::test]
#[ignore]
async fn solar_upsert_is_idempotent() {
    let pool = pool().await;
    let store = PgRecordStore::new(pool.clone());
    let site = unique("solar");
    let ts = datetime!(2024-06-01 10:15:00 UTC);

    let mut record = SolarRecord::zeroed(&site, ts);
    record.daily_generation = 1.0;
    store.upsert_solar(&record).await.unwrap();
    record.daily_generation = 2.0;
    store.upsert_solar(&record).await.unwrap();

    let history = solar_queries::history(&pool, &site, ts, ts, 10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].daily_generation, 2.0);

    let latest = solar_queries::latest(&pool, &site).await.unwrap().unwrap();
    assert_eq!(latest, record);
}

#[tokio::test]
#[ignore]
async fn load_batch_and_latest() {
    let pool = pool().await;
    let store = PgRecordStore::new(pool.clone());
    let site = unique("load");
    let readings: Vec<LoadRecord> = (0..3)
        .map(|i| LoadRecord {
            site_id: site.clone(),
            ts: datetime!(2024-06-01 00:00:00 UTC) + time::Duration::minutes(15 * i),
            load_value: i as f64,
        })
        .collect();

    store.upsert_load_batch(&readings).await.unwrap();
    store.upsert_load_batch(&readings).await.unwrap();

    let latest = load_queries::latest(&pool, &site).await.unwrap().unwrap();
    assert_eq!(latest.load_value, 2.0);
    let all = load_queries::history(
        &pool,
        &site,
        datetime!(2024-06-01 00:00:00 UTC),
        datetime!(2024-06-02 00:00:00 UTC),
        100,
    )
    .await
    .unwrap();
    assert_eq!(all.len(), 3);
}

#[tokio::test]
#[ignore]
async fn reserve_batch_is_all_or_nothing() {
    // One connection, so the session-local table below shadows the real one
    // for every statement the store runs.
    let pool = pool_with(1).await;
    sqlx::query(
        "CREATE TEMP TABLE taipower_reserve_data \
         (LIKE taipower_reserve_data INCLUDING ALL, CHECK (sr_bid >= 0))",
    )
    .execute(&pool)
    .await
    .unwrap();
    let store = PgRecordStore::new(pool.clone());
    let date = unique_day();

    let mut batch: Vec<ReserveRecord> = (0..23).map(|h| reserve_hour(date, h, 1.0)).collect();
    batch.push(reserve_hour(date, 23, -1.0));

    let err = store.upsert_reserve_batch(&batch).await.unwrap_err();
    assert!(matches!(err, PipelineError::Persist(_)));
    assert!(reserve_queries::by_date(&pool, date).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore]
async fn reserve_hours_outside_the_day_are_stored() {
    let pool = pool().await;
    let store = PgRecordStore::new(pool.clone());
    let date = unique_day();
    clear_reserve_day(&pool, date).await;

    let day: Vec<ReserveRecord> = (1..25).map(|h| reserve_hour(date, h, 1.0)).collect();
    store.upsert_reserve_batch(&day).await.unwrap();

    let rows = reserve_queries::by_date(&pool, date).await.unwrap();
    assert_eq!(rows.len(), 24);
    assert_eq!(rows.last().map(|r| r.tran_hour), Some(24));

    clear_reserve_day(&pool, date).await;
}

#[tokio::test]
#[ignore]
async fn reserve_day_queries_and_statistics() {
    let pool = pool().await;
    let store = PgRecordStore::new(pool.clone());
    let date = unique_day();
    clear_reserve_day(&pool, date).await;

    let day: Vec<ReserveRecord> = (0..24).map(|h| reserve_hour(date, h, h as f64)).collect();
    store.upsert_reserve_batch(&day).await.unwrap();
    // Re-collecting the same day replaces rows instead of duplicating them.
    store.upsert_reserve_batch(&day).await.unwrap();

    let rows = reserve_queries::by_date(&pool, date).await.unwrap();
    assert_eq!(rows.len(), 24);
    assert_eq!(rows, day);

    let hour = reserve_queries::by_hour(&pool, date, 5).await.unwrap().unwrap();
    assert_eq!(hour.sr_bid, 5.0);

    let stats = reserve_queries::statistics(&pool, date).await.unwrap();
    assert_eq!(stats.sr_bid_min, 0.0);
    assert_eq!(stats.sr_bid_max, 23.0);
    assert!((stats.sr_bid_avg - 11.5).abs() < 1e-9);
    assert_eq!(stats.sup_price_max, 0.0);

    let history = reserve_queries::history(&pool, date, date, 3).await.unwrap();
    assert_eq!(history.iter().map(|r| r.tran_hour).collect::<Vec<_>>(), vec![23, 22, 21]);

    clear_reserve_day(&pool, date).await;
}
