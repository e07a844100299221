use anyhow::Result;
use sqlx::PgPool;
use time::Date;

use crate::domain::ReserveRecord;

const COLUMNS: &str = r#"
    tran_date,
    tran_hour,
    sr_bid,
    sr_bid_qse,
    sr_bid_nontrade,
    sr_price,
    sr_perf_price_1,
    sr_perf_price_2,
    sr_perf_price_3,
    sup_bid,
    sup_bid_qse,
    sup_bid_nontrade,
    sup_price
"#;

/// Per-day aggregates over the hourly reserve rows. Days without data report zeros.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ReserveStatistics {
    pub sr_bid_avg: f64,
    pub sr_bid_max: f64,
    pub sr_bid_min: f64,
    pub sr_price_avg: f64,
    pub sr_price_max: f64,
    pub sr_price_min: f64,
    pub sup_bid_avg: f64,
    pub sup_bid_max: f64,
    pub sup_bid_min: f64,
    pub sup_price_avg: f64,
    pub sup_price_max: f64,
    pub sup_price_min: f64,
}

#[derive(sqlx::FromRow)]
struct StatisticsRow {
    sr_bid_avg: Option<f64>,
    sr_bid_max: Option<f64>,
    sr_bid_min: Option<f64>,
    sr_price_avg: Option<f64>,
    sr_price_max: Option<f64>,
    sr_price_min: Option<f64>,
    sup_bid_avg: Option<f64>,
    sup_bid_max: Option<f64>,
    sup_bid_min: Option<f64>,
    sup_price_avg: Option<f64>,
    sup_price_max: Option<f64>,
    sup_price_min: Option<f64>,
}

impl From<StatisticsRow> for ReserveStatistics {
    fn from(r: StatisticsRow) -> Self {
        Self {
            sr_bid_avg: r.sr_bid_avg.unwrap_or_default(),
            sr_bid_max: r.sr_bid_max.unwrap_or_default(),
            sr_bid_min: r.sr_bid_min.unwrap_or_default(),
            sr_price_avg: r.sr_price_avg.unwrap_or_default(),
            sr_price_max: r.sr_price_max.unwrap_or_default(),
            sr_price_min: r.sr_price_min.unwrap_or_default(),
            sup_bid_avg: r.sup_bid_avg.unwrap_or_default(),
            sup_bid_max: r.sup_bid_max.unwrap_or_default(),
            sup_bid_min: r.sup_bid_min.unwrap_or_default(),
            sup_price_avg: r.sup_price_avg.unwrap_or_default(),
            sup_price_max: r.sup_price_max.unwrap_or_default(),
            sup_price_min: r.sup_price_min.unwrap_or_default(),
        }
    }
}

/// All hours of the most recent trading day on record.
pub async fn latest_day(pool: &PgPool) -> Result<Vec<ReserveRecord>> {
    let sql = format!(
        r#"
        SELECT {COLUMNS}
        FROM taipower_reserve_data
        WHERE tran_date = (SELECT MAX(tran_date) FROM taipower_reserve_data)
        ORDER BY tran_hour
        "#
    );
    let rows = sqlx::query_as::<_, ReserveRecord>(&sql).fetch_all(pool).await?;

    Ok(rows)
}

pub async fn by_date(pool: &PgPool, date: Date) -> Result<Vec<ReserveRecord>> {
    let sql = format!("SELECT {COLUMNS} FROM taipower_reserve_data WHERE tran_date = $1 ORDER BY tran_hour");
    let rows = sqlx::query_as::<_, ReserveRecord>(&sql)
        .bind(date)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Rows with `start <= tran_date <= end`, newest day and hour first.
pub async fn history(pool: &PgPool, start: Date, end: Date, limit: i64) -> Result<Vec<ReserveRecord>> {
    let sql = format!(
        r#"
        SELECT {COLUMNS}
        FROM taipower_reserve_data
        WHERE tran_date BETWEEN $1 AND $2
        ORDER BY tran_date DESC, tran_hour DESC
        LIMIT $3
        "#
    );
    let rows = sqlx::query_as::<_, ReserveRecord>(&sql)
        .bind(start)
        .bind(end)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

pub async fn by_hour(pool: &PgPool, date: Date, hour: i32) -> Result<Option<ReserveRecord>> {
    let sql = format!("SELECT {COLUMNS} FROM taipower_reserve_data WHERE tran_date = $1 AND tran_hour = $2");
    let row = sqlx::query_as::<_, ReserveRecord>(&sql)
        .bind(date)
        .bind(hour)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub async fn statistics(pool: &PgPool, date: Date) -> Result<ReserveStatistics> {
    let row = sqlx::query_as::<_, StatisticsRow>(
        r#"
        SELECT
            AVG(sr_bid)    AS sr_bid_avg,
            MAX(sr_bid)    AS sr_bid_max,
            MIN(sr_bid)    AS sr_bid_min,
            AVG(sr_price)  AS sr_price_avg,
            MAX(sr_price)  AS sr_price_max,
            MIN(sr_price)  AS sr_price_min,
            AVG(sup_bid)   AS sup_bid_avg,
            MAX(sup_bid)   AS sup_bid_max,
            MIN(sup_bid)   AS sup_bid_min,
            AVG(sup_price) AS sup_price_avg,
            MAX(sup_price) AS sup_price_max,
            MIN(sup_price) AS sup_price_min
        FROM taipower_reserve_data
        WHERE tran_date = $1
        "#,
    )
    .bind(date)
    .fetch_one(pool)
    .await?;

    Ok(row.into())
}
