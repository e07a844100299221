use anyhow::Result;
use sqlx::PgPool;
use time::OffsetDateTime;

use crate::domain::SolarRecord;

const COLUMNS: &str = r#"
    site_id,
    datetime,
    daily_generation,
    solar_radiation,
    ac_avg_voltage,
    ac_total_power,
    ac_total_current,
    dc_avg_voltage,
    dc_total_power,
    dc_total_current,
    module_temperature,
    total_accumulated_generation,
    co2_reduction
"#;

/// Most recent snapshot for one site, if any.
pub async fn latest(pool: &PgPool, site_id: &str) -> Result<Option<SolarRecord>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM solar_data WHERE site_id = $1 ORDER BY datetime DESC LIMIT 1"
    );
    let row = sqlx::query_as::<_, SolarRecord>(&sql)
        .bind(site_id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Most recent snapshot of every site.
pub async fn latest_all_sites(pool: &PgPool) -> Result<Vec<SolarRecord>> {
    let sql = format!(
        "SELECT DISTINCT ON (site_id) {COLUMNS} FROM solar_data ORDER BY site_id, datetime DESC"
    );
    let rows = sqlx::query_as::<_, SolarRecord>(&sql).fetch_all(pool).await?;

    Ok(rows)
}

/// Snapshots for a site with `start <= datetime <= end`, newest first.
pub async fn history(
    pool: &PgPool,
    site_id: &str,
    start: OffsetDateTime,
    end: OffsetDateTime,
    limit: i64,
) -> Result<Vec<SolarRecord>> {
    let sql = format!(
        r#"
        SELECT {COLUMNS}
        FROM solar_data
        WHERE site_id = $1
          AND datetime BETWEEN $2 AND $3
        ORDER BY datetime DESC
        LIMIT $4
        "#
    );
    let rows = sqlx::query_as::<_, SolarRecord>(&sql)
        .bind(site_id)
        .bind(start)
        .bind(end)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}
