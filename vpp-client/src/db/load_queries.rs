use anyhow::Result;
use sqlx::PgPool;
use time::OffsetDateTime;

use crate::domain::LoadRecord;

pub async fn latest(pool: &PgPool, site_id: &str) -> Result<Option<LoadRecord>> {
    let row = sqlx::query_as::<_, LoadRecord>(
        r#"
        SELECT site_id, datetime, load_value
        FROM load_data
        WHERE site_id = $1
        ORDER BY datetime DESC
        LIMIT 1
        "#,
    )
    .bind(site_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn latest_all_sites(pool: &PgPool) -> Result<Vec<LoadRecord>> {
    let rows = sqlx::query_as::<_, LoadRecord>(
        r#"
        SELECT DISTINCT ON (site_id) site_id, datetime, load_value
        FROM load_data
        ORDER BY site_id, datetime DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn history(
    pool: &PgPool,
    site_id: &str,
    start: OffsetDateTime,
    end: OffsetDateTime,
    limit: i64,
) -> Result<Vec<LoadRecord>> {
    let rows = sqlx::query_as::<_, LoadRecord>(
        r#"
        SELECT site_id, datetime, load_value
        FROM load_data
        WHERE site_id = $1
          AND datetime BETWEEN $2 AND $3
        ORDER BY datetime DESC
        LIMIT $4
        "#,
    )
    .bind(site_id)
    .bind(start)
    .bind(end)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
