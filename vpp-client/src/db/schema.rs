use anyhow::{Context, Result};
use sqlx::PgPool;

// Table and column names are shared with the serving API and must not change.
// Each statement runs on its own; prepared statements reject multiple commands.
const STATEMENTS: &[(&str, &str)] = &[
    (
        "solar_data",
        r#"
        CREATE TABLE IF NOT EXISTS solar_data (
            id bigserial PRIMARY KEY,
            site_id text NOT NULL,
            datetime timestamptz NOT NULL,
            daily_generation double precision NOT NULL DEFAULT 0,
            solar_radiation double precision NOT NULL DEFAULT 0,
            ac_avg_voltage double precision NOT NULL DEFAULT 0,
            ac_total_power double precision NOT NULL DEFAULT 0,
            ac_total_current double precision NOT NULL DEFAULT 0,
            dc_avg_voltage double precision NOT NULL DEFAULT 0,
            dc_total_power double precision NOT NULL DEFAULT 0,
            dc_total_current double precision NOT NULL DEFAULT 0,
            module_temperature double precision NOT NULL DEFAULT 0,
            total_accumulated_generation double precision NOT NULL DEFAULT 0,
            co2_reduction double precision NOT NULL DEFAULT 0,
            UNIQUE (site_id, datetime)
        );
        "#,
    ),
    (
        "load_data",
        r#"
        CREATE TABLE IF NOT EXISTS load_data (
            id bigserial PRIMARY KEY,
            site_id text NOT NULL,
            datetime timestamptz NOT NULL,
            load_value double precision NOT NULL DEFAULT 0,
            UNIQUE (site_id, datetime)
        );
        "#,
    ),
    (
        "taipower_reserve_data",
        r#"
        CREATE TABLE IF NOT EXISTS taipower_reserve_data (
            id bigserial PRIMARY KEY,
            tran_date date NOT NULL,
            tran_hour integer NOT NULL,
            sr_bid double precision NOT NULL DEFAULT 0,
            sr_bid_qse double precision NOT NULL DEFAULT 0,
            sr_bid_nontrade double precision NOT NULL DEFAULT 0,
            sr_price double precision NOT NULL DEFAULT 0,
            sr_perf_price_1 double precision NOT NULL DEFAULT 0,
            sr_perf_price_2 double precision NOT NULL DEFAULT 0,
            sr_perf_price_3 double precision NOT NULL DEFAULT 0,
            sup_bid double precision NOT NULL DEFAULT 0,
            sup_bid_qse double precision NOT NULL DEFAULT 0,
            sup_bid_nontrade double precision NOT NULL DEFAULT 0,
            sup_price double precision NOT NULL DEFAULT 0,
            UNIQUE (tran_date, tran_hour)
        );
        "#,
    ),
    (
        "solar_data_site_ts_idx",
        "CREATE INDEX IF NOT EXISTS solar_data_site_ts_idx ON solar_data (site_id, datetime DESC);",
    ),
    (
        "load_data_site_ts_idx",
        "CREATE INDEX IF NOT EXISTS load_data_site_ts_idx ON load_data (site_id, datetime DESC);",
    ),
];

/// Create the collector tables if they do not exist yet.
///
/// The `UNIQUE` constraints are what the upserts resolve conflicts against.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    for (name, sql) in STATEMENTS {
        sqlx::query(sql)
            .execute(pool)
            .await
            .with_context(|| format!("creating {name}"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ddl(name: &str) -> &'static str {
        STATEMENTS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, sql)| *sql)
            .unwrap()
    }

    #[test]
    fn tables_use_shared_names() {
        assert!(ddl("solar_data").contains("UNIQUE (site_id, datetime)"));
        assert!(ddl("load_data").contains("UNIQUE (site_id, datetime)"));
        assert!(ddl("taipower_reserve_data").contains("CREATE TABLE IF NOT EXISTS taipower_reserve_data"));
    }

    #[test]
    fn reserve_hour_is_unconstrained() {
        assert!(!ddl("taipower_reserve_data").contains("CHECK"));
    }
}
