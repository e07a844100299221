use std::{str::FromStr, time::Duration};

use sqlx::{
    postgres::{PgConnectOptions, PgPool, PgPoolOptions},
    PgExecutor,
};
use vpp_client::domain::{LoadRecord, ReserveRecord, SolarRecord};

use super::RecordStore;
use crate::{config::DatabaseConfig, pipeline::PipelineError};

const UPSERT_SOLAR: &str = r#"
    INSERT INTO solar_data (
        site_id, datetime, daily_generation, solar_radiation,
        ac_avg_voltage, ac_total_power, ac_total_current,
        dc_avg_voltage, dc_total_power, dc_total_current,
        module_temperature, total_accumulated_generation, co2_reduction
    ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
    ON CONFLICT (site_id, datetime) DO UPDATE SET
        daily_generation = EXCLUDED.daily_generation,
        solar_radiation = EXCLUDED.solar_radiation,
        ac_avg_voltage = EXCLUDED.ac_avg_voltage,
        ac_total_power = EXCLUDED.ac_total_power,
        ac_total_current = EXCLUDED.ac_total_current,
        dc_avg_voltage = EXCLUDED.dc_avg_voltage,
        dc_total_power = EXCLUDED.dc_total_power,
        dc_total_current = EXCLUDED.dc_total_current,
        module_temperature = EXCLUDED.module_temperature,
        total_accumulated_generation = EXCLUDED.total_accumulated_generation,
        co2_reduction = EXCLUDED.co2_reduction
"#;

const UPSERT_LOAD: &str = r#"
    INSERT INTO load_data (site_id, datetime, load_value)
    VALUES ($1, $2, $3)
    ON CONFLICT (site_id, datetime) DO UPDATE SET
        load_value = EXCLUDED.load_value
"#;

const UPSERT_RESERVE: &str = r#"
    INSERT INTO taipower_reserve_data (
        tran_date, tran_hour, sr_bid, sr_bid_qse, sr_bid_nontrade,
        sr_price, sr_perf_price_1, sr_perf_price_2, sr_perf_price_3,
        sup_bid, sup_bid_qse, sup_bid_nontrade, sup_price
    ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
    ON CONFLICT (tran_date, tran_hour) DO UPDATE SET
        sr_bid = EXCLUDED.sr_bid,
        sr_bid_qse = EXCLUDED.sr_bid_qse,
        sr_bid_nontrade = EXCLUDED.sr_bid_nontrade,
        sr_price = EXCLUDED.sr_price,
        sr_perf_price_1 = EXCLUDED.sr_perf_price_1,
        sr_perf_price_2 = EXCLUDED.sr_perf_price_2,
        sr_perf_price_3 = EXCLUDED.sr_perf_price_3,
        sup_bid = EXCLUDED.sup_bid,
        sup_bid_qse = EXCLUDED.sup_bid_qse,
        sup_bid_nontrade = EXCLUDED.sup_bid_nontrade,
        sup_price = EXCLUDED.sup_price
"#;

async fn exec_solar<'e, E: PgExecutor<'e>>(exec: E, r: &SolarRecord) -> Result<(), sqlx::Error> {
    sqlx::query(UPSERT_SOLAR)
        .bind(&r.site_id)
        .bind(r.ts)
        .bind(r.daily_generation)
        .bind(r.solar_radiation)
        .bind(r.ac_avg_voltage)
        .bind(r.ac_total_power)
        .bind(r.ac_total_current)
        .bind(r.dc_avg_voltage)
        .bind(r.dc_total_power)
        .bind(r.dc_total_current)
        .bind(r.module_temperature)
        .bind(r.total_accumulated_generation)
        .bind(r.co2_reduction)
        .execute(exec)
        .await
        .map(|_| ())
}

async fn exec_load<'e, E: PgExecutor<'e>>(exec: E, r: &LoadRecord) -> Result<(), sqlx::Error> {
    sqlx::query(UPSERT_LOAD)
        .bind(&r.site_id)
        .bind(r.ts)
        .bind(r.load_value)
        .execute(exec)
        .await
        .map(|_| ())
}

async fn exec_reserve<'e, E: PgExecutor<'e>>(exec: E, r: &ReserveRecord) -> Result<(), sqlx::Error> {
    sqlx::query(UPSERT_RESERVE)
        .bind(r.tran_date)
        .bind(r.tran_hour)
        .bind(r.sr_bid)
        .bind(r.sr_bid_qse)
        .bind(r.sr_bid_nontrade)
        .bind(r.sr_price)
        .bind(r.sr_perf_price_1)
        .bind(r.sr_perf_price_2)
        .bind(r.sr_perf_price_3)
        .bind(r.sup_bid)
        .bind(r.sup_bid_qse)
        .bind(r.sup_bid_nontrade)
        .bind(r.sup_price)
        .execute(exec)
        .await
        .map(|_| ())
}

/// Open a pool whose sessions carry a `statement_timeout`, so a hung write
/// cannot stall a collector forever.
pub async fn connect_pool(cfg: &DatabaseConfig) -> anyhow::Result<PgPool> {
    let options = PgConnectOptions::from_str(&cfg.uri)?
        .options([("statement_timeout", cfg.statement_timeout_ms.to_string())]);

    let pool = PgPoolOptions::new()
        .max_connections(cfg.max_connections)
        .acquire_timeout(Duration::from_secs(cfg.acquire_timeout_secs))
        .connect_with(options)
        .await?;

    Ok(pool)
}

#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Each batch runs in one transaction. An early return drops `tx`, which rolls back.
#[async_trait::async_trait]
impl RecordStore for PgRecordStore {
    async fn upsert_solar(&self, record: &SolarRecord) -> Result<(), PipelineError> {
        exec_solar(&self.pool, record).await?;
        Ok(())
    }

    async fn upsert_solar_batch(&self, records: &[SolarRecord]) -> Result<(), PipelineError> {
        let mut tx = self.pool.begin().await?;
        for r in records {
            exec_solar(&mut *tx, r).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn upsert_load(&self, record: &LoadRecord) -> Result<(), PipelineError> {
        exec_load(&self.pool, record).await?;
        Ok(())
    }

    async fn upsert_load_batch(&self, records: &[LoadRecord]) -> Result<(), PipelineError> {
        let mut tx = self.pool.begin().await?;
        for r in records {
            exec_load(&mut *tx, r).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn upsert_reserve(&self, record: &ReserveRecord) -> Result<(), PipelineError> {
        exec_reserve(&self.pool, record).await?;
        Ok(())
    }

    async fn upsert_reserve_batch(&self, records: &[ReserveRecord]) -> Result<(), PipelineError> {
        let mut tx = self.pool.begin().await?;
        for r in records {
            exec_reserve(&mut *tx, r).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
