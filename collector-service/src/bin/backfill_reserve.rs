use anyhow::{bail, Context, Result};
use collector_service::{
    collectors::ReserveCollector,
    config::AppConfig,
    observability,
    sinks::{postgres::connect_pool, PgRecordStore},
};
use std::sync::Arc;
use time::{macros::format_description, Date};

fn parse_date(arg: &str) -> Result<Date> {
    Date::parse(arg, format_description!("[year]-[month]-[day]"))
        .with_context(|| format!("invalid date {arg:?}, expected YYYY-MM-DD"))
}

/// Re-scrape the reserve page for every day in an inclusive date range.
#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [from, to] = args.as_slice() else {
        bail!("usage: backfill_reserve <from YYYY-MM-DD> <to YYYY-MM-DD>");
    };
    let (from, to) = (parse_date(from)?, parse_date(to)?);
    if from > to {
        bail!("start date {from} is after end date {to}");
    }

    let cfg = AppConfig::load()?;
    let pool = connect_pool(&cfg.database).await?;
    if cfg.database.apply_schema {
        vpp_client::db::ensure_schema(&pool).await?;
    }
    let collector = ReserveCollector::from_config(&cfg.reserve, Arc::new(PgRecordStore::new(pool)))?;

    let mut failed = Vec::new();
    let mut written = 0usize;
    let mut day = Some(from);
    while let Some(date) = day.filter(|d| *d <= to) {
        match collector.collect_and_save(date).await {
            Ok(n) => written += n,
            Err(e) => {
                tracing::error!(date = %date, stage = e.stage(), error = %e, "backfill day failed");
                failed.push(date);
            }
        }
        day = date.next_day();
    }

    tracing::info!(%from, %to, written, failed = failed.len(), "reserve backfill finished");
    if !failed.is_empty() {
        bail!("{} day(s) failed: {:?}", failed.len(), failed);
    }
    Ok(())
}
