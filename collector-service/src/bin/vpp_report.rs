use anyhow::{Context, Result};
use collector_service::{config::AppConfig, sinks::postgres::connect_pool};
use serde_json::json;
use time::{macros::format_description, Date, OffsetDateTime};
use vpp_client::db::{load_queries, reserve_queries, solar_queries};

/// Print the latest readings per site and one day's reserve statistics as JSON.
#[tokio::main]
async fn main() -> Result<()> {
    let cfg = AppConfig::load()?;

    let date = match std::env::args().nth(1) {
        Some(arg) => Date::parse(&arg, format_description!("[year]-[month]-[day]"))
            .with_context(|| format!("invalid date {arg:?}, expected YYYY-MM-DD"))?,
        None => {
            let today = OffsetDateTime::now_utc().to_offset(cfg.reserve.offset()?).date();
            today.previous_day().unwrap_or(today)
        }
    };

    let pool = connect_pool(&cfg.database).await?;

    let solar = solar_queries::latest_all_sites(&pool).await?;
    let load = load_queries::latest_all_sites(&pool).await?;
    let reserve_hours = reserve_queries::by_date(&pool, date).await?.len();
    let reserve_stats = reserve_queries::statistics(&pool, date).await?;

    let report = json!({
        "date": date.to_string(),
        "solar_latest": solar,
        "load_latest": load,
        "reserve_hours": reserve_hours,
        "reserve_statistics": reserve_stats,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
