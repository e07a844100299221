use anyhow::Result;
use collector_service::{
    collectors::{ReserveCollector, SolarCollector},
    config::{AppConfig, UploadConfig},
    metrics_server, observability,
    pipeline::{Pipeline, Transform},
    schedule,
    sinks::{postgres::connect_pool, LoadUpsertSink, PgRecordStore, RecordStore},
    sources::HttpUploadSource,
    transform::LoadValidation,
};
use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use vpp_client::domain::LoadRecord;

async fn spawn_upload(cfg: &UploadConfig, store: Arc<dyn RecordStore>) -> Result<JoinHandle<()>> {
    let source = HttpUploadSource::bind(&cfg.bind_addr, cfg.channel_capacity).await?;
    let sink = LoadUpsertSink::new(
        store,
        cfg.batch_size,
        Duration::from_millis(cfg.flush_interval_ms),
        cfg.max_retries,
        Duration::from_millis(cfg.retry_backoff_ms),
    );
    let validation: Arc<dyn Transform<LoadRecord, LoadRecord> + Send + Sync> =
        Arc::new(LoadValidation::new(cfg.sites.iter().cloned()));
    let pipeline: Pipeline<_, LoadRecord, _> = Pipeline {
        source,
        transforms: vec![validation],
        sink,
    };

    Ok(tokio::spawn(async move {
        if let Err(e) = pipeline.run().await {
            tracing::error!(error = %e, "upload pipeline stopped");
        }
    }))
}

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;

    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    let pool = connect_pool(&cfg.database).await?;
    if cfg.database.apply_schema {
        vpp_client::db::ensure_schema(&pool).await?;
    }
    let store: Arc<dyn RecordStore> = Arc::new(PgRecordStore::new(pool));

    let solar = SolarCollector::from_config(&cfg.solar, store.clone())?;
    let reserve = ReserveCollector::from_config(&cfg.reserve, store.clone())?;
    let run_at = cfg.reserve.run_at_time()?;
    let offset = cfg.reserve.offset()?;
    let interval = cfg.solar.interval();

    let mut tasks = vec![
        tokio::spawn(async move { schedule::run_fixed_interval(&solar, interval).await }),
        tokio::spawn(async move { schedule::run_daily_at(&reserve, run_at, offset).await }),
    ];
    if let Some(upload_cfg) = &cfg.upload {
        tasks.push(spawn_upload(upload_cfg, store.clone()).await?);
    }

    tracing::info!(site_id = %cfg.solar.site_id, "collector service started");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested, stopping collectors");
    for task in &tasks {
        task.abort();
    }

    Ok(())
}
