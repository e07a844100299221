use std::sync::Arc;

use time::{Date, OffsetDateTime, UtcOffset};

use crate::{
    config::ReserveConfig,
    fetch::{reserve_url, HttpFetcher},
    pipeline::PipelineError,
    schedule::Cycle,
    sinks::RecordStore,
    transform::parse_reserve_html,
};

/// Scrapes one trading day of hourly reserve data and stores it as one batch.
pub struct ReserveCollector {
    fetcher: HttpFetcher,
    store: Arc<dyn RecordStore>,
    base_url: String,
    utc_offset: UtcOffset,
}

impl ReserveCollector {
    pub fn new(
        fetcher: HttpFetcher,
        store: Arc<dyn RecordStore>,
        base_url: impl Into<String>,
        utc_offset: UtcOffset,
    ) -> Self {
        Self {
            fetcher,
            store,
            base_url: base_url.into(),
            utc_offset,
        }
    }

    pub fn from_config(cfg: &ReserveConfig, store: Arc<dyn RecordStore>) -> anyhow::Result<Self> {
        let fetcher = HttpFetcher::new(cfg.request_timeout())?;
        Ok(Self::new(fetcher, store, &cfg.base_url, cfg.offset()?))
    }

    /// The local calendar day before `now`.
    pub fn target_date(&self, now: OffsetDateTime) -> Date {
        let today = now.to_offset(self.utc_offset).date();
        today.previous_day().unwrap_or(today)
    }

    /// Fetch, parse and batch-upsert every hour of `date`.
    ///
    /// A page with no data rows is an error and nothing is written. A partial
    /// day is stored as-is.
    pub async fn collect_and_save(&self, date: Date) -> Result<usize, PipelineError> {
        tracing::info!(date = %date, "collecting reserve data");

        let url = reserve_url(&self.base_url, date);
        let body = self.fetcher.get_text(&url, None).await?;
        let records = parse_reserve_html(&body, date);

        if records.is_empty() {
            return Err(PipelineError::EmptyResult(format!("no reserve rows for {date}")));
        }
        if records.len() < 24 {
            tracing::warn!(date = %date, count = records.len(), "reserve day is incomplete");
        }

        self.store.upsert_reserve_batch(&records).await?;

        tracing::info!(date = %date, count = records.len(), "reserve data collected");
        Ok(records.len())
    }
}

#[async_trait::async_trait]
impl Cycle for ReserveCollector {
    fn name(&self) -> &'static str {
        "reserve"
    }

    async fn run_cycle(&self, now: OffsetDateTime) -> Result<usize, PipelineError> {
        let date = self.target_date(now);
        match self.collect_and_save(date).await {
            Ok(n) => Ok(n),
            Err(e) => {
                tracing::error!(date = %date, stage = e.stage(), error = %e, "reserve collection failed");
                Err(e)
            }
        }
    }
}
