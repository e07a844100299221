use std::sync::Arc;

use time::OffsetDateTime;
use vpp_client::domain::SolarRecord;

use super::truncate_to_second;
use crate::{
    config::SolarConfig,
    fetch::{BasicAuth, HttpFetcher},
    pipeline::PipelineError,
    schedule::Cycle,
    sinks::RecordStore,
    transform::parse_solar_payload,
};

/// Polls the inverter vendor API for one site and upserts one snapshot per cycle.
pub struct SolarCollector {
    fetcher: HttpFetcher,
    store: Arc<dyn RecordStore>,
    api_url: String,
    site_id: String,
    auth: Option<BasicAuth>,
}

impl SolarCollector {
    pub fn new(
        fetcher: HttpFetcher,
        store: Arc<dyn RecordStore>,
        api_url: impl Into<String>,
        site_id: impl Into<String>,
        auth: Option<BasicAuth>,
    ) -> Self {
        Self {
            fetcher,
            store,
            api_url: api_url.into(),
            site_id: site_id.into(),
            auth,
        }
    }

    pub fn from_config(cfg: &SolarConfig, store: Arc<dyn RecordStore>) -> Result<Self, PipelineError> {
        let fetcher = HttpFetcher::new(cfg.request_timeout())?;
        let auth = BasicAuth::from_parts(cfg.username.as_deref(), cfg.password.as_deref());
        Ok(Self::new(fetcher, store, &cfg.api_url, &cfg.site_id, auth))
    }

    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    /// Fetch and parse one snapshot stamped at `collected_at` (to the second).
    pub async fn fetch(&self, collected_at: OffsetDateTime) -> Result<SolarRecord, PipelineError> {
        let body = self.fetcher.get_text(&self.api_url, self.auth.as_ref()).await?;
        parse_solar_payload(&body, &self.site_id, truncate_to_second(collected_at))
    }

    pub async fn collect_and_save(&self, now: OffsetDateTime) -> Result<SolarRecord, PipelineError> {
        tracing::info!(site_id = %self.site_id, "collecting solar data");

        let record = self.fetch(now).await?;
        self.store.upsert_solar(&record).await?;

        tracing::info!(site_id = %self.site_id, ts = %record.ts, "solar data collected");
        Ok(record)
    }
}

#[async_trait::async_trait]
impl Cycle for SolarCollector {
    fn name(&self) -> &'static str {
        "solar"
    }

    async fn run_cycle(&self, now: OffsetDateTime) -> Result<usize, PipelineError> {
        match self.collect_and_save(now).await {
            Ok(_) => Ok(1),
            Err(e) => {
                tracing::error!(
                    site_id = %self.site_id,
                    stage = e.stage(),
                    error = %e,
                    "solar collection failed"
                );
                Err(e)
            }
        }
    }
}
