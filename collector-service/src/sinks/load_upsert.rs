use std::{sync::Arc, time::Duration};

use tokio_stream::StreamExt;
use vpp_client::domain::LoadRecord;

use super::RecordStore;
use crate::pipeline::{Envelope, PipelineError, Sink};

/// Writes uploaded load readings in groups of up to `batch_size`, flushing a
/// partial group once `flush_interval` has passed since its first reading.
pub struct LoadUpsertSink {
    store: Arc<dyn RecordStore>,
    batch_size: usize,
    flush_interval: Duration,
    max_retries: u32,
    retry_backoff: Duration,
}

impl LoadUpsertSink {
    pub fn new(
        store: Arc<dyn RecordStore>,
        batch_size: usize,
        flush_interval: Duration,
        max_retries: u32,
        retry_backoff: Duration,
    ) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
            flush_interval,
            max_retries,
            retry_backoff,
        }
    }

    async fn flush_batch(&self, batch: &[Envelope<LoadRecord>]) -> Result<(), PipelineError> {
        if batch.is_empty() {
            return Ok(());
        }
        let records: Vec<LoadRecord> = batch.iter().map(|e| e.payload.clone()).collect();

        let mut attempt: u32 = 0;
        loop {
            match self.store.upsert_load_batch(&records).await {
                Ok(()) => {
                    metrics::counter!("collector_records_upserted_total", "collector" => "upload")
                        .increment(records.len() as u64);
                    return Ok(());
                }
                Err(e) if attempt < self.max_retries => {
                    attempt += 1;
                    let sleep_for = self.retry_backoff * attempt;
                    tracing::warn!(
                        error = %e,
                        attempt,
                        "load upsert failed, retrying with backoff"
                    );
                    tokio::time::sleep(sleep_for).await;
                }
                Err(e) => {
                    tracing::error!(error = %e, records = records.len(), "load upsert failed, giving up");
                    metrics::counter!("upload_sink_errors_total").increment(1);
                    return Err(e);
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl Sink<LoadRecord> for LoadUpsertSink {
    async fn run<S>(&self, input: S) -> Result<(), PipelineError>
    where
        S: futures::Stream<Item = Result<Envelope<LoadRecord>, PipelineError>> + Send + Unpin + 'static,
    {
        let accepted = input.filter_map(|item| match item {
            Ok(env) => Some(env),
            Err(e) => {
                tracing::warn!(error = %e, stage = e.stage(), "dropping upload reading");
                None
            }
        });
        let batches = accepted.chunks_timeout(self.batch_size, self.flush_interval);
        tokio::pin!(batches);

        while let Some(batch) = batches.next().await {
            // A group that exhausted its retries is dropped; the ingest keeps running.
            let _ = self.flush_batch(&batch).await;
        }

        Ok(())
    }
}
