pub mod load_upsert;
#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use load_upsert::LoadUpsertSink;
pub use postgres::PgRecordStore;

use vpp_client::domain::{LoadRecord, ReserveRecord, SolarRecord};

use crate::pipeline::PipelineError;

/// Idempotent writes keyed on each record's natural key.
///
/// A single upsert replaces every non-key field of an existing row. Batch
/// variants are all-or-nothing: when any record fails, none of the batch is
/// visible afterwards and the error is returned.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    async fn upsert_solar(&self, record: &SolarRecord) -> Result<(), PipelineError>;
    async fn upsert_solar_batch(&self, records: &[SolarRecord]) -> Result<(), PipelineError>;

    async fn upsert_load(&self, record: &LoadRecord) -> Result<(), PipelineError>;
    async fn upsert_load_batch(&self, records: &[LoadRecord]) -> Result<(), PipelineError>;

    async fn upsert_reserve(&self, record: &ReserveRecord) -> Result<(), PipelineError>;
    async fn upsert_reserve_batch(&self, records: &[ReserveRecord]) -> Result<(), PipelineError>;
}
