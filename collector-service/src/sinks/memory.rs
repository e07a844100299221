//! In-memory `RecordStore` for exercising collectors and sinks without a database.

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
};

use time::{Date, OffsetDateTime};
use vpp_client::domain::{LoadRecord, ReserveRecord, SolarRecord};

use super::RecordStore;
use crate::pipeline::PipelineError;

#[derive(Default)]
struct Tables {
    solar: BTreeMap<(String, OffsetDateTime), SolarRecord>,
    load: BTreeMap<(String, OffsetDateTime), LoadRecord>,
    reserve: BTreeMap<(Date, i32), ReserveRecord>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    /// Fail the record at this position of every batch.
    fail_at: Mutex<Option<usize>>,
    /// Fail the next `n` write calls outright.
    fail_next: AtomicUsize,
    fail_always: AtomicBool,
    pub write_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn fail_batches_at(&self, index: usize) {
        *self.fail_at.lock().unwrap() = Some(index);
    }

    pub fn fail_next_writes(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    pub fn fail_always(&self) {
        self.fail_always.store(true, Ordering::SeqCst);
    }

    pub fn solar(&self) -> Vec<SolarRecord> {
        self.tables.lock().unwrap().solar.values().cloned().collect()
    }

    pub fn load(&self) -> Vec<LoadRecord> {
        self.tables.lock().unwrap().load.values().cloned().collect()
    }

    pub fn reserve(&self) -> Vec<ReserveRecord> {
        self.tables.lock().unwrap().reserve.values().cloned().collect()
    }

    fn check_call(&self) -> Result<(), PipelineError> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_always.load(Ordering::SeqCst) {
            return Err(PipelineError::Persist("injected failure".into()));
        }
        let pending = self.fail_next.load(Ordering::SeqCst);
        if pending > 0 {
            self.fail_next.store(pending - 1, Ordering::SeqCst);
            return Err(PipelineError::Persist("injected failure".into()));
        }
        Ok(())
    }

    /// Apply `write` for each record to a copy of the tables and swap it in
    /// only when every record succeeded.
    fn batch<R>(&self, records: &[R], write: impl Fn(&mut Tables, &R)) -> Result<(), PipelineError> {
        self.check_call()?;
        let fail_at = *self.fail_at.lock().unwrap();
        let mut guard = self.tables.lock().unwrap();
        let mut staged = Tables {
            solar: guard.solar.clone(),
            load: guard.load.clone(),
            reserve: guard.reserve.clone(),
        };
        for (i, r) in records.iter().enumerate() {
            if fail_at == Some(i) {
                return Err(PipelineError::Persist(format!("injected failure at record {i}")));
            }
            write(&mut staged, r);
        }
        *guard = staged;
        Ok(())
    }
}

fn put_solar(t: &mut Tables, r: &SolarRecord) {
    t.solar.insert((r.site_id.clone(), r.ts), r.clone());
}

fn put_load(t: &mut Tables, r: &LoadRecord) {
    t.load.insert((r.site_id.clone(), r.ts), r.clone());
}

fn put_reserve(t: &mut Tables, r: &ReserveRecord) {
    t.reserve.insert((r.tran_date, r.tran_hour), r.clone());
}

#[async_trait::async_trait]
impl RecordStore for MemoryStore {
    async fn upsert_solar(&self, record: &SolarRecord) -> Result<(), PipelineError> {
        self.check_call()?;
        put_solar(&mut self.tables.lock().unwrap(), record);
        Ok(())
    }

    async fn upsert_solar_batch(&self, records: &[SolarRecord]) -> Result<(), PipelineError> {
        self.batch(records, put_solar)
    }

    async fn upsert_load(&self, record: &LoadRecord) -> Result<(), PipelineError> {
        self.check_call()?;
        put_load(&mut self.tables.lock().unwrap(), record);
        Ok(())
    }

    async fn upsert_load_batch(&self, records: &[LoadRecord]) -> Result<(), PipelineError> {
        self.batch(records, put_load)
    }

    async fn upsert_reserve(&self, record: &ReserveRecord) -> Result<(), PipelineError> {
        self.check_call()?;
        put_reserve(&mut self.tables.lock().unwrap(), record);
        Ok(())
    }

    async fn upsert_reserve_batch(&self, records: &[ReserveRecord]) -> Result<(), PipelineError> {
        self.batch(records, put_reserve)
    }
}
