//! In-memory index of registration numbers already handed out.
//!
//! 1. Cuckoo filter: fast negative ("surely free"), only trusted once warmed.
//! 2. Moka cache: fast positive ("surely taken").
//! 3. Store: authoritative fallback.

use autoscale_cuckoo_filter::CuckooFilter;
use moka::future::Cache;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::model::Matricula;
use crate::store::{PersistencePort, StoreResult};

/// Expected capacity and false-positive rate.
const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

const CACHE_CAPACITY: u64 = 100_000;
const CACHE_TTL: Duration = Duration::from_secs(86_400);

pub struct MatriculaIndex {
    filter: RwLock<CuckooFilter<String>>,
    taken: Cache<String, ()>,
    warmed: AtomicBool,
}

impl Default for MatriculaIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl MatriculaIndex {
    pub fn new() -> Self {
        Self {
            filter: RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)),
            taken: Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(CACHE_TTL)
                .build(),
            warmed: AtomicBool::new(false),
        }
    }

    /// false positives possible, false negatives not (once warmed)
    fn might_exist(&self, matricula: &Matricula) -> bool {
        self.filter
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&matricula.to_string())
    }

    pub fn is_warmed(&self) -> bool {
        self.warmed.load(Ordering::Acquire)
    }

    /// Records a number that was just persisted.
    pub async fn insert(&self, matricula: &Matricula) {
        self.filter
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .add(&matricula.to_string());
        self.taken.insert(matricula.to_string(), ()).await;
    }

    /// Forgets a deleted number.
    pub async fn remove(&self, matricula: &Matricula) {
        self.filter
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&matricula.to_string());
        self.taken.invalidate(matricula.as_str()).await;
    }

    /// true => available, false => taken.
    pub async fn is_available(
        &self,
        matricula: &Matricula,
        store: &dyn PersistencePort,
    ) -> StoreResult<bool> {
        if self.is_warmed() && !self.might_exist(matricula) {
            return Ok(true);
        }

        if self.taken.contains_key(matricula.as_str()) {
            return Ok(false);
        }

        let exists = store.find_employee(matricula).await?.is_some();
        if exists {
            self.taken.insert(matricula.to_string(), ()).await;
        }
        Ok(!exists)
    }

    /// Loads every stored number, then starts trusting the filter.
    pub async fn warmup(&self, store: &dyn PersistencePort, batch_size: usize) -> StoreResult<usize> {
        let employees = store.list_employees().await?;
        let total = employees.len();

        for batch in employees.chunks(batch_size.max(1)) {
            {
                let mut filter = self.filter.write().unwrap_or_else(|e| e.into_inner());
                for e in batch {
                    filter.add(&e.matricula.to_string());
                }
            }

            let inserts: Vec<_> = batch
                .iter()
                .map(|e| self.taken.insert(e.matricula.to_string(), ()))
                .collect();
            futures::future::join_all(inserts).await;
        }

        self.warmed.store(true, Ordering::Release);
        log::info!("Matricula index warmup complete: {} employees", total);
        Ok(total)
    }
}
