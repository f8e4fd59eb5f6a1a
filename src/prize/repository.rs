use async_trait::async_trait;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, instrument};

use super::models::PrizeArchiveEntry;
use crate::score::Period;
use crate::shared::AppError;

/// Write-once archive of finalized distributions.
#[async_trait]
pub trait PrizeArchiveRepository: Send + Sync {
    async fn get(&self, period: &Period) -> Result<Option<PrizeArchiveEntry>, AppError>;

    /// Stores the entry unless one already exists, and returns the canonical
    /// stored entry either way. This is what makes concurrent finalization
    /// of the same period converge on a single distribution.
    async fn put_if_absent(
        &self,
        period: &Period,
        entry: PrizeArchiveEntry,
    ) -> Result<PrizeArchiveEntry, AppError>;
}

/// In-memory implementation for development and testing.
pub struct InMemoryPrizeArchiveRepository {
    archives: Mutex<HashMap<String, PrizeArchiveEntry>>,
}

impl Default for InMemoryPrizeArchiveRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPrizeArchiveRepository {
    pub fn new() -> Self {
        Self {
            archives: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl PrizeArchiveRepository for InMemoryPrizeArchiveRepository {
    async fn get(&self, period: &Period) -> Result<Option<PrizeArchiveEntry>, AppError> {
        let archives = self.archives.lock().unwrap();
        Ok(archives.get(&period.to_string()).cloned())
    }

    #[instrument(skip(self, entry))]
    async fn put_if_absent(
        &self,
        period: &Period,
        entry: PrizeArchiveEntry,
    ) -> Result<PrizeArchiveEntry, AppError> {
        let mut archives = self.archives.lock().unwrap();
        match archives.entry(period.to_string()) {
            Entry::Occupied(existing) => {
                debug!(%period, "Archive already written, returning existing entry");
                Ok(existing.get().clone())
            }
            Entry::Vacant(slot) => {
                slot.insert(entry.clone());
                debug!(%period, awards = entry.distribution.len(), "Distribution archived");
                Ok(entry)
            }
        }
    }
}
