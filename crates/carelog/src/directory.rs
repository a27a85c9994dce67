//! The resident directory.
//!
//! The recorder only reads residents, renames them and hands over
//! [`DailyLog`]s; everything else about residents belongs to the directory.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::daily_log::DailyLog;
use crate::error::{Error, Result};
use crate::resident::{Resident, ResidentId, ResidentPatch};
use crate::storage::Storage;

/// A source of residents and a sink for daily logs.
#[async_trait::async_trait]
pub trait Directory: Send + Sync {
    /// All residents, in display order.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    async fn list_residents(&self) -> Result<Vec<Resident>>;

    /// Apply `patch` to the resident `id` and return the updated resident.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownResident`] if there is no such resident, or an
    /// error if the directory rejects the write.
    async fn update_resident(&self, id: &ResidentId, patch: ResidentPatch) -> Result<Resident>;

    /// Store a daily log and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory rejects the write.
    async fn append_log(&self, log: DailyLog) -> Result<DailyLog>;
}

/// Directory backed by the `residents` and `daily_logs` tables.
#[derive(Debug, Clone)]
pub struct SqliteDirectory {
    storage: Arc<Storage>,
}

impl SqliteDirectory {
    /// Create a directory over `storage`.
    #[must_use]
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    /// Add or replace a resident.
    ///
    /// # Errors
    ///
    /// Returns an error if the database write fails.
    pub fn add_resident(&self, resident: &Resident) -> Result<()> {
        self.storage.upsert_resident(resident)?;
        info!("Added resident {} ({})", resident.id, resident.name);
        Ok(())
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Storage) -> Result<T> + Send + 'static,
    {
        let storage = Arc::clone(&self.storage);
        tokio::task::spawn_blocking(move || f(&storage))
            .await
            .map_err(|e| Error::internal(format!("directory task failed: {e}")))?
    }
}

#[async_trait::async_trait]
impl Directory for SqliteDirectory {
    async fn list_residents(&self) -> Result<Vec<Resident>> {
        self.blocking(Storage::list_residents).await
    }

    async fn update_resident(&self, id: &ResidentId, patch: ResidentPatch) -> Result<Resident> {
        let id = id.clone();
        self.blocking(move |storage| {
            let mut resident = storage
                .get_resident(&id)?
                .ok_or_else(|| Error::UnknownResident(id.to_string()))?;
            patch.apply(&mut resident);
            storage.upsert_resident(&resident)?;
            debug!("Updated resident {}", id);
            Ok(resident)
        })
        .await
    }

    async fn append_log(&self, log: DailyLog) -> Result<DailyLog> {
        self.blocking(move |storage| storage.insert_daily_log(&log))
            .await
    }
}

/// Directory held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    residents: RwLock<Vec<Resident>>,
    logs: RwLock<Vec<DailyLog>>,
}

impl MemoryDirectory {
    /// Create a directory with the given residents.
    #[must_use]
    pub fn with_residents(residents: Vec<Resident>) -> Self {
        Self {
            residents: RwLock::new(residents),
            logs: RwLock::default(),
        }
    }

    /// Daily logs appended so far.
    pub async fn logs(&self) -> Vec<DailyLog> {
        self.logs.read().await.clone()
    }
}

#[async_trait::async_trait]
impl Directory for MemoryDirectory {
    async fn list_residents(&self) -> Result<Vec<Resident>> {
        Ok(self.residents.read().await.clone())
    }

    async fn update_resident(&self, id: &ResidentId, patch: ResidentPatch) -> Result<Resident> {
        let mut residents = self.residents.write().await;
        let resident = residents
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| Error::UnknownResident(id.to_string()))?;
        patch.apply(resident);
        Ok(resident.clone())
    }

    async fn append_log(&self, mut log: DailyLog) -> Result<DailyLog> {
        let mut logs = self.logs.write().await;
        log.id = Some((logs.len() + 1).to_string());
        logs.push(log.clone());
        Ok(log)
    }
}
