use async_trait::async_trait;
use redb::ReadableTable;

use super::db::{Database, DatabaseError};
use super::tables::*;
use crate::sidecar::{CounterError, DownloadCounter, DownloadCounts};

impl Database {
    // ========================================================================
    // Download count operations
    // ========================================================================

    pub fn get_count(&self, artifact_file: &str) -> Result<u64, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(DOWNLOAD_COUNTS)?;
        let count = table.get(artifact_file)?.map(|v| v.value()).unwrap_or(0);
        Ok(count)
    }

    /// Increment inside a single write transaction, so concurrent increments
    /// are never lost.
    pub fn increment_count(&self, artifact_file: &str) -> Result<u64, DatabaseError> {
        let write_txn = self.begin_write()?;
        let new_count = {
            let mut table = write_txn.open_table(DOWNLOAD_COUNTS)?;
            let current = table.get(artifact_file)?.map(|v| v.value()).unwrap_or(0);
            let new_count = current + 1;
            table.insert(artifact_file, new_count)?;
            new_count
        };
        write_txn.commit()?;
        Ok(new_count)
    }

    pub fn rename_count(&self, old_file: &str, new_file: &str) -> Result<(), DatabaseError> {
        if old_file == new_file {
            return Ok(());
        }
        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(DOWNLOAD_COUNTS)?;
            let moved = table.remove(old_file)?.map(|v| v.value());
            if let Some(count) = moved {
                table.insert(new_file, count)?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Remove a count. Returns whether one existed.
    pub fn remove_count(&self, artifact_file: &str) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;
        let existed = {
            let mut table = write_txn.open_table(DOWNLOAD_COUNTS)?;
            let removed = table.remove(artifact_file)?.is_some();
            removed
        };
        write_txn.commit()?;
        Ok(existed)
    }

    pub fn all_counts(&self) -> Result<DownloadCounts, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(DOWNLOAD_COUNTS)?;
        let mut counts = DownloadCounts::new();
        for entry in table.iter()? {
            let (key, value) = entry?;
            counts.insert(key.value().to_string(), value.value());
        }
        Ok(counts)
    }
}

#[async_trait]
impl DownloadCounter for Database {
    async fn count(&self, artifact_file: &str) -> Result<u64, CounterError> {
        Ok(self.get_count(artifact_file)?)
    }

    async fn increment(&self, artifact_file: &str) -> Result<u64, CounterError> {
        Ok(self.increment_count(artifact_file)?)
    }

    async fn rename(&self, old_file: &str, new_file: &str) -> Result<(), CounterError> {
        Ok(self.rename_count(old_file, new_file)?)
    }

    async fn forget(&self, artifact_file: &str) -> Result<(), CounterError> {
        self.remove_count(artifact_file)?;
        Ok(())
    }

    async fn snapshot(&self) -> Result<DownloadCounts, CounterError> {
        Ok(self.all_counts()?)
    }

    async fn clear(&self) -> Result<u64, CounterError> {
        Ok(self.purge_all()?.counts)
    }
}
