// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Result, bail};
use chrono::NaiveDate;
use tallybook::application::TrackerService;
use tallybook::storage::{DocumentStore, LedgerRecord, SqliteStore};
use tempfile::TempDir;

pub const USER: &str = "test-user";

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(TrackerService<SqliteStore>, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = TrackerService::init(db_path.to_str().unwrap(), USER).await?;
    Ok((service, temp_dir))
}

/// Open a second service on the same database file, as a fresh session would
pub async fn reopen(temp_dir: &TempDir) -> Result<TrackerService<SqliteStore>> {
    let db_path = temp_dir.path().join("test.db");
    Ok(TrackerService::init(db_path.to_str().unwrap(), USER).await?)
}

/// Helper to parse a date string into NaiveDate
pub fn parse_date(date_str: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
}

/// Store that can be told to fail reads or writes
#[derive(Default)]
pub struct FlakyStore {
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
}

impl FlakyStore {
    pub fn failing_reads() -> Self {
        let store = Self::default();
        store.fail_reads.store(true, Ordering::SeqCst);
        store
    }

    pub fn failing_writes() -> Self {
        let store = Self::default();
        store.fail_writes.store(true, Ordering::SeqCst);
        store
    }
}

impl DocumentStore for FlakyStore {
    async fn read(&self, _user_id: &str) -> Result<Option<LedgerRecord>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            bail!("connection refused");
        }
        Ok(None)
    }

    async fn write(&self, _user_id: &str, _record: &LedgerRecord) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("disk full");
        }
        Ok(())
    }

    async fn delete(&self, _user_id: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("disk full");
        }
        Ok(())
    }
}
