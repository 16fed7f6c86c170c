use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::domain::{Ledger, format_cents};
use crate::storage::LedgerRecord;

/// Downloadable backup: the stored document plus the capture time.
#[derive(Debug, Clone, Serialize)]
pub struct BackupFile {
    #[serde(flatten)]
    pub record: LedgerRecord,
    pub timestamp: DateTime<Utc>,
}

/// `finance-tracker-backup-YYYY-MM-DD.json`
pub fn backup_file_name(date: NaiveDate) -> String {
    format!("finance-tracker-backup-{}.json", date.format("%Y-%m-%d"))
}

/// Exporter for writing ledger data to files
pub struct Exporter<'a> {
    ledger: &'a Ledger,
}

impl<'a> Exporter<'a> {
    pub fn new(ledger: &'a Ledger) -> Self {
        Self { ledger }
    }

    /// Write the full backup as pretty-printed JSON
    pub fn export_backup_json<W: Write>(
        &self,
        mut writer: W,
        timestamp: DateTime<Utc>,
    ) -> Result<BackupFile> {
        let backup = BackupFile {
            record: LedgerRecord::from(self.ledger),
            timestamp,
        };

        let json = serde_json::to_string_pretty(&backup)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(backup)
    }

    /// Export transactions to CSV, ordered by due date
    pub fn export_transactions_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["id", "name", "amount", "due_date", "type", "status"])?;

        let mut count = 0;
        for tx in self.ledger.ordered_by_due_date() {
            let due = match tx.due_date {
                Some(date) => date.format("%Y-%m-%d").to_string(),
                None => tx.due_label(),
            };
            csv_writer.write_record([
                tx.id.to_string(),
                tx.name.clone(),
                format_cents(tx.amount),
                due,
                tx.kind.as_str().to_string(),
                tx.status_label().to_string(),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }
}
