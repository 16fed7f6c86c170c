use std::io::Read;

use serde_json::Value;
use tracing::info;

use crate::application::{AppError, Outcome, TrackerService};
use crate::domain::{Cents, Ledger};
use crate::storage::{DocumentStore, LedgerRecord, has_ledger_data, undecodable_list};

/// What a restored backup contained
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub transactions: usize,
    pub savings_accounts: usize,
    pub cleaned_days: usize,
    pub initial_balance: Cents,
}

impl ImportSummary {
    fn of(ledger: &Ledger) -> Self {
        Self {
            transactions: ledger.transactions().len(),
            savings_accounts: ledger.savings().len(),
            cleaned_days: ledger.cleaned_days().len(),
            initial_balance: ledger.initial_balance(),
        }
    }
}

/// Parse and check a backup file without touching any ledger.
///
/// Rejects input that is not a JSON object, that has none of `myBills`,
/// `myBalance` and `mySavings`, or whose list fields cannot be decoded.
/// Array fields stored as JSON strings by older backups are decoded
/// transparently.
pub fn read_backup<R: Read>(reader: R) -> Result<LedgerRecord, AppError> {
    let value: Value = serde_json::from_reader(reader)
        .map_err(|e| AppError::ImportFormat(format!("not valid JSON ({})", e)))?;

    let Value::Object(map) = &value else {
        return Err(AppError::ImportFormat("expected a JSON object".to_string()));
    };
    if !has_ledger_data(map) {
        return Err(AppError::ImportFormat(
            "missing data (no myBills, myBalance or mySavings)".to_string(),
        ));
    }
    if let Some(label) = undecodable_list(map) {
        return Err(AppError::ImportFormat(format!("{} is not a list", label)));
    }

    Ok(LedgerRecord::from_value(value))
}

/// Importer for restoring a backup into a user's ledger
pub struct Importer<'a, S: DocumentStore> {
    service: &'a mut TrackerService<S>,
}

impl<'a, S: DocumentStore> Importer<'a, S> {
    pub fn new(service: &'a mut TrackerService<S>) -> Self {
        Self { service }
    }

    /// Replace the whole ledger with the backup's contents and persist it.
    /// Nothing changes if the file is rejected.
    pub async fn restore<R: Read>(&mut self, reader: R) -> Result<Outcome<ImportSummary>, AppError> {
        let record = read_backup(reader)?;
        let ledger = Ledger::from(record);
        let summary = ImportSummary::of(&ledger);

        info!(
            user = self.service.user_id(),
            transactions = summary.transactions,
            savings = summary.savings_accounts,
            "restoring backup"
        );

        let outcome = self.service.replace_ledger(ledger).await;
        Ok(Outcome {
            value: Some(summary),
            sync: outcome.sync,
        })
    }
}
