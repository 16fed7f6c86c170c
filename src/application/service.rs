use chrono::{NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::domain::{
    CalendarMonth, Cents, Ledger, LedgerError, NameTotal, SavingsAccount, Totals, Transaction,
    TransactionId, TransactionKind,
};
use crate::storage::{DocumentStore, LedgerRecord, SqliteStore};

use super::AppError;

/// Whether the document store accepted the state produced by a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    /// The new state was written
    Saved,
    /// The write failed; the in-memory state is kept but not durable
    Failed(String),
    /// Nothing changed, so nothing was written
    Skipped,
}

/// Result of a command that was accepted.
///
/// `value` is `None` when the command referred to a transaction or account
/// that does not exist, which is treated as a no-op.
#[derive(Debug, Clone)]
pub struct Outcome<T> {
    pub value: Option<T>,
    pub sync: SyncStatus,
}

impl<T> Outcome<T> {
    fn applied(value: T, sync: SyncStatus) -> Self {
        Self {
            value: Some(value),
            sync,
        }
    }

    fn skipped() -> Self {
        Self {
            value: None,
            sync: SyncStatus::Skipped,
        }
    }

    pub fn is_applied(&self) -> bool {
        self.value.is_some()
    }

    pub fn is_synced(&self) -> bool {
        !matches!(self.sync, SyncStatus::Failed(_))
    }
}

/// Application service owning one user's ledger.
/// This is the primary interface for any client (CLI, API, TUI, etc.).
///
/// Every command is applied to the in-memory ledger first and then the whole
/// document is written. A failed write is reported in the outcome and never
/// rolls the ledger back.
pub struct TrackerService<S: DocumentStore> {
    store: S,
    user_id: String,
    ledger: Ledger,
    load_error: Option<String>,
}

impl TrackerService<SqliteStore> {
    /// Open (creating if needed) a SQLite database and load the user's ledger.
    pub async fn init(database_path: &str, user_id: &str) -> Result<Self, AppError> {
        let store = SqliteStore::open(database_path).await?;
        Ok(Self::open(store, user_id).await)
    }
}

impl<S: DocumentStore> TrackerService<S> {
    /// Load the user's ledger from the store.
    ///
    /// A missing document starts an empty ledger. A failed read also starts
    /// empty so the session stays usable; the failure is kept in
    /// [`load_error`](Self::load_error).
    pub async fn open(store: S, user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        let (ledger, load_error) = match store.read(&user_id).await {
            Ok(Some(record)) => {
                let ledger = Ledger::from(record);
                info!(
                    user = %user_id,
                    transactions = ledger.transactions().len(),
                    savings = ledger.savings().len(),
                    "ledger loaded"
                );
                (ledger, None)
            }
            Ok(None) => {
                info!(user = %user_id, "no existing data, starting fresh");
                (Ledger::new(), None)
            }
            Err(e) => {
                warn!(user = %user_id, error = %format!("{:#}", e), "failed to load ledger, starting empty");
                (Ledger::new(), Some(format!("{:#}", e)))
            }
        };

        Self {
            store,
            user_id,
            ledger,
            load_error,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Why the initial load failed, if it did.
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    // ========================
    // Queries
    // ========================

    pub fn totals(&self) -> Totals {
        self.ledger.totals()
    }

    pub fn total_savings(&self) -> Cents {
        self.ledger.savings().total()
    }

    pub fn ordered_transactions(&self) -> Vec<&Transaction> {
        self.ledger.ordered_by_due_date()
    }

    pub fn savings_accounts(&self) -> &[SavingsAccount] {
        self.ledger.savings().accounts()
    }

    pub fn calendar_month(&self, year: i32, month: u32) -> Result<CalendarMonth, AppError> {
        self.ledger
            .calendar_month(year, month)
            .ok_or_else(|| AppError::Validation(format!("no such month: {}-{:02}", year, month)))
    }

    pub fn breakdown(&self, kind: TransactionKind, limit: usize) -> Vec<NameTotal> {
        self.ledger.breakdown(kind, limit)
    }

    // ========================
    // Transaction commands
    // ========================

    pub async fn add_transaction(
        &mut self,
        name: &str,
        amount: Cents,
        due_date: Option<NaiveDate>,
        kind: TransactionKind,
    ) -> Result<Outcome<TransactionId>, AppError> {
        let result = self.ledger.add_transaction(name, amount, due_date, kind);
        self.commit("add transaction", result).await
    }

    pub async fn update_transaction(
        &mut self,
        id: TransactionId,
        name: &str,
        amount: Cents,
        due_date: Option<NaiveDate>,
        kind: TransactionKind,
    ) -> Result<Outcome<()>, AppError> {
        let result = self
            .ledger
            .update_transaction(id, name, amount, due_date, kind);
        self.commit("update transaction", result).await
    }

    pub async fn remove_transaction(
        &mut self,
        id: TransactionId,
    ) -> Result<Outcome<Transaction>, AppError> {
        let result = self.ledger.remove_transaction(id);
        self.commit("remove transaction", result).await
    }

    pub async fn toggle_status(&mut self, id: TransactionId) -> Result<Outcome<bool>, AppError> {
        let result = self.ledger.toggle_status(id);
        self.commit("toggle status", result).await
    }

    // ========================
    // Balance and calendar commands
    // ========================

    pub async fn set_initial_balance(&mut self, value: Cents) -> Outcome<()> {
        self.ledger.set_initial_balance(value);
        Outcome::applied((), self.persist().await)
    }

    pub async fn reset_initial_balance(&mut self) -> Outcome<()> {
        self.ledger.reset_initial_balance();
        Outcome::applied((), self.persist().await)
    }

    /// Returns whether the day is now marked.
    pub async fn toggle_cleaned_day(&mut self, date: NaiveDate) -> Outcome<bool> {
        let cleaned = self.ledger.toggle_cleaned_day(date);
        Outcome::applied(cleaned, self.persist().await)
    }

    // ========================
    // Savings commands
    // ========================

    pub async fn add_account(&mut self, name: &str, amount: Cents) -> Result<Outcome<usize>, AppError> {
        let result = self.ledger.savings_mut().add_account(name, amount);
        self.commit("add savings account", result).await
    }

    /// Cash deposit into a savings account. Returns the new account balance.
    pub async fn deposit(&mut self, index: usize, amount: Cents) -> Result<Outcome<Cents>, AppError> {
        let result = self.ledger.savings_mut().deposit(index, amount);
        self.commit("deposit", result).await
    }

    pub async fn transfer_from_checking(
        &mut self,
        index: usize,
        amount: Cents,
    ) -> Result<Outcome<TransactionId>, AppError> {
        let result = self.ledger.transfer_from_checking(index, amount, today());
        self.commit("transfer to savings", result).await
    }

    pub async fn withdraw_to_checking(
        &mut self,
        index: usize,
        amount: Cents,
    ) -> Result<Outcome<TransactionId>, AppError> {
        let result = self.ledger.withdraw_to_checking(index, amount, today());
        self.commit("withdraw from savings", result).await
    }

    pub async fn remove_account(&mut self, index: usize) -> Result<Outcome<SavingsAccount>, AppError> {
        let result = self.ledger.savings_mut().remove_account(index);
        self.commit("remove savings account", result).await
    }

    // ========================
    // Whole-ledger commands
    // ========================

    /// Swap in a complete ledger (used by backup restore) and persist it.
    pub async fn replace_ledger(&mut self, ledger: Ledger) -> Outcome<()> {
        self.ledger = ledger;
        info!(user = %self.user_id, "ledger replaced");
        Outcome::applied((), self.persist().await)
    }

    /// Delete the stored document and clear the in-memory ledger.
    /// Unlike other commands, a storage failure here is an error and nothing is cleared.
    pub async fn reset_all(&mut self) -> Result<(), AppError> {
        self.store.delete(&self.user_id).await?;
        self.ledger = Ledger::new();
        info!(user = %self.user_id, "all data deleted");
        Ok(())
    }

    async fn commit<T>(
        &mut self,
        action: &str,
        result: Result<T, LedgerError>,
    ) -> Result<Outcome<T>, AppError> {
        match result {
            Ok(value) => {
                debug!(user = %self.user_id, action, "command applied");
                Ok(Outcome::applied(value, self.persist().await))
            }
            Err(e) if e.is_not_found() => {
                debug!(user = %self.user_id, action, reason = %e, "command ignored");
                Ok(Outcome::skipped())
            }
            Err(e) => {
                debug!(user = %self.user_id, action, reason = %e, "command rejected");
                Err(e.into())
            }
        }
    }

    async fn persist(&self) -> SyncStatus {
        let record = LedgerRecord::from(&self.ledger);
        match self.store.write(&self.user_id, &record).await {
            Ok(()) => SyncStatus::Saved,
            Err(e) => {
                let reason = format!("{:#}", e);
                warn!(user = %self.user_id, error = %reason, "failed to save ledger, changes kept in memory");
                SyncStatus::Failed(reason)
            }
        }
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}
