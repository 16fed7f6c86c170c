use std::collections::{BTreeSet, HashSet};

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{
    CalendarMonth, Cents, MAX_TRANSACTION_ID, NameTotal, SavingsLedger, Transaction,
    TransactionId, TransactionKind, breakdown, format_cents, month_view, within_limit,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Name must not be empty")]
    EmptyName,

    #[error("Amount must be positive, got {}", display_cents(.0))]
    InvalidAmount(Cents),

    #[error("Due date is required")]
    MissingDueDate,

    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    #[error("Savings account not found at position {0}")]
    AccountNotFound(usize),

    #[error(
        "Insufficient funds in {account}: balance {}, requested {}",
        display_cents(.balance),
        display_cents(.requested)
    )]
    InsufficientFunds {
        account: String,
        balance: Cents,
        requested: Cents,
    },
}

fn display_cents(cents: &Cents) -> String {
    format_cents(*cents)
}

impl LedgerError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LedgerError::TransactionNotFound(_) | LedgerError::AccountNotFound(_)
        )
    }
}

/// Derived figures the dashboard renders from. All values in cents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub total_income: Cents,
    /// Every expense, paid or not
    pub total_expenses: Cents,
    pub paid_expenses: Cents,
    pub remaining_expenses: Cents,
    /// total_income - total_expenses
    pub net_balance: Cents,
    /// initial_balance + total_income - total_expenses
    pub projected_balance: Cents,
}

/// The whole per-user aggregate: bills, starting balance, calendar markers and savings.
///
/// Every mutation either applies completely or returns an error and leaves the
/// ledger untouched, including the two-sided savings transfers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    transactions: Vec<Transaction>,
    initial_balance: Cents,
    cleaned_days: BTreeSet<NaiveDate>,
    savings: SavingsLedger,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble a ledger from stored parts.
    /// Missing, out of range or duplicated transaction ids are replaced with
    /// fresh ones in place, so stored order is kept.
    pub fn from_parts(
        mut transactions: Vec<Transaction>,
        initial_balance: Cents,
        cleaned_days: BTreeSet<NaiveDate>,
        savings: SavingsLedger,
    ) -> Self {
        let mut seen = HashSet::new();
        let needs_id: Vec<usize> = transactions
            .iter()
            .enumerate()
            .filter(|(_, tx)| !(1..=MAX_TRANSACTION_ID).contains(&tx.id) || !seen.insert(tx.id))
            .map(|(i, _)| i)
            .collect();

        let mut next = seen
            .iter()
            .max()
            .map_or(0, |max| max + 1)
            .max(Utc::now().timestamp_millis());
        for i in needs_id {
            transactions[i].id = next;
            next += 1;
        }

        Self {
            transactions,
            initial_balance,
            cleaned_days,
            savings,
        }
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn get(&self, id: TransactionId) -> Option<&Transaction> {
        self.transactions.iter().find(|t| t.id == id)
    }

    pub fn initial_balance(&self) -> Cents {
        self.initial_balance
    }

    pub fn cleaned_days(&self) -> &BTreeSet<NaiveDate> {
        &self.cleaned_days
    }

    pub fn savings(&self) -> &SavingsLedger {
        &self.savings
    }

    pub fn savings_mut(&mut self) -> &mut SavingsLedger {
        &mut self.savings
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
            && self.initial_balance == 0
            && self.cleaned_days.is_empty()
            && self.savings.is_empty()
    }

    // ========================
    // Transactions
    // ========================

    /// Record a new unpaid bill or income entry.
    pub fn add_transaction(
        &mut self,
        name: &str,
        amount: Cents,
        due_date: Option<NaiveDate>,
        kind: TransactionKind,
    ) -> Result<TransactionId, LedgerError> {
        let (name, due_date) = validate_entry(name, amount, due_date)?;
        let id = self.next_id();
        self.transactions
            .push(Transaction::new(id, name, amount, due_date, kind));
        Ok(id)
    }

    /// Replace the editable fields of a transaction, keeping its id and paid flag.
    pub fn update_transaction(
        &mut self,
        id: TransactionId,
        name: &str,
        amount: Cents,
        due_date: Option<NaiveDate>,
        kind: TransactionKind,
    ) -> Result<(), LedgerError> {
        let tx = self
            .transactions
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(LedgerError::TransactionNotFound(id))?;
        let (name, due_date) = validate_entry(name, amount, due_date)?;

        tx.name = name.to_string();
        tx.amount = amount;
        tx.due_date = Some(due_date);
        tx.kind = kind;
        Ok(())
    }

    pub fn remove_transaction(&mut self, id: TransactionId) -> Result<Transaction, LedgerError> {
        let position = self
            .transactions
            .iter()
            .position(|t| t.id == id)
            .ok_or(LedgerError::TransactionNotFound(id))?;
        Ok(self.transactions.remove(position))
    }

    /// Flip the paid/received flag. Returns the new value.
    pub fn toggle_status(&mut self, id: TransactionId) -> Result<bool, LedgerError> {
        let tx = self
            .transactions
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(LedgerError::TransactionNotFound(id))?;
        tx.paid = !tx.paid;
        Ok(tx.paid)
    }

    pub fn totals(&self) -> Totals {
        let mut totals = Totals::default();
        for tx in &self.transactions {
            match tx.kind {
                TransactionKind::Income => {
                    totals.total_income = totals.total_income.saturating_add(tx.amount)
                }
                TransactionKind::Expense => {
                    totals.total_expenses = totals.total_expenses.saturating_add(tx.amount);
                    if tx.paid {
                        totals.paid_expenses = totals.paid_expenses.saturating_add(tx.amount);
                    } else {
                        totals.remaining_expenses =
                            totals.remaining_expenses.saturating_add(tx.amount);
                    }
                }
            }
        }
        totals.net_balance = totals.total_income.saturating_sub(totals.total_expenses);
        totals.projected_balance = self.initial_balance.saturating_add(totals.net_balance);
        totals
    }

    /// Transactions by due date, oldest first. Undated legacy records go last;
    /// ties keep insertion order.
    pub fn ordered_by_due_date(&self) -> Vec<&Transaction> {
        let mut ordered: Vec<&Transaction> = self.transactions.iter().collect();
        ordered.sort_by_key(|t| (t.due_date.is_none(), t.due_date));
        ordered
    }

    // ========================
    // Balance and calendar
    // ========================

    pub fn set_initial_balance(&mut self, value: Cents) {
        self.initial_balance = value;
    }

    pub fn reset_initial_balance(&mut self) {
        self.initial_balance = 0;
    }

    /// Mark or unmark a day. Returns whether the day is now marked.
    pub fn toggle_cleaned_day(&mut self, date: NaiveDate) -> bool {
        if self.cleaned_days.remove(&date) {
            false
        } else {
            self.cleaned_days.insert(date);
            true
        }
    }

    pub fn is_cleaned(&self, date: NaiveDate) -> bool {
        self.cleaned_days.contains(&date)
    }

    pub fn calendar_month(&self, year: i32, month: u32) -> Option<CalendarMonth> {
        month_view(self, year, month)
    }

    pub fn breakdown(&self, kind: TransactionKind, limit: usize) -> Vec<NameTotal> {
        breakdown(&self.transactions, kind, limit)
    }

    // ========================
    // Savings transfers
    // ========================

    /// Move money from checking into a savings account.
    ///
    /// Credits the account and records a paid expense dated `on`. Nothing
    /// changes unless both sides can be applied.
    pub fn transfer_from_checking(
        &mut self,
        index: usize,
        amount: Cents,
        on: NaiveDate,
    ) -> Result<TransactionId, LedgerError> {
        if amount <= 0 || !within_limit(amount) {
            return Err(LedgerError::InvalidAmount(amount));
        }
        let name = format!("Transfer to {}", self.savings.get(index)?.name);
        let id = self.next_id();

        self.savings.adjust(index, amount)?;
        self.transactions.push(
            Transaction::new(id, name, amount, on, TransactionKind::Expense).with_paid(true),
        );
        Ok(id)
    }

    /// Move money from a savings account back into checking.
    ///
    /// Fails with [`LedgerError::InsufficientFunds`] when the account holds
    /// less than `amount`. On success debits the account and records a
    /// received income dated `on`.
    pub fn withdraw_to_checking(
        &mut self,
        index: usize,
        amount: Cents,
        on: NaiveDate,
    ) -> Result<TransactionId, LedgerError> {
        self.savings.check_withdrawal(index, amount)?;
        let name = format!("Transfer from {}", self.savings.get(index)?.name);
        let id = self.next_id();

        self.savings.adjust(index, -amount)?;
        self.transactions.push(
            Transaction::new(id, name, amount, on, TransactionKind::Income).with_paid(true),
        );
        Ok(id)
    }

    fn next_id(&self) -> TransactionId {
        let now = Utc::now().timestamp_millis();
        match self.transactions.iter().map(|t| t.id).max() {
            Some(max) if max >= now => max + 1,
            _ => now,
        }
    }
}

fn validate_entry(
    name: &str,
    amount: Cents,
    due_date: Option<NaiveDate>,
) -> Result<(&str, NaiveDate), LedgerError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(LedgerError::EmptyName);
    }
    if amount <= 0 || !within_limit(amount) {
        return Err(LedgerError::InvalidAmount(amount));
    }
    let due_date = due_date.ok_or(LedgerError::MissingDueDate)?;
    Ok((name, due_date))
}
