use serde::{Deserialize, Serialize};

use super::{Cents, LedgerError, units, within_limit};

/// A named balance bucket kept apart from checking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavingsAccount {
    pub name: String,
    /// Balance in cents. Only withdrawals check it against zero.
    #[serde(with = "units")]
    pub amount: Cents,
}

impl SavingsAccount {
    pub fn new(name: impl Into<String>, amount: Cents) -> Self {
        Self {
            name: name.into(),
            amount,
        }
    }
}

/// Ordered list of savings accounts, addressed by position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SavingsLedger {
    accounts: Vec<SavingsAccount>,
}

impl SavingsLedger {
    pub fn new(accounts: Vec<SavingsAccount>) -> Self {
        Self { accounts }
    }

    pub fn accounts(&self) -> &[SavingsAccount] {
        &self.accounts
    }

    pub fn get(&self, index: usize) -> Result<&SavingsAccount, LedgerError> {
        self.accounts
            .get(index)
            .ok_or(LedgerError::AccountNotFound(index))
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Open an account with an existing balance. Negative balances are accepted.
    pub fn add_account(&mut self, name: &str, amount: Cents) -> Result<usize, LedgerError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::EmptyName);
        }
        if !within_limit(amount) {
            return Err(LedgerError::InvalidAmount(amount));
        }
        self.accounts.push(SavingsAccount::new(name, amount));
        Ok(self.accounts.len() - 1)
    }

    /// Cash or external deposit. Touches only the account balance.
    pub fn deposit(&mut self, index: usize, amount: Cents) -> Result<Cents, LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }
        self.adjust(index, amount)
    }

    /// Check that `amount` can be taken out of the account.
    pub fn check_withdrawal(&self, index: usize, amount: Cents) -> Result<(), LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }
        let account = self.get(index)?;
        if amount > account.amount {
            return Err(LedgerError::InsufficientFunds {
                account: account.name.clone(),
                balance: account.amount,
                requested: amount,
            });
        }
        Ok(())
    }

    pub fn remove_account(&mut self, index: usize) -> Result<SavingsAccount, LedgerError> {
        if index >= self.accounts.len() {
            return Err(LedgerError::AccountNotFound(index));
        }
        Ok(self.accounts.remove(index))
    }

    pub fn total(&self) -> Cents {
        self.accounts
            .iter()
            .fold(0, |sum: Cents, a| sum.saturating_add(a.amount))
    }

    /// Change a balance by `delta`. Fails without touching the account when
    /// the new balance would leave the supported range.
    pub(crate) fn adjust(&mut self, index: usize, delta: Cents) -> Result<Cents, LedgerError> {
        let account = self
            .accounts
            .get_mut(index)
            .ok_or(LedgerError::AccountNotFound(index))?;
        let balance = account
            .amount
            .checked_add(delta)
            .filter(|b| within_limit(*b))
            .ok_or(LedgerError::InvalidAmount(delta))?;
        account.amount = balance;
        Ok(balance)
    }
}
