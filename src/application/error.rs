use thiserror::Error;

use crate::domain::{Cents, LedgerError, format_cents};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(
        "Insufficient funds in {account}: balance {}, requested {}",
        money(.balance),
        money(.requested)
    )]
    InsufficientFunds {
        account: String,
        balance: Cents,
        requested: Cents,
    },

    #[error("Invalid backup file: {0}")]
    ImportFormat(String),

    #[error("Storage error: {0:#}")]
    Persistence(#[from] anyhow::Error),
}

fn money(cents: &Cents) -> String {
    format_cents(*cents)
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientFunds {
                account,
                balance,
                requested,
            } => AppError::InsufficientFunds {
                account,
                balance,
                requested,
            },
            LedgerError::TransactionNotFound(_) | LedgerError::AccountNotFound(_) => {
                AppError::NotFound(err.to_string())
            }
            LedgerError::EmptyName | LedgerError::InvalidAmount(_) | LedgerError::MissingDueDate => {
                AppError::Validation(err.to_string())
            }
        }
    }
}
