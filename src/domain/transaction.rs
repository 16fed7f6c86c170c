use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Cents, units};

/// Creation-time based identifier (milliseconds since the epoch),
/// bumped by the ledger when needed so it stays unique.
pub type TransactionId = i64;

/// Ids above this cannot be represented exactly by JSON readers that use
/// doubles, so stored ids beyond it are replaced on load.
pub const MAX_TRANSACTION_ID: TransactionId = (1 << 53) - 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// A bill or any other outgoing payment
    #[default]
    Expense,
    /// Money coming in. Always counts towards the balance, received or not.
    Income,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Expense => "expense",
            TransactionKind::Income => "income",
        }
    }
}

impl std::str::FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "expense" | "bill" => Ok(TransactionKind::Expense),
            "income" => Ok(TransactionKind::Income),
            other => Err(format!("unknown transaction type: {}", other)),
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single bill or income entry.
///
/// Records created through the ledger always carry a `due_date`. Older
/// records may only have `due_day` (a day of the month), which is kept
/// purely so it can still be shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    pub name: String,
    /// Amount in cents (always positive for records created by the ledger)
    #[serde(with = "units")]
    pub amount: Cents,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_day: Option<u32>,
    #[serde(rename = "type", default)]
    pub kind: TransactionKind,
    /// For income this reads as "received"; it never affects the totals.
    #[serde(default)]
    pub paid: bool,
}

impl Transaction {
    /// Create a new, unpaid transaction. Validation is the ledger's job.
    pub fn new(
        id: TransactionId,
        name: impl Into<String>,
        amount: Cents,
        due_date: NaiveDate,
        kind: TransactionKind,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            amount,
            due_date: Some(due_date),
            due_day: None,
            kind,
            paid: false,
        }
    }

    pub fn with_paid(mut self, paid: bool) -> Self {
        self.paid = paid;
        self
    }

    pub fn is_income(&self) -> bool {
        self.kind == TransactionKind::Income
    }

    pub fn is_expense(&self) -> bool {
        self.kind == TransactionKind::Expense
    }

    /// Short label for the due date: "Jan 15", "Day 15" for legacy records, or "No Date".
    pub fn due_label(&self) -> String {
        match (self.due_date, self.due_day) {
            (Some(date), _) => date.format("%b %-d").to_string(),
            (None, Some(day)) => format!("Day {}", day),
            (None, None) => "No Date".to_string(),
        }
    }

    /// Status as shown next to the amount.
    pub fn status_label(&self) -> &'static str {
        match (self.kind, self.paid) {
            (TransactionKind::Income, _) => "Received",
            (TransactionKind::Expense, true) => "Paid",
            (TransactionKind::Expense, false) => "Pending",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("income".parse::<TransactionKind>(), Ok(TransactionKind::Income));
        assert_eq!("Expense".parse::<TransactionKind>(), Ok(TransactionKind::Expense));
        assert!("transfer".parse::<TransactionKind>().is_err());
    }

    #[test]
    fn test_new_transaction_is_unpaid() {
        let tx = Transaction::new(1, "Rent", 120000, date("2024-01-01"), TransactionKind::Expense);
        assert!(!tx.paid);
        assert!(tx.is_expense());
        assert_eq!(tx.due_day, None);
    }

    #[test]
    fn test_due_label_fallbacks() {
        let mut tx = Transaction::new(1, "Rent", 100, date("2024-01-05"), TransactionKind::Expense);
        assert_eq!(tx.due_label(), "Jan 5");

        tx.due_date = None;
        tx.due_day = Some(15);
        assert_eq!(tx.due_label(), "Day 15");

        tx.due_day = None;
        assert_eq!(tx.due_label(), "No Date");
    }

    #[test]
    fn test_status_label() {
        let bill = Transaction::new(1, "Power", 100, date("2024-01-05"), TransactionKind::Expense);
        assert_eq!(bill.status_label(), "Pending");
        assert_eq!(bill.clone().with_paid(true).status_label(), "Paid");

        let pay = Transaction::new(2, "Paycheck", 100, date("2024-01-05"), TransactionKind::Income);
        assert_eq!(pay.status_label(), "Received");
    }

    #[test]
    fn test_serialized_shape() {
        let tx = Transaction::new(7, "Rent", 120050, date("2024-01-01"), TransactionKind::Expense);
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["amount"], 1200.5);
        assert_eq!(json["dueDate"], "2024-01-01");
        assert_eq!(json["type"], "expense");
        assert_eq!(json["paid"], false);
        assert!(json.get("dueDay").is_none());
    }
}
