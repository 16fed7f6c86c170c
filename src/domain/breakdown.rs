use std::collections::HashMap;

use serde::Serialize;

use super::{Cents, Transaction, TransactionKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameTotal {
    pub name: String,
    pub total: Cents,
}

/// Sum transactions of one kind by (trimmed) name, largest first, keeping at most `limit` groups.
pub fn breakdown(transactions: &[Transaction], kind: TransactionKind, limit: usize) -> Vec<NameTotal> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<NameTotal> = Vec::new();

    for tx in transactions.iter().filter(|t| t.kind == kind) {
        let name = tx.name.trim();
        match positions.get(name) {
            Some(&i) => groups[i].total += tx.amount,
            None => {
                positions.insert(name, groups.len());
                groups.push(NameTotal {
                    name: name.to_string(),
                    total: tx.amount,
                });
            }
        }
    }

    // Stable sort: equal totals keep first-seen order
    groups.sort_by(|a, b| b.total.cmp(&a.total));
    groups.truncate(limit);
    groups
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn tx(id: i64, name: &str, amount: Cents, kind: TransactionKind) -> Transaction {
        let due = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        Transaction::new(id, name, amount, due, kind)
    }

    #[test]
    fn test_groups_by_trimmed_name() {
        let txs = vec![
            tx(1, "Groceries", 5000, TransactionKind::Expense),
            tx(2, "Groceries ", 2500, TransactionKind::Expense),
            tx(3, "Rent", 120000, TransactionKind::Expense),
            tx(4, "Paycheck", 200000, TransactionKind::Income),
        ];

        let expenses = breakdown(&txs, TransactionKind::Expense, 4);
        assert_eq!(
            expenses,
            vec![
                NameTotal { name: "Rent".into(), total: 120000 },
                NameTotal { name: "Groceries".into(), total: 7500 },
            ]
        );

        let income = breakdown(&txs, TransactionKind::Income, 4);
        assert_eq!(income.len(), 1);
        assert_eq!(income[0].total, 200000);
    }

    #[test]
    fn test_limit() {
        let txs: Vec<Transaction> = (1..=6)
            .map(|i| tx(i, &format!("Bill {}", i), i * 100, TransactionKind::Expense))
            .collect();

        let top = breakdown(&txs, TransactionKind::Expense, 4);
        assert_eq!(top.len(), 4);
        assert_eq!(top[0].name, "Bill 6");
        assert_eq!(top[3].name, "Bill 3");
    }

    #[test]
    fn test_empty() {
        assert!(breakdown(&[], TransactionKind::Income, 4).is_empty());
    }
}
