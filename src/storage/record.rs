use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::domain::{
    Cents, Ledger, SavingsAccount, SavingsLedger, Transaction, TransactionId, TransactionKind,
    units,
};

const BILLS_KEYS: &[&str] = &["myBills", "transactions"];
const BALANCE_KEYS: &[&str] = &["myBalance", "initialBalance"];
const CLEANED_DAYS_KEYS: &[&str] = &["myCleanedDays", "cleanedDays"];
const SAVINGS_KEYS: &[&str] = &["mySavings", "savings"];

/// The flat per-user document: `{myBills, myBalance, myCleanedDays, mySavings}`.
///
/// Serializing always produces native arrays. Deserializing goes through
/// [`LedgerRecord::from_value`], which accepts every shape older documents
/// were written in and never fails on content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LedgerRecord {
    #[serde(rename = "myBills")]
    pub transactions: Vec<Transaction>,
    #[serde(rename = "myBalance", with = "units")]
    pub initial_balance: Cents,
    #[serde(rename = "myCleanedDays")]
    pub cleaned_days: Vec<NaiveDate>,
    #[serde(rename = "mySavings")]
    pub savings: Vec<SavingsAccount>,
}

impl LedgerRecord {
    /// Decode a stored document.
    ///
    /// - each field may be missing, null, a native array or a JSON-encoded string
    /// - undecodable arrays become empty, undecodable elements are skipped
    /// - the alias keys `transactions`, `initialBalance`, `cleanedDays`, `savings` are accepted
    pub fn from_value(value: Value) -> Self {
        let Value::Object(map) = value else {
            warn!("ledger document is not an object, starting empty");
            return Self::default();
        };

        let transactions = decode_list(field(&map, BILLS_KEYS), "myBills")
            .iter()
            .filter_map(decode_transaction)
            .collect();

        let initial_balance = field(&map, BALANCE_KEYS)
            .and_then(units::from_value)
            .unwrap_or(0);

        let cleaned_days = decode_list(field(&map, CLEANED_DAYS_KEYS), "myCleanedDays")
            .iter()
            .filter_map(coerce_date)
            .collect();

        let savings = decode_list(field(&map, SAVINGS_KEYS), "mySavings")
            .iter()
            .filter_map(decode_savings_account)
            .collect();

        Self {
            transactions,
            initial_balance,
            cleaned_days,
            savings,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(input: &str) -> serde_json::Result<Self> {
        serde_json::from_str(input)
    }
}

impl<'de> Deserialize<'de> for LedgerRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(value))
    }
}

impl From<&Ledger> for LedgerRecord {
    fn from(ledger: &Ledger) -> Self {
        Self {
            transactions: ledger.transactions().to_vec(),
            initial_balance: ledger.initial_balance(),
            cleaned_days: ledger.cleaned_days().iter().copied().collect(),
            savings: ledger.savings().accounts().to_vec(),
        }
    }
}

impl From<LedgerRecord> for Ledger {
    fn from(record: LedgerRecord) -> Self {
        Ledger::from_parts(
            record.transactions,
            record.initial_balance,
            record.cleaned_days.into_iter().collect(),
            SavingsLedger::new(record.savings),
        )
    }
}

/// Whether any of the keys is present with a non-null, non-empty value.
pub fn has_field(map: &Map<String, Value>, keys: &[&str]) -> bool {
    field(map, keys).is_some()
}

/// True when a backup carries at least bills, a balance or savings.
pub fn has_ledger_data(map: &Map<String, Value>) -> bool {
    has_field(map, BILLS_KEYS) || has_field(map, BALANCE_KEYS) || has_field(map, SAVINGS_KEYS)
}

/// Name of the first list field that is present but neither an array nor an
/// encoded array. Backups carrying one are refused instead of decoded as empty.
pub fn undecodable_list(map: &Map<String, Value>) -> Option<&'static str> {
    [
        ("myBills", BILLS_KEYS),
        ("myCleanedDays", CLEANED_DAYS_KEYS),
        ("mySavings", SAVINGS_KEYS),
    ]
    .into_iter()
    .find(|(_, keys)| field(map, keys).is_some_and(|value| !is_list(value)))
    .map(|(label, _)| label)
}

/// Null and empty strings count as absent.
fn field<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find(|v| !v.is_null() && v.as_str() != Some(""))
}

fn is_list(value: &Value) -> bool {
    match value {
        Value::Array(_) => true,
        Value::String(encoded) => matches!(
            serde_json::from_str::<Value>(encoded),
            Ok(Value::Array(_) | Value::Null)
        ),
        _ => false,
    }
}

/// Unwrap an array that may have been stored as a JSON string.
fn decode_list(value: Option<&Value>, label: &str) -> Vec<Value> {
    match value {
        None => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(Value::String(encoded)) => match serde_json::from_str::<Value>(encoded) {
            Ok(Value::Array(items)) => items,
            Ok(Value::Null) => Vec::new(),
            Ok(_) => {
                warn!(field = label, "encoded field is not an array, ignoring it");
                Vec::new()
            }
            Err(e) => {
                warn!(field = label, error = %e, "could not decode encoded field, ignoring it");
                Vec::new()
            }
        },
        Some(_) => {
            warn!(field = label, "field is not an array, ignoring it");
            Vec::new()
        }
    }
}

fn decode_transaction(value: &Value) -> Option<Transaction> {
    let Some(obj) = value.as_object() else {
        warn!("skipping transaction that is not an object");
        return None;
    };

    Some(Transaction {
        id: obj.get("id").and_then(coerce_id).unwrap_or(0),
        name: obj.get("name").map(coerce_string).unwrap_or_default(),
        amount: obj.get("amount").and_then(units::from_value).unwrap_or(0),
        due_date: obj.get("dueDate").and_then(coerce_date),
        due_day: obj.get("dueDay").and_then(coerce_day),
        kind: match obj.get("type").and_then(Value::as_str) {
            Some(kind) if kind.trim().eq_ignore_ascii_case("income") => TransactionKind::Income,
            _ => TransactionKind::Expense,
        },
        paid: obj.get("paid").map(coerce_bool).unwrap_or(false),
    })
}

fn decode_savings_account(value: &Value) -> Option<SavingsAccount> {
    let Some(obj) = value.as_object() else {
        warn!("skipping savings account that is not an object");
        return None;
    };

    Some(SavingsAccount {
        name: obj.get("name").map(coerce_string).unwrap_or_default(),
        amount: obj.get("amount").and_then(units::from_value).unwrap_or(0),
    })
}

fn coerce_id(value: &Value) -> Option<TransactionId> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Accepts `YYYY-MM-DD`, also as the prefix of a full ISO timestamp.
fn coerce_date(value: &Value) -> Option<NaiveDate> {
    let s = value.as_str()?.trim();
    let day = s.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn coerce_day(value: &Value) -> Option<u32> {
    let day = match value {
        Value::Number(n) => n.as_u64().and_then(|d| u32::try_from(d).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    (1..=31).contains(&day).then_some(day)
}

fn coerce_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => false,
    }
}
