use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;

use super::Ledger;

/// One month laid out for a Sunday-first calendar grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarMonth {
    pub year: i32,
    pub month: u32,
    /// Empty cells before the 1st (Sunday = 0)
    pub leading_blanks: u32,
    pub days: Vec<CalendarDay>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub cleaned: bool,
    /// Number of transactions falling due on this day
    pub due_count: usize,
}

impl CalendarMonth {
    pub fn first_day(&self) -> Option<NaiveDate> {
        self.days.first().map(|d| d.date)
    }
}

/// Build the grid for `year`-`month`. Returns `None` for an invalid month.
pub fn month_view(ledger: &Ledger, year: i32, month: u32) -> Option<CalendarMonth> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = first.checked_add_months(Months::new(1))?;

    let days = first
        .iter_days()
        .take_while(|d| *d < next)
        .map(|date| CalendarDay {
            date,
            cleaned: ledger.is_cleaned(date),
            due_count: ledger
                .transactions()
                .iter()
                .filter(|t| t.due_date == Some(date))
                .count(),
        })
        .collect();

    Some(CalendarMonth {
        year,
        month,
        leading_blanks: first.weekday().num_days_from_sunday(),
        days,
    })
}

/// Step a (year, month) pair forwards or backwards by whole months.
pub fn shift_month(year: i32, month: u32, delta: i32) -> Option<(i32, u32)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let shifted = if delta >= 0 {
        first.checked_add_months(Months::new(delta.unsigned_abs()))?
    } else {
        first.checked_sub_months(Months::new(delta.unsigned_abs()))?
    };
    Some((shifted.year(), shifted.month()))
}
