use std::fmt;

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, RunwayError};

pub const DEFAULT_CATEGORY: &str = "Uncategorized";
pub const DEFAULT_DESCRIPTION: &str = "No description";

const MONTH_ABBR: &[&str] = &[
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    Expense,
    Earning,
}

impl TransactionKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Expense => "Expense",
            Self::Earning => "Earning",
        }
    }

    /// Collection (table / JSON file stem) the kind is stored under.
    pub fn collection(&self) -> &'static str {
        match self {
            Self::Expense => "expenses",
            Self::Earning => "earnings",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "expense" | "expenses" => Ok(Self::Expense),
            "earning" | "earnings" | "income" => Ok(Self::Earning),
            other => Err(RunwayError::Other(format!(
                "Unknown kind: {other} (expected expense or earning)"
            ))),
        }
    }
}

/// A document as handed over by a record source, before any coercion.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub id: Option<String>,
    pub doc: Value,
}

impl RawRecord {
    pub fn new(id: Option<String>, doc: Value) -> Self {
        Self { id, doc }
    }
}

/// A normalized expense or earning. Every instance has a valid date,
/// a finite amount and a non-empty category.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub id: String,
    pub kind: TransactionKind,
    pub date: DateTime<Utc>,
    pub amount: f64,
    pub category: String,
    pub account_id: Option<String>,
    pub description: String,
}

impl TransactionRecord {
    pub fn month_key(&self) -> MonthKey {
        MonthKey::of(&self.date)
    }
}

/// Calendar month with a 0-indexed month (January = 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MonthKey {
    pub year: i32,
    pub month0: u32,
}

impl MonthKey {
    pub fn new(year: i32, month0: u32) -> Result<Self> {
        if month0 > 11 {
            return Err(RunwayError::InvalidMonth(format!("{year}-{:02}", month0 + 1)));
        }
        Ok(Self { year, month0 })
    }

    pub fn of(date: &DateTime<Utc>) -> Self {
        Self {
            year: date.year(),
            month0: date.month0(),
        }
    }

    /// Parse the command-line form `YYYY-MM` (1-indexed month).
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = || RunwayError::InvalidMonth(raw.to_string());
        let (y, m) = raw.trim().split_once('-').ok_or_else(invalid)?;
        let year: i32 = y.parse().map_err(|_| invalid())?;
        let month: u32 = m.parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) {
            return Err(invalid());
        }
        Ok(Self { year, month0: month - 1 })
    }

    pub fn next(&self) -> Self {
        if self.month0 == 11 {
            Self { year: self.year + 1, month0: 0 }
        } else {
            Self { year: self.year, month0: self.month0 + 1 }
        }
    }

    pub fn prev(&self) -> Self {
        if self.month0 == 0 {
            Self { year: self.year - 1, month0: 11 }
        } else {
            Self { year: self.year, month0: self.month0 - 1 }
        }
    }

    pub fn abbr(&self) -> &'static str {
        MONTH_ABBR[self.month0 as usize]
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.abbr(), self.year)
    }
}
