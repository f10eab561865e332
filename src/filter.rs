use std::collections::BTreeSet;

use chrono::{DateTime, Months, Utc};

use crate::error::{Result, RunwayError};
use crate::models::{MonthKey, TransactionRecord};
use crate::normalize::parse_date_str;

// ---------------------------------------------------------------------------
// Date range
// ---------------------------------------------------------------------------

/// Inclusive `[start, end]` range, compared at full timestamp precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end < start {
            return Err(RunwayError::InvalidFilter(format!(
                "end date {} is before start date {}",
                end.format("%Y-%m-%d %H:%M:%S"),
                start.format("%Y-%m-%d %H:%M:%S"),
            )));
        }
        Ok(Self { start, end })
    }

    /// Both bounds or neither; a single bound is rejected rather than
    /// applied as an open-ended range.
    pub fn from_bounds(
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Option<Self>> {
        match (start, end) {
            (Some(s), Some(e)) => Self::new(s, e).map(Some),
            (Some(_), None) => Err(RunwayError::InvalidFilter(
                "--from requires --to (both date boundaries must be specified)".to_string(),
            )),
            (None, Some(_)) => Err(RunwayError::InvalidFilter(
                "--to requires --from (both date boundaries must be specified)".to_string(),
            )),
            (None, None) => Ok(None),
        }
    }

    /// Parse command-line bounds. Date-only values mean midnight UTC.
    pub fn parse(from: Option<&str>, to: Option<&str>) -> Result<Option<Self>> {
        let parse = |raw: &str| {
            parse_date_str(raw)
                .ok_or_else(|| RunwayError::InvalidFilter(format!("unreadable date: {raw}")))
        };
        let start = from.map(parse).transpose()?;
        let end = to.map(parse).transpose()?;
        Self::from_bounds(start, end)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn contains(&self, date: &DateTime<Utc>) -> bool {
        self.start <= *date && *date <= self.end
    }
}

fn shift_months(date: DateTime<Utc>, delta: i32) -> Result<DateTime<Utc>> {
    let months = Months::new(delta.unsigned_abs());
    let shifted = if delta >= 0 {
        date.checked_add_months(months)
    } else {
        date.checked_sub_months(months)
    };
    shifted.ok_or_else(|| RunwayError::InvalidFilter("date out of range".to_string()))
}

// ---------------------------------------------------------------------------
// Filter state + reducer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    pub date_range: Option<DateRange>,
    pub account_id: Option<String>,
    /// Only consulted by the runway calculation.
    pub selected_months: BTreeSet<MonthKey>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterAction {
    SetDateRange {
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    },
    ClearDateRange,
    ShiftStart(i32),
    ShiftEnd(i32),
    SetAccount(Option<String>),
    ToggleMonth(MonthKey),
    ClearMonths,
    Reset,
}

impl FilterState {
    pub fn new(date_range: Option<DateRange>, account_id: Option<String>) -> Self {
        Self {
            date_range,
            account_id,
            selected_months: BTreeSet::new(),
        }
    }

    pub fn with_months(mut self, months: impl IntoIterator<Item = MonthKey>) -> Self {
        self.selected_months.extend(months);
        self
    }

    /// Produce the next state. On a validation failure the caller keeps the
    /// current state; nothing is partially applied.
    pub fn apply(&self, action: FilterAction) -> Result<FilterState> {
        let mut next = self.clone();
        match action {
            FilterAction::SetDateRange { start, end } => {
                next.date_range = DateRange::from_bounds(start, end)?;
            }
            FilterAction::ClearDateRange => next.date_range = None,
            FilterAction::ShiftStart(delta) => {
                let range = self.require_range()?;
                next.date_range = Some(DateRange::new(shift_months(range.start, delta)?, range.end)?);
            }
            FilterAction::ShiftEnd(delta) => {
                let range = self.require_range()?;
                next.date_range = Some(DateRange::new(range.start, shift_months(range.end, delta)?)?);
            }
            FilterAction::SetAccount(account) => {
                next.account_id = account.filter(|a| !a.is_empty());
            }
            FilterAction::ToggleMonth(key) => {
                if !next.selected_months.remove(&key) {
                    next.selected_months.insert(key);
                }
            }
            FilterAction::ClearMonths => next.selected_months.clear(),
            FilterAction::Reset => next = FilterState::default(),
        }
        Ok(next)
    }

    fn require_range(&self) -> Result<DateRange> {
        self.date_range
            .ok_or_else(|| RunwayError::InvalidFilter("no date range set".to_string()))
    }

    pub fn is_unrestricted(&self) -> bool {
        self.date_range.is_none() && self.account_id.is_none()
    }

    pub fn matches(&self, record: &TransactionRecord) -> bool {
        let in_range = self
            .date_range
            .as_ref()
            .map_or(true, |range| range.contains(&record.date));
        let on_account = self
            .account_id
            .as_deref()
            .map_or(true, |account| record.account_id.as_deref() == Some(account));
        in_range && on_account
    }
}

/// Records passing the date range and account filters. An unrestricted
/// filter returns every record in input order.
pub fn apply_filter<'a>(
    records: &'a [TransactionRecord],
    filter: &FilterState,
) -> Vec<&'a TransactionRecord> {
    if filter.is_unrestricted() {
        return records.iter().collect();
    }
    records.iter().filter(|r| filter.matches(r)).collect()
}
