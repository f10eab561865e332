use std::fmt::Write as _;
use std::io;

use serde::Serialize;

use crate::error::{Result, RunwayError};
use crate::models::TransactionRecord;

pub const NO_ACCOUNT: &str = "N/A";

/// Flat row for the drill-down table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailRow {
    #[serde(rename = "type")]
    pub kind: String,
    pub category: String,
    pub date: String,
    pub amount: f64,
    #[serde(rename = "accountId")]
    pub account_id: String,
    pub description: String,
}

fn detail_row(record: &TransactionRecord, date_format: &str) -> Result<DetailRow> {
    let mut date = String::new();
    write!(date, "{}", record.date.format(date_format)).map_err(|_| {
        RunwayError::Other(format!("cannot format date with pattern {date_format:?}"))
    })?;
    if !record.amount.is_finite() {
        return Err(RunwayError::Other(format!("non-finite amount {}", record.amount)));
    }
    Ok(DetailRow {
        kind: record.kind.label().to_string(),
        category: record.category.clone(),
        date,
        amount: record.amount,
        account_id: record
            .account_id
            .clone()
            .unwrap_or_else(|| NO_ACCOUNT.to_string()),
        description: record.description.clone(),
    })
}

/// Build table rows. A record that fails to convert is logged and skipped;
/// the rest of the view is still produced.
pub fn build_detail_rows<'a>(
    records: impl IntoIterator<Item = &'a TransactionRecord>,
    date_format: &str,
) -> Vec<DetailRow> {
    records
        .into_iter()
        .filter_map(|record| match detail_row(record, date_format) {
            Ok(row) => Some(row),
            Err(e) => {
                log::warn!("Dropping {} {} from detail view: {e}", record.kind.label(), record.id);
                None
            }
        })
        .collect()
}

/// Records belonging to one category (all categories when `None`).
pub fn drill_down<'a>(
    records: impl IntoIterator<Item = &'a TransactionRecord>,
    category: Option<&'a str>,
) -> impl Iterator<Item = &'a TransactionRecord> {
    records
        .into_iter()
        .filter(move |r| category.map_or(true, |c| r.category == c))
}

pub fn write_csv<W: io::Write>(rows: &[DetailRow], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}
