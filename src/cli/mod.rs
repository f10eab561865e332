#[cfg(feature = "dashboard")]
pub mod dashboard;
pub mod demo;
pub mod init;
pub mod report;
pub mod status;

use std::collections::BTreeSet;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use crate::error::Result;
use crate::filter::{DateRange, FilterState};
use crate::models::MonthKey;
use crate::settings::{load_settings, Settings, SourceKind};
use crate::source::{load_records, open_source, LoadedRecords};

/// Load settings and both collections from the configured store.
pub(crate) fn load() -> Result<(Settings, LoadedRecords)> {
    let settings = load_settings();
    let source = open_source(&settings);
    let data = load_records(source.as_ref())?;
    Ok((settings, data))
}

#[derive(Parser)]
#[command(
    name = "runway",
    version,
    about = "Expense and earnings dashboard: category breakdowns, P&L and financial runway."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Args, Clone, Default)]
pub struct FilterArgs {
    /// Start of the date range: YYYY-MM-DD or an RFC 3339 timestamp
    #[arg(long = "from")]
    pub from_date: Option<String>,
    /// End of the date range (inclusive): YYYY-MM-DD or an RFC 3339 timestamp
    #[arg(long = "to")]
    pub to_date: Option<String>,
    /// Only include records from this account id
    #[arg(long)]
    pub account: Option<String>,
}

impl FilterArgs {
    pub fn to_state(&self) -> Result<FilterState> {
        let range = DateRange::parse(self.from_date.as_deref(), self.to_date.as_deref())?;
        Ok(FilterState::new(range, self.account.clone()))
    }
}

/// Parse repeated `--month YYYY-MM` values.
pub(crate) fn parse_months(months: &[String]) -> Result<BTreeSet<MonthKey>> {
    months.iter().map(|m| MonthKey::parse(m)).collect()
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and record store, and initialize it.
    Init {
        /// Path for runway data (default: ~/Documents/runway)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Record store backing the dashboard
        #[arg(long, value_enum)]
        source: Option<SourceKind>,
    },
    /// Load a year of sample expenses and earnings.
    Demo,
    /// Totals, profit & loss, expense ratio and runway.
    Summary {
        #[command(flatten)]
        filter: FilterArgs,
        /// Month to base runway on: YYYY-MM (repeatable)
        #[arg(long = "month")]
        months: Vec<String>,
    },
    /// Category totals for expenses or earnings.
    Categories {
        /// expense or earning
        #[arg(long, default_value = "expense")]
        kind: String,
        #[command(flatten)]
        filter: FilterArgs,
        /// Print pie slices as JSON
        #[arg(long)]
        json: bool,
    },
    /// Bar chart series as JSON.
    Chart {
        /// Group by month instead of by category
        #[arg(long)]
        monthly: bool,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Months of runway over selected calendar months.
    Runway {
        /// Month to include: YYYY-MM (repeatable; none = all records over 12 months)
        #[arg(long = "month")]
        months: Vec<String>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Drill down into individual records.
    Detail {
        /// expense or earning (default: both)
        #[arg(long)]
        kind: Option<String>,
        /// Only records in this category
        #[arg(long)]
        category: Option<String>,
        #[command(flatten)]
        filter: FilterArgs,
        /// Write rows to a CSV file instead of printing a table
        #[arg(long)]
        csv: Option<String>,
    },
    /// Show settings and record counts.
    Status,
    /// Interactive dashboard.
    #[cfg(feature = "dashboard")]
    Dashboard,
    /// Print shell completions.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}
