use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use crate::models::{MonthKey, TransactionKind, TransactionRecord};

/// Month count used for the average burn when no months are selected.
/// The month filter is unrestricted in that case, so the divisor does not
/// track how many months the data actually spans.
pub const DEFAULT_RUNWAY_MONTHS: u32 = 12;

// ---------------------------------------------------------------------------
// Category totals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub name: String,
    pub total: f64,
    pub count: usize,
}

/// Category name -> summed amount, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryTotals {
    entries: Vec<CategoryTotal>,
    index: HashMap<String, usize>,
}

impl CategoryTotals {
    fn add(&mut self, category: &str, amount: f64) {
        match self.index.get(category) {
            Some(&i) => {
                self.entries[i].total += amount;
                self.entries[i].count += 1;
            }
            None => {
                self.index.insert(category.to_string(), self.entries.len());
                self.entries.push(CategoryTotal {
                    name: category.to_string(),
                    total: amount,
                    count: 1,
                });
            }
        }
    }

    pub fn get(&self, category: &str) -> Option<f64> {
        self.index.get(category).map(|&i| self.entries[i].total)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CategoryTotal> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|e| e.total).sum()
    }

    /// Entries ordered by total, largest first. Ties keep first-seen order.
    pub fn sorted_desc(&self) -> Vec<&CategoryTotal> {
        let mut sorted: Vec<&CategoryTotal> = self.entries.iter().collect();
        sorted.sort_by(|a, b| b.total.total_cmp(&a.total));
        sorted
    }
}

pub fn group_by_category<'a>(
    records: impl IntoIterator<Item = &'a TransactionRecord>,
) -> CategoryTotals {
    let mut totals = CategoryTotals::default();
    for record in records {
        totals.add(&record.category, record.amount);
    }
    totals
}

// ---------------------------------------------------------------------------
// Chart shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieSlice {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarSeries {
    pub name: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BarChart {
    pub labels: Vec<String>,
    pub series: Vec<BarSeries>,
}

pub fn pie_slices(totals: &CategoryTotals) -> Vec<PieSlice> {
    totals
        .iter()
        .map(|t| PieSlice {
            name: t.name.clone(),
            value: t.total,
        })
        .collect()
}

/// Expenses and earnings side by side for every category that has either.
pub fn category_bar_chart(expenses: &CategoryTotals, earnings: &CategoryTotals) -> BarChart {
    let mut labels: Vec<String> = expenses.iter().map(|t| t.name.clone()).collect();
    for t in earnings.iter() {
        if expenses.get(&t.name).is_none() {
            labels.push(t.name.clone());
        }
    }
    let values = |totals: &CategoryTotals| -> Vec<f64> {
        labels.iter().map(|l| totals.get(l).unwrap_or(0.0)).collect()
    };
    BarChart {
        series: vec![
            BarSeries {
                name: "Expenses".to_string(),
                values: values(expenses),
            },
            BarSeries {
                name: "Earnings".to_string(),
                values: values(earnings),
            },
        ],
        labels,
    }
}

/// Per-month expense and earning sums in chronological order.
pub fn monthly_bar_chart<'a>(
    records: impl IntoIterator<Item = &'a TransactionRecord>,
) -> BarChart {
    let mut months: BTreeMap<MonthKey, (f64, f64)> = BTreeMap::new();
    for record in records {
        let entry = months.entry(record.month_key()).or_insert((0.0, 0.0));
        match record.kind {
            TransactionKind::Expense => entry.0 += record.amount,
            TransactionKind::Earning => entry.1 += record.amount,
        }
    }
    BarChart {
        labels: months.keys().map(|k| k.to_string()).collect(),
        series: vec![
            BarSeries {
                name: "Expenses".to_string(),
                values: months.values().map(|v| v.0).collect(),
            },
            BarSeries {
                name: "Earnings".to_string(),
                values: months.values().map(|v| v.1).collect(),
            },
        ],
    }
}

// ---------------------------------------------------------------------------
// Summary metrics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_expenses: f64,
    pub total_earnings: f64,
    pub profit_loss: f64,
    pub expense_to_revenue_ratio: String,
}

/// `total_expense / revenue * 100` with two decimals. Zero revenue reads "0.00".
pub fn expense_to_revenue_ratio(total_expense: f64, revenue: f64) -> String {
    if revenue == 0.0 {
        return format!("{:.2}", 0.0);
    }
    format!("{:.2}", total_expense / revenue * 100.0)
}

pub fn summarize(expenses: &CategoryTotals, earnings: &CategoryTotals, revenue: f64) -> Summary {
    let total_expenses = expenses.total();
    let total_earnings = earnings.total();
    Summary {
        total_expenses,
        total_earnings,
        profit_loss: total_earnings - total_expenses,
        expense_to_revenue_ratio: expense_to_revenue_ratio(total_expenses, revenue),
    }
}

// ---------------------------------------------------------------------------
// Runway
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunwayReport {
    pub selected: Vec<MonthKey>,
    pub month_count: u32,
    pub total_expenses: f64,
    pub total_earnings: f64,
    pub profit_loss: f64,
    pub avg_monthly_expense: f64,
    pub months: i64,
}

impl RunwayReport {
    /// True when no months were selected and the 12-month default divisor applied.
    pub fn uses_default_months(&self) -> bool {
        self.selected.is_empty()
    }
}

/// Round half toward positive infinity (`-2.5` -> `-2`, `2.5` -> `3`).
fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Months of runway over the selected calendar months. An empty selection
/// takes every record but still divides expenses by 12.
pub fn compute_runway(
    expenses: &[TransactionRecord],
    earnings: &[TransactionRecord],
    selected: &BTreeSet<MonthKey>,
) -> RunwayReport {
    let in_selection = |r: &&TransactionRecord| selected.is_empty() || selected.contains(&r.month_key());

    let total_expenses: f64 = expenses.iter().filter(in_selection).map(|r| r.amount).sum();
    let total_earnings: f64 = earnings.iter().filter(in_selection).map(|r| r.amount).sum();
    let profit_loss = total_earnings - total_expenses;

    let month_count = if selected.is_empty() {
        DEFAULT_RUNWAY_MONTHS
    } else {
        selected.len() as u32
    };
    let avg_monthly_expense = total_expenses / f64::from(month_count);

    let ratio = if avg_monthly_expense == 0.0 {
        0.0
    } else {
        profit_loss / avg_monthly_expense
    };

    log::debug!(
        "runway over {month_count} month(s): p/l {profit_loss:.2}, burn {avg_monthly_expense:.2}"
    );

    RunwayReport {
        selected: selected.iter().copied().collect(),
        month_count,
        total_expenses,
        total_earnings,
        profit_loss,
        avg_monthly_expense,
        months: round_half_up(ratio),
    }
}
