use crate::aggregate::{
    category_bar_chart, compute_runway, group_by_category, monthly_bar_chart, pie_slices,
    summarize, BarChart, CategoryTotals, PieSlice, RunwayReport, Summary,
};
use crate::filter::{apply_filter, FilterState};
use crate::models::TransactionRecord;
use crate::source::LoadedRecords;

/// Everything the presentation layer renders for one filter state.
pub struct DashboardReport {
    pub expense_totals: CategoryTotals,
    pub earning_totals: CategoryTotals,
    pub expense_slices: Vec<PieSlice>,
    pub earning_slices: Vec<PieSlice>,
    pub category_chart: BarChart,
    pub monthly_chart: BarChart,
    pub summary: Summary,
    pub runway: RunwayReport,
    pub matched: usize,
}

/// Filtered expense and earning records for the current state.
pub fn filtered<'a>(
    data: &'a LoadedRecords,
    filter: &FilterState,
) -> (Vec<&'a TransactionRecord>, Vec<&'a TransactionRecord>) {
    (
        apply_filter(&data.expenses, filter),
        apply_filter(&data.earnings, filter),
    )
}

/// Run the whole pipeline. Cheap enough to redo on every filter change.
/// Runway looks at all loaded records and only honours the month selection.
pub fn build_report(data: &LoadedRecords, filter: &FilterState, revenue: f64) -> DashboardReport {
    let (expenses, earnings) = filtered(data, filter);

    let expense_totals = group_by_category(expenses.iter().copied());
    let earning_totals = group_by_category(earnings.iter().copied());
    let summary = summarize(&expense_totals, &earning_totals, revenue);
    let runway = compute_runway(&data.expenses, &data.earnings, &filter.selected_months);

    log::debug!(
        "report: {} of {} record(s) matched, {} expense / {} earning categories",
        expenses.len() + earnings.len(),
        data.len(),
        expense_totals.len(),
        earning_totals.len()
    );

    DashboardReport {
        expense_slices: pie_slices(&expense_totals),
        earning_slices: pie_slices(&earning_totals),
        category_chart: category_bar_chart(&expense_totals, &earning_totals),
        monthly_chart: monthly_bar_chart(expenses.iter().chain(earnings.iter()).copied()),
        matched: expenses.len() + earnings.len(),
        expense_totals,
        earning_totals,
        summary,
        runway,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::DateRange;
    use crate::models::{MonthKey, TransactionKind};
    use chrono::{TimeZone, Utc};

    fn rec(kind: TransactionKind, category: &str, amount: f64, m: u32, account: &str) -> TransactionRecord {
        TransactionRecord {
            id: format!("{category}{amount}{m}"),
            kind,
            date: Utc.with_ymd_and_hms(2025, m, 15, 0, 0, 0).unwrap(),
            amount,
            category: category.to_string(),
            account_id: Some(account.to_string()),
            description: "No description".to_string(),
        }
    }

    fn data() -> LoadedRecords {
        LoadedRecords {
            expenses: vec![
                rec(TransactionKind::Expense, "Food", 100.0, 1, "chk"),
                rec(TransactionKind::Expense, "Rent", 500.0, 1, "chk"),
                rec(TransactionKind::Expense, "Food", 50.0, 2, "sav"),
            ],
            earnings: vec![
                rec(TransactionKind::Earning, "Sales", 3000.0, 1, "chk"),
                rec(TransactionKind::Earning, "Sales", 1000.0, 2, "sav"),
            ],
        }
    }

    #[test]
    fn test_unfiltered_report() {
        let report = build_report(&data(), &FilterState::default(), 10_000.0);
        assert_eq!(report.matched, 5);
        assert_eq!(report.expense_totals.get("Food"), Some(150.0));
        assert_eq!(report.summary.total_expenses, 650.0);
        assert_eq!(report.summary.total_earnings, 4000.0);
        assert_eq!(report.summary.profit_loss, 3350.0);
        assert_eq!(report.summary.expense_to_revenue_ratio, "6.50");
        assert_eq!(report.monthly_chart.labels, vec!["Jan 2025", "Feb 2025"]);
        assert_eq!(report.earning_slices.len(), 1);
    }

    #[test]
    fn test_account_filter_flows_through() {
        let filter = FilterState::new(None, Some("sav".into()));
        let report = build_report(&data(), &filter, 10_000.0);
        assert_eq!(report.matched, 2);
        assert_eq!(report.expense_totals.get("Rent"), None);
        assert_eq!(report.summary.profit_loss, 950.0);
    }

    #[test]
    fn test_runway_ignores_date_filter() {
        let range = DateRange::new(
            Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 2, 28, 0, 0, 0).unwrap(),
        )
        .unwrap();
        let filter = FilterState::new(Some(range), None).with_months([MonthKey::new(2025, 0).unwrap()]);
        let report = build_report(&data(), &filter, 10_000.0);
        assert_eq!(report.summary.total_expenses, 50.0);
        // January only: (3000 - 600) / 600
        assert_eq!(report.runway.month_count, 1);
        assert_eq!(report.runway.months, 4);
    }
}
