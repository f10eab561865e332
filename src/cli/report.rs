use std::path::PathBuf;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::aggregate::{compute_runway, group_by_category, pie_slices, RunwayReport};
use crate::cli::{load, parse_months, FilterArgs};
use crate::detail::{build_detail_rows, drill_down, write_csv};
use crate::error::Result;
use crate::fmt::{money, months as months_label, share};
use crate::models::TransactionKind;
use crate::reports::{build_report, filtered};

fn print_runway_rows(table: &mut Table, runway: &RunwayReport) {
    let label = if runway.months >= 0 {
        months_label(runway.months).green().bold()
    } else {
        months_label(runway.months).red().bold()
    };
    table.add_row(vec![
        Cell::new("Avg Monthly Expense"),
        Cell::new(money(runway.avg_monthly_expense)),
    ]);
    table.add_row(vec![Cell::new("RUNWAY".bold()), Cell::new(label)]);
}

fn runway_basis(runway: &RunwayReport) -> String {
    if runway.uses_default_months() {
        format!(
            "All records, averaged over {} months (no months selected)",
            runway.month_count
        )
    } else {
        let names: Vec<String> = runway.selected.iter().map(|m| m.to_string()).collect();
        format!("{} ({} month(s))", names.join(", "), runway.month_count)
    }
}

pub fn summary(filter: FilterArgs, months: Vec<String>) -> Result<()> {
    let state = filter.to_state()?.with_months(parse_months(&months)?);
    let (settings, data) = load()?;
    let report = build_report(&data, &state, settings.revenue);
    let s = &report.summary;

    let mut table = Table::new();
    table.set_header(vec!["Profit & Loss", "Amount"]);
    table.add_row(vec![Cell::new("Total Earnings"), Cell::new(money(s.total_earnings))]);
    table.add_row(vec![Cell::new("Total Expenses"), Cell::new(money(s.total_expenses))]);
    let net_label = if s.profit_loss >= 0.0 {
        "NET".green().bold()
    } else {
        "NET".red().bold()
    };
    table.add_row(vec![Cell::new(net_label), Cell::new(money(s.profit_loss))]);
    table.add_row(vec![Cell::new(""), Cell::new("")]);
    table.add_row(vec![
        Cell::new(format!("Expense / Revenue ({})", money(settings.revenue))),
        Cell::new(format!("{}%", s.expense_to_revenue_ratio)),
    ]);
    print_runway_rows(&mut table, &report.runway);

    println!("Summary\n{table}");
    println!(
        "{} of {} records matched. Runway: {}",
        report.matched,
        data.len(),
        runway_basis(&report.runway)
    );
    Ok(())
}

pub fn categories(kind: &str, filter: FilterArgs, json: bool) -> Result<()> {
    let kind = TransactionKind::parse(kind)?;
    let state = filter.to_state()?;
    let (_, data) = load()?;
    let (expenses, earnings) = filtered(&data, &state);
    let records = match kind {
        TransactionKind::Expense => expenses,
        TransactionKind::Earning => earnings,
    };
    let totals = group_by_category(records.iter().copied());

    if json {
        println!("{}", serde_json::to_string_pretty(&pie_slices(&totals))?);
        return Ok(());
    }

    if totals.is_empty() {
        println!("No {} found.", kind.collection());
        return Ok(());
    }

    let grand_total = totals.total();
    let mut table = Table::new();
    table.set_header(vec!["Category", "Amount", "%", "Count"]);
    for item in totals.sorted_desc() {
        table.add_row(vec![
            Cell::new(&item.name),
            Cell::new(money(item.total)),
            Cell::new(share(item.total, grand_total)),
            Cell::new(item.count),
        ]);
    }
    table.add_row(vec![
        Cell::new("Total".bold()),
        Cell::new(money(grand_total)),
        Cell::new(""),
        Cell::new(records.len()),
    ]);
    println!("{} by Category\n{table}", kind.label());
    Ok(())
}

pub fn chart(monthly: bool, filter: FilterArgs) -> Result<()> {
    let state = filter.to_state()?;
    let (settings, data) = load()?;
    let report = build_report(&data, &state, settings.revenue);
    let chart = if monthly {
        &report.monthly_chart
    } else {
        &report.category_chart
    };
    println!("{}", serde_json::to_string_pretty(chart)?);
    Ok(())
}

pub fn runway(months: Vec<String>, json: bool) -> Result<()> {
    let selected = parse_months(&months)?;
    let (_, data) = load()?;
    let report = compute_runway(&data.expenses, &data.earnings, &selected);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Runway", "Amount"]);
    table.add_row(vec![Cell::new("Earnings"), Cell::new(money(report.total_earnings))]);
    table.add_row(vec![Cell::new("Expenses"), Cell::new(money(report.total_expenses))]);
    table.add_row(vec![Cell::new("Profit / Loss"), Cell::new(money(report.profit_loss))]);
    print_runway_rows(&mut table, &report);
    println!("Financial Runway\n{table}");
    println!("Basis: {}", runway_basis(&report));
    Ok(())
}

pub fn detail(
    kind: Option<String>,
    category: Option<String>,
    filter: FilterArgs,
    csv: Option<String>,
) -> Result<()> {
    let kind = kind.as_deref().map(TransactionKind::parse).transpose()?;
    let state = filter.to_state()?;
    let (settings, data) = load()?;
    let (expenses, earnings) = filtered(&data, &state);

    let records = expenses
        .into_iter()
        .chain(earnings)
        .filter(|r| kind.map_or(true, |k| r.kind == k));
    let rows = build_detail_rows(drill_down(records, category.as_deref()), &settings.date_format);

    if let Some(path) = csv {
        let path = PathBuf::from(path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        write_csv(&rows, std::fs::File::create(&path)?)?;
        println!("Wrote {} row(s) to {}", rows.len(), path.display());
        return Ok(());
    }

    if rows.is_empty() {
        println!("No records found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Type", "Category", "Date", "Amount", "Account", "Description"]);
    let mut total = 0.0;
    for r in &rows {
        let amt = match r.kind.as_str() {
            "Expense" => money(r.amount).red().to_string(),
            _ => money(r.amount).green().to_string(),
        };
        total += r.amount;
        table.add_row(vec![
            Cell::new(&r.kind),
            Cell::new(&r.category),
            Cell::new(&r.date),
            Cell::new(amt),
            Cell::new(&r.account_id),
            Cell::new(&r.description),
        ]);
    }
    println!("Detail\n{table}");
    println!("{} record(s), {} total", rows.len(), money(total));
    Ok(())
}
