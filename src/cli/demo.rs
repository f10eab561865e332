use chrono::{Datelike, Local, NaiveDate};
use rand::Rng;
use serde_json::json;

use crate::error::Result;
use crate::models::{MonthKey, RawRecord, TransactionKind};
use crate::settings::load_settings;
use crate::source::store_records;

const DEMO_MONTHS: u32 = 12;

/// Expenses posted every month.
struct Recurring {
    day: u32,
    category: &'static str,
    description: &'static str,
    account: &'static str,
    amount: f64,
}

const RECURRING: &[Recurring] = &[
    Recurring { day: 1, category: "Rent", description: "Studio lease", account: "checking", amount: 2400.00 },
    Recurring { day: 5, category: "Software", description: "GITHUB INC", account: "credit-card", amount: 21.00 },
    Recurring { day: 5, category: "Software", description: "ADOBE CREATIVE CLOUD", account: "credit-card", amount: 54.99 },
    Recurring { day: 8, category: "Hosting", description: "AMAZON WEB SERVICES", account: "credit-card", amount: 189.00 },
    Recurring { day: 15, category: "Salaries", description: "Payroll run", account: "checking", amount: 6200.00 },
    Recurring { day: 25, category: "Utilities", description: "COMCAST BUSINESS", account: "checking", amount: 129.99 },
];

/// One-off expenses; each month picks two by index.
const ROTATING: &[(&str, &str, f64)] = &[
    ("Travel", "Conference flights", 840.00),
    ("Meals", "Client lunch", 86.40),
    ("Office", "STAPLES OFFICE SUPPLY", 67.23),
    ("Marketing", "Sponsored newsletter", 450.00),
    ("Equipment", "Monitor", 329.00),
    ("Meals", "Team dinner", 212.75),
];

/// Two client payments per month.
const EARNING_BASES: &[(f64, f64)] = &[
    (12000.0, 2500.0),
    (9800.0, 2500.0),
    (11500.0, 3100.0),
    (7200.0, 2500.0),
];

fn jitter(rng: &mut impl Rng, amount: f64) -> f64 {
    let factor = 1.0 + rng.gen_range(-0.08..0.08);
    (amount * factor * 100.0).round() / 100.0
}

fn date_in(month: MonthKey, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(month.year, month.month0 + 1, day)
        .or_else(|| NaiveDate::from_ymd_opt(month.year, month.month0 + 1, 28))
        .unwrap_or_default()
}

/// Epoch seconds at midday UTC, stored the way database timestamps are.
fn timestamp_doc(date: NaiveDate) -> serde_json::Value {
    let seconds = date
        .and_hms_opt(12, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default();
    json!({ "seconds": seconds, "nanoseconds": 0 })
}

pub(crate) fn demo_records(end: MonthKey) -> (Vec<RawRecord>, Vec<RawRecord>) {
    let mut rng = rand::thread_rng();
    let mut expenses = Vec::new();
    let mut earnings = Vec::new();

    let mut month = end;
    for _ in 1..DEMO_MONTHS {
        month = month.prev();
    }

    for i in 0..DEMO_MONTHS as usize {
        let tag = format!("{}{:02}", month.year, month.month0 + 1);

        for (n, r) in RECURRING.iter().enumerate() {
            // Alternate between timestamp and string dates
            let date = date_in(month, r.day);
            let date_doc = if n % 2 == 0 {
                timestamp_doc(date)
            } else {
                json!(date.format("%Y-%m-%d").to_string())
            };
            let amount = if r.category == "Rent" {
                r.amount
            } else {
                jitter(&mut rng, r.amount)
            };
            expenses.push(RawRecord::new(
                Some(format!("exp-{tag}-{n}")),
                json!({
                    "date": date_doc,
                    "amount": amount,
                    "category": r.category,
                    "accountId": r.account,
                    "description": r.description,
                }),
            ));
        }

        for k in 0..2 {
            let (category, description, amount) = ROTATING[(i * 2 + k) % ROTATING.len()];
            expenses.push(RawRecord::new(
                Some(format!("exp-{tag}-r{k}")),
                json!({
                    "date": format!("{}T16:30:00Z", date_in(month, 10 + k as u32 * 9).format("%Y-%m-%d")),
                    "amount": format!("${:.2}", jitter(&mut rng, amount)),
                    "category": category,
                    "accountId": "credit-card",
                    "description": description,
                }),
            ));
        }

        let (retainer, hosting) = EARNING_BASES[i % EARNING_BASES.len()];
        earnings.push(RawRecord::new(
            Some(format!("ern-{tag}-0")),
            json!({
                "date": timestamp_doc(date_in(month, 3)),
                "amount": jitter(&mut rng, retainer),
                "category": "Client Services",
                "accountId": "checking",
                "description": "STRIPE TRANSFER",
            }),
        ));
        earnings.push(RawRecord::new(
            Some(format!("ern-{tag}-1")),
            json!({
                "date": date_in(month, 20).format("%Y-%m-%d").to_string(),
                "amount": hosting,
                "category": "Hosting & Maintenance",
                "accountId": "checking",
            }),
        ));

        month = month.next();
    }

    // A receipt nobody filed properly
    expenses.push(RawRecord::new(
        Some("exp-unfiled".to_string()),
        json!({ "date": date_in(end, 2).format("%Y-%m-%d").to_string(), "amount": "18.75" }),
    ));

    (expenses, earnings)
}

pub fn run() -> Result<()> {
    let settings = load_settings();
    std::fs::create_dir_all(&settings.data_dir)?;

    let today = Local::now().date_naive();
    let end = MonthKey::new(today.year(), today.month0())?;
    let (expenses, earnings) = demo_records(end);

    store_records(&settings, TransactionKind::Expense, &expenses)?;
    store_records(&settings, TransactionKind::Earning, &earnings)?;

    println!(
        "Loaded {} expenses and {} earnings into {} ({} store).",
        expenses.len(),
        earnings.len(),
        settings.data_dir,
        settings.source
    );
    println!("Try `runway summary` or `runway dashboard`.");
    Ok(())
}
