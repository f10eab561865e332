use std::path::PathBuf;

use crate::error::Result;
use crate::settings::{load_settings, settings_file_exists};
use crate::source::{load_records, open_source};

pub fn run() -> Result<()> {
    let settings = load_settings();
    let data_dir = PathBuf::from(&settings.data_dir);
    let source = open_source(&settings);

    println!("Data dir:   {}", data_dir.display());
    println!("Store:      {}", source.describe());
    println!("Revenue:    {}", crate::fmt::money(settings.revenue));
    println!("Debounce:   {} ms", settings.debounce_ms);

    if !settings_file_exists() {
        println!();
        println!("Settings not found. Run `runway init` to set up.");
        return Ok(());
    }

    match load_records(source.as_ref()) {
        Ok(data) => {
            println!();
            println!("Expenses:   {}", data.expenses.len());
            println!("Earnings:   {}", data.earnings.len());
            println!("Accounts:   {}", data.accounts().len());
            if data.is_empty() {
                println!();
                println!("No records yet. Run `runway demo` to load sample data.");
                return Ok(());
            }
            let months = data.months();
            if let (Some(first), Some(last)) = (months.first(), months.last()) {
                println!("Months:     {first} \u{2013} {last}");
            }
        }
        Err(e) => {
            println!();
            println!("{e}");
        }
    }
    Ok(())
}
