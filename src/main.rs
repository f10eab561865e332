mod aggregate;
mod cli;
mod db;
mod debounce;
mod detail;
mod error;
mod filter;
mod fmt;
mod models;
mod normalize;
mod reports;
mod settings;
mod source;
#[cfg(feature = "dashboard")]
mod tui;

use clap::{CommandFactory, Parser};

use cli::{Cli, Commands};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Init { data_dir, source }) => cli::init::run(data_dir, source),
        Some(Commands::Demo) => cli::demo::run(),
        Some(Commands::Summary { filter, months }) => cli::report::summary(filter, months),
        Some(Commands::Categories { kind, filter, json }) => {
            cli::report::categories(&kind, filter, json)
        }
        Some(Commands::Chart { monthly, filter }) => cli::report::chart(monthly, filter),
        Some(Commands::Runway { months, json }) => cli::report::runway(months, json),
        Some(Commands::Detail {
            kind,
            category,
            filter,
            csv,
        }) => cli::report::detail(kind, category, filter, csv),
        Some(Commands::Status) => cli::status::run(),
        #[cfg(feature = "dashboard")]
        Some(Commands::Dashboard) => cli::dashboard::run(),
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(shell, &mut Cli::command(), "runway", &mut std::io::stdout());
            Ok(())
        }
        #[cfg(feature = "dashboard")]
        None => cli::dashboard::run(),
        #[cfg(not(feature = "dashboard"))]
        None => Cli::command().print_help().map_err(Into::into),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
