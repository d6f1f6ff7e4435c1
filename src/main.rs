use anyhow::Result;
use std::env;

use currency_grid::{config, init_logging, SortKey, SortOrder, SortSpec};

#[cfg(feature = "tui")]
use currency_grid::{
    client::{CurrencyFeed, HttpFeed, LocalFeed},
    ClientConfig, CurrencyDataset,
};

fn main() -> Result<()> {
    config::load_dotenv();
    init_logging("warn");

    let args: Vec<String> = env::args().skip(1).collect();
    let local = args.iter().any(|a| a == "--local");
    let positional: Vec<&str> = args
        .iter()
        .map(String::as_str)
        .filter(|a| !a.starts_with("--"))
        .collect();

    match positional.first() {
        Some(&"list") => {
            let sort = parse_sort(&positional[1..])?;
            run_list(local, sort)
        }
        Some(&"codes") => run_codes(local),
        Some(other) => {
            eprintln!("❌ Unknown command: {}", other);
            eprintln!("   Usage: currency-grid [--local] [list [currency|amount] [asc|desc]]");
            eprintln!("          currency-grid [--local] codes");
            std::process::exit(2);
        }
        None => run_ui_mode(local),
    }
}

/// `list` takes an optional key and order; order defaults to asc.
fn parse_sort(args: &[&str]) -> Result<Option<SortSpec>> {
    let Some(key) = args.first() else {
        return Ok(None);
    };
    let key: SortKey = key.parse()?;
    let order: SortOrder = match args.get(1) {
        Some(order) => order.parse()?,
        None => SortOrder::Asc,
    };
    Ok(Some(SortSpec::new(key, order)))
}

#[cfg(feature = "tui")]
fn make_feed(local: bool) -> Result<Box<dyn CurrencyFeed>> {
    if local {
        Ok(Box::new(LocalFeed::new(CurrencyDataset::canonical())))
    } else {
        let config = ClientConfig::from_env()?;
        Ok(Box::new(HttpFeed::new(&config)?))
    }
}

#[cfg(feature = "tui")]
fn run_list(local: bool, sort: Option<SortSpec>) -> Result<()> {
    let feed = make_feed(local)?;
    let records = match sort {
        Some(spec) => feed.fetch_sorted(spec)?,
        None => feed.fetch(None)?,
    };

    println!("{:<10} {:>14}  {}", "Currency", "Amount", "Locality");
    println!("{}", "─".repeat(44));
    for record in &records {
        println!(
            "{:<10} {:>14}  {}",
            record.currency, record.display_amount, record.locality
        );
    }
    println!("\n{} records from {}", records.len(), feed.describe());

    Ok(())
}

#[cfg(feature = "tui")]
fn run_codes(local: bool) -> Result<()> {
    let feed = make_feed(local)?;
    let codes = feed.fetch_currencies()?;

    for code in &codes {
        println!("{code}");
    }
    println!("\n{} currencies from {}", codes.len(), feed.describe());

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(local: bool) -> Result<()> {
    let feed = make_feed(local)?;

    let mut app = currency_grid::ui::App::new(feed);
    app.reload();
    currency_grid::ui::run_ui(&mut app)?;

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_list(local: bool, _sort: Option<SortSpec>) -> Result<()> {
    run_ui_mode(local)
}

#[cfg(not(feature = "tui"))]
fn run_codes(local: bool) -> Result<()> {
    run_ui_mode(local)
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_local: bool) -> Result<()> {
    eprintln!("❌ Table client not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or run the API: cargo run --bin currency-server --features server");
    std::process::exit(1);
}
