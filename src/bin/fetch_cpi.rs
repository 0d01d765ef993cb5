// src/bin/fetch_cpi.rs
// Runs a single CPI refresh against the configured source and prints what was parsed.
// Usage: fetch_cpi [purchase_year]
use anyhow::{anyhow, Context};
use dotenv::dotenv;
use log::info;
use std::env;
use std::sync::Arc;

use ertragswert_backend::config::Settings;
use ertragswert_backend::services::cpi::CpiService;
use ertragswert_backend::services::cpi_parser::{CpiParser, RefreshOutcome};
use ertragswert_backend::services::cpi_store::CpiStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let purchase_year: Option<i32> = env::args()
        .nth(1)
        .map(|arg| arg.parse().with_context(|| format!("invalid purchase year: {}", arg)))
        .transpose()?;

    let settings = Settings::from_env()?;
    let store = Arc::new(CpiStore::new());
    let parser = CpiParser::new(settings.cpi_source_url.clone(), store.clone())?;

    info!("Fetching CPI data from {}", parser.url());
    match parser.refresh().await? {
        RefreshOutcome::Updated { parsed, total } => {
            println!("Parsed {} CPI values ({} periods stored)", parsed, total);
        }
        RefreshOutcome::TableMissing => {
            return Err(anyhow!("no CPI table found at {}", parser.url()));
        }
    }

    if let Some(latest) = store.latest_period() {
        let value = store
            .get(latest)
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("Latest period: {} = {}", latest, value);
    }

    if let Some(year) = purchase_year {
        let cpi = CpiService::new(store);
        let period = CpiService::reference_period(year);
        match cpi.get_reference_value(year) {
            Some(value) => println!("Reference CPI for purchase year {} ({}): {}", year, period, value),
            None => println!("No reference CPI for purchase year {} ({})", year, period),
        }
    }

    Ok(())
}
