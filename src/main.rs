// src/main.rs
use dotenv::dotenv;
use log::info;
use std::sync::Arc;
use warp::Filter;

use ertragswert_backend::config::Settings;
use ertragswert_backend::routes;
use ertragswert_backend::services::cpi::CpiService;
use ertragswert_backend::services::cpi_parser::CpiParser;
use ertragswert_backend::services::cpi_store::CpiStore;
use ertragswert_backend::services::scheduler::{run_refresh, start_refresh_scheduler};
use ertragswert_backend::services::valuation::ValuationService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();
    info!("Logger initialized. Starting the application...");

    let settings = Settings::from_env()?;
    let addr = settings.addr();
    info!("Will bind to: {}", addr);

    let store = Arc::new(CpiStore::new());
    let parser = Arc::new(CpiParser::new(settings.cpi_source_url.clone(), store.clone())?);

    // First load runs in the background; lookups return null until it lands
    let initial = parser.clone();
    tokio::spawn(async move {
        run_refresh(&initial).await;
    });

    // Keep the handle alive for the lifetime of the server
    let _scheduler = start_refresh_scheduler(parser, &settings.refresh_cron).await?;

    let cpi = CpiService::new(store);
    let valuation = ValuationService::new(settings.cpi_base);

    let api = routes::routes(cpi, valuation).with(routes::cors(&settings.frontend_urls));
    if settings.frontend_urls.is_empty() {
        info!("Routes configured with CORS for any origin.");
    } else {
        info!(
            "Routes configured with CORS for: {}",
            settings.frontend_urls.join(", ")
        );
    }

    info!("Starting server on {}", addr);
    warp::serve(api).run(addr).await;
    Ok(())
}
