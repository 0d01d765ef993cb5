// src/handlers/cpi.rs
use chrono::{Datelike, Utc};
use log::{debug, info};
use serde_json::json;
use warp::reply::Json;
use warp::Rejection;

use super::error::ApiError;
use crate::services::cpi::CpiService;

/// Earliest year served by the CPI endpoint.
pub const MIN_CPI_YEAR: i32 = 2002;

pub async fn get_cpi(year: i32, month: u32, cpi: CpiService) -> Result<Json, Rejection> {
    info!("Handling request to get CPI for {}-{:02}", year, month);

    if !(1..=12).contains(&month) {
        return Err(warp::reject::custom(ApiError::bad_request(
            "CPI month must be between 1 and 12",
        )));
    }

    if year < MIN_CPI_YEAR || year > Utc::now().year() {
        return Err(warp::reject::custom(ApiError::bad_request(
            "CPI year must be between 2002 and today.",
        )));
    }

    let value = cpi.get_cpi(year, month);
    if value.is_none() {
        debug!("No CPI value stored for {}-{:02}", year, month);
    }

    Ok(warp::reply::json(&value))
}

pub async fn get_reference_cpi(purchase_year: i32, cpi: CpiService) -> Result<Json, Rejection> {
    // Reference periods run from October 2002 to October of the current year.
    let min_year = MIN_CPI_YEAR + 1;
    let max_year = Utc::now().year() + 1;
    if purchase_year < min_year || purchase_year > max_year {
        return Err(warp::reject::custom(ApiError::bad_request(format!(
            "Purchase year must be between {} and {}.",
            min_year, max_year
        ))));
    }

    let period = CpiService::reference_period(purchase_year);
    info!("Handling request to get reference CPI ({}) for purchase year {}", period, purchase_year);

    Ok(warp::reply::json(&json!({
        "period": period.to_string(),
        "value": cpi.get_reference_value(purchase_year),
    })))
}
