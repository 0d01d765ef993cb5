// src/handlers/valuation.rs
use chrono::Datelike;
use log::{error, info, warn};
use warp::reply::Json;
use warp::Rejection;

use super::error::ApiError;
use crate::models::ValuationInput;
use crate::services::cpi::CpiService;
use crate::services::valuation::ValuationService;

pub async fn calculate_valuation(
    input: ValuationInput,
    cpi: CpiService,
    valuation: ValuationService,
) -> Result<Json, Rejection> {
    info!(
        "Handling valuation request for {:?} property purchased {}",
        input.property_type, input.purchase_date
    );

    input.validate().map_err(|e| {
        warn!("Rejected valuation input: {}", e);
        warp::reject::custom(ApiError::unprocessable(e.to_string()))
    })?;

    let purchase_year = input.purchase_date.year();
    let cpi_data = cpi.reference_cpi_data(purchase_year).ok_or_else(|| {
        let period = CpiService::reference_period(purchase_year);
        warn!("No reference CPI for purchase year {} ({})", purchase_year, period);
        warp::reject::custom(ApiError::not_found(format!(
            "No CPI value available for {}",
            period
        )))
    })?;

    let result = valuation
        .calculate_valuation(&input, &cpi_data)
        .map_err(|e| {
            error!("Valuation failed: {}", e);
            warp::reject::custom(ApiError::bad_request(format!("Calculation error: {}", e)))
        })?;

    info!(
        "Valuation complete: total value {} ({}% building / {}% land)",
        result.theoretical_total_value, result.building_share_percent, result.land_share_percent
    );
    Ok(warp::reply::json(&result))
}
