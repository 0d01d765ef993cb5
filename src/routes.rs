// src/routes.rs
use log::{error, info};
use std::convert::Infallible;
use warp::http::StatusCode;
use warp::reject::Rejection;
use warp::{Filter, Reply};

use crate::handlers::cpi::{get_cpi, get_reference_cpi};
use crate::handlers::error::ApiError;
use crate::handlers::health::health_check;
use crate::handlers::valuation::calculate_valuation;
use crate::services::cpi::CpiService;
use crate::services::valuation::ValuationService;

const MAX_BODY_BYTES: u64 = 16 * 1024;

// Maps every rejection to a JSON `{"error": ...}` body
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let code;
    let message: String;

    if err.is_not_found() {
        code = StatusCode::NOT_FOUND;
        message = "Not Found".to_string();
    } else if let Some(api_error) = err.find::<ApiError>() {
        code = api_error.status;
        message = api_error.message.clone();
    } else if let Some(e) = err.find::<warp::body::BodyDeserializeError>() {
        code = StatusCode::UNPROCESSABLE_ENTITY;
        message = format!("Invalid request body: {}", e);
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        code = StatusCode::PAYLOAD_TOO_LARGE;
        message = "Payload Too Large".to_string();
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        code = StatusCode::METHOD_NOT_ALLOWED;
        message = "Method Not Allowed".to_string();
    } else {
        error!("Unhandled rejection: {:?}", err);
        code = StatusCode::INTERNAL_SERVER_ERROR;
        message = "Internal Server Error".to_string();
    }

    Ok(warp::reply::with_status(
        warp::reply::json(&serde_json::json!({
            "error": message,
        })),
        code,
    ))
}

pub fn routes(
    cpi: CpiService,
    valuation: ValuationService,
) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    info!("Configuring routes...");

    let cpi_filter = warp::any().map(move || cpi.clone());
    let valuation_filter = warp::any().map(move || valuation);

    let health_route = warp::path!("api" / "health")
        .and(warp::get())
        .and_then(health_check);

    let cpi_route = warp::path!("api" / "cpi" / i32 / u32)
        .and(warp::get())
        .and(cpi_filter.clone())
        .and_then(get_cpi);

    let reference_cpi_route = warp::path!("api" / "cpi" / "reference" / i32)
        .and(warp::get())
        .and(cpi_filter.clone())
        .and_then(get_reference_cpi);

    let valuation_route = warp::path!("api" / "valuation" / "calculate")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(cpi_filter)
        .and(valuation_filter)
        .and_then(calculate_valuation);

    info!("All routes configured successfully.");

    health_route
        .or(cpi_route)
        .or(reference_cpi_route)
        .or(valuation_route)
        .recover(handle_rejection)
}

/// CORS for the frontend: the listed origins, or any origin when the list is empty.
/// Origins must already be validated (see `config::parse_origins`).
pub fn cors(frontend_urls: &[String]) -> warp::cors::Builder {
    let builder = warp::cors()
        .allow_headers(vec!["content-type", "accept", "authorization"])
        .allow_methods(vec!["GET", "POST", "OPTIONS"]);

    if frontend_urls.is_empty() {
        builder.allow_any_origin()
    } else {
        builder.allow_origins(frontend_urls.iter().map(String::as_str))
    }
}
